use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta};
use crate::models::is_valid_email;
use super::commands::UserCommand;
use super::errors::UserError;
use super::events::UserEvent;
use super::value_objects::{Caller, Role, UserStatus};

// ============================================================================
// User Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub meta: AggregateMeta,
    pub email: String,
    pub full_name: String,
    pub firma_id: Option<Uuid>,
    pub role: Role,
    pub status: UserStatus,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active && !self.meta.is_deleted
    }

    pub fn as_caller(&self) -> Caller {
        Caller { user_id: self.meta.id, firma_id: self.firma_id, role: self.role }
    }

    fn normalize_email(email: &str) -> Result<String, UserError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(UserError::InvalidEmail(email));
        }
        Ok(email)
    }

    fn validate_role(role: Role, firma_id: Option<Uuid>) -> Result<(), UserError> {
        match (role.requires_firma(), firma_id) {
            (true, None) => Err(UserError::FirmaRequired(role)),
            (false, Some(_)) => Err(UserError::AdminWithFirma),
            _ => Ok(()),
        }
    }
}

impl Aggregate for User {
    type Event = UserEvent;
    type Command = UserCommand;
    type Error = UserError;

    const AGGREGATE_TYPE: &'static str = "User";

    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Create { email, full_name, firma_id, role } => {
                let email = Self::normalize_email(email)?;
                if full_name.trim().is_empty() {
                    return Err(UserError::EmptyName);
                }
                Self::validate_role(*role, *firma_id)?;

                Ok(vec![UserEvent::Created {
                    email,
                    full_name: full_name.trim().to_string(),
                    firma_id: *firma_id,
                    role: *role,
                }])
            }
            _ => Err(UserError::NotInitialized),
        }
    }

    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            UserEvent::Created { email, full_name, firma_id, role } => Ok(Self {
                meta,
                email: email.clone(),
                full_name: full_name.clone(),
                firma_id: *firma_id,
                role: *role,
                status: UserStatus::Active,
            }),
            _ => Err(UserError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            UserEvent::Created { .. } => {}
            UserEvent::ProfileUpdated { email, full_name } => {
                if let Some(email) = email {
                    self.email = email.clone();
                }
                if let Some(full_name) = full_name {
                    self.full_name = full_name.clone();
                }
            }
            UserEvent::RoleChanged { new_role, .. } => self.role = *new_role,
            UserEvent::Disabled => self.status = UserStatus::Disabled,
            UserEvent::Enabled => self.status = UserStatus::Active,
            UserEvent::Deleted => self.meta.is_deleted = true,
        }
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.meta.is_deleted {
            return Err(UserError::Deleted);
        }

        match command {
            UserCommand::Create { .. } => Err(UserError::NotInitialized),

            UserCommand::UpdateProfile { email, full_name } => {
                let email = email.as_deref().map(Self::normalize_email).transpose()?;
                if let Some(name) = full_name {
                    if name.trim().is_empty() {
                        return Err(UserError::EmptyName);
                    }
                }
                Ok(vec![UserEvent::ProfileUpdated {
                    email,
                    full_name: full_name.as_ref().map(|n| n.trim().to_string()),
                }])
            }

            UserCommand::ChangeRole { role } => {
                if *role == self.role {
                    return Err(UserError::SameRole(*role));
                }
                Self::validate_role(*role, self.firma_id)?;
                Ok(vec![UserEvent::RoleChanged { old_role: self.role, new_role: *role }])
            }

            UserCommand::Disable => match self.status {
                UserStatus::Active => Ok(vec![UserEvent::Disabled]),
                UserStatus::Disabled => Err(UserError::AlreadyDisabled),
            },

            UserCommand::Enable => match self.status {
                UserStatus::Disabled => Ok(vec![UserEvent::Enabled]),
                UserStatus::Active => Err(UserError::AlreadyActive),
            },

            UserCommand::Delete => Ok(vec![UserEvent::Deleted]),
        }
    }

    fn command_name(command: &Self::Command) -> &'static str {
        command.name()
    }

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut AggregateMeta {
        &mut self.meta
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn owner_firma_id(&self) -> Option<Uuid> {
        self.firma_id
    }

    fn unique_keys(&self) -> Vec<String> {
        if self.meta.is_deleted {
            return Vec::new();
        }
        vec![format!("email:{}", self.email)]
    }

    fn empty_history_error() -> Self::Error {
        UserError::NotInitialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create(role: Role, firma_id: Option<Uuid>) -> Result<User, UserError> {
        let events = User::handle_creation(&UserCommand::Create {
            email: " Ayse.Yilmaz@Acme.com ".into(),
            full_name: "Ayse Yilmaz".into(),
            firma_id,
            role,
        })?;
        User::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, Utc::now()), &events)
    }

    fn run(user: &mut User, command: UserCommand) -> Result<(), UserError> {
        for event in user.handle_command(&command)? {
            user.apply_event(&event)?;
        }
        Ok(())
    }

    #[test]
    fn test_create_normalizes_email() {
        let user = create(Role::User, Some(Uuid::new_v4())).unwrap();
        assert_eq!(user.email, "ayse.yilmaz@acme.com");
        assert_eq!(user.unique_keys(), vec!["email:ayse.yilmaz@acme.com".to_string()]);
        assert!(user.is_active());
    }

    #[test]
    fn test_role_and_firma_must_agree() {
        assert!(matches!(create(Role::FirmaAdmin, None), Err(UserError::FirmaRequired(Role::FirmaAdmin))));
        assert!(matches!(create(Role::Admin, Some(Uuid::new_v4())), Err(UserError::AdminWithFirma)));
        assert!(create(Role::Admin, None).is_ok());
    }

    #[test]
    fn test_change_role() {
        let mut user = create(Role::User, Some(Uuid::new_v4())).unwrap();
        run(&mut user, UserCommand::ChangeRole { role: Role::FirmaAdmin }).unwrap();
        assert_eq!(user.role, Role::FirmaAdmin);

        assert!(matches!(
            user.handle_command(&UserCommand::ChangeRole { role: Role::FirmaAdmin }),
            Err(UserError::SameRole(_))
        ));
        assert!(matches!(
            user.handle_command(&UserCommand::ChangeRole { role: Role::Admin }),
            Err(UserError::AdminWithFirma)
        ));
    }

    #[test]
    fn test_disable_enable() {
        let mut user = create(Role::User, Some(Uuid::new_v4())).unwrap();
        run(&mut user, UserCommand::Disable).unwrap();
        assert!(!user.is_active());
        assert!(matches!(user.handle_command(&UserCommand::Disable), Err(UserError::AlreadyDisabled)));
        run(&mut user, UserCommand::Enable).unwrap();
        assert!(user.is_active());
    }

    #[test]
    fn test_caller_view() {
        let firma = Uuid::new_v4();
        let user = create(Role::FirmaAdmin, Some(firma)).unwrap();
        let caller = user.as_caller();
        assert_eq!(caller.user_id, user.meta.id);
        assert_eq!(caller.firma_id, Some(firma));
        assert_eq!(caller.role, Role::FirmaAdmin);
    }

    #[test]
    fn test_delete_releases_email() {
        let mut user = create(Role::User, Some(Uuid::new_v4())).unwrap();
        run(&mut user, UserCommand::Delete).unwrap();
        assert!(user.unique_keys().is_empty());
        assert!(matches!(user.handle_command(&UserCommand::Enable), Err(UserError::Deleted)));
    }
}
