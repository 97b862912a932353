use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta};
use crate::models::is_valid_email;
use super::commands::FirmaCommand;
use super::errors::FirmaError;
use super::events::*;
use super::value_objects::{FirmaStatus, FirmaType, TaxNumber};

// ============================================================================
// Firma Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Firma {
    pub meta: AggregateMeta,
    pub name: String,
    pub tax_number: TaxNumber,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub firma_type: FirmaType,
    pub status: FirmaStatus,
    pub passive_reason: Option<String>,
}

impl Firma {
    pub fn is_active(&self) -> bool {
        self.status == FirmaStatus::Active && !self.meta.is_deleted
    }

    fn validate_not_deleted(&self) -> Result<(), FirmaError> {
        if self.meta.is_deleted {
            return Err(FirmaError::Deleted);
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<(), FirmaError> {
        if !is_valid_email(email) {
            return Err(FirmaError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }
}

impl Aggregate for Firma {
    type Event = FirmaEvent;
    type Command = FirmaCommand;
    type Error = FirmaError;

    const AGGREGATE_TYPE: &'static str = "Firma";

    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FirmaCommand::Register { name, tax_number, tax_office, address, phone, email, firma_type } => {
                if name.trim().is_empty() {
                    return Err(FirmaError::EmptyName);
                }
                if !tax_number.is_valid() {
                    return Err(FirmaError::InvalidTaxNumber(tax_number.as_str().to_string()));
                }
                Self::validate_email(email)?;

                Ok(vec![FirmaEvent::Registered(FirmaRegistered {
                    name: name.trim().to_string(),
                    tax_number: tax_number.clone(),
                    tax_office: tax_office.clone(),
                    address: address.clone(),
                    phone: phone.clone(),
                    email: email.trim().to_lowercase(),
                    firma_type: *firma_type,
                })])
            }
            _ => Err(FirmaError::NotInitialized),
        }
    }

    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            FirmaEvent::Registered(e) => Ok(Self {
                meta,
                name: e.name.clone(),
                tax_number: e.tax_number.clone(),
                tax_office: e.tax_office.clone(),
                address: e.address.clone(),
                phone: e.phone.clone(),
                email: e.email.clone(),
                firma_type: e.firma_type,
                status: FirmaStatus::PendingApproval,
                passive_reason: None,
            }),
            _ => Err(FirmaError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            FirmaEvent::Registered(_) => {}
            FirmaEvent::ProfileUpdated(e) => {
                if let Some(ref name) = e.name {
                    self.name = name.clone();
                }
                if let Some(ref tax_office) = e.tax_office {
                    self.tax_office = Some(tax_office.clone());
                }
                if let Some(ref address) = e.address {
                    self.address = Some(address.clone());
                }
                if let Some(ref phone) = e.phone {
                    self.phone = Some(phone.clone());
                }
                if let Some(ref email) = e.email {
                    self.email = email.clone();
                }
                if let Some(firma_type) = e.firma_type {
                    self.firma_type = firma_type;
                }
            }
            FirmaEvent::Approved | FirmaEvent::Activated => {
                self.status = FirmaStatus::Active;
                self.passive_reason = None;
            }
            FirmaEvent::Deactivated { reason } => {
                self.status = FirmaStatus::Passive;
                self.passive_reason = Some(reason.clone());
            }
            FirmaEvent::Deleted => {
                self.meta.is_deleted = true;
            }
        }
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.validate_not_deleted()?;

        match command {
            FirmaCommand::Register { .. } => Err(FirmaError::InvalidStatusTransition(self.status)),

            FirmaCommand::UpdateProfile { name, tax_office, address, phone, email, firma_type } => {
                if let Some(name) = name {
                    if name.trim().is_empty() {
                        return Err(FirmaError::EmptyName);
                    }
                }
                if let Some(email) = email {
                    Self::validate_email(email)?;
                }

                let update = FirmaProfileUpdated {
                    name: name.as_ref().map(|n| n.trim().to_string()),
                    tax_office: tax_office.clone(),
                    address: address.clone(),
                    phone: phone.clone(),
                    email: email.as_ref().map(|e| e.trim().to_lowercase()),
                    firma_type: *firma_type,
                };
                Ok(vec![FirmaEvent::ProfileUpdated(update)])
            }

            FirmaCommand::Approve => match self.status {
                FirmaStatus::PendingApproval => Ok(vec![FirmaEvent::Approved]),
                FirmaStatus::Active => Err(FirmaError::AlreadyApproved),
                FirmaStatus::Passive => Err(FirmaError::InvalidStatusTransition(self.status)),
            },

            FirmaCommand::Deactivate { reason } => match self.status {
                FirmaStatus::Active => Ok(vec![FirmaEvent::Deactivated { reason: reason.clone() }]),
                _ => Err(FirmaError::NotActive),
            },

            FirmaCommand::Activate => match self.status {
                FirmaStatus::Passive => Ok(vec![FirmaEvent::Activated]),
                _ => Err(FirmaError::NotPassive),
            },

            FirmaCommand::Delete => Ok(vec![FirmaEvent::Deleted]),
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

    /// A firm owns itself; child tables reference it through this column.
    fn owner_firma_id(&self) -> Option<Uuid> {
        Some(self.meta.id)
    }

    fn unique_keys(&self) -> Vec<String> {
        if self.meta.is_deleted {
            return Vec::new();
        }
        vec![format!("tax_number:{}", self.tax_number.as_str())]
    }

    fn empty_history_error() -> Self::Error {
        FirmaError::NotInitialized
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn register_command() -> FirmaCommand {
        FirmaCommand::Register {
            name: "  Acme Endustri A.S. ".to_string(),
            tax_number: TaxNumber::new("1234567890"),
            tax_office: Some("Kadikoy".to_string()),
            address: None,
            phone: None,
            email: "Info@Acme.com.tr".to_string(),
            firma_type: FirmaType::Customer,
        }
    }

    fn registered_firma() -> Firma {
        let events = Firma::handle_creation(&register_command()).unwrap();
        Firma::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, Utc::now()), &events).unwrap()
    }

    fn apply(firma: &mut Firma, command: FirmaCommand) -> Result<(), FirmaError> {
        let events = firma.handle_command(&command)?;
        for event in &events {
            firma.apply_event(event)?;
        }
        Ok(())
    }

    #[test]
    fn test_registration_starts_pending() {
        let firma = registered_firma();
        assert_eq!(firma.status, FirmaStatus::PendingApproval);
        assert_eq!(firma.name, "Acme Endustri A.S.");
        assert_eq!(firma.email, "info@acme.com.tr");
        assert!(!firma.is_active());
    }

    #[test]
    fn test_registration_rejects_bad_tax_number() {
        let command = FirmaCommand::Register {
            name: "Acme".into(),
            tax_number: TaxNumber::new("12AB"),
            tax_office: None,
            address: None,
            phone: None,
            email: "info@acme.com".into(),
            firma_type: FirmaType::Supplier,
        };
        assert!(matches!(Firma::handle_creation(&command), Err(FirmaError::InvalidTaxNumber(_))));
    }

    #[test]
    fn test_registration_rejects_empty_name() {
        let command = FirmaCommand::Register {
            name: "   ".into(),
            tax_number: TaxNumber::new("1234567890"),
            tax_office: None,
            address: None,
            phone: None,
            email: "info@acme.com".into(),
            firma_type: FirmaType::Supplier,
        };
        assert!(matches!(Firma::handle_creation(&command), Err(FirmaError::EmptyName)));
    }

    #[test]
    fn test_approval_lifecycle() {
        let mut firma = registered_firma();

        apply(&mut firma, FirmaCommand::Approve).unwrap();
        assert!(firma.is_active());
        assert!(matches!(firma.handle_command(&FirmaCommand::Approve), Err(FirmaError::AlreadyApproved)));

        apply(&mut firma, FirmaCommand::Deactivate { reason: "unpaid fees".into() }).unwrap();
        assert_eq!(firma.status, FirmaStatus::Passive);
        assert_eq!(firma.passive_reason.as_deref(), Some("unpaid fees"));

        apply(&mut firma, FirmaCommand::Activate).unwrap();
        assert_eq!(firma.status, FirmaStatus::Active);
        assert!(firma.passive_reason.is_none());
    }

    #[test]
    fn test_cannot_deactivate_pending_firma() {
        let firma = registered_firma();
        let result = firma.handle_command(&FirmaCommand::Deactivate { reason: "x".into() });
        assert!(matches!(result, Err(FirmaError::NotActive)));
    }

    #[test]
    fn test_cannot_activate_active_firma() {
        let mut firma = registered_firma();
        apply(&mut firma, FirmaCommand::Approve).unwrap();
        assert!(matches!(firma.handle_command(&FirmaCommand::Activate), Err(FirmaError::NotPassive)));
    }

    #[test]
    fn test_profile_update_only_changes_given_fields() {
        let mut firma = registered_firma();
        apply(
            &mut firma,
            FirmaCommand::UpdateProfile {
                name: None,
                tax_office: None,
                address: Some("Istanbul".into()),
                phone: None,
                email: None,
                firma_type: Some(FirmaType::Both),
            },
        )
        .unwrap();

        assert_eq!(firma.name, "Acme Endustri A.S.");
        assert_eq!(firma.address.as_deref(), Some("Istanbul"));
        assert_eq!(firma.firma_type, FirmaType::Both);
    }

    #[test]
    fn test_deleted_firma_rejects_commands_and_releases_tax_number() {
        let mut firma = registered_firma();
        assert_eq!(firma.unique_keys(), vec!["tax_number:1234567890".to_string()]);

        apply(&mut firma, FirmaCommand::Delete).unwrap();
        assert!(firma.is_deleted());
        assert!(firma.unique_keys().is_empty());
        assert!(matches!(firma.handle_command(&FirmaCommand::Approve), Err(FirmaError::Deleted)));
        assert!(matches!(firma.handle_command(&FirmaCommand::Delete), Err(FirmaError::Deleted)));
    }
}
