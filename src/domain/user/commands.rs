use uuid::Uuid;

use super::value_objects::Role;

// ============================================================================
// User Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum UserCommand {
    Create {
        email: String,
        full_name: String,
        firma_id: Option<Uuid>,
        role: Role,
    },
    UpdateProfile {
        email: Option<String>,
        full_name: Option<String>,
    },
    ChangeRole {
        role: Role,
    },
    Disable,
    Enable,
    Delete,
}

impl UserCommand {
    pub fn name(&self) -> &'static str {
        match self {
            UserCommand::Create { .. } => "create",
            UserCommand::UpdateProfile { .. } => "update_profile",
            UserCommand::ChangeRole { .. } => "change_role",
            UserCommand::Disable => "disable",
            UserCommand::Enable => "enable",
            UserCommand::Delete => "delete",
        }
    }
}
