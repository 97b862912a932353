use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::DomainEvent;
use super::value_objects::Role;

// ============================================================================
// User Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    Created {
        email: String,
        full_name: String,
        firma_id: Option<Uuid>,
        role: Role,
    },
    ProfileUpdated {
        email: Option<String>,
        full_name: Option<String>,
    },
    RoleChanged {
        old_role: Role,
        new_role: Role,
    },
    Disabled,
    Enabled,
    Deleted,
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created { .. } => "UserCreated",
            UserEvent::ProfileUpdated { .. } => "UserProfileUpdated",
            UserEvent::RoleChanged { .. } => "UserRoleChanged",
            UserEvent::Disabled => "UserDisabled",
            UserEvent::Enabled => "UserEnabled",
            UserEvent::Deleted => "UserDeleted",
        }
    }
}
