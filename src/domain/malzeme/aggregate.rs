use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta};
use crate::models::{Currency, Unit};
use super::commands::MalzemeCommand;
use super::errors::MalzemeError;
use super::events::*;
use super::value_objects::{MalzemeStatus, MaterialCode};

// ============================================================================
// Malzeme Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Malzeme {
    pub meta: AggregateMeta,
    pub firma_id: Uuid,
    pub code: MaterialCode,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub currency: Currency,
    pub status: MalzemeStatus,
}

impl Malzeme {
    pub fn is_active(&self) -> bool {
        self.status == MalzemeStatus::Active && !self.meta.is_deleted
    }

    fn validate_price(price: Decimal) -> Result<(), MalzemeError> {
        if price < Decimal::ZERO {
            return Err(MalzemeError::NegativePrice(price));
        }
        Ok(())
    }
}

impl Aggregate for Malzeme {
    type Event = MalzemeEvent;
    type Command = MalzemeCommand;
    type Error = MalzemeError;

    const AGGREGATE_TYPE: &'static str = "Malzeme";

    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MalzemeCommand::Create { firma_id, code, name, description, category, unit, unit_price, currency } => {
                if code.as_str().is_empty() {
                    return Err(MalzemeError::EmptyCode);
                }
                if name.trim().is_empty() {
                    return Err(MalzemeError::EmptyName);
                }
                Self::validate_price(*unit_price)?;

                Ok(vec![MalzemeEvent::Created(MalzemeCreated {
                    firma_id: *firma_id,
                    code: code.clone(),
                    name: name.trim().to_string(),
                    description: description.clone(),
                    category: category.clone(),
                    unit: *unit,
                    unit_price: *unit_price,
                    currency: *currency,
                })])
            }
            _ => Err(MalzemeError::NotInitialized),
        }
    }

    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            MalzemeEvent::Created(e) => Ok(Self {
                meta,
                firma_id: e.firma_id,
                code: e.code.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
                category: e.category.clone(),
                unit: e.unit,
                unit_price: e.unit_price,
                currency: e.currency,
                status: MalzemeStatus::Active,
            }),
            _ => Err(MalzemeError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            MalzemeEvent::Created(_) => {}
            MalzemeEvent::Updated(e) => {
                if let Some(ref name) = e.name {
                    self.name = name.clone();
                }
                if let Some(ref description) = e.description {
                    self.description = Some(description.clone());
                }
                if let Some(ref category) = e.category {
                    self.category = Some(category.clone());
                }
                if let Some(unit) = e.unit {
                    self.unit = unit;
                }
            }
            MalzemeEvent::PriceChanged { new_price, currency, .. } => {
                self.unit_price = *new_price;
                self.currency = *currency;
            }
            MalzemeEvent::Deactivated => self.status = MalzemeStatus::Inactive,
            MalzemeEvent::Activated => self.status = MalzemeStatus::Active,
            MalzemeEvent::Deleted => self.meta.is_deleted = true,
        }
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.meta.is_deleted {
            return Err(MalzemeError::Deleted);
        }

        match command {
            MalzemeCommand::Create { .. } => Err(MalzemeError::NotInitialized),

            MalzemeCommand::Update { name, description, category, unit } => {
                if let Some(name) = name {
                    if name.trim().is_empty() {
                        return Err(MalzemeError::EmptyName);
                    }
                }
                Ok(vec![MalzemeEvent::Updated(MalzemeUpdated {
                    name: name.as_ref().map(|n| n.trim().to_string()),
                    description: description.clone(),
                    category: category.clone(),
                    unit: *unit,
                })])
            }

            MalzemeCommand::ChangePrice { unit_price, currency } => {
                Self::validate_price(*unit_price)?;
                if *unit_price == self.unit_price && *currency == self.currency {
                    return Ok(vec![]);
                }
                Ok(vec![MalzemeEvent::PriceChanged {
                    old_price: self.unit_price,
                    new_price: *unit_price,
                    currency: *currency,
                }])
            }

            MalzemeCommand::Deactivate => match self.status {
                MalzemeStatus::Active => Ok(vec![MalzemeEvent::Deactivated]),
                MalzemeStatus::Inactive => Err(MalzemeError::AlreadyInactive),
            },

            MalzemeCommand::Activate => match self.status {
                MalzemeStatus::Inactive => Ok(vec![MalzemeEvent::Activated]),
                MalzemeStatus::Active => Err(MalzemeError::AlreadyActive),
            },

            MalzemeCommand::Delete => Ok(vec![MalzemeEvent::Deleted]),
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
        Some(self.firma_id)
    }

    fn unique_keys(&self) -> Vec<String> {
        if self.meta.is_deleted {
            return Vec::new();
        }
        vec![format!("code:{}:{}", self.firma_id, self.code.as_str())]
    }

    fn empty_history_error() -> Self::Error {
        MalzemeError::NotInitialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_command(price: Decimal) -> MalzemeCommand {
        MalzemeCommand::Create {
            firma_id: Uuid::new_v4(),
            code: MaterialCode::new("civ-m8"),
            name: "Civata M8".into(),
            description: None,
            category: Some("Baglanti".into()),
            unit: Unit::Piece,
            unit_price: price,
            currency: Currency::TRY,
        }
    }

    fn created() -> Malzeme {
        let events = Malzeme::handle_creation(&create_command(Decimal::new(250, 2))).unwrap();
        Malzeme::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, Utc::now()), &events).unwrap()
    }

    #[test]
    fn test_create_material() {
        let malzeme = created();
        assert_eq!(malzeme.code.as_str(), "CIV-M8");
        assert_eq!(malzeme.status, MalzemeStatus::Active);
        assert_eq!(malzeme.unit_price, Decimal::new(250, 2));
        assert_eq!(malzeme.unique_keys(), vec![format!("code:{}:CIV-M8", malzeme.firma_id)]);
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = Malzeme::handle_creation(&create_command(Decimal::new(-1, 0)));
        assert!(matches!(result, Err(MalzemeError::NegativePrice(_))));
    }

    #[test]
    fn test_zero_price_allowed() {
        assert!(Malzeme::handle_creation(&create_command(Decimal::ZERO)).is_ok());
    }

    #[test]
    fn test_price_change() {
        let mut malzeme = created();
        let events = malzeme
            .handle_command(&MalzemeCommand::ChangePrice { unit_price: Decimal::new(3, 0), currency: Currency::EUR })
            .unwrap();
        assert_eq!(events.len(), 1);
        malzeme.apply_event(&events[0]).unwrap();
        assert_eq!(malzeme.unit_price, Decimal::new(3, 0));
        assert_eq!(malzeme.currency, Currency::EUR);

        let unchanged = malzeme
            .handle_command(&MalzemeCommand::ChangePrice { unit_price: Decimal::new(3, 0), currency: Currency::EUR })
            .unwrap();
        assert!(unchanged.is_empty());
    }

    #[test]
    fn test_activation_toggle() {
        let mut malzeme = created();
        assert!(matches!(malzeme.handle_command(&MalzemeCommand::Activate), Err(MalzemeError::AlreadyActive)));

        let events = malzeme.handle_command(&MalzemeCommand::Deactivate).unwrap();
        malzeme.apply_event(&events[0]).unwrap();
        assert!(!malzeme.is_active());
        assert!(matches!(malzeme.handle_command(&MalzemeCommand::Deactivate), Err(MalzemeError::AlreadyInactive)));
    }

    #[test]
    fn test_deleted_material_is_frozen() {
        let mut malzeme = created();
        let events = malzeme.handle_command(&MalzemeCommand::Delete).unwrap();
        malzeme.apply_event(&events[0]).unwrap();

        assert!(malzeme.unique_keys().is_empty());
        let result = malzeme.handle_command(&MalzemeCommand::Update {
            name: Some("x".into()),
            description: None,
            category: None,
            unit: None,
        });
        assert!(matches!(result, Err(MalzemeError::Deleted)));
    }
}
