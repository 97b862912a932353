use serde::{Deserialize, Serialize};

// ============================================================================
// Malzeme Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalzemeStatus {
    Active,
    Inactive,
}

impl MalzemeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalzemeStatus::Active => "Active",
            MalzemeStatus::Inactive => "Inactive",
        }
    }
}

/// Catalog code, stored upper case without surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCode(pub String);

impl MaterialCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_normalized() {
        assert_eq!(MaterialCode::new("  vida-m8 ").as_str(), "VIDA-M8");
    }
}
