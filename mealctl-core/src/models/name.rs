//! Entity name validation

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum length for meal, recipe, product and profile names
const MAX_NAME_LEN: usize = 255;

/// Validated display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Create a new name.
    ///
    /// # Rules
    /// - Non-empty (after trimming whitespace)
    /// - Max 255 characters
    ///
    /// # Example
    /// ```
    /// use mealctl_core::models::EntityName;
    ///
    /// assert!(EntityName::new("Lasagna").is_ok());
    /// assert!(EntityName::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}
