//! Tags attached to clients, menus, meals and recipes
//!
//! Textual form is `key::value` with an optional `@author` suffix,
//! e.g. `cuisine::italian@4f1c...`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Matches: key::value or key::value@author
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[A-Za-z0-9_\-]+)::(?P<value>[^@\s]+)(?:@(?P<author>[^\s]+))?$")
        .expect("invalid tag regex")
});

const MAX_PART_LEN: usize = 64;

/// A single `(key, value, author)` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
    /// `None` in a filter matches tags from any author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl Tag {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        author_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let key = key.into().trim().to_lowercase();
        let value = value.into().trim().to_lowercase();

        if key.is_empty() {
            return Err(ValidationError::Empty { field: "tag key" });
        }
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "tag value" });
        }
        if key.len() > MAX_PART_LEN || value.len() > MAX_PART_LEN {
            return Err(ValidationError::TooLong {
                field: "tag",
                max: MAX_PART_LEN,
            });
        }

        Ok(Self {
            key,
            value,
            author_id: author_id.filter(|a| !a.is_empty()),
        })
    }

    /// Parse the textual `key::value[@author]` form.
    ///
    /// # Example
    /// ```
    /// use mealctl_core::models::Tag;
    ///
    /// let tag = Tag::parse("diet::vegan").unwrap();
    /// assert_eq!(tag.key, "diet");
    /// assert!(tag.author_id.is_none());
    /// ```
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let caps = TAG_RE.captures(s.trim()).ok_or(ValidationError::InvalidFormat {
            field: "tag",
            reason: "expected key::value or key::value@author",
        })?;

        Self::new(
            &caps["key"],
            &caps["value"],
            caps.name("author").map(|m| m.as_str().to_owned()),
        )
    }

    /// Grouping key for filter semantics: same key and author are OR-ed.
    pub fn group(&self) -> (&str, Option<&str>) {
        (&self.key, self.author_id.as_deref())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.key, self.value)?;
        if let Some(author) = &self.author_id {
            write!(f, "@{}", author)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_author() {
        let tag = Tag::parse("cuisine::italian").unwrap();
        assert_eq!(tag.key, "cuisine");
        assert_eq!(tag.value, "italian");
        assert_eq!(tag.author_id, None);
    }

    #[test]
    fn parse_with_author() {
        let tag = Tag::parse("diet::vegan@nutri-42").unwrap();
        assert_eq!(tag.author_id.as_deref(), Some("nutri-42"));
        assert_eq!(tag.to_string(), "diet::vegan@nutri-42");
    }

    #[test]
    fn parse_normalizes_case() {
        let tag = Tag::parse("Cuisine::ITALIAN").unwrap();
        assert_eq!(tag.key, "cuisine");
        assert_eq!(tag.value, "italian");
    }

    #[test]
    fn invalid_tags() {
        assert!(Tag::parse("cuisine").is_err());
        assert!(Tag::parse("::italian").is_err());
        assert!(Tag::parse("cuisine::").is_err());
        assert!(Tag::parse("has space::x").is_err());
    }

    #[test]
    fn rejects_long_parts() {
        let long = "x".repeat(65);
        assert!(matches!(
            Tag::new(long, "v", None).unwrap_err(),
            ValidationError::TooLong { .. }
        ));
    }

    #[test]
    fn group_uses_key_and_author() {
        let a = Tag::parse("diet::vegan@u1").unwrap();
        let b = Tag::parse("diet::keto@u1").unwrap();
        let c = Tag::parse("diet::keto@u2").unwrap();
        assert_eq!(a.group(), b.group());
        assert_ne!(b.group(), c.group());
    }
}
