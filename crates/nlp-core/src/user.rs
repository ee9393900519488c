// Identity / tenant context of a runner

use serde::{Deserialize, Serialize};
use std::fmt;

/// The user a runner works on behalf of
///
/// The user decides the default index name used when a work message
/// does not name one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    /// Id of the single-user local deployment
    pub const LOCAL_ID: &'static str = "local";

    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The local user
    pub fn local() -> Self {
        Self::new(Self::LOCAL_ID)
    }

    /// Index holding this user's documents
    pub fn default_index(&self) -> String {
        format!("{}-datashare", self.id)
    }

    pub fn is_local(&self) -> bool {
        self.id == Self::LOCAL_ID
    }
}

impl Default for User {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_user_default_index() {
        let user = User::default();
        assert!(user.is_local());
        assert_eq!(user.default_index(), "local-datashare");
    }

    #[test]
    fn test_named_user_default_index() {
        let user = User::new("alice");
        assert!(!user.is_local());
        assert_eq!(user.default_index(), "alice-datashare");
    }
}
