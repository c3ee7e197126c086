use serde::{Deserialize, Serialize};

/// What a caller is allowed to do, resolved once from its credentials.
///
/// Tokens never reach the judging core; the front end turns them into one of these values
/// and the core only matches on the variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Capability {
    Anonymous,
    User(String),
    Admin(String),
}

impl Capability {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    /// Name of the authenticated user, if any.
    pub fn user_name(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(name) | Self::Admin(name) => Some(name),
        }
    }

    /// True when the caller is the named user.
    pub fn is_user(&self, name: &str) -> bool {
        self.user_name() == Some(name)
    }
}
