//! The principal on whose behalf a command runs.

use serde::{Deserialize, Serialize};

use crate::order::{UserId, VendorId};

/// Who issued a command.
///
/// Recorded on every order event so the audit trail shows which party moved
/// an order, including the checkout saga acting as [`Actor::System`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(UserId),
    Vendor(VendorId),
    Admin(String),
    System,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin(_))
    }

    /// Short role name used in logs and event metadata.
    pub fn role(&self) -> &'static str {
        match self {
            Actor::User(_) => "user",
            Actor::Vendor(_) => "vendor",
            Actor::Admin(_) => "admin",
            Actor::System => "system",
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::Vendor(id) => write!(f, "vendor:{id}"),
            Actor::Admin(id) => write!(f, "admin:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}
