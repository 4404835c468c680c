//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Placing ──┬──► Completed
///                          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// Checkout has not started yet.
    #[default]
    NotStarted,

    /// Vendor orders are being placed.
    Placing,

    /// A vendor order failed and sibling orders are being cancelled.
    Compensating,

    /// Every vendor order was placed (terminal state).
    Completed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if the checkout can begin placing orders.
    pub fn can_start(&self) -> bool {
        matches!(self, CheckoutState::NotStarted)
    }

    /// Returns true if the checkout can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, CheckoutState::Placing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::NotStarted => "not_started",
            CheckoutState::Placing => "placing",
            CheckoutState::Compensating => "compensating",
            CheckoutState::Completed => "completed",
            CheckoutState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
