//! Checkout saga fanning a multi-vendor cart out into vendor orders.
//!
//! A checkout proceeds as follows:
//! 1. Validate the whole cart (vendors, quantities, prices, address)
//! 2. Place one order per vendor, sequentially
//! 3. Hand back notification intents for the caller to dispatch
//!
//! If placing a vendor order fails, the orders already placed are cancelled
//! in reverse order and the checkout ends `failed`.

pub mod aggregate;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod state;

pub use aggregate::{Checkout, PlacedOrder};
pub use coordinator::{CheckoutCoordinator, CheckoutOutcome, CheckoutRequest};
pub use directory::{InMemoryVendorDirectory, VendorDirectory};
pub use error::SagaError;
pub use events::CheckoutEvent;
pub use state::CheckoutState;
