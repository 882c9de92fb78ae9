//! State module for tracking discovery progress
//!
//! # Components
//!
//! - `RosterDiscoverySession`: visited set, pending queue and accumulated roster
//! - `DriverState`: states of the discovery state machine
//! - `Termination`: why a session stopped

mod driver_state;
mod session;

// Re-export main types
pub use driver_state::{DriverState, Termination};
pub use session::{PendingUrl, RosterDiscoverySession};
