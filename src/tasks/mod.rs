//! Background Tasks Module
//!
//! Contains background tasks that run while a lock is held.
//!
//! # Tasks
//! - Lease renewal: refreshes a networked lease at half its TTL and deletes
//!   it on release

mod renewal;

pub use renewal::{spawn_renewal_task, RenewalHandle};
