//! # Strata SDK
//!
//! Implements the time-indexed aggregating tree ([`tree`]) and the
//! process-wide [`Registry`] of named signals built on top of it, including
//! the rate-limited change-notification fan-out ([`subscription`]) that lets
//! external collaborators learn "something changed" without polling.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

mod error;
mod registry;
mod subscription;
pub mod tree;

pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use subscription::{Listener, SubscriptionHandle, Subscriptions};
pub use tree::QueryResult;
