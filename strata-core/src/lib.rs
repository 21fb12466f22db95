//! # Strata core
//!
//! Data model and aggregate algebra shared by every signal kept in a
//! [`strata-sdk`](https://docs.rs/strata-sdk) tree: observations, the kind a
//! signal is pinned to after its first sample, the [`Metric`] monoid used to
//! summarize runs of observations, and the [`Timespan`]/[`Aggregation`] pair
//! that caches those summaries at every level of the tree.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

mod aggregation;
mod error;
mod kind;
mod metric;
mod observation;
mod timespan;

pub use aggregation::Aggregation;
pub use error::{CoreError, CoreResult};
pub use kind::Kind;
pub use metric::{LogLevel, Metric};
pub use observation::{Observation, Value};
pub use timespan::Timespan;
