//! # Strata Ingest
//!
//! The length-prefixed CBOR wire protocol ([`wire`], [`framing`]) and the
//! TCP server ([`server`]) that decodes it into [`strata_sdk::Registry`]
//! appends, plus the CLI surface ([`config`]) the `strata-serverd` binary
//! is built from.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

pub mod config;
pub mod error;
pub mod framing;
pub mod server;
pub mod wire;

pub use config::{Cli, ServerConfig};
pub use error::{FramingError, FramingResult, IngestError, IngestResult};
