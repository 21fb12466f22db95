//! The time-indexed aggregating tree (TAT).
//!
//! [`node`] defines the leaf/internal node family and their append/select
//! protocols; [`root`] wraps the current root node with the growth policy
//! and the public query surface ([`Tat`](root::Tat)).

mod node;
mod root;

pub use node::{InternalNode, LeafNode, Node, FANOUT, LEAF_CAP};
pub use root::{QueryResult, Tat};
