//! Ops Platform Common Library
//!
//! Shared types exchanged between the access core and the systems around it.

pub mod types;

pub use types::*;
