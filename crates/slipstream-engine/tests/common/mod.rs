//! Common test infrastructure for slipstream-engine tests
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

pub mod builders;

pub use builders::*;
