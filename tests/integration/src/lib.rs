//! Integration test utilities for the session lifecycle
//!
//! This crate provides helpers for running end-to-end flows through the
//! service layer against the in-memory store or a real PostgreSQL database.

pub mod helpers;
pub mod fixtures;

pub use helpers::*;
pub use fixtures::*;
