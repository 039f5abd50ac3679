//! Shared test utilities for jobdesk integration tests.
//!
//! This module provides:
//! - `ScriptedApi`, an in-memory `JobsApi` with gated replies
//! - `TestHarness` wiring a controller to it
//! - Builders for jobs, pages and errors

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{settle, test_options, Action, Call, Gate, ScriptedApi, TestHarness};
