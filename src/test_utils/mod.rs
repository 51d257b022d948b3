//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations and a scriptable payment gateway
//! - `TestAppStateBuilder` for HTTP-level tests

mod app_state_builder;
mod factories;
mod subscription_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use subscription_mocks::*;
