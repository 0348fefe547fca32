//! Shared test utilities for riglaunch integration tests.
//!
//! This module provides:
//! - `TestHarness` with a SQLite-backed store in a temp directory
//! - `FakeGateway`, a scripted stand-in for the remote endpoints
//! - `RecordingProgress`, which keeps every pipeline event
//! - `HttpStub`, a local HTTP endpoint with one canned response
//! - Builders for configs and attribution maps

pub mod builders;
pub mod harness;
pub mod http_stub;

pub use builders::*;
pub use harness::{FakeGateway, RecordingProgress, TestHarness};
pub use http_stub::HttpStub;
