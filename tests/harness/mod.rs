//! Test harness utilities for handshake integration tests.
//!
//! This module provides a scripted WebSocket server that answers the opening
//! handshake in a configurable way and records every request it receives.

#![allow(dead_code)]

mod server;

pub use server::{Reply, TestServer};
