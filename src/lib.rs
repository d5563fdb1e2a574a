//! EspWebUI connectivity core library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod config_store;
pub mod diagnostics;
pub mod error;
pub mod secret;
pub mod shell;
pub mod timer;

// Adapters carry their device-only code behind cfg attributes; the std
// backends below them run on the host.
pub mod adapters;
