//! Driven adapters behind the port traits in [`crate::app::ports`].
//!
//! Device-only code is gated on `target_os = "espidf"`; every adapter has a
//! std/simulation backend so the whole core runs and tests on the host.

pub mod discovery;
pub mod netlink;
pub mod storage;
pub mod system;
pub mod telnet;
pub mod time;
pub mod transport;
