//! ProximaGo Core - Shared types and pure logic.
//!
//! This crate provides everything the ticket desk computes without talking
//! to the backend:
//! - [`types`] - IDs, emails, closed enumerations and the row models
//! - [`permissions`] - role to capability mapping
//! - [`views`] - dashboard aggregation and ticket registry projection
//! - [`desk`] - the per-browser application state and its transitions
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Handlers in `proxima-desk` call the gateway and then feed the
//! results into [`desk::Desk::apply`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod desk;
pub mod permissions;
pub mod types;
pub mod views;

pub use permissions::Capabilities;
pub use types::*;
