//! Core types for ProximaGo.
//!
//! This module provides type-safe wrappers and the row models mirrored from
//! the backend tables `profiles`, `tickets`, `comments` and `notifications`.

pub mod email;
pub mod id;
pub mod notification;
pub mod profile;
pub mod status;
pub mod ticket;

pub use email::{Email, EmailError};
pub use id::*;
pub use notification::Notification;
pub use profile::{Identity, Profile};
pub use status::*;
pub use ticket::{Comment, DraftError, Ticket, TicketDraft};
