//! Core types for NeYisek.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod notification;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Lira;
pub use notification::{NotificationKind, Segment, UnknownNotificationKind};
pub use status::*;
