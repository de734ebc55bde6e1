//! NeYisek Core - Shared domain types.
//!
//! This crate provides the types used across the NeYisek components:
//! - `server` - JSON API for the storefront, restaurant panel and admin panel
//! - `cli` - Migrations and database seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no network I/O, no database
//! access, no HTTP clients. The guest checkout session lives here because it is
//! client-local state: it only needs a key-value storage and a clock.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, money, emails, statuses and notification kinds
//! - [`guest`] - Guest checkout sessions with a 24-hour expiry

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod guest;
pub mod types;

pub use types::*;
