//! RescueMap Core - Shared types library.
//!
//! This crate provides common types used across all RescueMap components:
//! - `server` - JSON API, city inventory engine and sync manager
//! - `cli` - Command-line tools for migrations, city loading and sync
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Shop records, statuses, coordinates, city names and sync envelopes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
