//! Core types for RescueMap.
//!
//! This module provides type-safe wrappers for the shop inventory domain.

pub mod city;
pub mod geo;
pub mod id;
pub mod shop;
pub mod status;
pub mod sync;
pub mod timestamp;

pub use city::{CityName, CityNameError};
pub use geo::Coordinates;
pub use id::*;
pub use shop::{Shop, ShopCandidate};
pub use status::*;
pub use sync::{SyncChangeSet, SyncCursor};
