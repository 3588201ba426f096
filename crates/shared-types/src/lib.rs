//! # Shared Types Crate
//!
//! This crate contains the identifiers and enums that cross crate
//! boundaries: the engine, the event bus and the runtime all speak in these
//! types.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Opaque Identity**: `PlayerId` is an already-authenticated identity
//!   string; nothing in this workspace parses or trusts its contents.
//! - **Monotonic Lifecycle**: `MatchState` only moves forward.

pub mod entities;

pub use entities::*;
