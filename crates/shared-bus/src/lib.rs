//! # Shared Bus - Match Update Fan-out
//!
//! Carries the per-viewer payloads the engine emits after every successful
//! command to whatever real-time transport sits on top (websocket gateway,
//! SSE, test harness).
//!
//! ## Rules
//!
//! - Every `MatchUpdate` is addressed to exactly one `Recipient`. The payload
//!   is the projection computed for that recipient; there is no shared
//!   payload that several viewers could read.
//! - Transports subscribe with an `EventFilter` naming their recipient so a
//!   connection never sees another player's projection.
//!
//! ```text
//! ┌──────────────┐   publish(update per recipient)   ┌──────────────┐
//! │ Rush Engine  │ ────────────────────────────────→ │  Event Bus   │
//! └──────────────┘                                   └──────┬───────┘
//!                                                           │ subscribe(filter)
//!                                      ┌────────────────────┼──────────────────┐
//!                                      ↓                    ↓                  ↓
//!                                 player A conn       player B conn     spectator conn
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, MatchUpdate, Recipient, RushEvent, UpdateKind};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::Subscription;

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
