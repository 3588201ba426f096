//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports: enough to run the
//! engine standalone and to drive it in tests.

mod clock;
mod invites;
mod memory_levels;
mod memory_ratings;
mod memory_repository;
mod notifier;
mod solver;

pub use clock::{ManualClock, SystemClock};
pub use invites::{AllowListInvites, OpenInvites};
pub use memory_levels::InMemoryLevelStore;
pub use memory_ratings::InMemoryRatingStore;
pub use memory_repository::InMemoryMatchRepository;
pub use notifier::{EventBusNotifier, RecordingNotifier};
pub use solver::SokobanSolver;
