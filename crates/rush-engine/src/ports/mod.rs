//! Ports for the match engine
//!
//! - `inbound`: API the engine offers to transports
//! - `outbound`: collaborators the engine depends on

pub mod inbound;
pub mod outbound;
