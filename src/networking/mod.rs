/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable message transport between simulated nodes.
//!
//! Each protocol instance talks to the rest of the system through a [`Network`] supplied by the harness.
//! The network only moves opaque byte payloads tagged with a [`MessageType`](messages::MessageType); the
//! protocol modules encode and decode their own message types with [borsh](borsh).

pub mod network;

pub mod messages;

pub(crate) mod sending;

pub use messages::MessageType;
pub use network::{Network, SendError};
