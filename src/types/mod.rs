/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across multiple protocols or components of this crate.
//!
//! Other types, specific to single components, can be found in the "types" submodules of those
//! components, e.g., [`crate::bracha::types`].

pub mod data_types;

pub mod message_id;

pub use data_types::{ContentHash, NodeId, SequenceNumber, TrackingId};
pub use message_id::MessageId;
