/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Application`] trait, implemented by whatever consumes delivered broadcasts.
//!
//! In an evaluation run, the application is usually a statistics collector owned by the harness, which
//! also compares the payloads delivered by different nodes to detect protocol-guarantee violations.

use crate::types::{NodeId, TrackingId};

/// Receiver of delivered broadcasts.
///
/// Every protocol calls [`deliver`](Application::deliver) at most once per broadcast instance, and only
/// once its delivery condition is met. A node that starts a broadcast delivers it to itself as well.
pub trait Application: Send {
    fn deliver(&mut self, tracking_id: TrackingId, payload: &[u8], origin: NodeId);
}
