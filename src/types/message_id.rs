/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The deduplication key shared by every protocol.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use super::data_types::{ContentHash, NodeId, SequenceNumber, TrackingId};

/// Uniquely identifies one logical broadcast instance.
///
/// A `MessageId` is created when an origin calls `broadcast`, or when a node first receives a message
/// carrying it. All per-id protocol state (vote sets, recorded paths, relay buffers) is keyed by the
/// `MessageId`, and is deleted when the node delivers the broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct MessageId {
    pub origin: NodeId,
    pub sequence: SequenceNumber,
    pub tracking_id: TrackingId,
    pub content_hash: ContentHash,
}

impl MessageId {
    pub fn new(
        origin: NodeId,
        sequence: SequenceNumber,
        tracking_id: TrackingId,
        content: &[u8],
    ) -> Self {
        Self {
            origin,
            sequence,
            tracking_id,
            content_hash: ContentHash::of(content),
        }
    }

    /// Check that `content` is the content this id was created for.
    pub fn matches(&self, content: &[u8]) -> bool {
        self.content_hash == ContentHash::of(content)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.origin, self.sequence, self.tracking_id, self.content_hash
        )
    }
}
