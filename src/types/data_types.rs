/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store numbers or bytes, and do not have any major "active" behavior.

use std::fmt::{self, Debug, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// Number that uniquely identifies a node (an actor) in the simulated network.
///
/// `NodeId`s are totally ordered. Several deterministic decisions in this crate depend on this order,
/// for example the order in which routing destinations are visited, and which of two conflicting
/// relay paths gets forwarding priority.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshDeserialize, BorshSerialize,
)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a new `NodeId` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the `u64` value of this `NodeId`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(int: u64) -> Self {
        Self(int)
    }
}

/// External correlation identifier attached to a broadcast by the harness.
///
/// The tracking ID is only used for statistics. It takes part in [`MessageId`](super::MessageId), but
/// the protocols never make decisions based on its value.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshDeserialize, BorshSerialize,
)]
pub struct TrackingId(u64);

impl TrackingId {
    /// Create a new `TrackingId` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the `u64` value of this `TrackingId`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for TrackingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for TrackingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Per-origin counter that increases by 1 with every broadcast the origin starts.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// Create a new `SequenceNumber` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the `u64` value of this `SequenceNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the current value and advance the counter by one.
    pub(crate) fn next(&mut self) -> SequenceNumber {
        let current = *self;
        self.0 += 1;
        current
    }
}

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// 32-byte SHA256 hash of a broadcast's content.
///
/// Two broadcasts that share origin and sequence number but carry different content have different
/// `ContentHash`es, and are therefore treated as two different broadcast instances.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new `ContentHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the SHA256 hash of `content`.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Get the inner `[u8; 32]` value of this `ContentHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
