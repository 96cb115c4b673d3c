/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wire format of [`BrachaDolev`](super::BrachaDolev).
//!
//! The outer message is a routed envelope. The content of each of its parts is a borsh-encoded
//! [`BrachaMessage`], and the part's id is a Dolev-level id created by the voter for that content.

use crate::bracha::messages::BrachaMessage;
use crate::dolev::messages::RoutedDolevEnvelope;
use crate::networking::messages::{decode, encode};
use crate::protocol::ProtocolError;

/// Routed Dolev messages whose contents are encoded [`BrachaMessage`]s.
pub type BrachaDolevMessage = RoutedDolevEnvelope;

pub(crate) fn encode_vote(message: &BrachaMessage) -> Result<Vec<u8>, ProtocolError> {
    encode(message)
}

pub(crate) fn decode_vote(content: &[u8]) -> Result<BrachaMessage, ProtocolError> {
    decode(content)
}
