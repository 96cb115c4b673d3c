/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tags that tell a receiving protocol how to decode a payload, and the borsh helpers used to encode
//! and decode payloads.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::protocol::ProtocolError;

/// Kind of a message on the wire. Every protocol only accepts the kinds it sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum MessageType {
    /// [`BrachaPayload`](crate::bracha::messages::BrachaPayload) sent by the origin.
    BrachaSend,
    /// [`BrachaPayload`](crate::bracha::messages::BrachaPayload) echoed by a node that got the SEND.
    BrachaEcho,
    /// [`BrachaPayload`](crate::bracha::messages::BrachaPayload) from a node ready to deliver.
    BrachaReady,
    /// [`DolevMessage`](crate::dolev::messages::DolevMessage) relayed by flooding.
    Dolev,
    /// [`RoutedDolevEnvelope`](crate::dolev::messages::RoutedDolevEnvelope) relayed along precomputed
    /// routes.
    DolevRouted,
    /// Routed envelope whose parts carry encoded
    /// [`BrachaMessage`](crate::bracha::messages::BrachaMessage)s.
    BrachaDolev,
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::BrachaSend => "BrachaSend",
            MessageType::BrachaEcho => "BrachaEcho",
            MessageType::BrachaReady => "BrachaReady",
            MessageType::Dolev => "Dolev",
            MessageType::DolevRouted => "DolevRouted",
            MessageType::BrachaDolev => "BrachaDolev",
        };
        f.write_str(name)
    }
}

pub(crate) fn encode<M: BorshSerialize>(message: &M) -> Result<Vec<u8>, ProtocolError> {
    message
        .try_to_vec()
        .map_err(|error| ProtocolError::Encode(error.to_string()))
}

/// Decode a payload. The whole payload must be consumed.
pub(crate) fn decode<M: BorshDeserialize>(payload: &[u8]) -> Result<M, ProtocolError> {
    M::try_from_slice(payload).map_err(|error| ProtocolError::Decode(error.to_string()))
}
