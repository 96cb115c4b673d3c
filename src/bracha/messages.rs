/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for structured messages that are sent between nodes as part of the [Bracha][super::Bracha]
//! protocol.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::networking::MessageType;
use crate::protocol::ProtocolError;
use crate::types::MessageId;

/// What every Bracha message carries. The content travels with every vote, so that a node can deliver
/// no matter which message it saw first.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BrachaPayload {
    pub id: MessageId,
    pub content: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum BrachaMessage {
    Send(BrachaPayload),
    Echo(BrachaPayload),
    Ready(BrachaPayload),
}

impl BrachaMessage {
    pub fn send(id: MessageId, content: Vec<u8>) -> BrachaMessage {
        BrachaMessage::Send(BrachaPayload { id, content })
    }

    pub fn echo(id: MessageId, content: Vec<u8>) -> BrachaMessage {
        BrachaMessage::Echo(BrachaPayload { id, content })
    }

    pub fn ready(id: MessageId, content: Vec<u8>) -> BrachaMessage {
        BrachaMessage::Ready(BrachaPayload { id, content })
    }

    /// Rebuild a message from the type tag and payload it was sent with over direct links.
    pub fn from_parts(
        message_type: MessageType,
        payload: BrachaPayload,
    ) -> Result<BrachaMessage, ProtocolError> {
        match message_type {
            MessageType::BrachaSend => Ok(BrachaMessage::Send(payload)),
            MessageType::BrachaEcho => Ok(BrachaMessage::Echo(payload)),
            MessageType::BrachaReady => Ok(BrachaMessage::Ready(payload)),
            other => Err(ProtocolError::UnexpectedMessageType(other)),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            BrachaMessage::Send(_) => MessageType::BrachaSend,
            BrachaMessage::Echo(_) => MessageType::BrachaEcho,
            BrachaMessage::Ready(_) => MessageType::BrachaReady,
        }
    }

    pub fn payload(&self) -> &BrachaPayload {
        match self {
            BrachaMessage::Send(payload)
            | BrachaMessage::Echo(payload)
            | BrachaMessage::Ready(payload) => payload,
        }
    }

    pub fn id(&self) -> MessageId {
        self.payload().id
    }

    pub fn content(&self) -> &[u8] {
        &self.payload().content
    }
}
