/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The uniform surface every broadcast protocol exposes to the harness.
//!
//! The harness creates one protocol instance per node with [`init_protocol`] (or a concrete type's
//! [`Protocol::init`]), then feeds it every message addressed to the node with [`Protocol::receive`],
//! and starts broadcasts with [`Protocol::broadcast`]. Each instance is owned by exactly one actor and
//! is never shared, so protocols hold their state without locks.

use std::fmt::{self, Display, Formatter};

use crate::app::Application;
use crate::bracha::Bracha;
use crate::bracha_dolev::BrachaDolev;
use crate::config::{Config, ConfigError};
use crate::dolev::{Dolev, DolevRouted};
use crate::networking::{MessageType, Network, SendError};
use crate::routing::RoutingError;
use crate::types::{NodeId, TrackingId};

pub trait Protocol<N: Network, A: Application>: Send {
    /// Create the protocol instance of one node. Routed protocols compute their routes here.
    fn init(network: N, application: A, config: Config) -> Result<Self, ProtocolError>
    where
        Self: Sized;

    /// Process one message sent to this node by its neighbor `src`.
    ///
    /// Messages that are inconsistent or arrive after delivery are dropped. An `Err` means a local
    /// invariant or the network failed, and the run should be stopped.
    fn receive(
        &mut self,
        message_type: MessageType,
        src: NodeId,
        tracking_id: TrackingId,
        payload: &[u8],
    ) -> Result<(), ProtocolError>;

    /// Start a new broadcast of `payload` from this node.
    fn broadcast(&mut self, tracking_id: TrackingId, payload: Vec<u8>) -> Result<(), ProtocolError>;

    fn id(&self) -> NodeId;

    /// Number of messages this node has handed to the network.
    fn messages_sent(&self) -> u64;
}

/// The protocols this crate implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// Quorum voting over direct links. Assumes a fully connected network.
    Bracha,
    /// Path-diversity flooding.
    Dolev,
    /// Path-diversity along precomputed disjoint routes.
    DolevRouted,
    /// Bracha whose votes travel over routed Dolev.
    BrachaDolev,
}

impl ProtocolKind {
    /// Whether the protocol needs a topology to compute routes from.
    pub fn is_routed(&self) -> bool {
        matches!(self, ProtocolKind::DolevRouted | ProtocolKind::BrachaDolev)
    }
}

impl Display for ProtocolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Bracha => "bracha",
            ProtocolKind::Dolev => "dolev",
            ProtocolKind::DolevRouted => "dolev-routed",
            ProtocolKind::BrachaDolev => "bracha-dolev",
        };
        f.write_str(name)
    }
}

/// Create a protocol instance of the given `kind`. The instance validates `config` for its kind.
pub fn init_protocol<N, A>(
    kind: ProtocolKind,
    network: N,
    application: A,
    config: Config,
) -> Result<Box<dyn Protocol<N, A>>, ProtocolError>
where
    N: Network + 'static,
    A: Application + 'static,
{
    Ok(match kind {
        ProtocolKind::Bracha => Box::new(Bracha::init(network, application, config)?),
        ProtocolKind::Dolev => Box::new(Dolev::init(network, application, config)?),
        ProtocolKind::DolevRouted => Box::new(DolevRouted::init(network, application, config)?),
        ProtocolKind::BrachaDolev => Box::new(BrachaDolev::init(network, application, config)?),
    })
}

/// The ways a protocol instance can fail. Every variant is fatal to the run.
#[derive(Debug, PartialEq)]
pub enum ProtocolError {
    Config(ConfigError),

    /// Routes could not be computed on the configured topology.
    Routing(RoutingError),

    Send(SendError),

    /// The protocol does not handle messages of this type.
    UnexpectedMessageType(MessageType),

    /// A payload could not be decoded.
    Decode(String),

    /// A message could not be encoded.
    Encode(String),

    /// Local state contradicts what the protocol guarantees, e.g. a node received its own broadcast
    /// back, or a forwarded path already covers more hops than its route has.
    InvariantViolation(String),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Config(error) => write!(f, "invalid configuration: {}", error),
            ProtocolError::Routing(error) => write!(f, "routing failed: {}", error),
            ProtocolError::Send(error) => write!(f, "send failed: {}", error),
            ProtocolError::UnexpectedMessageType(message_type) => {
                write!(f, "unexpected message type {}", message_type)
            }
            ProtocolError::Decode(reason) => write!(f, "cannot decode payload: {}", reason),
            ProtocolError::Encode(reason) => write!(f, "cannot encode message: {}", reason),
            ProtocolError::InvariantViolation(reason) => {
                write!(f, "invariant violated: {}", reason)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ConfigError> for ProtocolError {
    fn from(value: ConfigError) -> Self {
        ProtocolError::Config(value)
    }
}

impl From<RoutingError> for ProtocolError {
    fn from(value: RoutingError) -> Self {
        ProtocolError::Routing(value)
    }
}

impl From<SendError> for ProtocolError {
    fn from(value: SendError) -> Self {
        ProtocolError::Send(value)
    }
}
