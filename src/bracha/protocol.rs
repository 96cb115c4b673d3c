/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`Bracha`] over direct links.

use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::app::Application;
use crate::config::Config;
use crate::event_bus::EventPublisher;
use crate::events::{Event, IgnoreMessageEvent, IgnoreReason};
use crate::networking::messages::decode;
use crate::networking::sending::SenderHandle;
use crate::networking::{MessageType, Network};
use crate::protocol::{Protocol, ProtocolError, ProtocolKind};
use crate::types::{MessageId, NodeId, TrackingId};

use super::implementation::{BrachaAction, BrachaCore, Recipients};
use super::messages::{BrachaMessage, BrachaPayload};
use super::types::Phase;

/// Bracha's protocol, with every vote sent straight to the recipient. Needs a fully connected network.
pub struct Bracha<N: Network, A: Application> {
    me: NodeId,
    byzantine: bool,
    neighbors: BTreeSet<NodeId>,
    included: BTreeSet<NodeId>,
    core: BrachaCore,
    sender: SenderHandle<N>,
    application: A,
    event_publisher: EventPublisher,
}

impl<N: Network, A: Application> Bracha<N, A> {
    /// Progress of the broadcast instance `id` at this node.
    pub fn phase(&self, id: &MessageId) -> Phase {
        self.core.phase(id)
    }

    fn execute(&mut self, actions: Vec<BrachaAction>) -> Result<(), ProtocolError> {
        for action in actions {
            match action {
                BrachaAction::Send {
                    message,
                    recipients,
                } => {
                    let destinations: Vec<NodeId> = match recipients {
                        Recipients::All => self.neighbors.iter().copied().collect(),
                        Recipients::Included => self
                            .neighbors
                            .intersection(&self.included)
                            .copied()
                            .collect(),
                    };
                    self.sender.multicast(
                        message.message_type(),
                        destinations,
                        message.id().tracking_id,
                        message.payload(),
                    )?;
                }
                BrachaAction::Deliver { id, content } => {
                    self.application
                        .deliver(id.tracking_id, &content, id.origin)
                }
            }
        }
        Ok(())
    }
}

impl<N: Network, A: Application> Protocol<N, A> for Bracha<N, A> {
    fn init(network: N, application: A, config: Config) -> Result<Self, ProtocolError> {
        config.validate(ProtocolKind::Bracha)?;
        let event_publisher = EventPublisher::new(config.log_events, config.event_handlers.clone());
        Ok(Self {
            me: config.id,
            byzantine: config.byzantine,
            included: config.included(),
            core: BrachaCore::new(&config, event_publisher.clone()),
            neighbors: config.neighbors,
            sender: SenderHandle::new(network),
            application,
            event_publisher,
        })
    }

    fn receive(
        &mut self,
        message_type: MessageType,
        src: NodeId,
        _tracking_id: TrackingId,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} drops {} from {}", self.me, message_type, src);
            Event::IgnoreMessage(IgnoreMessageEvent {
                timestamp: SystemTime::now(),
                node: self.me,
                src,
                message_type,
                reason: IgnoreReason::Byzantine,
            })
            .publish(&self.event_publisher);
            return Ok(());
        }

        if !matches!(
            message_type,
            MessageType::BrachaSend | MessageType::BrachaEcho | MessageType::BrachaReady
        ) {
            return Err(ProtocolError::UnexpectedMessageType(message_type));
        }
        let payload: BrachaPayload = decode(payload)?;
        let message = BrachaMessage::from_parts(message_type, payload)?;
        let actions = self.core.on_receive(src, message)?;
        self.execute(actions)
    }

    fn broadcast(&mut self, tracking_id: TrackingId, payload: Vec<u8>) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} does not broadcast", self.me);
            return Ok(());
        }
        let actions = self.core.broadcast(tracking_id, payload)?;
        self.execute(actions)
    }

    fn id(&self) -> NodeId {
        self.me
    }

    fn messages_sent(&self) -> u64 {
        self.sender.sent()
    }
}
