/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`BrachaDolev`], the hybrid protocol.

use std::time::SystemTime;

use crate::app::Application;
use crate::bracha::implementation::{BrachaAction, BrachaCore, Recipients};
use crate::bracha::messages::BrachaMessage;
use crate::bracha::types::Phase;
use crate::config::Config;
use crate::dolev::routed::RoutedDolevCore;
use crate::event_bus::EventPublisher;
use crate::events::{Event, IgnoreMessageEvent, IgnoreReason};
use crate::networking::messages::decode;
use crate::networking::sending::SenderHandle;
use crate::networking::{MessageType, Network};
use crate::protocol::{Protocol, ProtocolError, ProtocolKind};
use crate::types::{MessageId, NodeId, SequenceNumber, TrackingId};

use super::messages::{decode_vote, encode_vote, BrachaDolevMessage};

/// Bracha's protocol whose votes travel as routed Dolev broadcasts.
pub struct BrachaDolev<N: Network, A: Application> {
    me: NodeId,
    byzantine: bool,
    partial_relay: bool,
    bracha: BrachaCore,
    dolev: RoutedDolevCore,
    /// Sequence of the Dolev-level broadcasts that carry this node's votes.
    vote_sequence: SequenceNumber,
    sender: SenderHandle<N>,
    application: A,
    event_publisher: EventPublisher,
}

impl<N: Network, A: Application> BrachaDolev<N, A> {
    /// Progress of the Bracha instance `id` at this node.
    pub fn phase(&self, id: &MessageId) -> Phase {
        self.bracha.phase(id)
    }

    /// Send every vote the Bracha layer asks for as a new Dolev broadcast, and hand deliveries to the
    /// application.
    fn execute(&mut self, actions: Vec<BrachaAction>) -> Result<(), ProtocolError> {
        for action in actions {
            match action {
                BrachaAction::Send {
                    message,
                    recipients,
                } => {
                    let partial = recipients == Recipients::Included
                        || (self.partial_relay && matches!(message, BrachaMessage::Echo(_)));
                    let content = encode_vote(&message)?;
                    let id = MessageId::new(
                        self.me,
                        self.vote_sequence.next(),
                        message.id().tracking_id,
                        &content,
                    );
                    self.dolev.broadcast(id, &content, partial);
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

impl<N: Network, A: Application> Protocol<N, A> for BrachaDolev<N, A> {
    fn init(network: N, application: A, config: Config) -> Result<Self, ProtocolError> {
        config.validate(ProtocolKind::BrachaDolev)?;
        let event_publisher = EventPublisher::new(config.log_events, config.event_handlers.clone());

        let partial_relay = config.bracha.partial_relay;
        let mut included = config.included();
        included.remove(&config.id);
        let partial_destinations =
            (partial_relay || config.bracha.improved).then_some(&included);

        let dolev = RoutedDolevCore::new(
            &config,
            MessageType::BrachaDolev,
            partial_destinations,
            event_publisher.clone(),
        )?;
        let bracha = BrachaCore::new(&config, event_publisher.clone());

        Ok(Self {
            me: config.id,
            byzantine: config.byzantine,
            partial_relay,
            bracha,
            dolev,
            vote_sequence: SequenceNumber::new(0),
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
        if message_type != MessageType::BrachaDolev {
            return Err(ProtocolError::UnexpectedMessageType(message_type));
        }

        let envelope: BrachaDolevMessage = decode(payload)?;
        for part in envelope.parts {
            let Some(delivery) = self.dolev.on_receive(src, part)? else {
                continue;
            };
            // The Dolev origin is the voter.
            let vote = decode_vote(&delivery.content)?;
            let actions = self.bracha.on_receive(delivery.id.origin, vote)?;
            self.execute(actions)?;
        }
        self.dolev.flush(&mut self.sender)
    }

    fn broadcast(&mut self, tracking_id: TrackingId, payload: Vec<u8>) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} does not broadcast", self.me);
            return Ok(());
        }
        let actions = self.bracha.broadcast(tracking_id, payload)?;
        self.execute(actions)?;
        self.dolev.flush(&mut self.sender)
    }

    fn id(&self) -> NodeId {
        self.me
    }

    fn messages_sent(&self) -> u64 {
        self.sender.sent()
    }
}
