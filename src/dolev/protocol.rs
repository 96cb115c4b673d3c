/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`DolevRouted`], Dolev's protocol along precomputed disjoint routes.

use std::time::SystemTime;

use crate::app::Application;
use crate::config::Config;
use crate::event_bus::EventPublisher;
use crate::events::*;
use crate::networking::messages::decode;
use crate::networking::sending::SenderHandle;
use crate::networking::{MessageType, Network};
use crate::protocol::{Protocol, ProtocolError, ProtocolKind};
use crate::routing::BroadcastPlan;
use crate::types::{MessageId, NodeId, SequenceNumber, TrackingId};

use super::messages::RoutedDolevEnvelope;
use super::routed::RoutedDolevCore;

/// Dolev's protocol, with every message following one of the routes its origin computed.
///
/// Routes are computed in [`init`](Protocol::init) from the configured topology:
/// [`resilience`](crate::config::Config::resilience) disjoint routes from this node to every other
/// node, grouped by next hop into a [`BroadcastPlan`].
pub struct DolevRouted<N: Network, A: Application> {
    me: NodeId,
    byzantine: bool,
    core: RoutedDolevCore,
    sequence: SequenceNumber,
    sender: SenderHandle<N>,
    application: A,
    event_publisher: EventPublisher,
}

impl<N: Network, A: Application> DolevRouted<N, A> {
    /// The plan this node follows when it starts a broadcast.
    pub fn plan(&self) -> &BroadcastPlan {
        self.core.plan()
    }

    pub fn has_delivered(&self, id: &MessageId) -> bool {
        self.core.has_delivered(id)
    }
}

impl<N: Network, A: Application> Protocol<N, A> for DolevRouted<N, A> {
    fn init(network: N, application: A, config: Config) -> Result<Self, ProtocolError> {
        config.validate(ProtocolKind::DolevRouted)?;
        let event_publisher = EventPublisher::new(config.log_events, config.event_handlers.clone());
        let core = RoutedDolevCore::new(
            &config,
            MessageType::DolevRouted,
            None,
            event_publisher.clone(),
        )?;
        Ok(Self {
            me: config.id,
            byzantine: config.byzantine,
            core,
            sequence: SequenceNumber::new(0),
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
        if message_type != MessageType::DolevRouted {
            return Err(ProtocolError::UnexpectedMessageType(message_type));
        }

        let envelope: RoutedDolevEnvelope = decode(payload)?;
        for part in envelope.parts {
            if let Some(delivery) = self.core.on_receive(src, part)? {
                self.application.deliver(
                    delivery.id.tracking_id,
                    &delivery.content,
                    delivery.id.origin,
                );
            }
        }
        self.core.flush(&mut self.sender)
    }

    fn broadcast(&mut self, tracking_id: TrackingId, payload: Vec<u8>) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} does not broadcast", self.me);
            return Ok(());
        }

        let id = MessageId::new(self.me, self.sequence.next(), tracking_id, &payload);
        Event::Broadcast(BroadcastEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
        })
        .publish(&self.event_publisher);

        self.core.broadcast(id, &payload, false);
        self.application.deliver(tracking_id, &payload, self.me);
        Event::Deliver(DeliverEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
            cause: DeliveryCause::Origin,
        })
        .publish(&self.event_publisher);

        self.core.flush(&mut self.sender)
    }

    fn id(&self) -> NodeId {
        self.me
    }

    fn messages_sent(&self) -> u64 {
        self.sender.sent()
    }
}
