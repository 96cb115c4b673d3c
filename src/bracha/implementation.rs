/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transport-independent Bracha state machine.
//!
//! [`BrachaCore`] never sends anything itself. Every call returns the [`BrachaAction`]s the caller has
//! to carry out, in order, so that the same quorum logic can run over direct links ([`super::Bracha`])
//! and over routed Dolev ([`crate::bracha_dolev::BrachaDolev`]).

use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::config::Config;
use crate::event_bus::EventPublisher;
use crate::events::*;
use crate::protocol::ProtocolError;
use crate::types::{MessageId, NodeId, SequenceNumber, TrackingId};

use super::messages::BrachaMessage;
use super::types::{BrachaStore, Phase, Thresholds};

/// Who a message returned by [`BrachaCore`] is addressed to. The node itself is never a recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Recipients {
    All,
    /// Only the nodes of [`Config::included`].
    Included,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BrachaAction {
    Send {
        message: BrachaMessage,
        recipients: Recipients,
    },
    Deliver {
        id: MessageId,
        content: Vec<u8>,
    },
}

pub(crate) struct BrachaCore {
    me: NodeId,
    thresholds: Thresholds,
    improved: bool,
    included: BTreeSet<NodeId>,
    store: BrachaStore,
    sequence: SequenceNumber,
    event_publisher: EventPublisher,
}

impl BrachaCore {
    pub(crate) fn new(config: &Config, event_publisher: EventPublisher) -> Self {
        Self {
            me: config.id,
            thresholds: config.thresholds(),
            improved: config.bracha.improved,
            included: config.included(),
            store: BrachaStore::new(),
            sequence: SequenceNumber::new(0),
            event_publisher,
        }
    }

    /// Start a new broadcast instance of `content`. The returned actions send the SEND, and include a
    /// delivery if this node alone forms a READY quorum.
    pub(crate) fn broadcast(
        &mut self,
        tracking_id: TrackingId,
        content: Vec<u8>,
    ) -> Result<Vec<BrachaAction>, ProtocolError> {
        let id = MessageId::new(self.me, self.sequence.next(), tracking_id, &content);
        let mut actions = Vec::new();

        Event::Broadcast(BroadcastEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
        })
        .publish(&self.event_publisher);

        // The SEND doubles as the origin's ECHO.
        let counts_own_echo = self.counts_echo_from(self.me);
        let state = self.store.get_or_insert(id);
        state.content = Some(content.clone());
        state.echo_sent = true;
        if counts_own_echo {
            state.echo.insert(self.me);
        }

        actions.push(BrachaAction::Send {
            message: BrachaMessage::send(id, content),
            recipients: Recipients::All,
        });
        self.check_progress(id, &mut actions)?;
        Ok(actions)
    }

    /// Process a message that node `src` sent to this node.
    pub(crate) fn on_receive(
        &mut self,
        src: NodeId,
        message: BrachaMessage,
    ) -> Result<Vec<BrachaAction>, ProtocolError> {
        let id = message.id();
        if !id.matches(message.content()) {
            self.ignore(src, &message, IgnoreReason::Malformed);
            return Ok(Vec::new());
        }
        if self.store.is_delivered(&id) {
            self.ignore(src, &message, IgnoreReason::AlreadyDelivered);
            return Ok(Vec::new());
        }

        let mut actions = Vec::new();
        match &message {
            BrachaMessage::Send(payload) => {
                if id.origin == self.me {
                    return Err(ProtocolError::InvariantViolation(format!(
                        "node {} received its own broadcast {} back",
                        self.me, id
                    )));
                }
                if src != id.origin {
                    log::warn!("SEND for {} relayed by {} instead of its origin", id, src);
                    self.ignore(src, &message, IgnoreReason::Malformed);
                    return Ok(actions);
                }

                let counts_origin_echo = self.counts_echo_from(id.origin);
                let sends_echo = !self.improved || self.included.contains(&self.me);
                let counts_own_echo = self.counts_echo_from(self.me);
                let state = self.store.get_or_insert(id);
                state
                    .content
                    .get_or_insert_with(|| payload.content.clone());
                if counts_origin_echo {
                    state.echo.insert(id.origin);
                }

                if !state.echo_sent {
                    state.echo_sent = true;
                    if sends_echo {
                        if counts_own_echo {
                            state.echo.insert(self.me);
                        }
                        actions.push(BrachaAction::Send {
                            message: BrachaMessage::echo(id, payload.content.clone()),
                            recipients: if self.improved {
                                Recipients::Included
                            } else {
                                Recipients::All
                            },
                        });
                        Event::Echo(EchoEvent {
                            timestamp: SystemTime::now(),
                            node: self.me,
                            id,
                        })
                        .publish(&self.event_publisher);
                    }
                }
            }

            BrachaMessage::Echo(payload) => {
                if !self.counts_echo_from(src) {
                    self.ignore(src, &message, IgnoreReason::Malformed);
                    return Ok(actions);
                }
                let state = self.store.get_or_insert(id);
                state
                    .content
                    .get_or_insert_with(|| payload.content.clone());
                state.echo.insert(src);
            }

            BrachaMessage::Ready(payload) => {
                let state = self.store.get_or_insert(id);
                state
                    .content
                    .get_or_insert_with(|| payload.content.clone());
                state.ready.insert(src);
            }
        }

        self.check_progress(id, &mut actions)?;
        Ok(actions)
    }

    pub(crate) fn phase(&self, id: &MessageId) -> Phase {
        self.store.phase(id)
    }

    pub(crate) fn pending(&self) -> usize {
        self.store.pending()
    }

    // In the improved variant, only echoes from included nodes count towards the quorum.
    fn counts_echo_from(&self, voter: NodeId) -> bool {
        !self.improved || self.included.contains(&voter)
    }

    /// Send READY and deliver if the vote sets of `id` allow it.
    fn check_progress(
        &mut self,
        id: MessageId,
        actions: &mut Vec<BrachaAction>,
    ) -> Result<(), ProtocolError> {
        let Some(state) = self.store.get_mut(&id) else {
            return Ok(());
        };

        if !state.ready_sent {
            let trigger = if state.echo.len() >= self.thresholds.echo {
                Some(ReadyTrigger::EchoQuorum(state.echo.len()))
            } else if state.ready.len() >= self.thresholds.ready {
                Some(ReadyTrigger::ReadyAmplification(state.ready.len()))
            } else {
                None
            };

            if let Some(trigger) = trigger {
                state.ready_sent = true;
                state.ready.insert(self.me);
                let content = state.content.clone().unwrap_or_default();
                actions.push(BrachaAction::Send {
                    message: BrachaMessage::ready(id, content),
                    recipients: Recipients::All,
                });
                Event::Ready(ReadyEvent {
                    timestamp: SystemTime::now(),
                    node: self.me,
                    id,
                    trigger,
                })
                .publish(&self.event_publisher);
            }
        }

        if state.ready.len() >= self.thresholds.deliver {
            let readies = state.ready.len();
            let content = self
                .store
                .mark_delivered(id)
                .and_then(|state| state.content)
                .ok_or_else(|| {
                    ProtocolError::InvariantViolation(format!("{} has no content to deliver", id))
                })?;
            actions.push(BrachaAction::Deliver { id, content });
            Event::Deliver(DeliverEvent {
                timestamp: SystemTime::now(),
                node: self.me,
                id,
                cause: DeliveryCause::ReadyQuorum(readies),
            })
            .publish(&self.event_publisher);
        }

        Ok(())
    }

    fn ignore(&self, src: NodeId, message: &BrachaMessage, reason: IgnoreReason) {
        Event::IgnoreMessage(IgnoreMessageEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            src,
            message_type: message.message_type(),
            reason,
        })
        .publish(&self.event_publisher);
    }
}
