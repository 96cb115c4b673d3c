/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registration and synchronous dispatch of event handlers.
//!
//! Handlers are registered on an [`EventHandlers`] value with the `on_*` methods and passed to a node
//! through its [`Config`](crate::config::Config):
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use brb_rs::event_bus::EventHandlers;
//!
//! let delivered = Arc::new(Mutex::new(Vec::new()));
//! let sink = delivered.clone();
//! let handlers = EventHandlers::new().on_deliver(move |event| sink.lock().unwrap().push(event.id));
//! # let _ = handlers;
//! ```
//!
//! A protocol instance runs the handlers inline, on the thread that processes its messages, so a slow
//! handler slows down the node.

use std::sync::Arc;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send + Sync>;

#[derive(Default)]
pub struct EventHandlers {
    pub(crate) broadcast_handlers: Vec<HandlerPtr<BroadcastEvent>>,
    pub(crate) deliver_handlers: Vec<HandlerPtr<DeliverEvent>>,
    pub(crate) echo_handlers: Vec<HandlerPtr<EchoEvent>>,
    pub(crate) ready_handlers: Vec<HandlerPtr<ReadyEvent>>,
    pub(crate) relay_handlers: Vec<HandlerPtr<RelayEvent>>,
    pub(crate) record_path_handlers: Vec<HandlerPtr<RecordPathEvent>>,
    pub(crate) compute_routes_handlers: Vec<HandlerPtr<ComputeRoutesEvent>>,
    pub(crate) ignore_message_handlers: Vec<HandlerPtr<IgnoreMessageEvent>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_broadcast(mut self, handler: impl Fn(&BroadcastEvent) + Send + Sync + 'static) -> Self {
        self.broadcast_handlers.push(Box::new(handler));
        self
    }

    pub fn on_deliver(mut self, handler: impl Fn(&DeliverEvent) + Send + Sync + 'static) -> Self {
        self.deliver_handlers.push(Box::new(handler));
        self
    }

    pub fn on_echo(mut self, handler: impl Fn(&EchoEvent) + Send + Sync + 'static) -> Self {
        self.echo_handlers.push(Box::new(handler));
        self
    }

    pub fn on_ready(mut self, handler: impl Fn(&ReadyEvent) + Send + Sync + 'static) -> Self {
        self.ready_handlers.push(Box::new(handler));
        self
    }

    pub fn on_relay(mut self, handler: impl Fn(&RelayEvent) + Send + Sync + 'static) -> Self {
        self.relay_handlers.push(Box::new(handler));
        self
    }

    pub fn on_record_path(
        mut self,
        handler: impl Fn(&RecordPathEvent) + Send + Sync + 'static,
    ) -> Self {
        self.record_path_handlers.push(Box::new(handler));
        self
    }

    pub fn on_compute_routes(
        mut self,
        handler: impl Fn(&ComputeRoutesEvent) + Send + Sync + 'static,
    ) -> Self {
        self.compute_routes_handlers.push(Box::new(handler));
        self
    }

    pub fn on_ignore_message(
        mut self,
        handler: impl Fn(&IgnoreMessageEvent) + Send + Sync + 'static,
    ) -> Self {
        self.ignore_message_handlers.push(Box::new(handler));
        self
    }

    /// Handlers that print every event with its default [`Logger`].
    pub(crate) fn loggers() -> Self {
        Self {
            broadcast_handlers: vec![BroadcastEvent::get_logger()],
            deliver_handlers: vec![DeliverEvent::get_logger()],
            echo_handlers: vec![EchoEvent::get_logger()],
            ready_handlers: vec![ReadyEvent::get_logger()],
            relay_handlers: vec![RelayEvent::get_logger()],
            record_path_handlers: vec![RecordPathEvent::get_logger()],
            compute_routes_handlers: vec![ComputeRoutesEvent::get_logger()],
            ignore_message_handlers: vec![IgnoreMessageEvent::get_logger()],
        }
    }

    pub(crate) fn fire_handlers(&self, event: &Event) {
        match event {
            Event::Broadcast(broadcast_event) => self
                .broadcast_handlers
                .iter()
                .for_each(|handler| handler(broadcast_event)),

            Event::Deliver(deliver_event) => self
                .deliver_handlers
                .iter()
                .for_each(|handler| handler(deliver_event)),

            Event::Echo(echo_event) => self
                .echo_handlers
                .iter()
                .for_each(|handler| handler(echo_event)),

            Event::Ready(ready_event) => self
                .ready_handlers
                .iter()
                .for_each(|handler| handler(ready_event)),

            Event::Relay(relay_event) => self
                .relay_handlers
                .iter()
                .for_each(|handler| handler(relay_event)),

            Event::RecordPath(record_path_event) => self
                .record_path_handlers
                .iter()
                .for_each(|handler| handler(record_path_event)),

            Event::ComputeRoutes(compute_routes_event) => self
                .compute_routes_handlers
                .iter()
                .for_each(|handler| handler(compute_routes_event)),

            Event::IgnoreMessage(ignore_message_event) => self
                .ignore_message_handlers
                .iter()
                .for_each(|handler| handler(ignore_message_event)),
        }
    }
}

/// Dispatches the events of one node to the logging handlers (if enabled) and then to the user's
/// handlers.
#[derive(Clone)]
pub(crate) struct EventPublisher {
    loggers: Option<Arc<EventHandlers>>,
    handlers: Arc<EventHandlers>,
}

impl EventPublisher {
    pub(crate) fn new(log_events: bool, handlers: Arc<EventHandlers>) -> Self {
        Self {
            loggers: log_events.then(|| Arc::new(EventHandlers::loggers())),
            handlers,
        }
    }

    pub(crate) fn publish(&self, event: Event) {
        if let Some(loggers) = &self.loggers {
            loggers.fire_handlers(&event);
        }
        self.handlers.fire_handlers(&event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::SystemTime;

    use super::*;
    use crate::types::{MessageId, NodeId, SequenceNumber, TrackingId};

    #[test]
    fn handlers_only_see_their_event_kind() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let echoes = Arc::new(Mutex::new(0));
        let (delivered_sink, echoes_sink) = (delivered.clone(), echoes.clone());
        let handlers = EventHandlers::new()
            .on_deliver(move |event| delivered_sink.lock().unwrap().push(event.node))
            .on_echo(move |_| *echoes_sink.lock().unwrap() += 1);
        let publisher = EventPublisher::new(true, Arc::new(handlers));

        let id = MessageId::new(
            NodeId::new(0),
            SequenceNumber::new(0),
            TrackingId::new(1),
            b"m",
        );
        Event::Deliver(DeliverEvent {
            timestamp: SystemTime::now(),
            node: NodeId::new(3),
            id,
            cause: DeliveryCause::Direct,
        })
        .publish(&publisher);
        Event::Broadcast(BroadcastEvent {
            timestamp: SystemTime::now(),
            node: NodeId::new(0),
            id,
        })
        .publish(&publisher);

        assert_eq!(*delivered.lock().unwrap(), vec![NodeId::new(3)]);
        assert_eq!(*echoes.lock().unwrap(), 0);
    }
}
