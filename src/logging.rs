/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the node's
//! [config](crate::config::Config::log_events).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations), for
//! example the [fern](https://docs.rs/fern) dispatcher installed by [`init_logger`].
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least three values. The first three values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//! 3. The id of the node that emitted the event.
//!
//! Most events then identify the broadcast instance with four values: origin, sequence number,
//! tracking id, and the first seven characters of the Base64 encoding of the content hash. For example,
//! the following snippet is how a [Deliver](crate::events::DeliverEvent) is printed:
//!
//! ```text
//! Deliver, 1701329264, 5, 0, 12, 3, fNGCJyk, DisjointPaths(2)
//! ```
//!
//! In the snippet, node 5 delivered the 13th broadcast of node 0 (tracking id 3) after recording two
//! disjoint paths.

use std::{io, thread, time::SystemTime};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log::{self, LevelFilter, SetLoggerError};

use crate::events::*;
use crate::types::{MessageId, NodeId};

// Names of each event in PascalCase for printing:
pub const BROADCAST: &str = "Broadcast";
pub const DELIVER: &str = "Deliver";
pub const ECHO: &str = "Echo";
pub const READY: &str = "Ready";
pub const RELAY: &str = "Relay";
pub const RECORD_PATH: &str = "RecordPath";
pub const COMPUTE_ROUTES: &str = "ComputeRoutes";
pub const IGNORE_MESSAGE: &str = "IgnoreMessage";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync>;
}

impl Logger for BroadcastEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |broadcast_event: &BroadcastEvent| {
            log::info!(
                "{}, {}, {}, {}",
                BROADCAST,
                secs_since_unix_epoch(broadcast_event.timestamp),
                broadcast_event.node,
                message_id_fields(&broadcast_event.id)
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeliverEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |deliver_event: &DeliverEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                DELIVER,
                secs_since_unix_epoch(deliver_event.timestamp),
                deliver_event.node,
                message_id_fields(&deliver_event.id),
                deliver_event.cause
            )
        };
        Box::new(logger)
    }
}

impl Logger for EchoEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |echo_event: &EchoEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ECHO,
                secs_since_unix_epoch(echo_event.timestamp),
                echo_event.node,
                message_id_fields(&echo_event.id)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReadyEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |ready_event: &ReadyEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                READY,
                secs_since_unix_epoch(ready_event.timestamp),
                ready_event.node,
                message_id_fields(&ready_event.id),
                ready_event.trigger
            )
        };
        Box::new(logger)
    }
}

impl Logger for RelayEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |relay_event: &RelayEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RELAY,
                secs_since_unix_epoch(relay_event.timestamp),
                relay_event.node,
                message_id_fields(&relay_event.id),
                relay_event.next_hop,
                relay_event.paths
            )
        };
        Box::new(logger)
    }
}

impl Logger for RecordPathEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |record_path_event: &RecordPathEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RECORD_PATH,
                secs_since_unix_epoch(record_path_event.timestamp),
                record_path_event.node,
                message_id_fields(&record_path_event.id),
                node_list(&record_path_event.intermediates),
                record_path_event.recorded
            )
        };
        Box::new(logger)
    }
}

impl Logger for ComputeRoutesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |compute_routes_event: &ComputeRoutesEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                COMPUTE_ROUTES,
                secs_since_unix_epoch(compute_routes_event.timestamp),
                compute_routes_event.node,
                compute_routes_event.routes,
                compute_routes_event.priority_routes,
                compute_routes_event.messages
            )
        };
        Box::new(logger)
    }
}

impl Logger for IgnoreMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |ignore_message_event: &IgnoreMessageEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}, {:?}",
                IGNORE_MESSAGE,
                secs_since_unix_epoch(ignore_message_event.timestamp),
                ignore_message_event.node,
                ignore_message_event.src,
                ignore_message_event.message_type,
                ignore_message_event.reason
            )
        };
        Box::new(logger)
    }
}

/// Install a [fern] dispatcher that prints every log message at `level` or above to standard output,
/// prefixed with the thread it was logged from.
///
/// Fails if a logger has already been installed in this process.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:?}][{}] {}",
                thread::current().id(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

fn message_id_fields(id: &MessageId) -> String {
    format!(
        "{}, {}, {}, {}",
        id.origin,
        id.sequence,
        id.tracking_id,
        first_seven_base64_chars(&id.content_hash.bytes())
    )
}

// Nodes joined with dashes, or "-" for an empty list.
fn node_list(nodes: &[NodeId]) -> String {
    if nodes.is_empty() {
        return String::from("-");
    }
    nodes
        .iter()
        .map(NodeId::to_string)
        .collect::<Vec<_>>()
        .join("-")
}
