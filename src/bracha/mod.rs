/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bracha's quorum-based Byzantine reliable broadcast.
//!
//! ## Protocol
//!
//! Every broadcast instance, identified by its [`MessageId`](crate::types::MessageId), goes through
//! three rounds of all-to-all messages:
//! 1. The origin sends SEND to every node, and counts the SEND as its own ECHO.
//! 2. A node that receives the SEND sends ECHO to every node, once.
//! 3. A node that has seen ECHOs from an echo quorum (`⌈(N+F+1)/2⌉` nodes), or READYs from `F+1`
//!    nodes, sends READY to every node, once.
//!
//! A node delivers once it has seen READYs from `2F+1` nodes, its own included. It then forgets the
//! vote sets of the instance, and ignores any later message for it.
//!
//! In the improved variant ([`BrachaConfig::improved`](crate::config::BrachaConfig::improved)), only the
//! [included](crate::config::Config::included) nodes send ECHOs, and only to each other. Every other
//! node learns of the broadcast through READY amplification.
//!
//! The quorum logic lives in [`BrachaCore`](implementation::BrachaCore), a state machine that returns
//! the messages to send instead of sending them. [`Bracha`] runs the core over direct links, and
//! [`BrachaDolev`](crate::bracha_dolev::BrachaDolev) runs it over routed Dolev.

pub mod messages;

pub mod types;

pub(crate) mod implementation;

pub mod protocol;

pub use protocol::Bracha;
