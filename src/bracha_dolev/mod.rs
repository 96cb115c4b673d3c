/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bracha over routed Dolev, for Byzantine reliable broadcast on networks that are not fully connected.
//!
//! Bracha's votes need every node to talk to every other node. This protocol runs the
//! [Bracha state machine](crate::bracha) unchanged, but sends each of its SEND, ECHO and READY
//! messages as the content of a routed [Dolev](crate::dolev) broadcast. A vote reaches the Bracha layer
//! of a node once the Dolev layer has delivered it there, i.e. once it arrived over `F+1` disjoint
//! routes or straight from the voter.
//!
//! Two optimizations are specific to this protocol:
//! - With [`partial_relay`](crate::config::BrachaConfig::partial_relay), ECHOs are only routed
//!   towards the [included](crate::config::Config::included) nodes, the only nodes whose echo quorum
//!   matters for liveness.
//! - Dolev messages of different votes that are bound for the same next hop at the same time travel
//!   together in one [`BrachaDolevMessage`](messages::BrachaDolevMessage).

pub mod messages;

pub mod protocol;

pub use protocol::BrachaDolev;
