/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byzantine reliable broadcast over networks that are not necessarily fully connected.
//!
//! The crate has two halves:
//! - A [router](routing) that computes vertex-disjoint paths on a weighted [graph], and turns them into
//!   per-node routing tables and broadcast plans.
//! - A family of [protocols](protocol::Protocol) that deliver every broadcast exactly once at every
//!   correct node, despite up to `F` Byzantine nodes: [Bracha](bracha), [Dolev](dolev) (flooding and
//!   routed), and [Bracha over Dolev](bracha_dolev).
//!
//! A harness drives one protocol instance per simulated node. It supplies a [`Network`](networking::Network)
//! to send through and an [`Application`](app::Application) to deliver to, and calls
//! [`receive`](protocol::Protocol::receive) for every message addressed to the node.

pub mod app;

pub mod bracha;

pub mod bracha_dolev;

pub mod config;

pub mod dolev;

pub mod event_bus;

pub mod events;

pub mod graph;

pub mod logging;

pub mod networking;

pub mod protocol;

pub mod routing;

pub mod types;
