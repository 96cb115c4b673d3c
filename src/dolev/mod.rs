/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Dolev's path-diversity Byzantine reliable broadcast, for networks that are not fully connected.
//!
//! A node delivers a broadcast the first time either:
//! 1. It receives the message directly from its origin, or
//! 2. It has recorded `F+1` paths from the origin to itself that share no intermediate node. At most `F`
//!    of those paths can contain a Byzantine node, so at least one of them is made of correct nodes
//!    only.
//!
//! Two variants are implemented:
//! - [`Dolev`] floods: every relay appends itself to the message's trace and forwards to every
//!   neighbor that is not on the trace.
//! - [`DolevRouted`] forwards along routes computed at initialization by the [router](crate::routing).
//!   Every message carries the route it is meant to follow (its "desired" path) next to the route it
//!   actually followed, and every relay forwards it to the next hop of the desired path only.
//!
//! Both variants can let a node that has delivered restart traces at itself, which tells downstream
//! nodes that the path up to it needs no further checking.

pub mod messages;

pub(crate) mod collector;

pub mod flooding;

pub(crate) mod outbox;

pub(crate) mod routed;

pub mod protocol;

pub use flooding::Dolev;
pub use protocol::DolevRouted;
