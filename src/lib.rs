/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A delegated Byzantine Fault Tolerant (dBFT) consensus engine for permissioned blockchains.
//!
//! A set of validators, the `next_miners` of the current chain head, take turns proposing the next
//! block. A block is mined once a quorum of more than two thirds of them sign it. If the validator due
//! to propose in a view fails to, the others vote to change to the next view, under deadlines that
//! double with every view and are anchored to a shared genesis time.
//!
//! The engine is pluggable on three sides:
//! - The chain it builds is a [`Host`](host::Host), which creates, verifies, and mines blocks.
//! - Peers are reached through a [`Network`](networking::network::Network).
//! - Who proposes in which view is decided by a [`RoundSchedule`](dbft::roles::RoundSchedule).
//!
//! To run a validator, build a [`ReplicaSpec`](replica::ReplicaSpec), start it, and feed the chain head
//! to the resulting [`ReplicaHandle`](replica::ReplicaHandle).

pub(crate) mod algorithm;

pub mod dbft;

pub(crate) mod event_bus;

pub mod events;

pub mod host;

pub(crate) mod logging;

pub mod networking;

pub mod pacemaker;

pub mod replica;

pub mod types;
