/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol for committing `Block`s with delegated Byzantine Fault Tolerance.
//!
//! ## Rounds
//!
//! Every block height is decided in one or more rounds, each identified by a
//! [`ViewNumber`](crate::types::data_types::ViewNumber) that starts at 0 whenever the tip advances.
//! In every view, exactly one validator from the tip's `next_miners` is the due miner, as decided by
//! the [`RoundSchedule`](roles::RoundSchedule).
//!
//! A round in which the due miner is correct and the network is timely proceeds as follows:
//! 1. The due miner asks the [`Host`](crate::host::Host) to create a block, signs its header, and
//!    broadcasts it in a [`PrepareRequest`](messages::PrepareRequest).
//! 2. Every validator (the due miner included) asks the host to verify the block. If the host agrees,
//!    the validator signs the block hash and broadcasts it in a
//!    [`PrepareResponse`](messages::PrepareResponse).
//! 3. Once a validator has collected signatures from a quorum of `next_miners`, it attaches them to
//!    the header and hands the block to the host to mine. The host later advances the tip, which
//!    starts the next height.
//!
//! `PrepareResponse`s that arrive before the validator has seen or verified the block are buffered, and
//! counted once the validator signs the same block.
//!
//! ## Changing views
//!
//! If a round does not complete before its [deadline](crate::pacemaker), a validator broadcasts a
//! [`ChangeView`](messages::ChangeView) vote for the next view. Once a quorum of validators vote for the
//! same view, every validator that sees the votes moves to that view, and a new round starts there with
//! the next due miner.
//!
//! ## State machine
//!
//! The states of a validator in a round are enumerated by
//! [`ConsensusState`](types::ConsensusState):
//!
//! |State|Waiting for|
//! |---|---|
//! |`None`|The round start deadline.|
//! |`WaitingCreate`|The host to create a block.|
//! |`WaitingProposal`|The due miner's `PrepareRequest`.|
//! |`WaitingVerify`|The host to verify the candidate block.|
//! |`WaitingAgree`|A quorum of `PrepareResponse`s.|
//! |`WaitingBlock`|The host to advance the tip.|
//! |`ChangeViewSent`|A quorum of `ChangeView` votes.|
//! |`ChangeViewSucc`|The round start deadline of the adopted view.|

pub(crate) mod implementation;
pub use implementation::{IgnoreReason, MessageVerdict, ProposalResult, RejectReason};

pub mod messages;

pub mod roles;

pub mod types;
