/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events the consensus engine emits, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Handlers for each event
//! type can be registered on the [`ReplicaSpec`](crate::replica::ReplicaSpec), and default handlers
//! that [log](crate::logging) every event are registered if the replica's configuration enables
//! `log_events`.

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::types::{
    block::Block,
    data_types::{Address, BlockHeight, CryptoHash, TotalView, ViewNumber},
};

/// Enumerates all events defined for dBFT-rs.
pub enum Event {
    // Events that change the tip.
    UpdateTip(UpdateTipEvent),
    // Events that involve broadcasting a consensus message.
    Propose(ProposeEvent),
    PrepareResponse(PrepareResponseEvent),
    ChangeView(ChangeViewEvent),
    // Events that involve receiving a consensus message.
    ReceiveProposal(ReceiveProposalEvent),
    ReceivePrepareResponse(ReceivePrepareResponseEvent),
    ReceiveChangeView(ReceiveChangeViewEvent),
    DropMessage(DropMessageEvent),
    // Round and view events.
    StartRound(StartRoundEvent),
    MineBlock(MineBlockEvent),
    ViewTimeout(ViewTimeoutEvent),
    ChangeViewSuccess(ChangeViewSuccessEvent),
    CatchUp(CatchUpEvent),
    AbortRound(AbortRoundEvent),
}

impl Event {
    /// Send the event to the event bus, if one is listening.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only goes away while the replica is shutting down.
            let _ = event_publisher.send(self);
        }
    }
}

/// The tip was replaced, cancelling the in-flight round.
pub struct UpdateTipEvent {
    pub timestamp: SystemTime,
    pub hash: CryptoHash,
    pub number: BlockHeight,
    pub total_view: TotalView,
    pub next_miners: Vec<Address>,
}

/// The local validator signed and broadcasted a `PrepareRequest` for `block`.
pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub block: Block,
}

/// The local validator signed and broadcasted a `PrepareResponse` for the block with `hash`.
pub struct PrepareResponseEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub hash: CryptoHash,
}

/// The local validator broadcasted a `ChangeView` vote for `new_view`.
pub struct ChangeViewEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub new_view: ViewNumber,
}

/// An authentic `PrepareRequest` for `block` was received from `origin`.
pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub block: Block,
}

/// An authentic `PrepareResponse` for the block with `hash` was received from `origin`.
pub struct ReceivePrepareResponseEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub hash: CryptoHash,
}

/// An authentic `ChangeView` vote for `new_view` was received from `origin`.
pub struct ReceiveChangeViewEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub new_view: ViewNumber,
}

/// A received message was dropped without changing state.
///
/// If `rejected` is true the message was malformed or unauthenticated, and the network provider may
/// want to ban its sender. Otherwise it was merely irrelevant to the current round.
pub struct DropMessageEvent {
    pub timestamp: SystemTime,
    pub command: String,
    pub reason: String,
    pub rejected: bool,
}

/// A round started in `view`, with `due_miner` as its leader.
pub struct StartRoundEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub due_miner: Address,
}

/// A quorum signed `block` and it was handed to the host for committing.
pub struct MineBlockEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub block: Block,
}

/// The deadline of `view` passed without progress.
pub struct ViewTimeoutEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
}

/// A quorum of validators voted to change to `view`, and the local validator adopted it.
pub struct ChangeViewSuccessEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
}

/// Every deadline of `skipped_view` had already passed, so the local validator skipped it.
pub struct CatchUpEvent {
    pub timestamp: SystemTime,
    pub skipped_view: ViewNumber,
}

/// The host answered a request while the engine had no tip, and the round in `view` was aborted.
pub struct AbortRoundEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
}
