/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the dBFT state machine: the tip it builds on, the state-tagged context of the
//! in-flight round, and the ballot of change-view votes.

use std::collections::HashMap;

use crate::types::{
    block::{Block, BlockHeader},
    data_types::{Address, CryptoHash, TotalView, ViewNumber},
};

use super::messages::QuorumSignature;

/// The consensus engine's view of the committed chain head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tip {
    /// Last committed block header.
    pub header: BlockHeader,
    /// Hash of `header`.
    pub hash: CryptoHash,
    /// Validators eligible to propose and sign the next block. The order defines leader duty.
    pub next_miners: Vec<Address>,
    /// Block intervals consumed by the chain up to this tip.
    pub total_view: TotalView,
}

impl Tip {
    /// Create a `Tip` over `header`.
    pub fn new(header: BlockHeader, next_miners: Vec<Address>, total_view: TotalView) -> Self {
        Self {
            hash: header.hash(),
            header,
            next_miners,
            total_view,
        }
    }

    /// Check whether `address` may propose or sign the next block.
    pub fn is_miner(&self, address: &Address) -> bool {
        self.next_miners.contains(address)
    }
}

/// The tag of a [`ConsensusContext`]. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsensusState {
    None,
    WaitingCreate,
    WaitingProposal,
    WaitingVerify,
    WaitingAgree,
    WaitingBlock,
    ChangeViewSent,
    ChangeViewSucc,
}

/// Prepare-responses received before the local node knew the candidate they sign, keyed by signer.
pub type PreSigns = HashMap<Address, (CryptoHash, QuorumSignature)>;

/// Prepare-responses collected for the current candidate, keyed by signer.
pub type Signs = HashMap<Address, QuorumSignature>;

/// Change-view votes of the current round, keyed by voter.
pub type ChangeViewBallot = HashMap<Address, ViewNumber>;

/// State-tagged data of the in-flight round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusContext {
    /// No round has started in `cur_view`.
    None { cur_view: ViewNumber },

    /// The local node is due and waits for the host to assemble a block.
    WaitingCreate { cur_view: ViewNumber },

    /// The local node waits for the due miner's `PrepareRequest`.
    WaitingProposal {
        cur_view: ViewNumber,
        pre_signs: PreSigns,
    },

    /// The host is verifying `block`.
    WaitingVerify {
        cur_view: ViewNumber,
        block: Block,
        pre_signs: PreSigns,
    },

    /// The local node signed `block` and collects signatures for it.
    WaitingAgree {
        cur_view: ViewNumber,
        block: Block,
        signs: Signs,
    },

    /// A quorum signed `block` and it was handed to the host. Waits for the host to advance the tip.
    WaitingBlock { cur_view: ViewNumber, block: Block },

    /// The local node timed out and voted to move to `expect_view`.
    ChangeViewSent {
        cur_view: ViewNumber,
        expect_view: ViewNumber,
    },

    /// A quorum agreed to move to `cur_view`.
    ChangeViewSucc { cur_view: ViewNumber },
}

impl ConsensusContext {
    /// Get the tag of this context.
    pub fn state(&self) -> ConsensusState {
        match self {
            ConsensusContext::None { .. } => ConsensusState::None,
            ConsensusContext::WaitingCreate { .. } => ConsensusState::WaitingCreate,
            ConsensusContext::WaitingProposal { .. } => ConsensusState::WaitingProposal,
            ConsensusContext::WaitingVerify { .. } => ConsensusState::WaitingVerify,
            ConsensusContext::WaitingAgree { .. } => ConsensusState::WaitingAgree,
            ConsensusContext::WaitingBlock { .. } => ConsensusState::WaitingBlock,
            ConsensusContext::ChangeViewSent { .. } => ConsensusState::ChangeViewSent,
            ConsensusContext::ChangeViewSucc { .. } => ConsensusState::ChangeViewSucc,
        }
    }

    /// Get the view this context belongs to.
    pub fn cur_view(&self) -> ViewNumber {
        match self {
            ConsensusContext::None { cur_view }
            | ConsensusContext::WaitingCreate { cur_view }
            | ConsensusContext::WaitingProposal { cur_view, .. }
            | ConsensusContext::WaitingVerify { cur_view, .. }
            | ConsensusContext::WaitingAgree { cur_view, .. }
            | ConsensusContext::WaitingBlock { cur_view, .. }
            | ConsensusContext::ChangeViewSent { cur_view, .. }
            | ConsensusContext::ChangeViewSucc { cur_view } => *cur_view,
        }
    }

    /// Get the candidate block of this context, if it has one.
    pub fn block(&self) -> Option<&Block> {
        match self {
            ConsensusContext::WaitingVerify { block, .. }
            | ConsensusContext::WaitingAgree { block, .. }
            | ConsensusContext::WaitingBlock { block, .. } => Some(block),
            _ => None,
        }
    }

    /// Check whether a round can start from this context.
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            ConsensusContext::None { .. } | ConsensusContext::ChangeViewSucc { .. }
        )
    }
}

impl Default for ConsensusContext {
    fn default() -> Self {
        ConsensusContext::None {
            cur_view: ViewNumber::new(0),
        }
    }
}
