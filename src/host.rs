/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Trait definition for the host chain that the consensus engine asks to assemble, verify, and commit
//! blocks.
//!
//! The consensus engine calls the three methods of [`Host`] from the algorithm thread. None of them
//! returns an answer: the host does the (possibly slow) work elsewhere and answers later through the
//! [`ReplicaHandle`](crate::replica::ReplicaHandle):
//!
//! |Engine calls|Host answers with|
//! |---|---|
//! |[`create_block`](Host::create_block)|[`new_proposal`](crate::replica::ReplicaHandle::new_proposal)|
//! |[`verify_block`](Host::verify_block)|[`agree_proposal`](crate::replica::ReplicaHandle::agree_proposal), or nothing if the block is invalid|
//! |[`mine_block`](Host::mine_block)|[`update_tip`](crate::replica::ReplicaHandle::update_tip) once the block is committed|
//!
//! Host methods must return promptly and must never wait on the `ReplicaHandle`, since the algorithm
//! thread only serves the handle between calls into the engine.

use crate::types::block::{Block, BlockHeader, QuorumEntry};

/// Methods that a type needs to implement to serve as the chain a dBFT validator builds.
pub trait Host: Send + 'static {
    /// Called when the local validator is due to propose. The host should fill in `data_hash` and
    /// `state_root` of `request.template`, attach the block body, and hand the resulting block back
    /// through `new_proposal`.
    fn create_block(&mut self, request: CreateBlockRequest);

    /// Called when a candidate block, either proposed by the due miner or created locally, needs
    /// semantic validation. If the block is valid the host should call `agree_proposal` with it.
    fn verify_block(&mut self, request: VerifyBlockRequest);

    /// Called exactly once per round when a quorum of validators signed the candidate block. The
    /// block's header already carries the quorum signatures.
    fn mine_block(&mut self, request: MineBlockRequest);
}

/// Request for the host to assemble a block on top of the current tip.
#[derive(Clone, Debug)]
pub struct CreateBlockRequest {
    template: BlockHeader,
}

impl CreateBlockRequest {
    pub(crate) fn new(template: BlockHeader) -> Self {
        Self { template }
    }

    /// Get the header skeleton: parent hash, height, timestamp, view, and proposer are already set.
    pub fn template(&self) -> &BlockHeader {
        &self.template
    }

    /// Consume the request, returning the header skeleton.
    pub fn into_template(self) -> BlockHeader {
        self.template
    }
}

/// Request for the host to validate a candidate block.
#[derive(Clone, Debug)]
pub struct VerifyBlockRequest {
    block: Block,
}

impl VerifyBlockRequest {
    pub(crate) fn new(block: Block) -> Self {
        Self { block }
    }

    /// Get the candidate block.
    pub fn block(&self) -> &Block {
        &self.block
    }
}

/// Request for the host to commit a quorum-signed block.
#[derive(Clone, Debug)]
pub struct MineBlockRequest {
    block: Block,
    signatures: Vec<QuorumEntry>,
}

impl MineBlockRequest {
    pub(crate) fn new(block: Block, signatures: Vec<QuorumEntry>) -> Self {
        Self { block, signatures }
    }

    /// Get the block, with the quorum signatures attached to its header.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Get the quorum signatures, ordered as the validators appear in the tip's `next_miners`.
    pub fn signatures(&self) -> &[QuorumEntry] {
        &self.signatures
    }
}
