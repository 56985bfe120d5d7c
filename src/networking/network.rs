/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The trait a P2P network provider implements.

use crate::{dbft::RejectReason, types::data_types::Address};

use super::messages::WireMessage;

/// Methods the consensus engine uses to exchange [`WireMessage`]s with the current validator set.
///
/// Framing, connection management, and banning peers that send rejected messages are the provider's
/// responsibility. [`WireMessage`] carries no origin, so the engine hands rejected messages back
/// through [`report_rejected`](Network::report_rejected), and the provider matches them against the
/// peer it received them from.
pub trait Network: Clone + Send {
    /// Inform the network provider of the validators eligible to propose and sign the next block.
    ///
    /// Called every time the consensus engine accepts a new tip.
    fn update_validators(&mut self, validators: &[Address]);

    /// Send a message to all validators without blocking.
    fn broadcast(&mut self, message: WireMessage);

    /// Receive a message from any peer. Returns `None` immediately if no message is available now.
    fn recv(&mut self) -> Option<WireMessage>;

    /// Called with every message from [`recv`](Network::recv) that was rejected. The provider may
    /// ban the peer it received `message` from. Does nothing by default.
    fn report_rejected(&mut self, _message: &WireMessage, _reason: &RejectReason) {}
}

/// Handle for informing the network provider about the validators of the next block.
#[derive(Clone)]
pub(crate) struct ValidatorUpdateHandle<N: Network> {
    network: N,
}

impl<N: Network> ValidatorUpdateHandle<N> {
    /// Create a new update handle.
    pub(crate) fn new(network: N) -> Self {
        Self { network }
    }

    /// Inform the network provider that `validators` are the validators of the next block.
    pub(crate) fn update_validators(&mut self, validators: &[Address]) {
        self.network.update_validators(validators)
    }
}
