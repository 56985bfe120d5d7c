/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for receiving messages from the P2P network.

use crate::dbft::RejectReason;

use super::{messages::WireMessage, network::Network};

/// Handle for polling the [`Network`] for inbound messages, and reporting the ones that were rejected.
pub(crate) struct ReceiverHandle<N: Network> {
    network: N,
}

impl<N: Network> ReceiverHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self { network }
    }

    /// Drain at most `limit` messages that are immediately available.
    pub(crate) fn drain(&mut self, limit: usize) -> Vec<WireMessage> {
        let mut msgs = Vec::new();
        while msgs.len() < limit {
            match self.network.recv() {
                Some(msg) => msgs.push(msg),
                None => break,
            }
        }
        msgs
    }

    /// Tell the network provider that `message` was rejected for `reason`.
    pub(crate) fn report_rejected(&mut self, message: &WireMessage, reason: &RejectReason) {
        self.network.report_rejected(message, reason)
    }
}
