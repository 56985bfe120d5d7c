/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the P2P network.

use super::{messages::WireMessage, network::Network};

/// Handle for broadcasting messages to the [`Network`].
///
/// It can be used to broadcast instances of any type that implement the [`Into<WireMessage>`] trait.
#[derive(Clone)]
pub(crate) struct SenderHandle<N: Network> {
    network: N,
}

impl<N: Network> SenderHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self { network }
    }

    pub(crate) fn broadcast<S: Into<WireMessage>>(&mut self, msg: S) {
        self.network.broadcast(msg.into())
    }
}
