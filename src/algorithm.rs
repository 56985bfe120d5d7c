/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The algorithm thread, which serializes every input to the consensus engine.
//!
//! The [`DbftConsensusEngine`] is a single-threaded state machine. The algorithm thread owns it and, on
//! every iteration of its loop:
//! 1. Checks whether the replica is shutting down.
//! 2. Applies the host's answers received through the [`ReplicaHandle`](crate::replica::ReplicaHandle),
//!    in the order they were sent.
//! 3. Processes messages received from the network, and reports rejected ones back to it.
//! 4. Fires the armed deadline, if it passed.
//!
//! Since the algorithm thread calls the [`Host`] between these steps, host methods must not block on the
//! `ReplicaHandle`.

use std::{
    sync::mpsc::{Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    dbft::implementation::{DbftConsensusEngine, MessageVerdict, ProposalResult},
    host::Host,
    networking::{network::Network, receiving::ReceiverHandle},
    types::{
        block::{Block, BlockHeader},
        data_types::{Address, TotalView},
    },
};

/// Largest number of network messages processed before the deadline is checked again.
const MAX_MSGS_PER_ITERATION: usize = 64;

/// How long the algorithm thread sleeps after an iteration in which nothing happened.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// An answer from the host, forwarded by a [`ReplicaHandle`](crate::replica::ReplicaHandle) together
/// with a channel for the engine's reply.
pub(crate) enum HostCommand {
    UpdateTip {
        header: BlockHeader,
        next_miners: Vec<Address>,
        total_view: TotalView,
        reply: Sender<bool>,
    },
    NewProposal {
        block: Block,
        reply: Sender<ProposalResult>,
    },
    AgreeProposal {
        block: Block,
        reply: Sender<ProposalResult>,
    },
}

pub(crate) struct Algorithm<N: Network + 'static, H: Host> {
    engine: DbftConsensusEngine<N, H>,
    receiver_handle: ReceiverHandle<N>,
    host_commands: Receiver<HostCommand>,
    shutdown_signal: Receiver<()>,
}

impl<N: Network + 'static, H: Host> Algorithm<N, H> {
    pub(crate) fn new(
        engine: DbftConsensusEngine<N, H>,
        network: N,
        host_commands: Receiver<HostCommand>,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            engine,
            receiver_handle: ReceiverHandle::new(network),
            host_commands,
            shutdown_signal,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || self.execute())
    }

    fn execute(&mut self) {
        loop {
            // 1. Check whether the replica is shutting down.
            match self.shutdown_signal.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => (),
            }

            // 2. Apply the host's answers.
            let mut busy = self.apply_host_commands();

            // 3. Process messages from the network.
            let msgs = self.receiver_handle.drain(MAX_MSGS_PER_ITERATION);
            busy |= !msgs.is_empty();
            for msg in &msgs {
                if let MessageVerdict::Rejected(reason) = self.engine.on_receive_msg(msg) {
                    self.receiver_handle.report_rejected(msg, &reason);
                }
            }

            // 4. Fire the deadline.
            self.engine.tick();

            if !busy {
                thread::sleep(IDLE_SLEEP);
            }
        }
    }

    /// Apply every host answer that is immediately available. Returns whether there was any.
    fn apply_host_commands(&mut self) -> bool {
        let mut applied = false;
        while let Ok(command) = self.host_commands.try_recv() {
            applied = true;
            match command {
                HostCommand::UpdateTip {
                    header,
                    next_miners,
                    total_view,
                    reply,
                } => {
                    let updated = self.engine.update_tip(header, next_miners, total_view);
                    let _ = reply.send(updated);
                }
                HostCommand::NewProposal { block, reply } => {
                    let result = self.engine.new_proposal(block);
                    let _ = reply.send(result);
                }
                HostCommand::AgreeProposal { block, reply } => {
                    let result = self.engine.agree_proposal(&block);
                    let _ = reply.send(result);
                }
            }
        }
        applied
    }
}
