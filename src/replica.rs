/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a replica.
//!
//! dBFT-rs replicates a chain among a set of validators. In our terminology, each of these processes is
//! called a 'replica'. Each replica is uniquely identified by a secp256k1 keypair, whose
//! [address](crate::types::data_types::Address) appears in the `next_miners` of the chain's tip.
//!
//! They key components of this module are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica alive, and
//! - [The handle](ReplicaHandle) through which the host answers the consensus engine.
//!
//! ## Starting a replica
//!
//! Here is an example that demonstrates how to build and start running a replica using the builder pattern:
//!
//! ```ignore
//! let replica =
//!     ReplicaSpec::builder()
//!     .host(host)
//!     .network(network)
//!     .configuration(configuration)
//!     .on_mine_block(mine_block_handler)
//!     .build()
//!     .start();
//!
//! let handle = replica.handle();
//! handle.update_tip(genesis_header, next_miners, TotalView::new(0));
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the trait implementations required to run a replica:
//! - `.host(...)`
//! - `.network(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! `.schedule(...)` replaces the default [`RoundRobinSchedule`], for example with
//! [`HostRotatedSchedule`](crate::dbft::roles::HostRotatedSchedule) when the host rotates `next_miners` on
//! every tip. `.clock(...)` replaces the default [`SystemClock`].
//!
//! The other optional setters are for registering user-defined event handlers for events from
//! [crate::events]:
//! - `.on_update_tip(...)`
//! - `.on_propose(...)`
//! - `.on_prepare_response(...)`
//! - `.on_change_view(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_receive_prepare_response(...)`
//! - `.on_receive_change_view(...)`
//! - `.on_drop_message(...)`
//! - `.on_start_round(...)`
//! - `.on_mine_block(...)`
//! - `.on_view_timeout(...)`
//! - `.on_change_view_success(...)`
//! - `.on_catch_up(...)`
//! - `.on_abort_round(...)`
//!
//! The replica's [configuration](Configuration) can also be defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(secret_key)
//!     .genesis_time(genesis_time)
//!     .block_interval(Duration::from_secs(15))
//!     .log_events(true)
//!     .build()
//! ```

use std::{
    sync::mpsc::{self, Sender},
    thread::JoinHandle,
    time::{Duration, SystemTime},
};

use typed_builder::TypedBuilder;

use crate::{
    algorithm::{Algorithm, HostCommand},
    dbft::{
        implementation::{DbftConfiguration, DbftConsensusEngine, ProposalResult},
        roles::{RoundRobinSchedule, RoundSchedule},
    },
    event_bus::*,
    events::*,
    host::Host,
    networking::network::Network,
    pacemaker::implementation::{Clock, SystemClock, TimeoutConfiguration, TimeoutScheduler},
    types::{
        block::{Block, BlockHeader},
        crypto_primitives::{Keypair, SecretKey},
        data_types::{Address, TotalView},
    },
};

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The replica's [secret key](SecretKey).
/// 2. The genesis time, from which block intervals are counted.
/// 3. The block interval, the duration of one unit of the round [timing](crate::pacemaker).
/// 4. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Genesis time and block interval
///
/// Every validator of a chain must be configured with the same genesis time and block interval, since
/// validators only agree on when rounds start and end if they compute the same deadlines.
///
/// ## Log Events
///
/// dBFT-rs logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.me(...)`
    - `.genesis_time(...)`
    - `.block_interval(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the replica's secret key, used to sign headers and votes. Required."))]
    pub me: SecretKey,
    #[builder(setter(doc = "Set the time from which block intervals are counted. Required."))]
    pub genesis_time: SystemTime,
    #[builder(setter(doc = "Set the duration of one block interval. Required."))]
    pub block_interval: Duration,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

impl Configuration {
    fn into_parts(self) -> (DbftConfiguration, TimeoutConfiguration) {
        let dbft_config = DbftConfiguration::new(Keypair::new(self.me));
        let timeout_config = TimeoutConfiguration {
            genesis_time: self.genesis_time,
            block_interval: self.block_interval,
        };
        (dbft_config, timeout_config)
    }
}

/// Stores all necessary parameters and trait implementations required to run the [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.host(...)`
    - `.network(...)`
    - `.configuration(...)`

    Optional:
    - `.schedule(...)`
    - `.clock(...)`
    - `.on_update_tip(...)`
    - `.on_propose(...)`
    - `.on_prepare_response(...)`
    - `.on_change_view(...)`
    - `.on_receive_proposal(...)`
    - `.on_receive_prepare_response(...)`
    - `.on_receive_change_view(...)`
    - `.on_drop_message(...)`
    - `.on_start_round(...)`
    - `.on_mine_block(...)`
    - `.on_view_timeout(...)`
    - `.on_change_view_success(...)`
    - `.on_catch_up(...)`
    - `.on_abort_round(...)`
"))]
pub struct ReplicaSpec<H: Host, N: Network + 'static> {
    // Required parameters
    #[builder(setter(doc = "Set the host chain that creates, verifies, and mines blocks. The argument must implement the [Host](crate::host::Host) trait. Required."))]
    host: H,
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a replica. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |schedule: impl RoundSchedule + 'static| Some(Box::new(schedule) as Box<dyn RoundSchedule>),
    doc = "Set the [schedule](crate::dbft::roles::RoundSchedule) that decides the due miner of every view. Defaults to [RoundRobinSchedule]. Optional."))]
    schedule: Option<Box<dyn RoundSchedule>>,
    #[builder(default, setter(transform = |clock: impl Clock + 'static| Some(Box::new(clock) as Box<dyn Clock>),
    doc = "Set the source of wall-clock time. Defaults to [SystemClock]. Optional."))]
    clock: Option<Box<dyn Clock>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateTipEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateTipEvent>),
    doc = "Register a handler closure to be invoked after the replica accepts a new tip. Optional."))]
    on_update_tip: Option<HandlerPtr<UpdateTipEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a proposal for a block. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PrepareResponseEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PrepareResponseEvent>),
    doc = "Register a handler closure to be invoked after the replica signs and broadcasts a prepare response. Optional."))]
    on_prepare_response: Option<HandlerPtr<PrepareResponseEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ChangeViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ChangeViewEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a change-view vote. Optional."))]
    on_change_view: Option<HandlerPtr<ChangeViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a handler closure to be invoked after the replica receives an authentic proposal. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceivePrepareResponseEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceivePrepareResponseEvent>),
    doc = "Register a handler closure to be invoked after the replica receives an authentic prepare response. Optional."))]
    on_receive_prepare_response: Option<HandlerPtr<ReceivePrepareResponseEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveChangeViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveChangeViewEvent>),
    doc = "Register a handler closure to be invoked after the replica receives an authentic change-view vote. Optional."))]
    on_receive_change_view: Option<HandlerPtr<ReceiveChangeViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DropMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DropMessageEvent>),
    doc = "Register a handler closure to be invoked after the replica drops a received message. Optional."))]
    on_drop_message: Option<HandlerPtr<DropMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&StartRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartRoundEvent>),
    doc = "Register a handler closure to be invoked after the replica starts a round. Optional."))]
    on_start_round: Option<HandlerPtr<StartRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&MineBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<MineBlockEvent>),
    doc = "Register a handler closure to be invoked after the replica hands a quorum-signed block to the host. Optional."))]
    on_mine_block: Option<HandlerPtr<MineBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ViewTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ViewTimeoutEvent>),
    doc = "Register a handler closure to be invoked after the replica's view times out. Optional."))]
    on_view_timeout: Option<HandlerPtr<ViewTimeoutEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ChangeViewSuccessEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ChangeViewSuccessEvent>),
    doc = "Register a handler closure to be invoked after the replica adopts a view that a quorum voted for. Optional."))]
    on_change_view_success: Option<HandlerPtr<ChangeViewSuccessEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CatchUpEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CatchUpEvent>),
    doc = "Register a handler closure to be invoked after the replica skips a view whose deadlines already passed. Optional."))]
    on_catch_up: Option<HandlerPtr<CatchUpEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AbortRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AbortRoundEvent>),
    doc = "Register a handler closure to be invoked after the replica aborts a round. Optional."))]
    on_abort_round: Option<HandlerPtr<AbortRoundEvent>>,
}

impl<H: Host, N: Network + 'static> ReplicaSpec<H, N> {
    /// Starts all threads and channels associated with running a replica, and returns the handles to them in a [Replica] struct.
    ///
    /// The replica stays idle until the host provides the first tip through [`ReplicaHandle::update_tip`].
    pub fn start(self) -> Replica {
        let log_events = self.configuration.log_events;
        let (dbft_config, timeout_config) = self.configuration.into_parts();

        let event_handlers = EventHandlers::new(
            log_events,
            self.on_update_tip,
            self.on_propose,
            self.on_prepare_response,
            self.on_change_view,
            self.on_receive_proposal,
            self.on_receive_prepare_response,
            self.on_receive_change_view,
            self.on_drop_message,
            self.on_start_round,
            self.on_mine_block,
            self.on_view_timeout,
            self.on_change_view_success,
            self.on_catch_up,
            self.on_abort_round,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let engine = DbftConsensusEngine::new(
            dbft_config,
            TimeoutScheduler::new(timeout_config),
            self.schedule
                .unwrap_or_else(|| Box::new(RoundRobinSchedule)),
            self.host,
            self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            self.network.clone(),
            event_publisher,
        );

        let (host_command_sender, host_commands) = mpsc::channel();
        let (algorithm_shutdown, algorithm_shutdown_receiver) = mpsc::channel();
        let algorithm = Algorithm::new(
            engine,
            self.network,
            host_commands,
            algorithm_shutdown_receiver,
        )
        .start();

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(
                    event_handlers,
                    event_subscriber,
                    event_bus_shutdown_receiver,
                );
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        Replica {
            handle: ReplicaHandle {
                host_commands: host_command_sender,
            },
            algorithm: Some(algorithm),
            algorithm_shutdown,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A handle to the background threads of a dBFT-rs replica. When this value is dropped, all background
/// threads are gracefully shut down.
pub struct Replica {
    handle: ReplicaHandle,
    algorithm: Option<JoinHandle<()>>,
    algorithm_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl Replica {
    /// Get a handle through which the host answers the consensus engine.
    pub fn handle(&self) -> ReplicaHandle {
        self.handle.clone()
    }
}

impl Drop for Replica {
    fn drop(&mut self) {
        if let Some(event_bus_shutdown) = self.event_bus_shutdown.take() {
            let _ = event_bus_shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }

        let _ = self.algorithm_shutdown.send(());
        if let Some(algorithm) = self.algorithm.take() {
            let _ = algorithm.join();
        }
    }
}

/// Cloneable handle through which the host answers the requests of the consensus engine.
///
/// Every method waits for the algorithm thread to apply the answer, so none of them may be called from
/// inside a [`Host`] method. Once the replica is dropped, every method reports that nothing happened.
#[derive(Clone)]
pub struct ReplicaHandle {
    host_commands: Sender<HostCommand>,
}

impl ReplicaHandle {
    /// Replace the tip with `header`, whose successor may be proposed and signed by `next_miners`.
    /// `total_view` is the number of block intervals the chain consumed up to `header`.
    ///
    /// Returns `false` if `header` already was the tip.
    pub fn update_tip(
        &self,
        header: BlockHeader,
        next_miners: Vec<Address>,
        total_view: TotalView,
    ) -> bool {
        let (reply, response) = mpsc::channel();
        let command = HostCommand::UpdateTip {
            header,
            next_miners,
            total_view,
            reply,
        };
        if self.host_commands.send(command).is_err() {
            return false;
        }
        response.recv().unwrap_or(false)
    }

    /// Answer a [`create_block`](Host::create_block) request with the assembled `block`.
    pub fn new_proposal(&self, block: Block) -> ProposalResult {
        let (reply, response) = mpsc::channel();
        if self
            .host_commands
            .send(HostCommand::NewProposal { block, reply })
            .is_err()
        {
            return ProposalResult::Skipped;
        }
        response.recv().unwrap_or(ProposalResult::Skipped)
    }

    /// Answer a [`verify_block`](Host::verify_block) request by confirming that `block` is valid.
    pub fn agree_proposal(&self, block: Block) -> ProposalResult {
        let (reply, response) = mpsc::channel();
        if self
            .host_commands
            .send(HostCommand::AgreeProposal { block, reply })
            .is_err()
        {
            return ProposalResult::Skipped;
        }
        response.recv().unwrap_or(ProposalResult::Skipped)
    }
}
