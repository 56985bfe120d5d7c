use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, SystemTime},
};

use dbft_rs::{
    events::{ChangeViewSuccessEvent, MineBlockEvent, ReceiveProposalEvent, ViewTimeoutEvent},
    replica::{Configuration, Replica, ReplicaSpec},
    types::{
        block::{Block, BlockHeader},
        crypto_primitives::Keypair,
        data_types::{Address, TotalView},
        validator_set::ValidatorSet,
    },
};

use super::{
    host::{start_host_thread, BlockRelay, Chain, ChainHost},
    logging::{first_seven_base64_chars, log_with_context},
    network::NetworkStub,
};

/// Things the Nodes will have in common:
/// - Genesis header and initial miners.
/// - Genesis time and block interval.
/// - Block relay.
///
/// Things that they will differ in:
/// - Host instance and chain.
/// - Network instance.
/// - Keypair.
pub(crate) struct Node {
    address: Address,
    chain: Arc<Mutex<Chain>>,
    _replica: Replica,
    _host_thread: JoinHandle<()>,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        keypair: Keypair,
        network: NetworkStub,
        genesis: BlockHeader,
        miners: Vec<Address>,
        validator_set: ValidatorSet,
        genesis_time: SystemTime,
        block_interval: Duration,
        relay: BlockRelay,
    ) -> Node {
        let address = keypair.address();
        let (host, requests) = ChainHost::new();
        let chain = Arc::new(Mutex::new(Chain::new(genesis.clone(), miners.clone())));

        let configuration = Configuration::builder()
            .me(keypair.secret().clone())
            .genesis_time(genesis_time)
            .block_interval(block_interval)
            .log_events(false)
            .build();

        let replica = ReplicaSpec::builder()
            .host(host)
            .network(network)
            .configuration(configuration)
            .on_receive_proposal(receive_proposal_handler(address))
            .on_mine_block(mine_block_handler(address))
            .on_view_timeout(view_timeout_handler(address))
            .on_change_view_success(change_view_success_handler(address))
            .build()
            .start();

        let handle = replica.handle();
        assert!(handle.update_tip(genesis, miners, TotalView::new(0)));

        let host_thread =
            start_host_thread(address, requests, handle, chain.clone(), relay, validator_set);

        Node {
            address,
            chain,
            _replica: replica,
            _host_thread: host_thread,
        }
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn height(&self) -> u64 {
        self.chain.lock().unwrap().height()
    }

    pub(crate) fn committed_blocks(&self) -> Vec<Block> {
        self.chain.lock().unwrap().blocks.clone()
    }
}

fn receive_proposal_handler(address: Address) -> impl Fn(&ReceiveProposalEvent) + Send + 'static {
    move |receive_proposal_event| {
        log_with_context(
            address,
            &format!(
                "Received Proposal, origin: {}, view: {}, block hash: {}, block height: {}",
                first_seven_base64_chars(&receive_proposal_event.origin.bytes()),
                receive_proposal_event.block.header.header.view,
                first_seven_base64_chars(&receive_proposal_event.block.hash().bytes()),
                receive_proposal_event.block.number()
            ),
        );
    }
}

fn mine_block_handler(address: Address) -> impl Fn(&MineBlockEvent) + Send + 'static {
    move |mine_block_event| {
        log_with_context(
            address,
            &format!(
                "Reached quorum, block hash: {}, view: {}, no. of signatures: {}",
                first_seven_base64_chars(&mine_block_event.block.hash().bytes()),
                mine_block_event.view,
                mine_block_event.block.header.quorum_signatures().len()
            ),
        );
    }
}

fn view_timeout_handler(address: Address) -> impl Fn(&ViewTimeoutEvent) + Send + 'static {
    move |view_timeout_event| {
        log_with_context(address, &format!("View timed out, view: {}", view_timeout_event.view));
    }
}

fn change_view_success_handler(
    address: Address,
) -> impl Fn(&ChangeViewSuccessEvent) + Send + 'static {
    move |change_view_success_event| {
        log_with_context(
            address,
            &format!("Changed view, view: {}", change_view_success_event.view),
        );
    }
}
