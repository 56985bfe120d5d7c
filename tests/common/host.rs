use std::{
    collections::BTreeMap,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use dbft_rs::{
    host::{CreateBlockRequest, Host, MineBlockRequest, VerifyBlockRequest},
    pacemaker::leader_allowance,
    replica::ReplicaHandle,
    types::{
        block::{Block, BlockHeader},
        crypto_primitives::{CryptoHasher, Digest},
        data_types::{Address, CryptoHash, Data, Datum, TotalView},
        validator_set::ValidatorSet,
    },
};

use super::logging::{first_seven_base64_chars, log_with_context};

/// Blocks committed by any node, keyed by height. Stands in for the block sync a real host runs, so that
/// a node which missed a round can fetch the block the others committed.
pub(crate) type BlockRelay = Arc<Mutex<BTreeMap<u64, Block>>>;

/// Requests the consensus engine made to a [`ChainHost`], served on the host thread.
pub(crate) enum HostRequest {
    Create(CreateBlockRequest),
    Verify(VerifyBlockRequest),
    Mine(MineBlockRequest),
}

/// A [`Host`] that forwards every request to the host thread, since the engine must not wait for the
/// host's answer.
pub(crate) struct ChainHost {
    requests: Sender<HostRequest>,
}

impl ChainHost {
    pub(crate) fn new() -> (ChainHost, Receiver<HostRequest>) {
        let (requests, receiver) = mpsc::channel();
        (ChainHost { requests }, receiver)
    }
}

impl Host for ChainHost {
    fn create_block(&mut self, request: CreateBlockRequest) {
        let _ = self.requests.send(HostRequest::Create(request));
    }

    fn verify_block(&mut self, request: VerifyBlockRequest) {
        let _ = self.requests.send(HostRequest::Verify(request));
    }

    fn mine_block(&mut self, request: MineBlockRequest) {
        let _ = self.requests.send(HostRequest::Mine(request));
    }
}

/// The committed chain of one node.
pub(crate) struct Chain {
    pub(crate) genesis: BlockHeader,
    pub(crate) blocks: Vec<Block>,
    pub(crate) next_miners: Vec<Address>,
    pub(crate) total_view: TotalView,
}

impl Chain {
    pub(crate) fn new(genesis: BlockHeader, next_miners: Vec<Address>) -> Chain {
        Chain {
            genesis,
            blocks: Vec::new(),
            next_miners,
            total_view: TotalView::new(0),
        }
    }

    pub(crate) fn tip(&self) -> &BlockHeader {
        match self.blocks.last() {
            Some(block) => &block.header.header,
            None => &self.genesis,
        }
    }

    pub(crate) fn height(&self) -> u64 {
        self.tip().number.int()
    }

    /// Append `block` if it extends the tip. The miners stay the same, and the chain consumes the intervals
    /// up to the leader deadline of the view the block was mined in.
    fn commit(&mut self, block: Block) -> bool {
        let tip = self.tip();
        let header = &block.header.header;
        if header.parent_hash != tip.hash() || header.number.int() != tip.number.int() + 1 {
            return false;
        }

        self.total_view = TotalView::new(leader_allowance(self.total_view, header.view));
        self.blocks.push(block);
        true
    }
}

/// Digest of the body of a block, used as its `data_hash`.
pub(crate) fn data_hash(data: &Data) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    for datum in data.iter() {
        hasher.update(datum.bytes());
    }
    CryptoHash::new(hasher.finalize().into())
}

/// Start the thread that answers the engine's requests and adopts blocks that other nodes committed.
pub(crate) fn start_host_thread(
    address: Address,
    requests: Receiver<HostRequest>,
    handle: ReplicaHandle,
    chain: Arc<Mutex<Chain>>,
    relay: BlockRelay,
    validator_set: ValidatorSet,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match requests.recv_timeout(Duration::from_millis(5)) {
            Ok(HostRequest::Create(request)) => {
                let mut template = request.into_template();
                let height = template.number.int();
                let data = Data::new(vec![Datum::new(height.to_le_bytes().to_vec())]);
                template.data_hash = data_hash(&data);
                template.state_root = CryptoHash::new([height as u8; 32]);
                handle.new_proposal(Block::new(template, data));
            }
            Ok(HostRequest::Verify(request)) => {
                let block = request.block();
                let tip_hash = chain.lock().unwrap().tip().hash();
                let extends_tip = block.header.header.parent_hash == tip_hash;
                if extends_tip && block.header.header.data_hash == data_hash(&block.data) {
                    handle.agree_proposal(block.clone());
                }
            }
            Ok(HostRequest::Mine(request)) => {
                let block = request.block().clone();
                assert!(block.header.verify(&validator_set));
                log_with_context(
                    address,
                    &format!(
                        "Mined Block, block hash: {}, height: {}, view: {}",
                        first_seven_base64_chars(&block.hash().bytes()),
                        block.number(),
                        block.header.header.view
                    ),
                );
                relay
                    .lock()
                    .unwrap()
                    .entry(block.number().int())
                    .or_insert_with(|| block.clone());
                commit_and_update_tip(&chain, block, &handle);
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }

        // Catch up with blocks this node did not mine itself.
        loop {
            let next_height = chain.lock().unwrap().height() + 1;
            let relayed = relay.lock().unwrap().get(&next_height).cloned();
            match relayed {
                Some(block) if block.header.verify(&validator_set) => {
                    if !commit_and_update_tip(&chain, block, &handle) {
                        break;
                    }
                }
                _ => break,
            }
        }
    })
}

fn commit_and_update_tip(chain: &Arc<Mutex<Chain>>, block: Block, handle: &ReplicaHandle) -> bool {
    let (header, next_miners, total_view) = {
        let mut chain = chain.lock().unwrap();
        if !chain.commit(block) {
            return false;
        }
        (chain.tip().clone(), chain.next_miners.clone(), chain.total_view)
    };
    handle.update_tip(header, next_miners, total_view);
    true
}
