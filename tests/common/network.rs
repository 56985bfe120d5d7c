use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
};

use dbft_rs::{
    networking::{messages::WireMessage, network::Network},
    types::data_types::Address,
};

/// A mock network stub which passes messages from and to threads using channels.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    my_address: Address,
    all_peers: HashMap<Address, Sender<WireMessage>>,
    validators: Arc<Mutex<Vec<Address>>>,
    inbox: Arc<Mutex<Receiver<WireMessage>>>,
}

impl NetworkStub {
    /// The validators this stub was last told about.
    pub(crate) fn validators(&self) -> Vec<Address> {
        self.validators.lock().unwrap().clone()
    }
}

impl Network for NetworkStub {
    fn update_validators(&mut self, validators: &[Address]) {
        *self.validators.lock().unwrap() = validators.to_vec();
    }

    fn broadcast(&mut self, message: WireMessage) {
        for (address, peer) in &self.all_peers {
            if *address != self.my_address {
                let _ = peer.send(message.clone());
            }
        }
    }

    fn recv(&mut self) -> Option<WireMessage> {
        match self.inbox.lock().unwrap().try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => panic!(),
        }
    }
}

pub(crate) fn mock_network(peers: impl Iterator<Item = Address>) -> Vec<NetworkStub> {
    let mut all_peers = HashMap::new();
    let peer_and_inboxes: Vec<(Address, Receiver<WireMessage>)> = peers
        .map(|peer| {
            let (sender, receiver) = mpsc::channel();
            all_peers.insert(peer, sender);

            (peer, receiver)
        })
        .collect();

    peer_and_inboxes
        .into_iter()
        .map(|(my_address, inbox)| NetworkStub {
            my_address,
            all_peers: all_peers.clone(),
            validators: Arc::new(Mutex::new(Vec::new())),
            inbox: Arc::new(Mutex::new(inbox)),
        })
        .collect()
}
