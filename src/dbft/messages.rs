/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the structured messages that validators exchange during a dBFT round, and their
//! encoding into [`WireMessage`]s.
//!
//! | Message | Command tag | Body fields | Payload |
//! |---|---|---|---|
//! | [`PrepareRequest`] | `prepareRequest` | none | Borsh-encoded [`Block`] |
//! | [`PrepareResponse`] | `prepareResponse` | `hash`: hex block hash | [`QuorumSignature`] over the hash |
//! | [`ChangeView`] | `changeview` | `newView`: decimal view | [`QuorumSignature`] over the [change-view digest](change_view_digest) |

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    networking::messages::{CommandTag, DecodeError, WireMessage},
    types::{
        block::Block,
        crypto_primitives::{address_from_public_key, change_view_digest, verify, Keypair},
        data_types::{Address, CryptoHash, PublicKeyBytes, SignatureBytes, ViewNumber},
    },
};

const HASH_FIELD: &str = "hash";
const NEW_VIEW_FIELD: &str = "newView";

/// A signature together with the compressed public key that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuorumSignature {
    pub public_key: PublicKeyBytes,
    pub signature: SignatureBytes,
}

impl QuorumSignature {
    /// Length of a `QuorumSignature` payload: a 33-byte public key followed by a 64-byte signature.
    pub const PAYLOAD_LEN: usize = 33 + 64;

    /// Sign `message` with `keypair`.
    pub fn new(keypair: &Keypair, message: &[u8; 32]) -> Self {
        Self {
            public_key: keypair.public(),
            signature: keypair.sign(message),
        }
    }

    /// Get the address of the signer.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key)
    }

    /// Check whether the signature is valid over `message`.
    pub fn verify(&self, message: &[u8; 32]) -> bool {
        verify(message, &self.signature, &self.public_key)
    }

    /// Encode as the 97-byte `public_key ++ signature` payload.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(Self::PAYLOAD_LEN);
        payload.extend_from_slice(&self.public_key.bytes());
        payload.extend_from_slice(&self.signature.bytes());
        payload
    }

    /// Decode from a 97-byte `public_key ++ signature` payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() != Self::PAYLOAD_LEN {
            return Err(DecodeError::InvalidPayloadLength {
                expected: Self::PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        let mut public_key = [0u8; 33];
        public_key.copy_from_slice(&payload[..33]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&payload[33..]);
        Ok(Self {
            public_key: PublicKeyBytes::new(public_key),
            signature: SignatureBytes::new(signature),
        })
    }
}

/// All message variants used in a dBFT round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DbftMessage {
    PrepareRequest(PrepareRequest),
    PrepareResponse(PrepareResponse),
    ChangeView(ChangeView),
}

impl DbftMessage {
    /// Create a `PrepareRequest` carrying `block`.
    pub fn prepare_request(block: Block) -> DbftMessage {
        DbftMessage::PrepareRequest(PrepareRequest { block })
    }

    /// Create a `PrepareResponse` signing `hash` with `me`.
    pub fn prepare_response(me: &Keypair, hash: CryptoHash) -> DbftMessage {
        DbftMessage::PrepareResponse(PrepareResponse {
            hash,
            signature: QuorumSignature::new(me, &hash.bytes()),
        })
    }

    /// Create a `ChangeView` voting for `new_view` on top of the tip with hash `tip_hash`, signed with `me`.
    pub fn change_view(me: &Keypair, tip_hash: &CryptoHash, new_view: ViewNumber) -> DbftMessage {
        DbftMessage::ChangeView(ChangeView {
            new_view,
            signature: QuorumSignature::new(me, &change_view_digest(tip_hash, new_view)),
        })
    }

    /// Get the command tag this message is sent with.
    pub fn command(&self) -> CommandTag {
        match self {
            DbftMessage::PrepareRequest(_) => CommandTag::PrepareRequest,
            DbftMessage::PrepareResponse(_) => CommandTag::PrepareResponse,
            DbftMessage::ChangeView(_) => CommandTag::ChangeView,
        }
    }
}

impl From<DbftMessage> for WireMessage {
    fn from(value: DbftMessage) -> Self {
        match value {
            DbftMessage::PrepareRequest(prepare_request) => {
                let mut payload = Vec::new();
                // Writing into a `Vec<u8>` cannot fail.
                let _ = prepare_request.block.serialize(&mut payload);
                WireMessage::new(CommandTag::PrepareRequest, payload)
            }
            DbftMessage::PrepareResponse(prepare_response) => WireMessage::new(
                CommandTag::PrepareResponse,
                prepare_response.signature.to_payload(),
            )
            .with_field(HASH_FIELD, prepare_response.hash.to_hex()),
            DbftMessage::ChangeView(change_view) => {
                WireMessage::new(CommandTag::ChangeView, change_view.signature.to_payload())
                    .with_field(NEW_VIEW_FIELD, change_view.new_view.to_string())
            }
        }
    }
}

impl TryFrom<&WireMessage> for DbftMessage {
    type Error = DecodeError;

    fn try_from(msg: &WireMessage) -> Result<Self, Self::Error> {
        match msg.command_tag()? {
            CommandTag::PrepareRequest => {
                let block = Block::try_from_slice(&msg.payload)?;
                Ok(DbftMessage::PrepareRequest(PrepareRequest { block }))
            }
            CommandTag::PrepareResponse => {
                let value = msg.field(HASH_FIELD)?;
                let hash = CryptoHash::from_hex(value).ok_or_else(|| DecodeError::InvalidField {
                    field: HASH_FIELD,
                    value: value.to_string(),
                })?;
                let signature = QuorumSignature::from_payload(&msg.payload)?;
                Ok(DbftMessage::PrepareResponse(PrepareResponse { hash, signature }))
            }
            CommandTag::ChangeView => {
                let value = msg.field(NEW_VIEW_FIELD)?;
                let new_view = value.parse::<u64>().map_err(|_| DecodeError::InvalidField {
                    field: NEW_VIEW_FIELD,
                    value: value.to_string(),
                })?;
                let signature = QuorumSignature::from_payload(&msg.payload)?;
                Ok(DbftMessage::ChangeView(ChangeView {
                    new_view: ViewNumber::new(new_view),
                    signature,
                }))
            }
        }
    }
}

/// Broadcast by the due miner of a view to propose a signed candidate block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareRequest {
    pub block: Block,
}

/// Broadcast by a validator that verified the candidate block with `hash`, carrying its signature over
/// the hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrepareResponse {
    pub hash: CryptoHash,
    pub signature: QuorumSignature,
}

/// Broadcast by a validator that timed out, voting to move to `new_view`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeView {
    pub new_view: ViewNumber,
    pub signature: QuorumSignature,
}

impl ChangeView {
    /// Check whether the vote is signed over the change-view digest for `tip_hash`.
    pub fn is_correct(&self, tip_hash: &CryptoHash) -> bool {
        self.signature
            .verify(&change_view_digest(tip_hash, self.new_view))
    }
}
