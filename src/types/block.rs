/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the block header, its quorum-signed wrapper, and the block type.
//!
//! A block moves through three stages during a consensus round:
//! 1. The host fills in a [`BlockHeader`] template handed to it by the consensus engine.
//! 2. The proposer wraps the header in a [`SignedHeader`] and [`sign`](SignedHeader::sign)s it, which
//!    fixes the header's [`hash`](SignedHeader::hash).
//! 3. Once a quorum of validators has signed the hash, the collected signatures are attached with
//!    [`add_signs`](SignedHeader::add_signs). Neither the proposer signature nor the quorum signatures
//!    are covered by the hash.

use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{address_from_public_key, verify, CryptoHasher, Digest, Keypair},
    data_types::{
        Address, BlockHeight, CryptoHash, Data, PublicKeyBytes, SignatureBytes, ViewNumber,
    },
    validator_set::{is_quorum, ValidatorSet},
};

/// Content of a block header that is covered by its hash.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    /// Hash of the parent block's header.
    pub parent_hash: CryptoHash,
    /// Height of this block.
    pub number: BlockHeight,
    /// Seconds since the Unix Epoch at which the block was assembled.
    pub timestamp: u64,
    /// View in which this block was proposed.
    pub view: ViewNumber,
    /// Compressed public key of the validator that proposed this block.
    pub proposer: PublicKeyBytes,
    /// Hash over the block's [`Data`], computed by the host.
    pub data_hash: CryptoHash,
    /// State root after executing the block, computed by the host.
    pub state_root: CryptoHash,
}

impl BlockHeader {
    /// Compute the SHA256 hash over the fields of this header.
    pub fn hash(&self) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(self.parent_hash.bytes());
        hasher.update(self.number.int().to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.view.int().to_le_bytes());
        hasher.update(self.proposer.bytes());
        hasher.update(self.data_hash.bytes());
        hasher.update(self.state_root.bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Get the address of this header's proposer.
    pub fn proposer_address(&self) -> Address {
        address_from_public_key(&self.proposer)
    }
}

/// A validator's signature over a header hash, stored next to the validator's address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QuorumEntry {
    pub address: Address,
    pub signature: SignatureBytes,
}

/// A [`BlockHeader`] together with its proposer signature and the quorum signatures collected during
/// consensus.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedHeader {
    pub header: BlockHeader,
    pub hash: CryptoHash,
    proposer_signature: Option<SignatureBytes>,
    quorum_signatures: Vec<QuorumEntry>,
}

impl SignedHeader {
    /// Wrap `header`, computing its hash. The result carries no signatures.
    pub fn new(header: BlockHeader) -> Self {
        Self {
            hash: header.hash(),
            header,
            proposer_signature: None,
            quorum_signatures: Vec::new(),
        }
    }

    /// Sign the header hash as its proposer.
    ///
    /// Returns `false` and leaves the header untouched if `keypair` is not the header's proposer.
    pub fn sign(&mut self, keypair: &Keypair) -> bool {
        if keypair.public() != self.header.proposer {
            return false;
        }
        self.proposer_signature = Some(keypair.sign(&self.hash.bytes()));
        true
    }

    /// Replace the quorum-signature list with `signs`. The header hash is not affected.
    pub fn add_signs(&mut self, signs: Vec<QuorumEntry>) {
        self.quorum_signatures = signs;
    }

    /// Get the proposer's signature over the header hash, if the header was signed.
    pub fn proposer_signature(&self) -> Option<&SignatureBytes> {
        self.proposer_signature.as_ref()
    }

    /// Get the quorum-signature list, in the order it was set with [`add_signs`](Self::add_signs).
    pub fn quorum_signatures(&self) -> &[QuorumEntry] {
        &self.quorum_signatures
    }

    /// Checks whether the stored hash matches the header content.
    pub fn is_correct(&self) -> bool {
        self.hash == self.header.hash()
    }

    /// Checks whether the header is correct and carries a valid signature from its proposer.
    pub fn verify_proposer(&self) -> bool {
        match &self.proposer_signature {
            Some(signature) => {
                self.is_correct() && verify(&self.hash.bytes(), signature, &self.header.proposer)
            }
            None => false,
        }
    }

    /// Checks whether this header can be accepted as committed by `validator_set`.
    ///
    /// This is the case if:
    /// 1. The header is correct and its proposer signature verifies.
    /// 2. The proposer is a member of `validator_set`.
    /// 3. The valid quorum signatures from distinct members of `validator_set` form a
    ///    [quorum](crate::types::validator_set::is_quorum) of `validator_set`. Entries from unknown
    ///    signers, entries whose signature does not verify, and repeated addresses are not counted.
    pub fn verify(&self, validator_set: &ValidatorSet) -> bool {
        // 1. Check the hash and the proposer signature.
        if !self.verify_proposer() {
            return false;
        }

        // 2. Check the proposer's membership.
        if !validator_set.contains(&self.header.proposer_address()) {
            return false;
        }

        // 3. Count valid signatures from distinct members.
        let mut counted = HashSet::new();
        let valid = self
            .quorum_signatures
            .iter()
            .filter(|entry| {
                let Some(public_key) = validator_set.public_key(&entry.address) else {
                    return false;
                };
                !counted.contains(&entry.address)
                    && verify(&self.hash.bytes(), &entry.signature, public_key)
                    && counted.insert(entry.address)
            })
            .count();

        is_quorum(validator_set.len(), valid)
    }
}

/// A signed header together with the body it commits to.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub header: SignedHeader,
    pub data: Data,
}

impl Block {
    /// Create an unsigned block from `header` and `data`.
    pub fn new(header: BlockHeader, data: Data) -> Block {
        Block {
            header: SignedHeader::new(header),
            data,
        }
    }

    /// Get the hash of this block's header.
    pub fn hash(&self) -> CryptoHash {
        self.header.hash
    }

    /// Get the height of this block.
    pub fn number(&self) -> BlockHeight {
        self.header.header.number
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;

    fn header(proposer: &Keypair) -> BlockHeader {
        BlockHeader {
            parent_hash: CryptoHash::new([1u8; 32]),
            number: BlockHeight::new(11),
            timestamp: 1_700_000_000,
            view: ViewNumber::new(0),
            proposer: proposer.public(),
            data_hash: CryptoHash::new([2u8; 32]),
            state_root: CryptoHash::new([3u8; 32]),
        }
    }

    fn entries(signers: &[Keypair], hash: &CryptoHash) -> Vec<QuorumEntry> {
        signers
            .iter()
            .map(|signer| QuorumEntry {
                address: signer.address(),
                signature: signer.sign(&hash.bytes()),
            })
            .collect()
    }

    #[test]
    fn sign_only_as_proposer_test() {
        let proposer = Keypair::generate(&mut OsRng);
        let other = Keypair::generate(&mut OsRng);
        let mut signed_header = SignedHeader::new(header(&proposer));

        assert!(!signed_header.verify_proposer());
        assert!(!signed_header.sign(&other));
        assert!(signed_header.proposer_signature().is_none());
        assert!(signed_header.sign(&proposer));
        assert!(signed_header.verify_proposer());
    }

    #[test]
    fn add_signs_keeps_hash_test() {
        let proposer = Keypair::generate(&mut OsRng);
        let mut signed_header = SignedHeader::new(header(&proposer));
        signed_header.sign(&proposer);
        let hash = signed_header.hash;

        signed_header.add_signs(entries(&[proposer.clone()], &hash));
        assert_eq!(signed_header.hash, hash);
        assert_eq!(signed_header.quorum_signatures().len(), 1);
        assert!(signed_header.is_correct());

        signed_header.add_signs(Vec::new());
        assert!(signed_header.quorum_signatures().is_empty());
    }

    #[test]
    fn quorum_verify_round_trip_test() {
        let validators: Vec<Keypair> = (0..7).map(|_| Keypair::generate(&mut OsRng)).collect();
        let validator_set =
            ValidatorSet::from_public_keys(validators.iter().map(|keypair| keypair.public()));
        let mut signed_header = SignedHeader::new(header(&validators[0]));
        signed_header.sign(&validators[0]);
        let hash = signed_header.hash;

        // quorum(7) = 5.
        signed_header.add_signs(entries(&validators[..5], &hash));
        assert!(signed_header.verify(&validator_set));

        signed_header.add_signs(entries(&validators[..4], &hash));
        assert!(!signed_header.verify(&validator_set));

        // Repeating an address does not count twice.
        let mut repeated = entries(&validators[..4], &hash);
        repeated.push(repeated[0]);
        signed_header.add_signs(repeated);
        assert!(!signed_header.verify(&validator_set));

        // Signers outside the set do not count.
        let outsider = Keypair::generate(&mut OsRng);
        let mut with_outsider = entries(&validators[..4], &hash);
        with_outsider.extend(entries(&[outsider], &hash));
        signed_header.add_signs(with_outsider);
        assert!(!signed_header.verify(&validator_set));

        // Signatures over another hash do not count.
        let mut with_bad_signature = entries(&validators[..4], &hash);
        with_bad_signature.extend(entries(&validators[4..5], &CryptoHash::new([9u8; 32])));
        signed_header.add_signs(with_bad_signature);
        assert!(!signed_header.verify(&validator_set));
    }

    #[test]
    fn more_than_two_thirds_test() {
        // Two out of three is two thirds, not more.
        let validators: Vec<Keypair> = (0..3).map(|_| Keypair::generate(&mut OsRng)).collect();
        let validator_set =
            ValidatorSet::from_public_keys(validators.iter().map(|keypair| keypair.public()));
        let mut signed_header = SignedHeader::new(header(&validators[0]));
        signed_header.sign(&validators[0]);
        let hash = signed_header.hash;

        signed_header.add_signs(entries(&validators[..2], &hash));
        assert!(!signed_header.verify(&validator_set));
        signed_header.add_signs(entries(&validators, &hash));
        assert!(signed_header.verify(&validator_set));

        // Four out of six likewise.
        let validators: Vec<Keypair> = (0..6).map(|_| Keypair::generate(&mut OsRng)).collect();
        let validator_set =
            ValidatorSet::from_public_keys(validators.iter().map(|keypair| keypair.public()));
        let mut signed_header = SignedHeader::new(header(&validators[0]));
        signed_header.sign(&validators[0]);
        let hash = signed_header.hash;

        signed_header.add_signs(entries(&validators[..4], &hash));
        assert!(!signed_header.verify(&validator_set));
        signed_header.add_signs(entries(&validators[..5], &hash));
        assert!(signed_header.verify(&validator_set));
    }

    #[test]
    fn verify_requires_proposer_signature_test() {
        let validators: Vec<Keypair> = (0..4).map(|_| Keypair::generate(&mut OsRng)).collect();
        let validator_set =
            ValidatorSet::from_public_keys(validators.iter().map(|keypair| keypair.public()));

        let mut unsigned = SignedHeader::new(header(&validators[0]));
        let hash = unsigned.hash;
        unsigned.add_signs(entries(&validators, &hash));
        assert!(!unsigned.verify(&validator_set));

        let outsider = Keypair::generate(&mut OsRng);
        let mut foreign = SignedHeader::new(header(&outsider));
        foreign.sign(&outsider);
        let hash = foreign.hash;
        foreign.add_signs(entries(&validators, &hash));
        assert!(!foreign.verify(&validator_set));

        let mut tampered = SignedHeader::new(header(&validators[0]));
        tampered.sign(&validators[0]);
        let hash = tampered.hash;
        tampered.add_signs(entries(&validators, &hash));
        assert!(tampered.verify(&validator_set));
        tampered.header.timestamp += 1;
        assert!(!tampered.verify(&validator_set));
    }
}
