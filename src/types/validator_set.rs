/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registry of the validators that may sign a block header, and the quorum threshold shared by every
//! consensus decision.
//!
//! Main type: [`ValidatorSet`].
//!
//! ## Quorum
//!
//! A decision is binding when it is backed by *more than two-thirds* of the validators, that is,
//! `floor(2n/3) + 1` of `n`. The same predicate, [`is_quorum`], is used to decide when enough
//! `PrepareResponse`s have been collected, when enough `ChangeView` votes agree, and when a header's
//! quorum signatures are sufficient.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::address_from_public_key,
    data_types::{Address, PublicKeyBytes},
};

/// Ordered set of validators, each identified by its [`Address`] and holding a compressed public key.
///
/// The order of insertion is preserved and is the order returned by [`addresses`](Self::addresses).
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorSet {
    validators: Vec<(Address, PublicKeyBytes)>,
}

impl ValidatorSet {
    /// Create an empty `ValidatorSet`.
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Create a `ValidatorSet` from `public_keys`, deriving each validator's address. Duplicate keys
    /// are only inserted once.
    pub fn from_public_keys(public_keys: impl IntoIterator<Item = PublicKeyBytes>) -> Self {
        let mut validator_set = Self::new();
        public_keys
            .into_iter()
            .for_each(|public_key| validator_set.insert(public_key));
        validator_set
    }

    /// Insert a validator with `public_key`. Does nothing if a validator with the same address is already
    /// in the set.
    pub fn insert(&mut self, public_key: PublicKeyBytes) {
        let address = address_from_public_key(&public_key);
        if !self.contains(&address) {
            self.validators.push((address, public_key))
        }
    }

    /// Get the public key of the validator with `address`, if it is in the set.
    pub fn public_key(&self, address: &Address) -> Option<&PublicKeyBytes> {
        self.validators
            .iter()
            .find(|(validator, _)| validator == address)
            .map(|(_, public_key)| public_key)
    }

    /// Check whether a validator with `address` is in the set.
    pub fn contains(&self, address: &Address) -> bool {
        self.public_key(address).is_some()
    }

    /// Get the position of the validator with `address` in the set.
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.validators
            .iter()
            .position(|(validator, _)| validator == address)
    }

    /// Get the addresses of the validators in insertion order.
    pub fn addresses(&self) -> Vec<Address> {
        self.validators.iter().map(|(address, _)| *address).collect()
    }

    /// Iterate over the `(address, public_key)` pairs in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, (Address, PublicKeyBytes)> {
        self.validators.iter()
    }

    /// Get the number of validators in the set.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Get the number of matching votes needed for a quorum in this set. See [`quorum`].
    pub fn quorum(&self) -> usize {
        quorum(self.len())
    }
}

/// Minimum number of matching votes out of `validator_count` that makes a decision binding: more than
/// two-thirds.
pub const fn quorum(validator_count: usize) -> usize {
    (validator_count * 2) / 3 + 1
}

/// Check whether `vote_count` matching votes out of `validator_count` validators form a quorum.
///
/// An empty validator set never reaches a quorum.
pub const fn is_quorum(validator_count: usize, vote_count: usize) -> bool {
    validator_count > 0 && vote_count >= quorum(validator_count)
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;
    use crate::types::crypto_primitives::Keypair;

    #[test]
    fn quorum_threshold_test() {
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(3), 3);
        assert_eq!(quorum(4), 3);
        assert_eq!(quorum(6), 5);
        assert_eq!(quorum(7), 5);

        assert!(!is_quorum(4, 2));
        assert!(is_quorum(4, 3));
        assert!(is_quorum(4, 4));
        assert!(!is_quorum(0, 0));
    }

    #[test]
    fn insert_and_lookup_test() {
        let keypairs: Vec<Keypair> = (0..3).map(|_| Keypair::generate(&mut OsRng)).collect();
        let mut validator_set =
            ValidatorSet::from_public_keys(keypairs.iter().map(|keypair| keypair.public()));
        validator_set.insert(keypairs[0].public());

        assert_eq!(validator_set.len(), 3);
        assert_eq!(
            validator_set.addresses(),
            keypairs.iter().map(|keypair| keypair.address()).collect::<Vec<_>>()
        );
        assert_eq!(
            validator_set.public_key(&keypairs[1].address()),
            Some(&keypairs[1].public())
        );
        assert_eq!(validator_set.position(&keypairs[2].address()), Some(2));
        assert!(!validator_set.contains(&Keypair::generate(&mut OsRng).address()));
    }
}
