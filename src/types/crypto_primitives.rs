/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide three categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: SHA256 provided by the [`sha2`] crate, used for block header hashes and
//!    address derivation.
//! 2. **Digital Signatures**: secp256k1 provided by the [`libsecp256k1`] crate. Public keys travel in
//!    their 33-byte compressed form and signatures in their 64-byte compact form.
//! 3. **Change-view digests**: the message a validator signs to vote for a new view. This is the
//!    lowercase hex encoding of an MD5 ([`md5`] crate) over the tip hash's hex encoding followed by the
//!    decimal view number, giving exactly 32 ASCII bytes.

use rand_core::{CryptoRng, RngCore};

use super::data_types::{Address, CryptoHash, PublicKeyBytes, SignatureBytes, ViewNumber};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use libsecp256k1::{PublicKey, SecretKey};

/// A facade around [`SecretKey`] that implements methods for [`sign`](Self::sign)-ing 32-byte messages
/// as well as getters for the [`public`](Self::public) key and [`address`](Self::address) associated with
/// the secret key.
#[derive(Clone)]
pub struct Keypair {
    secret_key: SecretKey,
    public_key: PublicKeyBytes,
}

impl Keypair {
    /// Create a `Keypair` that wraps over `secret_key`.
    pub fn new(secret_key: SecretKey) -> Keypair {
        let public_key =
            PublicKeyBytes::new(PublicKey::from_secret_key(&secret_key).serialize_compressed());
        Keypair {
            secret_key,
            public_key,
        }
    }

    /// Create a `Keypair` from the raw bytes of a secret key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Keypair, CryptoError> {
        let secret_key = SecretKey::parse(bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Keypair::new(secret_key))
    }

    /// Generate a fresh `Keypair` from a cryptographically secure `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Keypair {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(keypair) = Keypair::from_bytes(&bytes) {
                return keypair;
            }
        }
    }

    /// Sign a 32-byte `message` with the `Keypair`.
    pub fn sign(&self, message: &[u8; 32]) -> SignatureBytes {
        let message = libsecp256k1::Message::parse(message);
        let (signature, _) = libsecp256k1::sign(&message, &self.secret_key);
        SignatureBytes::new(signature.serialize())
    }

    /// Get the compressed public key of this `Keypair`.
    pub fn public(&self) -> PublicKeyBytes {
        self.public_key
    }

    /// Get the address of this `Keypair`.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key)
    }

    /// Get the `SecretKey` this `Keypair` wraps.
    pub fn secret(&self) -> &SecretKey {
        &self.secret_key
    }
}

/// Verify that `signature` was produced by the owner of `public_key` over `message`.
///
/// Malformed public keys or signatures are not errors: they simply fail verification.
pub fn verify(message: &[u8; 32], signature: &SignatureBytes, public_key: &PublicKeyBytes) -> bool {
    let Ok(public_key) = PublicKey::parse_compressed(&public_key.bytes()) else {
        return false;
    };
    let Ok(signature) = libsecp256k1::Signature::parse_standard(&signature.bytes()) else {
        return false;
    };
    libsecp256k1::verify(&libsecp256k1::Message::parse(message), &signature, &public_key)
}

/// Derive the account address of `public_key`: the last 20 bytes of the SHA256 hash of its compressed
/// encoding.
pub fn address_from_public_key(public_key: &PublicKeyBytes) -> Address {
    let digest = CryptoHasher::digest(public_key.bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::new(bytes)
}

/// Compute the 32-byte message that a validator signs when voting to change the view on top of the
/// tip with hash `tip_hash` to `new_view`.
pub fn change_view_digest(tip_hash: &CryptoHash, new_view: ViewNumber) -> [u8; 32] {
    let preimage = format!("{}{}", tip_hash.to_hex(), new_view.int());
    let encoded = hex::encode(md5::Md5::digest(preimage.as_bytes()));
    let mut message = [0u8; 32];
    message.copy_from_slice(encoded.as_bytes());
    message
}

/// Enumerates the ways constructing cryptographic material can fail.
#[derive(Debug)]
pub enum CryptoError {
    /// The provided bytes are not a valid secp256k1 secret key (zero, or not less than the curve order).
    InvalidSecretKey,
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn sign_and_verify_test() {
        let keypair = Keypair::generate(&mut OsRng);
        let other = Keypair::generate(&mut OsRng);
        let message = [7u8; 32];

        let signature = keypair.sign(&message);
        assert!(verify(&message, &signature, &keypair.public()));
        assert!(!verify(&message, &signature, &other.public()));
        assert!(!verify(&[8u8; 32], &signature, &keypair.public()));
        assert!(!verify(&message, &SignatureBytes::new([0u8; 64]), &keypair.public()));
    }

    #[test]
    fn secret_key_bytes_test() {
        assert!(matches!(
            Keypair::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidSecretKey)
        ));

        let keypair = Keypair::generate(&mut OsRng);
        let restored = Keypair::from_bytes(&keypair.secret().serialize()).unwrap();
        assert_eq!(restored.public(), keypair.public());
        assert_eq!(restored.address(), keypair.address());
    }

    #[test]
    fn change_view_digest_test() {
        let tip_hash = CryptoHash::new([0xab; 32]);
        let digest = change_view_digest(&tip_hash, ViewNumber::new(1));

        let expected = hex::encode(md5::Md5::digest(format!("{}1", "ab".repeat(32)).as_bytes()));
        assert_eq!(&digest[..], expected.as_bytes());
        assert!(digest.iter().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(digest, change_view_digest(&tip_hash, ViewNumber::new(2)));
    }
}
