/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
    io::{self, Read, Write},
    ops::{Add, AddAssign},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Round-change epoch within the attempt to commit a single block height.
///
/// Starts at 0 every time the tip advances, and increases only when validators agree to give up on
/// the leader of the current view.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct ViewNumber(u64);

impl ViewNumber {
    /// Create a new `ViewNumber` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `ViewNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for ViewNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for ViewNumber {
    type Output = ViewNumber;
    fn add(self, rhs: u64) -> Self::Output {
        ViewNumber::new(self.0.saturating_add(rhs))
    }
}

impl AddAssign<u64> for ViewNumber {
    fn add_assign(&mut self, rhs: u64) {
        self.0 = self.0.saturating_add(rhs)
    }
}

/// Height of a block in the chain. The genesis block has height 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0.saturating_add(rhs))
    }
}

/// Number of block intervals the chain has consumed up to a given tip.
///
/// Every committed block contributes the number of views it took to commit, so `TotalView` anchors
/// the timeouts of the next height to the genesis time rather than to the local wall clock.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize,
)]
pub struct TotalView(u64);

impl TotalView {
    /// Create a new `TotalView` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `TotalView`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

/// 32-byte cryptographic hash.
///
/// Block header hashes are always SHA256 hashes. The `data_hash` of a header can come from any 32-byte
/// hash function chosen by the host.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Lowercase hex encoding of this hash, as it appears on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a `CryptoHash` from its hex encoding. Returns `None` if `s` is not exactly 32 hex-encoded bytes.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 20-byte account address of a validator, derived from its public key by
/// [`address_from_public_key`](super::crypto_primitives::address_from_public_key).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Create a new `Address` wrapping `bytes`.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 20]` value of this `Address`.
    pub const fn bytes(&self) -> [u8; 20] {
        self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 33-byte compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; 33]);

impl PublicKeyBytes {
    /// Create a new `PublicKeyBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 33]` value of this `PublicKeyBytes`.
    pub const fn bytes(&self) -> [u8; 33] {
        self.0
    }
}

impl BorshSerialize for PublicKeyBytes {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKeyBytes {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; 33];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 64-byte compact secp256k1 signature (`r ++ s`).
#[derive(Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 64]` value of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Arbitrary data provided by the host to be stored in the body of a [`Block`](super::block::Block),
/// typically its encoded transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Data(Vec<Datum>);

impl Data {
    /// Create a new `Data` wrapping `datum_vec`.
    pub fn new(datum_vec: Vec<Datum>) -> Self {
        Self(datum_vec)
    }

    /// Get a reference to the inner `Vec<Datum>` of this `Data`.
    pub const fn vec(&self) -> &Vec<Datum> {
        &self.0
    }

    /// Get how many `Datum`s are in this `Data`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether this `Data` contains no `Datum`s.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate through the `Datum`s in this `Data` in the order they were provided to [`new`](Self::new).
    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.0.iter()
    }
}

/// A single opaque item of [`Data`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Datum(Vec<u8>);

impl Datum {
    /// Create a new `Datum` wrapping `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get a reference to the inner `Vec<u8>` of this `Datum`.
    pub const fn bytes(&self) -> &Vec<u8> {
        &self.0
    }
}
