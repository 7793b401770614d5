//! Append-only hash chain: a from-scratch SHA-256, Merkle roots over block
//! payloads and a linear proof-of-work nonce search.

pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;
pub mod sha256;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use constants::{GENESIS_PREVIOUS_DIGEST, HASH_HEX_SIZE, HASH_SIZE};
pub use chain::Chain;
pub use error::{ChainError, DifficultyError, DigestParseError, MineError, ValidationFailure};
pub use pow::Difficulty;

/// 256-bit SHA-256 output. Displays as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; HASH_SIZE]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_HEX_SIZE {
            return Err(DigestParseError::Length {
                expected: HASH_HEX_SIZE,
                actual: s.len(),
            });
        }
        let mut out = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Link from a block to its predecessor. Genesis links to the `"0"` sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PreviousDigest {
    Sentinel,
    Block(Digest),
}

impl PreviousDigest {
    pub fn digest(&self) -> Option<Digest> {
        match self {
            PreviousDigest::Sentinel => None,
            PreviousDigest::Block(digest) => Some(*digest),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, PreviousDigest::Sentinel)
    }
}

impl From<Digest> for PreviousDigest {
    fn from(digest: Digest) -> Self {
        PreviousDigest::Block(digest)
    }
}

impl fmt::Display for PreviousDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousDigest::Sentinel => f.write_str(GENESIS_PREVIOUS_DIGEST),
            PreviousDigest::Block(digest) => fmt::Display::fmt(digest, f),
        }
    }
}

impl FromStr for PreviousDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == GENESIS_PREVIOUS_DIGEST {
            Ok(PreviousDigest::Sentinel)
        } else {
            s.parse().map(PreviousDigest::Block)
        }
    }
}

impl From<PreviousDigest> for String {
    fn from(previous: PreviousDigest) -> Self {
        previous.to_string()
    }
}

impl TryFrom<String> for PreviousDigest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A block payload entry. The chain never interprets items; it only hashes
/// their canonical bytes.
pub trait Item {
    fn canonical_bytes(&self) -> Cow<'_, [u8]>;
}

impl Item for str {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Item for String {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Item for [u8] {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl Item for Vec<u8> {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl<T: Item + ?Sized> Item for &T {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        (**self).canonical_bytes()
    }
}

impl<T: Item + ?Sized> Item for Box<T> {
    fn canonical_bytes(&self) -> Cow<'_, [u8]> {
        (**self).canonical_bytes()
    }
}

/// Reduce `items` to a single digest by pairwise hashing of hex forms,
/// duplicating the last digest of any odd-sized level.
///
/// Order is significant. No items yields the digest of the empty string.
pub fn merkle_root<T: Item>(items: &[T]) -> Digest {
    if items.is_empty() {
        return sha256::hash(b"");
    }
    let mut level: Vec<Digest> = items
        .iter()
        .map(|item| sha256::hash(item.canonical_bytes()))
        .collect();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut buf = String::with_capacity(HASH_HEX_SIZE * 2);
    buf.push_str(&left.to_hex());
    buf.push_str(&right.to_hex());
    sha256::hash(buf)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: u64,
    pub merkle_root: Digest,
    pub previous_digest: PreviousDigest,
    pub nonce: u64,
}

impl BlockHeader {
    /// Bytes covered by the block digest: index and timestamp as u64 LE,
    /// merkle root and previous digest as their hex text, nonce as u64 LE.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 8 + HASH_HEX_SIZE + HASH_HEX_SIZE + 8);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(self.merkle_root.to_hex().as_bytes());
        bytes.extend_from_slice(self.previous_digest.to_string().as_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn digest(&self) -> Digest {
        sha256::hash(self.hash_bytes())
    }
}

/// A block that has not been mined yet. Consumed by [`PendingBlock::mine`].
#[derive(Clone, Debug)]
pub struct PendingBlock<T> {
    header: BlockHeader,
    items: Vec<T>,
}

impl<T: Item> PendingBlock<T> {
    pub fn new(index: u64, previous_digest: PreviousDigest, items: Vec<T>) -> Self {
        Self::with_timestamp(index, previous_digest, items, unix_now())
    }

    pub fn with_timestamp(
        index: u64,
        previous_digest: PreviousDigest,
        items: Vec<T>,
        timestamp: u64,
    ) -> Self {
        let header = BlockHeader {
            index,
            timestamp,
            merkle_root: merkle_root(&items),
            previous_digest,
            nonce: 0,
        };
        Self { header, items }
    }
}

impl<T> PendingBlock<T> {
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Digest at the current nonce.
    pub fn digest(&self) -> Digest {
        self.header.digest()
    }
}

/// A mined block. Fields are fixed once mining completes.
#[derive(Clone, Debug, Serialize)]
pub struct Block<T> {
    #[serde(flatten)]
    header: BlockHeader,
    items: Vec<T>,
    digest: Digest,
}

impl<T> Block<T> {
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn previous_digest(&self) -> PreviousDigest {
        self.header.previous_digest
    }

    pub fn merkle_root(&self) -> Digest {
        self.header.merkle_root
    }

    pub fn nonce(&self) -> u64 {
        self.header.nonce
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Digest recomputed from the stored header, nonce included.
    pub fn recompute_digest(&self) -> Digest {
        self.header.digest()
    }

    pub fn meets_difficulty(&self, difficulty: Difficulty) -> bool {
        pow::meets_difficulty(&self.digest, difficulty)
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub mod pow {
    use super::Digest;
    use crate::constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
    use crate::error::DifficultyError;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Required number of leading `'0'` hex characters in a block digest.
    /// Always within `0..=MAX_DIFFICULTY`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(into = "u8", try_from = "u8")]
    pub struct Difficulty(u8);

    impl Difficulty {
        pub const ZERO: Difficulty = Difficulty(0);
        pub const MAX: Difficulty = Difficulty(MAX_DIFFICULTY);

        pub fn new(zeros: u8) -> Result<Self, DifficultyError> {
            if zeros > MAX_DIFFICULTY {
                return Err(DifficultyError::OutOfRange {
                    requested: zeros,
                    max: MAX_DIFFICULTY,
                });
            }
            Ok(Self(zeros))
        }

        pub fn get(self) -> u8 {
            self.0
        }
    }

    impl Default for Difficulty {
        fn default() -> Self {
            Self(DEFAULT_DIFFICULTY)
        }
    }

    impl TryFrom<u8> for Difficulty {
        type Error = DifficultyError;

        fn try_from(zeros: u8) -> Result<Self, Self::Error> {
            Self::new(zeros)
        }
    }

    impl From<Difficulty> for u8 {
        fn from(difficulty: Difficulty) -> Self {
            difficulty.0
        }
    }

    impl fmt::Display for Difficulty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Display::fmt(&self.0, f)
        }
    }

    /// Number of leading `'0'` characters in the hex form of `digest`.
    pub fn count_leading_zero_nibbles(digest: &Digest) -> u32 {
        let mut total = 0u32;
        for b in digest.as_bytes() {
            if *b == 0 {
                total += 2;
            } else {
                if *b < 0x10 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(digest: &Digest, difficulty: Difficulty) -> bool {
        count_leading_zero_nibbles(digest) >= u32::from(difficulty.get())
    }
}
