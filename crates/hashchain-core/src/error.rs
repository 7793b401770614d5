use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
    #[error("difficulty {requested} exceeds the maximum of {max} hex characters")]
    OutOfRange { requested: u8, max: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    /// Every u64 nonce from the starting one was tried without a match.
    #[error("nonce space exhausted while mining block {index}")]
    NonceSpaceExhausted { index: u64 },
}

#[derive(Debug, Error)]
pub enum DigestParseError {
    #[error("expected {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid hex digest: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// First inconsistency found while replaying a chain.
///
/// This is a report, not a fault: the chain it came from stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("genesis block is malformed: {reason}")]
    GenesisMalformed { reason: &'static str },
    #[error("block at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: u64 },
    #[error("block {index} does not link to the digest of its predecessor")]
    BrokenLink { index: u64 },
    #[error("block {index} merkle root does not match its items")]
    MerkleRootMismatch { index: u64 },
    #[error("block {index} digest does not match its fields")]
    DigestMismatch { index: u64 },
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    Mine(#[from] MineError),
}
