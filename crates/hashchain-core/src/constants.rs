pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Size of one compression chunk in bytes.
pub const BLOCK_SIZE: usize = 64;
/// A digest has 64 hex characters, so no prefix longer than that can ever match.
pub const MAX_DIFFICULTY: u8 = HASH_HEX_SIZE as u8;
pub const DEFAULT_DIFFICULTY: u8 = 2;
/// Stands in for the previous digest of the genesis block.
pub const GENESIS_PREVIOUS_DIGEST: &str = "0";
