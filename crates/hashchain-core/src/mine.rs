use crate::{error::MineError, pow::meets_difficulty, Block, Difficulty, PendingBlock};
use tracing::info;

impl<T> PendingBlock<T> {
    /// Mines the block by incrementing the nonce until the digest has at least
    /// `difficulty` leading `'0'` hex characters, then freezes it.
    ///
    /// The search is a linear scan on the calling thread. The nonce is a u64
    /// and the search aborts with [`MineError::NonceSpaceExhausted`] rather
    /// than wrap around.
    pub fn mine(self, difficulty: Difficulty) -> Result<Block<T>, MineError> {
        let PendingBlock { mut header, items } = self;
        let mut digest = header.digest();
        let mut attempts = 1u64;

        while !meets_difficulty(&digest, difficulty) {
            header.nonce = header
                .nonce
                .checked_add(1)
                .ok_or(MineError::NonceSpaceExhausted {
                    index: header.index,
                })?;
            digest = header.digest();
            attempts = attempts.saturating_add(1);
        }

        info!(
            index = header.index,
            nonce = header.nonce,
            %difficulty,
            attempts,
            "mined block {digest}"
        );

        Ok(Block {
            header,
            items,
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{merkle_root, pow::count_leading_zero_nibbles, sha256, PreviousDigest};

    fn pending(items: Vec<&'static str>) -> PendingBlock<&'static str> {
        PendingBlock::with_timestamp(
            1,
            PreviousDigest::Block(sha256::hash("previous")),
            items,
            1_600_000_200,
        )
    }

    #[test]
    fn mine_block_example() {
        let difficulty = Difficulty::new(3).unwrap();
        let block = pending(vec!["Alice->Bob: $10", "Bob->Charlie: $20"])
            .mine(difficulty)
            .unwrap();
        assert!(block.digest().to_hex().starts_with("000"));
        assert!(count_leading_zero_nibbles(&block.digest()) >= 3);
        assert!(block.meets_difficulty(difficulty));
        assert_eq!(block.digest(), block.recompute_digest());
    }

    #[test]
    fn mining_preserves_fields() {
        let items = vec!["A->B:10", "B->C:20"];
        let template = pending(items.clone());
        let header = *template.header();
        let block = template.mine(Difficulty::new(2).unwrap()).unwrap();
        assert_eq!(block.index(), header.index);
        assert_eq!(block.timestamp(), header.timestamp);
        assert_eq!(block.previous_digest(), header.previous_digest);
        assert_eq!(block.merkle_root(), merkle_root(&items));
        assert_eq!(block.items(), items.as_slice());
    }

    #[test]
    fn difficulty_zero_keeps_nonce_zero() {
        let template = pending(vec!["x"]);
        let unmined = template.digest();
        let block = template.mine(Difficulty::ZERO).unwrap();
        assert_eq!(block.nonce(), 0);
        assert_eq!(block.digest(), unmined);
    }

    #[test]
    fn mined_nonce_is_the_first_match() {
        let difficulty = Difficulty::new(2).unwrap();
        let template = pending(vec!["first"]);
        let mut header = *template.header();
        let block = template.mine(difficulty).unwrap();
        for nonce in 0..block.nonce() {
            header.nonce = nonce;
            assert!(!meets_difficulty(&header.digest(), difficulty));
        }
    }

    #[test]
    fn nonce_overflow_aborts() {
        let mut template = pending(vec!["overflow"]);
        template.header.nonce = u64::MAX;
        let err = template.mine(Difficulty::MAX).unwrap_err();
        assert_eq!(err, MineError::NonceSpaceExhausted { index: 1 });
    }
}
