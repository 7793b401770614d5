use crate::error::{ChainError, MineError, ValidationFailure};
use crate::{merkle_root, Block, Difficulty, Item, PendingBlock, PreviousDigest};
use std::ops::Index;
use tracing::{debug, warn};

/// Ordered, append-only sequence of mined blocks starting at genesis.
///
/// `append` takes `&mut self`, so a chain has exactly one writer at a time.
#[derive(Clone, Debug)]
pub struct Chain<T = String> {
    blocks: Vec<Block<T>>,
    difficulty: Difficulty,
}

impl<T: Item> Chain<T> {
    /// Create a chain holding only the genesis block, mined at `difficulty`.
    pub fn new(difficulty: Difficulty) -> Result<Self, MineError> {
        let genesis = genesis_block(difficulty)?;
        debug!(digest = %genesis.digest(), %difficulty, "created genesis block");
        Ok(Self {
            blocks: vec![genesis],
            difficulty,
        })
    }

    pub fn with_difficulty(zeros: u8) -> Result<Self, ChainError> {
        let difficulty = Difficulty::new(zeros)?;
        Ok(Self::new(difficulty)?)
    }

    /// Mine a block over `items` on top of the current tip and append it.
    pub fn append<I>(&mut self, items: I) -> Result<&Block<T>, MineError>
    where
        I: IntoIterator<Item = T>,
    {
        let previous = PreviousDigest::Block(self.last().digest());
        let index = self.blocks.len() as u64;
        let block =
            PendingBlock::new(index, previous, items.into_iter().collect()).mine(self.difficulty)?;
        debug!(
            index = block.index(),
            items = block.items().len(),
            "appended block"
        );
        self.blocks.push(block);
        Ok(self.last())
    }

    /// Structural integrity check: `true` when every block links to its
    /// predecessor and its digest recomputes from its stored fields.
    ///
    /// Proof-of-work difficulty is not re-verified; see [`Chain::verify_work`].
    pub fn validate(&self) -> bool {
        match self.check() {
            Ok(()) => true,
            Err(failure) => {
                warn!(%failure, "chain validation failed");
                false
            }
        }
    }

    /// Like [`Chain::validate`] but reports the first failing check.
    pub fn check(&self) -> Result<(), ValidationFailure> {
        let genesis = &self.blocks[0];
        if genesis.index() != 0 {
            return Err(ValidationFailure::GenesisMalformed {
                reason: "index is not 0",
            });
        }
        if !genesis.previous_digest().is_sentinel() {
            return Err(ValidationFailure::GenesisMalformed {
                reason: "previous digest is not the sentinel",
            });
        }
        if !genesis.items().is_empty() {
            return Err(ValidationFailure::GenesisMalformed {
                reason: "genesis carries items",
            });
        }
        check_recomputation(genesis)?;

        for (offset, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let position = offset + 1;
            if current.index() != position as u64 {
                return Err(ValidationFailure::IndexMismatch {
                    position,
                    index: current.index(),
                });
            }
            if current.previous_digest() != PreviousDigest::Block(previous.digest()) {
                return Err(ValidationFailure::BrokenLink {
                    index: current.index(),
                });
            }
            check_recomputation(current)?;
        }
        Ok(())
    }
}

impl<T> Chain<T> {
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Number of blocks, genesis included. Never zero.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&Block<T>> {
        self.blocks.get(index)
    }

    pub fn genesis(&self) -> &Block<T> {
        &self.blocks[0]
    }

    pub fn last(&self) -> &Block<T> {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block<T>> {
        self.blocks.iter()
    }

    /// Difficulty-compliance audit, separate from [`Chain::validate`].
    pub fn verify_work(&self) -> bool {
        self.blocks
            .iter()
            .all(|block| block.meets_difficulty(self.difficulty))
    }
}

impl<T> Index<usize> for Chain<T> {
    type Output = Block<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.blocks[index]
    }
}

impl<'a, T> IntoIterator for &'a Chain<T> {
    type Item = &'a Block<T>;
    type IntoIter = std::slice::Iter<'a, Block<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Index 0, no items, previous digest set to the `"0"` sentinel.
pub fn genesis_block<T: Item>(difficulty: Difficulty) -> Result<Block<T>, MineError> {
    PendingBlock::new(0, PreviousDigest::Sentinel, Vec::new()).mine(difficulty)
}

fn check_recomputation<T: Item>(block: &Block<T>) -> Result<(), ValidationFailure> {
    if merkle_root(block.items()) != block.merkle_root() {
        return Err(ValidationFailure::MerkleRootMismatch {
            index: block.index(),
        });
    }
    if block.recompute_digest() != block.digest() {
        return Err(ValidationFailure::DigestMismatch {
            index: block.index(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sha256, Digest};

    fn chain_with(difficulty: u8, batches: &[&[&str]]) -> Chain {
        let mut chain = Chain::with_difficulty(difficulty).unwrap();
        for batch in batches {
            chain
                .append(batch.iter().map(|item| item.to_string()))
                .unwrap();
        }
        chain
    }

    #[test]
    fn genesis_block_example() {
        let chain: Chain = Chain::with_difficulty(1).unwrap();
        let genesis = chain.genesis();
        assert_eq!(chain.len(), 1);
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_digest(), PreviousDigest::Sentinel);
        assert_eq!(genesis.previous_digest().to_string(), "0");
        assert!(genesis.items().is_empty());
        assert_eq!(genesis.merkle_root(), sha256::hash(""));
        assert!(genesis.digest().to_hex().starts_with('0'));
        assert!(chain.validate());
    }

    #[test]
    fn end_to_end_example() {
        let chain = chain_with(2, &[&["A->B:10", "B->C:20"]]);
        assert!(chain.validate());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].index(), 1);
        assert!(chain[1].digest().to_hex().starts_with("00"));
        assert_eq!(
            chain[1].previous_digest(),
            PreviousDigest::Block(chain[0].digest())
        );
        assert_eq!(chain[1].items(), ["A->B:10", "B->C:20"]);
        assert!(chain.verify_work());
    }

    #[test]
    fn append_returns_new_tip() {
        let mut chain: Chain<&str> = Chain::new(Difficulty::new(1).unwrap()).unwrap();
        let tip_digest = chain.append(["x", "y"]).unwrap().digest();
        assert_eq!(chain.last().digest(), tip_digest);
        assert_eq!(chain.last().index(), 1);
    }

    #[test]
    fn append_empty_batch() {
        let mut chain: Chain<&str> = Chain::new(Difficulty::ZERO).unwrap();
        let block = chain.append(Vec::new()).unwrap();
        assert_eq!(block.merkle_root(), sha256::hash(""));
        assert_eq!(block.nonce(), 0);
        assert!(chain.validate());
    }

    #[test]
    fn many_blocks_validate() {
        let chain = chain_with(1, &[&["a"], &["b", "c"], &["d", "e", "f"], &[], &["g"]]);
        assert_eq!(chain.len(), 6);
        for (position, block) in chain.iter().enumerate() {
            assert_eq!(block.index(), position as u64);
        }
        assert!(chain.validate());
        assert_eq!(chain.check(), Ok(()));
    }

    #[test]
    fn tampered_item_is_detected() {
        let mut chain = chain_with(1, &[&["A->B:10", "B->C:20"], &["C->D:15"]]);
        chain.blocks[1].items[0] = "A->B:1000".to_string();
        assert!(!chain.validate());
        assert_eq!(
            chain.check(),
            Err(ValidationFailure::MerkleRootMismatch { index: 1 })
        );
    }

    #[test]
    fn tampered_previous_digest_is_detected() {
        let mut chain = chain_with(1, &[&["A->B:10"], &["C->D:15"]]);
        chain.blocks[2].header.previous_digest = PreviousDigest::Block(sha256::hash("forged"));
        assert!(!chain.validate());
        assert_eq!(chain.check(), Err(ValidationFailure::BrokenLink { index: 2 }));
    }

    #[test]
    fn tampered_nonce_is_detected() {
        let mut chain = chain_with(1, &[&["A->B:10"]]);
        chain.blocks[1].header.nonce += 1;
        assert_eq!(
            chain.check(),
            Err(ValidationFailure::DigestMismatch { index: 1 })
        );
    }

    #[test]
    fn tampered_timestamp_is_detected() {
        let mut chain = chain_with(1, &[&["A->B:10"]]);
        chain.blocks[1].header.timestamp += 1;
        assert!(!chain.validate());
    }

    #[test]
    fn tampered_merkle_root_is_detected() {
        let mut chain = chain_with(1, &[&["A->B:10"]]);
        chain.blocks[1].header.merkle_root = sha256::hash("other");
        assert_eq!(
            chain.check(),
            Err(ValidationFailure::MerkleRootMismatch { index: 1 })
        );
    }

    #[test]
    fn relinked_forgery_breaks_the_next_block() {
        // Re-mining a tampered block fixes its own digest but not its successor's link.
        let mut chain = chain_with(1, &[&["A->B:10"], &["B->C:5"]]);
        let forged = PendingBlock::with_timestamp(
            1,
            PreviousDigest::Block(chain[0].digest()),
            vec!["A->B:9999".to_string()],
            chain[1].timestamp(),
        )
        .mine(chain.difficulty())
        .unwrap();
        chain.blocks[1] = forged;
        assert_eq!(chain.check(), Err(ValidationFailure::BrokenLink { index: 2 }));
    }

    #[test]
    fn wrong_index_is_detected() {
        let mut chain = chain_with(0, &[&["a"]]);
        chain.blocks[1].header.index = 7;
        assert_eq!(
            chain.check(),
            Err(ValidationFailure::IndexMismatch {
                position: 1,
                index: 7
            })
        );
    }

    #[test]
    fn tampered_genesis_is_detected() {
        let mut chain = chain_with(0, &[]);
        chain.blocks[0].items.push("smuggled".to_string());
        assert_eq!(
            chain.check(),
            Err(ValidationFailure::GenesisMalformed {
                reason: "genesis carries items"
            })
        );
    }

    #[test]
    fn validation_ignores_difficulty() {
        // A block mined below the chain difficulty is structurally sound.
        let mut chain = chain_with(0, &[]);
        chain.difficulty = Difficulty::MAX;
        chain.append_unmined_for_test(vec!["cheap".to_string()]);
        assert!(chain.validate());
        assert!(!chain.verify_work());
    }

    #[test]
    fn difficulty_is_fixed_at_construction() {
        let chain: Chain = Chain::with_difficulty(2).unwrap();
        assert_eq!(chain.difficulty(), Difficulty::new(2).unwrap());
        assert!(matches!(
            Chain::<String>::with_difficulty(65),
            Err(ChainError::Difficulty(_))
        ));
    }

    #[test]
    fn chain_iteration_example() {
        let chain = chain_with(0, &[&["a"], &["b"]]);
        let digests: Vec<Digest> = (&chain).into_iter().map(|block| block.digest()).collect();
        assert_eq!(digests.len(), 3);
        assert_eq!(chain.get(3).map(|b| b.index()), None);
        assert_eq!(chain.blocks().len(), 3);
        assert!(!chain.is_empty());
    }

    impl Chain<String> {
        fn append_unmined_for_test(&mut self, items: Vec<String>) {
            let previous = PreviousDigest::Block(self.last().digest());
            let block = PendingBlock::new(self.blocks.len() as u64, previous, items)
                .mine(Difficulty::ZERO)
                .unwrap();
            self.blocks.push(block);
        }
    }
}
