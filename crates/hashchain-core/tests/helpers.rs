use hashchain_core::{Chain, Difficulty};

pub fn transfer(from: &str, to: &str, amount: u64) -> String {
    format!("{from}->{to}:{amount}")
}

pub fn build_chain(difficulty: u8, batches: &[Vec<String>]) -> Chain {
    let mut chain = Chain::new(Difficulty::new(difficulty).expect("difficulty in range"))
        .expect("genesis mines");
    for batch in batches {
        chain.append(batch.clone()).expect("block mines");
    }
    chain
}

pub fn sample_batches() -> Vec<Vec<String>> {
    vec![
        vec![transfer("Alice", "Bob", 10), transfer("Bob", "Charlie", 20)],
        vec![transfer("Charlie", "Dave", 15), transfer("Dave", "Eve", 25)],
        vec![transfer("Eve", "Alice", 5)],
    ]
}
