use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashchain_core::{
    constants::DEFAULT_DIFFICULTY, merkle_root, sha256, Block, Chain, Difficulty,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hashchain")]
#[command(about = "Hash data, compute Merkle roots and mine a demo proof-of-work chain")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SHA-256 digest of TEXT
    Hash { text: String },
    /// Print the Merkle root of ITEMS, in the order given
    Merkle { items: Vec<String> },
    /// Build a chain, append transaction batches and print every block
    Demo {
        /// Leading '0' hex characters required in each block digest (0-64)
        #[arg(long, env = "HASHCHAIN_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u8,
        /// Comma-separated batch of items; repeat for more blocks.
        /// Defaults to two sample batches.
        #[arg(long = "block")]
        blocks: Vec<String>,
        /// Print the chain as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    difficulty: Difficulty,
    valid: bool,
    blocks: &'a [Block<String>],
}

fn sample_batches() -> Vec<Vec<String>> {
    vec![
        vec!["Alice->Bob: $10".into(), "Bob->Charlie: $20".into()],
        vec!["Charlie->Dave: $15".into(), "Dave->Eve: $25".into()],
    ]
}

fn parse_batches(blocks: &[String]) -> Vec<Vec<String>> {
    blocks
        .iter()
        .map(|block| {
            block
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .collect()
}

fn run_demo(difficulty: u8, blocks: &[String], json: bool) -> Result<()> {
    let difficulty = Difficulty::new(difficulty).context("invalid --difficulty")?;
    let batches = if blocks.is_empty() {
        sample_batches()
    } else {
        parse_batches(blocks)
    };

    let mut chain: Chain = Chain::new(difficulty).context("mining genesis block")?;
    for batch in batches {
        let block = chain.append(batch).context("mining block")?;
        info!(index = block.index(), nonce = block.nonce(), "block added");
    }
    let valid = chain.validate();

    if json {
        let report = Report {
            difficulty,
            valid,
            blocks: chain.blocks(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for block in &chain {
        println!("Block {}:", block.index());
        println!("  Previous Hash: {}", block.previous_digest());
        println!("  Timestamp: {}", block.timestamp());
        println!("  Items: {}", block.items().join(" | "));
        println!("  Merkle Root: {}", block.merkle_root());
        println!("  Nonce: {}", block.nonce());
        println!("  Block Hash: {}", block.digest());
        println!();
    }
    println!("Blockchain is valid: {valid}");
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Hash { text } => println!("{}", sha256::hash(text)),
        Command::Merkle { items } => println!("{}", merkle_root(&items)),
        Command::Demo {
            difficulty,
            blocks,
            json,
        } => run_demo(difficulty, &blocks, json)?,
    }
    Ok(())
}
