//! Decodes a hex-encoded block and prints a JSON summary of its identities,
//! classification and validity checks.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use solar_primitives::{
    Network,
    blockdata::block::{Block, BlockHash, BlockHeader, exceeds_max_weight},
    consensus::{SerializationContext, deserialize_with},
};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Registry, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "solar-inspect")]
#[command(about = "Decode a block and summarise its hashes, stake classification and signature.", long_about = None)]
struct Args {
    /// Hex-encoded block.
    pub hex: Option<String>,

    /// Read the hex-encoded block from a file instead.
    #[arg(short, long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,

    /// Network whose parameters apply (mainnet, testnet, regtest).
    #[arg(short, long, default_value = "mainnet")]
    pub network: Network,

    /// Decode a header-only announcement instead of a full block.
    #[arg(long, default_value = "false")]
    pub header_only: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Disable colored output.
    #[arg(long, default_value = "false")]
    pub no_color: bool,
}

/// The stake kernel of a proof-of-stake block.
#[derive(Debug, Serialize)]
struct Kernel {
    prevout: String,
    time: u32,
}

#[derive(Debug, Serialize)]
struct BlockSummary {
    network: Network,
    block_hash: BlockHash,
    pow_hash: String,
    header: BlockHeader,
    proof_of_stake: bool,
    stake_entropy_bit: u32,
    kernel: Option<Kernel>,
    transaction_count: usize,
    weight: u64,
    exceeds_max_weight: bool,
    signature_len: usize,
    signature_valid: bool,
    merkle_root_valid: bool,
}

impl BlockSummary {
    fn new(block: &Block, network: Network) -> Result<Self, Box<dyn std::error::Error>> {
        let proof_of_stake = block.is_proof_of_stake();
        let kernel = proof_of_stake.then(|| {
            let (prevout, time) = block.proof_of_stake_kernel();
            Kernel {
                prevout: prevout.to_string(),
                time,
            }
        });

        Ok(Self {
            network,
            block_hash: block.block_hash(),
            pow_hash: block.pow_hash()?.to_string(),
            header: block.header_view(),
            proof_of_stake,
            stake_entropy_bit: block.header.stake_entropy_bit(block.header.time),
            kernel,
            transaction_count: block.transaction_count(),
            weight: block.weight(),
            exceeds_max_weight: exceeds_max_weight(block, network.consensus_params()),
            signature_len: block.signature.len(),
            signature_valid: block.verify_signature(proof_of_stake),
            merkle_root_valid: block.check_merkle_root(),
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_tracing(&args)?;

    let input = match (&args.hex, &args.file) {
        (Some(hex), None) => hex.clone(),
        (None, Some(path)) => {
            debug!(path = %path.display(), "Reading block from file");
            std::fs::read_to_string(path)?
        }
        _ => return Err("Provide a hex-encoded block or --file".into()),
    };
    let bytes = hex::decode(input.trim())?;

    let params = args.network.consensus_params();
    let ctx = SerializationContext::network(params.protocol_version).with_header_only(args.header_only);
    info!(
        network = %args.network,
        header_only = args.header_only,
        len = bytes.len(),
        "Decoding block"
    );

    let block: Block = deserialize_with(&bytes, &ctx)?;
    block.header.trace_stake_entropy_bit(block.header.time);
    let summary = BlockSummary::new(&block, args.network)?;
    if !summary.merkle_root_valid && !block.transactions.is_empty() {
        warn!(block_hash = %summary.block_hash, "Merkle root does not match transactions");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn init_tracing(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let level = match args.log_level.as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => {
            eprintln!(
                "Invalid log level: {}. Using 'warn' as default.",
                args.log_level
            );
            tracing::Level::WARN
        }
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr()) && !args.no_color;

    // Logs go to stderr so stdout carries only the JSON summary.
    let subscriber = Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_level(true)
            .with_target(true)
            .with_thread_ids(args.verbose)
            .with_thread_names(args.verbose)
            .with_ansi(use_ansi)
            .with_file(args.verbose)
            .with_line_number(args.verbose)
            .with_timer(ChronoUtc::rfc_3339()),
    );

    subscriber.try_init()?;

    Ok(())
}
