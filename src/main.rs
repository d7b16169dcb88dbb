//! Falchion - UCI Chess Engine
//!
//! By default the engine reads UCI commands from stdin and writes
//! responses to stdout, compatible with any UCI chess GUI (Arena,
//! CuteChess, etc.). The `bench` and `perft` subcommands run their
//! workloads directly and exit.

use anyhow::Result;
use clap::{Parser, Subcommand};

use falchion::perft;
use falchion::position::Position;
use falchion::uci::{self, UCIProtocol};

#[derive(Parser, Debug)]
#[command(name = "falchion", version, about = "UCI chess engine", long_about = None)]
struct Args {
    /// Transposition table size in megabytes
    #[arg(long, default_value_t = 32)]
    hash: usize,

    /// Search worker threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the benchmark suite to a fixed depth
    Bench {
        #[arg(long, default_value_t = 8)]
        depth: i32,
        /// Worker threads; defaults to the machine's core count
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Count legal move paths from a position
    Perft {
        #[arg(long, default_value_t = 6)]
        depth: u32,
        /// FEN string or 'startpos'
        #[arg(long, default_value = "startpos")]
        fen: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::info!(
        "starting with hash {} MB, {} thread(s)",
        args.hash,
        args.threads
    );
    match args.command {
        Some(Command::Bench { depth, threads }) => {
            let threads = threads.unwrap_or_else(num_cpus::get);
            perft::run_bench(depth, args.hash, threads)?;
        }
        Some(Command::Perft { depth, fen }) => {
            let mut pos = if fen == "startpos" {
                Position::new()
            } else {
                Position::from_fen(&fen)?
            };
            perft::run_perft(&mut pos, depth);
        }
        None => {
            println!("{}", uci::engine_info());
            let mut protocol = UCIProtocol::new(args.hash, args.threads);
            protocol.run();
        }
    }
    Ok(())
}
