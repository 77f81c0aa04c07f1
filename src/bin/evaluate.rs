use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use ecoexlab::utils::logger;
use ecoexlab::{summarize, Chronicle};

#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Inspect and re-evaluate a stored experiment chronicle")]
struct Args {
    /// Path to a chronicle.json file or an output directory containing one
    path: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    let path = chronicle_path(&args.path);
    tracing::info!("📖 Loading chronicle from: {}", path.display());

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read chronicle {}", path.display()))?;
    let chronicle = Chronicle::from_json(&text)
        .with_context(|| format!("{} is not a valid chronicle", path.display()))?;

    println!("📋 Experiment Setup:");
    for (label, value) in chronicle.setup_table() {
        println!("  {:<24} {}", label, value);
    }
    println!();

    let evaluation = chronicle
        .evaluation()
        .context("the chronicle cannot be evaluated")?;
    println!("{}", summarize(&evaluation));

    Ok(())
}

/// Accepts either the chronicle file itself or the output directory the
/// experiment wrote it to.
fn chronicle_path(arg: &str) -> PathBuf {
    let path = Path::new(arg);
    if path.is_dir() {
        path.join("chronicle.json")
    } else {
        path.to_path_buf()
    }
}
