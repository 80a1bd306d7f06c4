//! UniverseKV WAL Inspector
//!
//! Verifies a log file offline and optionally dumps its entries. Never
//! modifies the file; must not be pointed at a log a running Store owns.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use universekv::wal::{self, EntryKind};

/// UniverseKV WAL Inspector
#[derive(Parser, Debug)]
#[command(name = "universekv-inspect")]
#[command(about = "Verify and dump a UniverseKV write-ahead log")]
#[command(version)]
struct Args {
    /// WAL file to inspect
    path: PathBuf,

    /// Print every entry as it is read
    #[arg(short, long)]
    dump: bool,

    /// Maximum number of value bytes shown per entry
    #[arg(long, default_value = "64")]
    max_value_bytes: usize,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,universekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("UniverseKV inspect v{}", universekv::VERSION);

    let result = wal::scan(&args.path, |offset, entry| {
        if !args.dump {
            return;
        }
        match entry.kind() {
            EntryKind::Set => {
                let value = entry.value();
                let shown = &value[..value.len().min(args.max_value_bytes)];
                println!(
                    "{:>10}  SET  {}  {} ({} bytes)",
                    offset,
                    entry.key(),
                    String::from_utf8_lossy(shown),
                    value.len()
                );
            }
            EntryKind::Delete => println!("{:>10}  DEL  {}", offset, entry.key()),
        }
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("file:          {}", args.path.display());
    println!("frames:        {}", report.frames());
    println!("  sets:        {}", report.sets);
    println!("  deletes:     {}", report.deletes);
    println!("  unknown:     {}", report.unknown_kinds);
    println!("valid bytes:   {} / {}", report.valid_bytes, report.file_bytes);

    match report.corruption {
        None => {
            println!("status:        clean");
            ExitCode::SUCCESS
        }
        Some(reason) => {
            println!("status:        CORRUPT at offset {}: {}", report.valid_bytes, reason);
            ExitCode::FAILURE
        }
    }
}
