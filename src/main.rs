//! shardsync CLI - content-addressed directory snapshots

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shardsync::ops::{push, verify, PushOptions};
use shardsync::{hash_file, scan, Config, Hash, HashAlgorithm, Snapshot, Store};

#[derive(Parser)]
#[command(name = "shardsync")]
#[command(about = "content-addressed directory snapshots with a sharded object store")]
#[command(version)]
struct Cli {
    /// store path
    #[arg(short, long, env = "SHARDSYNC_STORE", default_value = ".")]
    store: PathBuf,

    /// increase log verbosity (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// initialize a new store
    Init {
        /// digest for new content: md5 or sha1
        #[arg(long, default_value = "sha1")]
        algorithm: HashAlgorithm,

        /// seconds between lock attempts, 0 to wait until interrupted
        #[arg(long, default_value_t = 5)]
        poll_interval: u64,
    },

    /// print the snapshot listing of a directory
    Scan {
        dir: PathBuf,

        #[arg(long, default_value = "sha1")]
        algorithm: HashAlgorithm,
    },

    /// print the content hash of a file
    Hash {
        file: PathBuf,

        #[arg(long, default_value = "sha1")]
        algorithm: HashAlgorithm,
    },

    /// print the storage address of a hash
    Address { hash: String },

    /// parse a snapshot listing file ("-" for stdin)
    Check { file: PathBuf },

    /// snapshot a directory into the store under a label
    Push {
        source: PathBuf,

        label: String,

        /// only report what would be uploaded
        #[arg(long)]
        dry_run: bool,

        /// stop waiting for the store lock after this many seconds
        #[arg(long)]
        give_up_after: Option<u64>,
    },

    /// print the snapshot stored under a label
    Show { label: String },

    /// list labels
    Labels,

    /// check that all content of a labelled snapshot is present and intact
    Verify { label: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> shardsync::Result<ExitCode> {
    match cli.command {
        Commands::Init {
            algorithm,
            poll_interval,
        } => {
            let config = Config {
                algorithm,
                poll_interval_secs: poll_interval,
                ..Config::default()
            };
            Store::init(&cli.store, config)?;
            println!("initialized store at {}", cli.store.display());
        }

        Commands::Scan { dir, algorithm } => {
            let snapshot = scan(&dir, algorithm)?;
            write_stdout(&snapshot)?;
        }

        Commands::Hash { file, algorithm } => {
            println!("{}", hash_file(&file, algorithm)?);
        }

        Commands::Address { hash } => {
            let hash = Hash::from_hex(&hash)?;
            println!("{}", hash.storage_address());
        }

        Commands::Check { file } => {
            let snapshot = if file.as_os_str() == "-" {
                Snapshot::read_from(io::stdin().lock())?
            } else {
                let reader = File::open(&file).map_err(|source| shardsync::Error::Io {
                    path: file.clone(),
                    source,
                })?;
                Snapshot::read_from(BufReader::new(reader))?
            };
            println!(
                "{} entries, {} distinct hashes",
                snapshot.len(),
                snapshot.hashes().len()
            );
        }

        Commands::Push {
            source,
            label,
            dry_run,
            give_up_after,
        } => {
            let store = Store::open(&cli.store)?;
            let waiter = Arc::new(store.config().waiter());
            if let Some(secs) = give_up_after {
                let waiter = Arc::clone(&waiter);
                thread::spawn(move || {
                    thread::sleep(Duration::from_secs(secs));
                    waiter.stop();
                });
            }

            let result = push(&store, &source, &label, &waiter, &PushOptions { dry_run })?;
            if dry_run {
                println!(
                    "would upload {} objects ({} entries, {} already stored)",
                    result.uploaded, result.entries, result.skipped
                );
            } else {
                println!(
                    "{}: uploaded {} objects ({} entries, {} already stored)",
                    label, result.uploaded, result.entries, result.skipped
                );
            }
        }

        Commands::Show { label } => {
            let store = Store::open(&cli.store)?;
            write_stdout(&store.get_snapshot(&label)?)?;
        }

        Commands::Labels => {
            let store = Store::open(&cli.store)?;
            for label in store.list_labels()? {
                println!("{}", label);
            }
        }

        Commands::Verify { label } => {
            let store = Store::open(&cli.store)?;
            let report = verify(&store, &label)?;
            for hash in &report.missing {
                println!("missing {}", hash);
            }
            for hash in &report.corrupt {
                println!("corrupt {}", hash);
            }
            println!("{}", report);
            if !report.is_ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn write_stdout(snapshot: &Snapshot) -> shardsync::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    snapshot
        .write_to(&mut out)
        .and_then(|_| out.flush())
        .map_err(|source| shardsync::Error::Io {
            path: "/dev/stdout".into(),
            source,
        })
}
