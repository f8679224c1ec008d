//! filecrypt - encrypt and decrypt files or directory trees in place.
//!
//! AES-256-CBC with keys from a raw key file or a password (PBKDF2).

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use filecrypt::{BatchReport, Engine, EngineConfig, KeySource, Operation, Outcome, Target};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Key file used when `--key` is not given.
const DEFAULT_KEY_FILE: &str = ".encryption_key";

#[derive(Parser)]
#[command(name = "filecrypt")]
#[command(
    author,
    version,
    about = "Encrypt and decrypt files or directories with AES-256",
    long_about = "Encrypts files in place with AES-256-CBC. Keys come from a raw 32-byte key file or are derived from a password with PBKDF2-HMAC-SHA256."
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the PBKDF2 iteration count
    #[arg(long, global = true)]
    iterations: Option<u32>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random 256-bit key file
    Keygen {
        /// Where to write the key (default: ~/.encryption_key)
        #[arg(long)]
        key_path: Option<PathBuf>,
    },

    /// Encrypt a file or every file in a directory
    Encrypt(TransformArgs),

    /// Decrypt a file or every file in a directory
    Decrypt(TransformArgs),
}

#[derive(Args)]
struct TransformArgs {
    /// Single file to process
    #[arg(long, conflicts_with = "directory", required_unless_present = "directory")]
    file: Option<PathBuf>,

    /// Directory to process recursively
    #[arg(long, conflicts_with = "file")]
    directory: Option<PathBuf>,

    /// Key file (default: ~/.encryption_key)
    #[arg(long, conflicts_with = "password")]
    key: Option<PathBuf>,

    /// Derive the key from a password (prompted)
    #[arg(long)]
    password: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(iterations) = cli.iterations {
        config = config.with_iterations(iterations);
    }
    let engine = Engine::new(config)?;

    let operation = match cli.command {
        Commands::Keygen { key_path } => Operation::GenerateKey {
            path: key_path.map_or_else(default_key_path, Ok)?,
        },
        Commands::Encrypt(args) => {
            let (target, key) = transform_inputs(args, true)?;
            Operation::Encrypt { target, key }
        }
        Commands::Decrypt(args) => {
            let (target, key) = transform_inputs(args, false)?;
            Operation::Decrypt { target, key }
        }
    };

    let outcome = engine.run(operation)?;
    report(&outcome);
    Ok(outcome.is_success())
}

fn transform_inputs(args: TransformArgs, confirm: bool) -> anyhow::Result<(Target, KeySource)> {
    let target = match (args.file, args.directory) {
        (Some(file), None) => Target::File(file),
        (None, Some(dir)) => Target::Directory(dir),
        _ => bail!("specify exactly one of --file or --directory"),
    };

    let key = if args.password {
        KeySource::password(prompt_new_or_existing(confirm)?)
    } else {
        let path = args.key.map_or_else(default_key_path, Ok)?;
        KeySource::key_file(path)
    };

    Ok((target, key))
}

fn default_key_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(DEFAULT_KEY_FILE))
}

fn prompt_new_or_existing(confirm: bool) -> anyhow::Result<String> {
    let password = rpassword::prompt_password("Password: ").context("reading password")?;
    if confirm {
        let again = rpassword::prompt_password("Confirm password: ").context("reading password")?;
        if password != again {
            bail!("passwords do not match");
        }
    }
    Ok(password)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::KeyGenerated(path) => {
            println!("Key has been generated and saved to '{}'", path.display());
        }
        Outcome::File(path) => println!("Done: {}", path.display()),
        Outcome::Directory(report) => print_batch(report),
    }
}

fn print_batch(report: &BatchReport) {
    println!("{} {}", report.op, report.root.display());
    println!("  Succeeded:  {}", report.succeeded.len());
    println!("  Skipped:    {}", report.skipped.len());
    println!("  Failed:     {}", report.failed.len());

    if !report.failed.is_empty() {
        println!();
        println!("Failures:");
        for failure in &report.failed {
            println!("  {}: {}", failure.path.display(), failure.error);
        }
    }
}
