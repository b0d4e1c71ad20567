//! inventory - inspect and edit the scanner's inventory store

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use parts_scanner::inventory::open_store;
use parts_scanner::{Fault, ScannerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the scanner TOML config
    #[arg(long, env = "SCANNER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every component with its quantity
    List,
    /// Show the quantity of one component
    Get { name: String },
    /// Overwrite the quantity of one component
    Set { name: String, qty: i64 },
    /// Add (or with a negative delta, remove) units
    Add {
        name: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = ScannerConfig::load(args.config.as_deref())?;
    let mut store = open_store(&config.inventory).context(Fault::Inventory)?;

    match args.command {
        Command::List => {
            let rows = store.list().context(Fault::Inventory)?;
            if rows.is_empty() {
                println!("(empty)");
            }
            let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, qty) in rows {
                println!("{:<width$}  {}", name, qty, width = width);
            }
        }
        Command::Get { name } => {
            let qty = store.read_qty(&name).context(Fault::Inventory)?;
            println!("{}: {}", name, qty);
        }
        Command::Set { name, qty } => {
            if qty < 0 {
                bail!("quantity must be >= 0, got {}", qty);
            }
            let stored = store.write_qty(&name, qty).context(Fault::Inventory)?;
            println!("{}: {}", name, stored);
        }
        Command::Add { name, delta } => {
            let stored = store.adjust_qty(&name, delta).context(Fault::Inventory)?;
            println!("{}: {}", name, stored);
        }
    }
    Ok(())
}
