//! scanner - identify components on camera and book them into the inventory
//!
//! This binary:
//! 1. Loads configuration (file, then SCANNER_* overrides)
//! 2. Opens the inventory store and the classifier
//! 3. Runs the scanner loop until Ctrl-C, `q` on the detail panel, or
//!    `--max-frames`

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use parts_scanner::detail::{
    spawn_stdin_reader, AutoAdjust, InventoryHandler, TerminalDetailView,
};
use parts_scanner::detect::build_classifier;
use parts_scanner::ingest::open_source;
use parts_scanner::inventory::open_store;
use parts_scanner::overlay::{NullPreview, Preview};
use parts_scanner::ui::Ui;
use parts_scanner::{Classifier, Fault, QuitSignal, Scanner, ScannerConfig, ScannerOptions};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the scanner TOML config
    #[arg(long, env = "SCANNER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// Book every confirmation automatically instead of opening the panel
    #[arg(long)]
    headless: bool,
    /// Quantity booked per confirmation in headless mode
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    delta: i64,
    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let is_tty = std::io::stderr().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty);

    let config = {
        let _stage = ui.stage("Load configuration");
        ScannerConfig::load(args.config.as_deref())?
    };
    let (classifier, policy) = {
        let _stage = ui.stage("Load model");
        let labels = config.load_labels().context(Fault::Configuration)?;
        let policy = config.detection_policy(&labels)?;
        let classifier = build_classifier(&config.model, labels).context(Fault::Inference)?;
        (classifier, policy)
    };
    let store = {
        let _stage = ui.stage("Open inventory");
        open_store(&config.inventory).context(Fault::Inventory)?
    };
    log::info!(
        "scanner: backend={}, threshold={}, confirm_frames={}, valid={:?}",
        classifier.name(),
        policy.threshold(),
        policy.confirm_frames(),
        policy.valid_classes()
    );

    let quit = QuitSignal::new();
    quit.install_ctrlc()?;

    let handler: Box<dyn InventoryHandler> = if args.headless {
        Box::new(AutoAdjust::new(store, config.catalog.clone(), args.delta))
    } else {
        Box::new(TerminalDetailView::new(
            store,
            config.catalog.clone(),
            spawn_stdin_reader(),
            Box::new(std::io::stdout()),
            quit.handle(),
        ))
    };
    let preview: Box<dyn Preview> = if args.headless {
        Box::new(NullPreview)
    } else {
        Box::new(ui.status_preview())
    };

    let camera = open_source(&config.camera).context(Fault::Acquisition)?;
    let options = ScannerOptions::from_config(&config, args.max_frames);
    let mut scanner = Scanner::new(camera, classifier, handler, preview, policy, quit, options);
    let summary = scanner.run()?;

    println!(
        "scanned {} frames, {} confirmations ({:?})",
        summary.frames, summary.confirmations, summary.stop
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_reads_scanner_config_env() {
        std::env::set_var("SCANNER_CONFIG", "/etc/scanner/bench.toml");

        let args = Args::try_parse_from(["scanner"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/scanner/bench.toml")));

        let args = Args::try_parse_from(["scanner", "--config", "local.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("local.toml")));

        std::env::remove_var("SCANNER_CONFIG");
    }
}
