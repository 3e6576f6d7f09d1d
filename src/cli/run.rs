use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::cli::commands::RunArgs;
use crate::config::{self, parse_check_list, AuditConfig, AuditSettings, OutputFormat};
use crate::errors::AuditError;
use crate::pipeline::AuditOrchestrator;
use crate::progress;
use crate::provider::{Inventory, InventoryProvider};
use crate::reporting::{format_json_report, format_text_report};

pub async fn handle_run(args: RunArgs, quiet: bool) -> Result<(), AuditError> {
    let audit_config = match args.config {
        Some(ref path) => config::parse_config(path).await?,
        None => AuditConfig::default(),
    };
    let inventory = Inventory::load(&args.inventory).await?;
    let settings = resolve_settings(&args, &audit_config, &inventory)?;

    info!(
        region = %settings.region,
        audits = settings.checks.len(),
        sample_cap = settings.sample_cap,
        "Starting audit run"
    );

    let provider = Arc::new(InventoryProvider::new(inventory, settings.region.clone()));
    let mut orchestrator = AuditOrchestrator::new(provider, settings.clone());

    let show_progress = !quiet && settings.output_format == OutputFormat::Text;
    let consumer = if show_progress {
        let (tx, rx) = mpsc::unbounded_channel();
        orchestrator = orchestrator.with_event_channel(tx);
        Some(tokio::spawn(progress::consume(rx)))
    } else {
        None
    };

    let result = orchestrator.run().await;
    // Dropping the orchestrator closes the channel so the consumer can finish.
    drop(orchestrator);
    if let Some(handle) = consumer {
        let _ = handle.await;
    }
    let report = result?;

    match settings.output_format {
        OutputFormat::Text => print!("{}", format_text_report(&report, settings.bar_width)),
        OutputFormat::Json => println!("{}", format_json_report(&report)?),
    }

    if let Some(ref path) = args.output {
        tokio::fs::write(path, format_json_report(&report)?).await?;
        info!(path = %path.display(), "Report written");
    }
    Ok(())
}

/// Merge config file, inventory and command-line values into run settings.
///
/// Region precedence: `--region`, then the config file, then the inventory.
pub fn resolve_settings(
    args: &RunArgs,
    audit_config: &AuditConfig,
    inventory: &Inventory,
) -> Result<AuditSettings, AuditError> {
    let mut settings = AuditSettings::from_config(audit_config);

    if let Some(ref region) = args.region {
        settings.region = region.clone();
    } else if audit_config.region.is_none() {
        if let Some(ref region) = inventory.region {
            settings.region = region.clone();
        }
    }
    if let Some(ref raw) = args.checks {
        let mut checks = parse_check_list(raw)?;
        checks.sort();
        checks.dedup();
        settings.checks = checks;
    }
    if let Some(cap) = args.sample_cap {
        settings.sample_cap = cap;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }

    config::validate_settings(&settings)?;
    Ok(settings)
}
