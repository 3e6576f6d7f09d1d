use crate::cli::commands::ValidateArgs;
use crate::config::{self, AuditSettings};
use crate::errors::AuditError;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), AuditError> {
    let audit_config = config::parse_config(&args.config).await?;
    let settings = AuditSettings::from_config(&audit_config);
    println!("Configuration is valid: {}", args.config.display());
    println!(
        "  region {} | {} audits | sample cap {} | concurrency {}",
        settings.region,
        settings.checks.len(),
        settings.sample_cap,
        settings.concurrency
    );
    Ok(())
}
