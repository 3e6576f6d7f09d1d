use tracing::info;

use super::AuditContext;
use crate::config::region_name;
use crate::errors::AuditError;
use crate::models::report::AccountInformation;

pub const NO_ALIAS: &str = "N/A";

pub async fn describe_account(ctx: &AuditContext) -> Result<AccountInformation, AuditError> {
    let identity = ctx.provider.account_identity().await?;
    let account_id = identity
        .account_id
        .ok_or_else(|| AuditError::Provider("caller identity carried no account id".into()))?;
    let account_alias = identity
        .aliases
        .into_iter()
        .next()
        .unwrap_or_else(|| NO_ALIAS.to_string());
    let region_code = ctx.settings.region.clone();

    info!(account_id = %account_id, region = %region_code, "Resolved account");
    Ok(AccountInformation {
        region_name: region_name(&region_code).to_string(),
        account_id,
        account_alias,
        region_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[tokio::test]
    async fn test_alias_and_region_name() {
        let ctx = context("account: { account_id: '111122223333', aliases: [prod, other] }\n");
        let info = describe_account(&ctx).await.unwrap();
        assert_eq!(info.account_id, "111122223333");
        assert_eq!(info.account_alias, "prod");
        assert_eq!(info.region_name, "US East (N. Virginia)");
    }

    #[tokio::test]
    async fn test_missing_alias_is_na() {
        let ctx = context("account: { account_id: '111122223333' }\n");
        assert_eq!(describe_account(&ctx).await.unwrap().account_alias, "N/A");
    }

    #[tokio::test]
    async fn test_missing_account_id_is_error() {
        let ctx = context("account: {}\n");
        assert!(describe_account(&ctx).await.is_err());
    }
}
