use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{count_provider_failures, is_provider_failure, provider_failure, AuditContext, AuditResult};
use crate::engine::{aggregate_by, collect_pages, CheckOutcome, ResourceCheck};
use crate::errors::AuditError;
use crate::models::report::DynamoDbSection;
use crate::provider::CloudProvider;

const AUDIT: &str = "dynamodb";
pub const MAX_TABLES: usize = 500;
pub const PROVISIONED: &str = "provisioned";
pub const ON_DEMAND: &str = "on-demand";

/// Classifies a table's capacity mode from its provisioned write capacity.
pub struct CapacityModeCheck {
    provider: Arc<dyn CloudProvider>,
}

impl CapacityModeCheck {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ResourceCheck<String> for CapacityModeCheck {
    async fn check(&self, table: &String) -> CheckOutcome {
        let description = match self.provider.describe_table(table).await {
            Ok(d) => d,
            Err(e) => return provider_failure(table, "describe table", &e),
        };
        let write_capacity = description
            .provisioned_throughput
            .and_then(|t| t.write_capacity_units);
        match write_capacity {
            None => CheckOutcome::skipped(table.as_str(), "no provisioned throughput reported"),
            Some(0) => CheckOutcome::pass(table.as_str()).with_category(ON_DEMAND),
            Some(units) => CheckOutcome::pass(table.as_str())
                .with_category(PROVISIONED)
                .with_metric(units as f64),
        }
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<DynamoDbSection>, AuditError> {
    let tables = collect_pages("tables", Some(MAX_TABLES), |cursor| ctx.provider.list_tables(cursor)).await?;

    let batch = ctx
        .scanner(AUDIT, ctx.settings.concurrency)
        .scan(tables, Arc::new(CapacityModeCheck::new(ctx.provider.clone())))
        .await;

    let capacity_distribution = aggregate_by(&batch, |o| {
        if is_provider_failure(o) {
            None
        } else {
            o.category.clone()
        }
    });
    let count_of = |mode: &str| {
        capacity_distribution
            .iter()
            .find(|e| e.category == mode)
            .map(|e| e.count)
            .unwrap_or(0)
    };

    let section = DynamoDbSection {
        total_tables: batch.len(),
        provisioned_tables: count_of(PROVISIONED),
        on_demand_tables: count_of(ON_DEMAND),
        skipped: batch.counts().skipped,
        errors: count_provider_failures(&batch),
        capacity_distribution,
    };
    info!(
        tables = section.total_tables,
        provisioned = section.provisioned_tables,
        on_demand = section.on_demand_tables,
        "DynamoDB audit complete"
    );
    Ok(AuditResult::new(section, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[tokio::test]
    async fn test_capacity_distribution_excludes_skipped() {
        let ctx = context(
            r#"
tables:
  - { table_name: t1, provisioned_throughput: { write_capacity_units: 5 } }
  - { table_name: t2, provisioned_throughput: { write_capacity_units: 0 } }
  - { table_name: t3, provisioned_throughput: { write_capacity_units: 0 } }
  - { table_name: t4 }
  - { table_name: t5, provisioned_throughput: { write_capacity_units: 1 } }
faults:
  "describe_table:t5": "ThrottlingException"
"#,
        );
        let result = audit(&ctx).await.unwrap();
        let section = &result.section;
        assert_eq!(section.total_tables, 5);
        assert_eq!(section.skipped, 1);
        assert_eq!(section.errors, 1);
        assert_eq!(section.on_demand_tables, 2);
        assert_eq!(section.provisioned_tables, 1);
        let total: usize = section.capacity_distribution.iter().map(|e| e.count).sum();
        assert_eq!(total, 3);
        assert_eq!(section.capacity_distribution[0].category, ON_DEMAND);
    }

    #[tokio::test]
    async fn test_table_listing_is_capped() {
        let mut yaml = String::from("tables:\n");
        for i in 0..(MAX_TABLES + 20) {
            yaml.push_str(&format!("  - {{ table_name: t{i} }}\n"));
        }
        let result = audit(&context(&yaml)).await.unwrap();
        assert_eq!(result.section.total_tables, MAX_TABLES);
    }
}
