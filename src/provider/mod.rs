//! The boundary between audits and the cloud account they inspect.

pub mod inventory;
pub mod runtimes;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::Page;
use crate::errors::AuditError;
use crate::models::resources::*;

/// Quota code of the Lambda code-storage limit.
pub const LAMBDA_CODE_STORAGE_QUOTA: (&str, &str) = ("lambda", "L-2ACBD22F");

/// Read-only access to one account and region.
///
/// Listing calls are cursor-paginated: pass `None` for the first page and the
/// previous page's `next_cursor` afterwards. Per-resource lookups return
/// [`AuditError::Provider`] (or a more specific resource-scoped variant) on
/// failure; callers decide whether that is fatal.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn account_identity(&self) -> Result<AccountIdentity, AuditError>;

    /// Snapshots owned by the calling account.
    async fn list_snapshots(&self, cursor: Option<String>) -> Result<Page<Snapshot>, AuditError>;

    async fn snapshot_volume_permissions(
        &self,
        snapshot_id: &str,
    ) -> Result<Vec<VolumePermission>, AuditError>;

    async fn list_security_groups(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SecurityGroup>, AuditError>;

    async fn list_instances(&self, cursor: Option<String>) -> Result<Page<Instance>, AuditError>;

    async fn list_reserved_instances(&self) -> Result<Vec<ReservedInstance>, AuditError>;

    /// Average CPU utilization over `[start, end)`; `None` when no datapoints exist.
    async fn average_cpu_utilization(
        &self,
        instance_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, AuditError>;

    async fn list_addresses(&self) -> Result<Vec<ElasticIp>, AuditError>;

    async fn list_subnets(&self, cursor: Option<String>) -> Result<Page<Subnet>, AuditError>;

    async fn list_volumes(&self, cursor: Option<String>) -> Result<Page<Volume>, AuditError>;

    async fn list_functions(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<LambdaFunction>, AuditError>;

    async fn list_db_instances(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<DbInstance>, AuditError>;

    async fn list_buckets(&self) -> Result<Vec<Bucket>, AuditError>;

    /// Up to `max_keys` objects of `bucket`. A bucket homed in another region
    /// fails with [`AuditError::WrongRegion`].
    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectSummary>, AuditError>;

    /// Whether `bucket` carries a lifecycle configuration.
    async fn bucket_has_lifecycle(&self, bucket: &str) -> Result<bool, AuditError>;

    async fn list_tables(&self, cursor: Option<String>) -> Result<Page<String>, AuditError>;

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, AuditError>;

    async fn list_repositories(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<Repository>, AuditError>;

    /// Repository policy text; `None` when no policy is attached.
    async fn repository_policy(&self, repository_name: &str)
        -> Result<Option<String>, AuditError>;

    async fn list_service_quotas(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<ServiceQuota>, AuditError>;

    async fn service_quota(
        &self,
        service_code: &str,
        quota_code: &str,
    ) -> Result<Option<ServiceQuota>, AuditError>;
}

pub use inventory::{Inventory, InventoryProvider};
pub use runtimes::fetch_deprecated_runtimes;
