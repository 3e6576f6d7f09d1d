//! A [`CloudProvider`] backed by an account inventory file.
//!
//! The inventory is a JSON or YAML snapshot of one account. Listings are
//! served in pages of `page_size` so pagination behaves as it does against a
//! live account, and the `faults` table injects provider errors:
//!
//! ```yaml
//! faults:
//!   list_snapshots: "throttled"          # fails the whole listing
//!   "cpu:i-0abc": "metric query denied"  # fails one lookup
//!   snap-0123: "access denied"           # fails every lookup of that id
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::CloudProvider;
use crate::engine::Page;
use crate::errors::AuditError;
use crate::models::resources::*;

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub create_volume_permissions: Vec<VolumePermission>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryInstance {
    #[serde(flatten)]
    pub instance: Instance,
    /// Average CPU over the audit window; absent means no datapoints.
    pub average_cpu: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryBucket {
    #[serde(flatten)]
    pub bucket: Bucket,
    /// Home region; absent means the inventory's region.
    pub region: Option<String>,
    pub objects: Vec<ObjectSummary>,
    pub lifecycle: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryRepository {
    #[serde(flatten)]
    pub repository: Repository,
    /// Policy document, either as text or inline.
    pub policy: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub region: Option<String>,
    pub page_size: Option<usize>,
    pub account: AccountIdentity,
    pub snapshots: Vec<InventorySnapshot>,
    pub security_groups: Vec<SecurityGroup>,
    pub instances: Vec<InventoryInstance>,
    pub reserved_instances: Vec<ReservedInstance>,
    pub addresses: Vec<ElasticIp>,
    pub subnets: Vec<Subnet>,
    pub volumes: Vec<Volume>,
    pub functions: Vec<LambdaFunction>,
    pub db_instances: Vec<DbInstance>,
    pub buckets: Vec<InventoryBucket>,
    pub tables: Vec<TableDescription>,
    pub repositories: Vec<InventoryRepository>,
    pub service_quotas: Vec<ServiceQuota>,
    pub faults: HashMap<String, String>,
}

impl Inventory {
    /// Load an inventory, choosing the format by file extension.
    pub async fn load(path: &Path) -> Result<Self, AuditError> {
        if !path.exists() {
            return Err(AuditError::Inventory(format!(
                "Inventory file not found: {}",
                path.display()
            )));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let inventory = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        info!(
            path = %path.display(),
            snapshots = inventory.snapshots.len(),
            instances = inventory.instances.len(),
            buckets = inventory.buckets.len(),
            "Loaded inventory"
        );
        Ok(inventory)
    }

    pub fn from_json(content: &str) -> Result<Self, AuditError> {
        serde_json::from_str(content)
            .map_err(|e| AuditError::Inventory(format!("Invalid JSON inventory: {e}")))
    }

    pub fn from_yaml(content: &str) -> Result<Self, AuditError> {
        serde_yaml::from_str(content)
            .map_err(|e| AuditError::Inventory(format!("Invalid YAML inventory: {e}")))
    }
}

pub struct InventoryProvider {
    inventory: Inventory,
    region: String,
    page_size: usize,
}

impl InventoryProvider {
    /// Serve `inventory` as the contents of `region`.
    pub fn new(inventory: Inventory, region: impl Into<String>) -> Self {
        let page_size = inventory.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        Self {
            inventory,
            region: region.into(),
            page_size,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Injected failure for listing `operation`.
    fn list_fault(&self, operation: &str) -> Result<(), AuditError> {
        match self.inventory.faults.get(operation) {
            Some(message) => Err(AuditError::Provider(message.clone())),
            None => Ok(()),
        }
    }

    /// Injected failure for a lookup of `id`, by `operation:id` or bare `id`.
    fn lookup_fault(&self, operation: &str, id: &str) -> Result<(), AuditError> {
        let scoped = format!("{operation}:{id}");
        match self
            .inventory
            .faults
            .get(&scoped)
            .or_else(|| self.inventory.faults.get(id))
        {
            Some(message) => Err(AuditError::Provider(message.clone())),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(
        &self,
        operation: &str,
        items: &[T],
        cursor: Option<String>,
    ) -> Result<Page<T>, AuditError> {
        self.list_fault(operation)?;
        let start = match cursor {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| AuditError::Provider(format!("invalid pagination token '{c}'")))?,
        };
        let start = start.min(items.len());
        let end = (start + self.page_size).min(items.len());
        let next_cursor = (end < items.len()).then(|| end.to_string());
        debug!(operation, start, end, total = items.len(), "Serving inventory page");
        Ok(Page {
            items: items[start..end].to_vec(),
            next_cursor,
        })
    }

    fn find_bucket(&self, name: &str) -> Result<&InventoryBucket, AuditError> {
        self.inventory
            .buckets
            .iter()
            .find(|b| b.bucket.name.as_deref() == Some(name))
            .ok_or_else(|| AuditError::Provider(format!("NoSuchBucket: {name}")))
    }

    fn check_bucket_region(&self, bucket: &InventoryBucket, name: &str) -> Result<(), AuditError> {
        match bucket.region.as_deref() {
            Some(home) if home != self.region => Err(AuditError::WrongRegion {
                resource: name.to_string(),
                region: Some(home.to_string()),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CloudProvider for InventoryProvider {
    fn provider_name(&self) -> &str {
        "inventory"
    }

    async fn account_identity(&self) -> Result<AccountIdentity, AuditError> {
        self.list_fault("account_identity")?;
        Ok(self.inventory.account.clone())
    }

    async fn list_snapshots(&self, cursor: Option<String>) -> Result<Page<Snapshot>, AuditError> {
        let snapshots: Vec<Snapshot> = self
            .inventory
            .snapshots
            .iter()
            .map(|s| s.snapshot.clone())
            .collect();
        self.page("list_snapshots", &snapshots, cursor)
    }

    async fn snapshot_volume_permissions(
        &self,
        snapshot_id: &str,
    ) -> Result<Vec<VolumePermission>, AuditError> {
        self.lookup_fault("permissions", snapshot_id)?;
        self.inventory
            .snapshots
            .iter()
            .find(|s| s.snapshot.snapshot_id.as_deref() == Some(snapshot_id))
            .map(|s| s.create_volume_permissions.clone())
            .ok_or_else(|| {
                AuditError::Provider(format!("InvalidSnapshot.NotFound: {snapshot_id}"))
            })
    }

    async fn list_security_groups(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SecurityGroup>, AuditError> {
        self.page("list_security_groups", &self.inventory.security_groups, cursor)
    }

    async fn list_instances(&self, cursor: Option<String>) -> Result<Page<Instance>, AuditError> {
        let instances: Vec<Instance> = self
            .inventory
            .instances
            .iter()
            .map(|i| i.instance.clone())
            .collect();
        self.page("list_instances", &instances, cursor)
    }

    async fn list_reserved_instances(&self) -> Result<Vec<ReservedInstance>, AuditError> {
        self.list_fault("list_reserved_instances")?;
        Ok(self.inventory.reserved_instances.clone())
    }

    async fn average_cpu_utilization(
        &self,
        instance_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Option<f64>, AuditError> {
        self.lookup_fault("cpu", instance_id)?;
        Ok(self
            .inventory
            .instances
            .iter()
            .find(|i| i.instance.instance_id.as_deref() == Some(instance_id))
            .and_then(|i| i.average_cpu))
    }

    async fn list_addresses(&self) -> Result<Vec<ElasticIp>, AuditError> {
        self.list_fault("list_addresses")?;
        Ok(self.inventory.addresses.clone())
    }

    async fn list_subnets(&self, cursor: Option<String>) -> Result<Page<Subnet>, AuditError> {
        self.page("list_subnets", &self.inventory.subnets, cursor)
    }

    async fn list_volumes(&self, cursor: Option<String>) -> Result<Page<Volume>, AuditError> {
        self.page("list_volumes", &self.inventory.volumes, cursor)
    }

    async fn list_functions(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<LambdaFunction>, AuditError> {
        self.page("list_functions", &self.inventory.functions, cursor)
    }

    async fn list_db_instances(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<DbInstance>, AuditError> {
        self.page("list_db_instances", &self.inventory.db_instances, cursor)
    }

    async fn list_buckets(&self) -> Result<Vec<Bucket>, AuditError> {
        self.list_fault("list_buckets")?;
        Ok(self
            .inventory
            .buckets
            .iter()
            .map(|b| b.bucket.clone())
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectSummary>, AuditError> {
        let entry = self.find_bucket(bucket)?;
        self.check_bucket_region(entry, bucket)?;
        self.lookup_fault("objects", bucket)?;
        Ok(entry.objects.iter().take(max_keys).cloned().collect())
    }

    async fn bucket_has_lifecycle(&self, bucket: &str) -> Result<bool, AuditError> {
        let entry = self.find_bucket(bucket)?;
        self.check_bucket_region(entry, bucket)?;
        self.lookup_fault("lifecycle", bucket)?;
        Ok(entry.lifecycle)
    }

    async fn list_tables(&self, cursor: Option<String>) -> Result<Page<String>, AuditError> {
        let names: Vec<String> = self
            .inventory
            .tables
            .iter()
            .filter_map(|t| t.table_name.clone())
            .collect();
        self.page("list_tables", &names, cursor)
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, AuditError> {
        self.lookup_fault("describe_table", table_name)?;
        self.inventory
            .tables
            .iter()
            .find(|t| t.table_name.as_deref() == Some(table_name))
            .cloned()
            .ok_or_else(|| AuditError::Provider(format!("ResourceNotFoundException: {table_name}")))
    }

    async fn list_repositories(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<Repository>, AuditError> {
        let repositories: Vec<Repository> = self
            .inventory
            .repositories
            .iter()
            .map(|r| r.repository.clone())
            .collect();
        self.page("list_repositories", &repositories, cursor)
    }

    async fn repository_policy(
        &self,
        repository_name: &str,
    ) -> Result<Option<String>, AuditError> {
        self.lookup_fault("policy", repository_name)?;
        let entry = self
            .inventory
            .repositories
            .iter()
            .find(|r| r.repository.repository_name.as_deref() == Some(repository_name))
            .ok_or_else(|| {
                AuditError::Provider(format!("RepositoryNotFoundException: {repository_name}"))
            })?;
        Ok(match &entry.policy {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(document) => Some(serde_json::to_string(document)?),
        })
    }

    async fn list_service_quotas(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<ServiceQuota>, AuditError> {
        self.page("list_service_quotas", &self.inventory.service_quotas, cursor)
    }

    async fn service_quota(
        &self,
        service_code: &str,
        quota_code: &str,
    ) -> Result<Option<ServiceQuota>, AuditError> {
        self.lookup_fault("quota", quota_code)?;
        Ok(self
            .inventory
            .service_quotas
            .iter()
            .find(|q| {
                q.service_code.as_deref() == Some(service_code)
                    && q.quota_code.as_deref() == Some(quota_code)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collect_pages;

    fn inventory() -> Inventory {
        Inventory::from_yaml(
            r#"
region: us-east-1
account:
  account_id: "123456789012"
  aliases: [prod]
snapshots:
  - snapshot_id: snap-1
    create_volume_permissions: [{ group: all }]
  - snapshot_id: snap-2
subnets:
  - { subnet_id: subnet-a, cidr_block: 10.0.0.0/16 }
  - { subnet_id: subnet-b, cidr_block: 10.1.0.0/16 }
  - { subnet_id: subnet-c, cidr_block: 10.2.0.0/16 }
buckets:
  - name: local
    objects: [{ key: a, storage_class: STANDARD }]
    lifecycle: true
  - name: remote
    region: eu-west-1
repositories:
  - repository_name: inline
    policy: { Statement: [{ Effect: Allow, Principal: "*" }] }
  - repository_name: none
faults:
  "permissions:snap-2": "access denied"
  list_volumes: "throttled"
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pages_are_served_in_order() {
        let provider = InventoryProvider::new(inventory(), "us-east-1").with_page_size(2);
        let first = provider.list_subnets(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));
        let second = provider.list_subnets(first.next_cursor).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_collect_pages_over_inventory() {
        let provider = InventoryProvider::new(inventory(), "us-east-1").with_page_size(1);
        let subnets = collect_pages("subnets", None, |c| provider.list_subnets(c))
            .await
            .unwrap();
        assert_eq!(subnets.len(), 3);
    }

    #[tokio::test]
    async fn test_list_fault_fails_listing() {
        let provider = InventoryProvider::new(inventory(), "us-east-1");
        let err = provider.list_volumes(None).await.unwrap_err();
        assert!(err.to_string().contains("throttled"));
    }

    #[tokio::test]
    async fn test_lookup_fault_is_scoped_to_operation() {
        let provider = InventoryProvider::new(inventory(), "us-east-1");
        assert_eq!(
            provider.snapshot_volume_permissions("snap-1").await.unwrap().len(),
            1
        );
        assert!(provider.snapshot_volume_permissions("snap-2").await.is_err());
    }

    #[tokio::test]
    async fn test_bucket_in_other_region() {
        let provider = InventoryProvider::new(inventory(), "us-east-1");
        assert!(provider.bucket_has_lifecycle("local").await.unwrap());
        let err = provider.list_objects("remote", 100).await.unwrap_err();
        assert!(matches!(err, AuditError::WrongRegion { .. }));
    }

    #[tokio::test]
    async fn test_inline_policy_is_serialized() {
        let provider = InventoryProvider::new(inventory(), "us-east-1");
        let policy = provider.repository_policy("inline").await.unwrap().unwrap();
        assert!(policy.contains("\"Principal\":\"*\""));
        assert!(provider.repository_policy("none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_cursor() {
        let provider = InventoryProvider::new(inventory(), "us-east-1");
        assert!(provider.list_subnets(Some("x".into())).await.is_err());
    }

    #[test]
    fn test_bad_inventory_is_inventory_error() {
        let err = Inventory::from_json("{not json").unwrap_err();
        assert!(matches!(err, AuditError::Inventory(_)));
    }
}
