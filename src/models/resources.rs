//! Provider-shaped resource records.
//!
//! Every field a provider returns is optional; checks decide explicitly what
//! an absent value means for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Resource, UNKNOWN_RESOURCE_ID};

macro_rules! impl_resource {
    ($ty:ty, $field:ident) => {
        impl Resource for $ty {
            fn resource_id(&self) -> &str {
                self.$field.as_deref().unwrap_or(UNKNOWN_RESOURCE_ID)
            }
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountIdentity {
    pub account_id: Option<String>,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub snapshot_id: Option<String>,
    pub volume_size_gb: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
}
impl_resource!(Snapshot, snapshot_id);

/// One entry of a snapshot's create-volume permission list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumePermission {
    pub group: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityGroup {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub permissions: Vec<IpPermission>,
}

/// An inbound rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpPermission {
    pub protocol: Option<String>,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    /// IPv4 and IPv6 source ranges.
    pub ranges: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupRef {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataOptions {
    pub http_endpoint: Option<String>,
    pub http_tokens: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Instance {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub state: Option<String>,
    /// `spot` for spot instances; absent for on-demand.
    pub lifecycle: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    pub security_groups: Vec<GroupRef>,
    pub metadata_options: Option<MetadataOptions>,
}
impl_resource!(Instance, instance_id);

impl Instance {
    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some("running")
    }

    pub fn is_spot(&self) -> bool {
        self.lifecycle.as_deref() == Some("spot")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservedInstance {
    pub reserved_id: Option<String>,
    pub instance_type: Option<String>,
    pub availability_zone: Option<String>,
    pub instance_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticIp {
    pub public_ip: Option<String>,
    pub allocation_id: Option<String>,
    pub association_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subnet {
    pub subnet_id: Option<String>,
    pub vpc_id: Option<String>,
    pub cidr_block: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Volume {
    pub volume_id: Option<String>,
    pub size_gb: Option<i64>,
    pub state: Option<String>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaFunction {
    pub function_name: Option<String>,
    pub function_arn: Option<String>,
    pub runtime: Option<String>,
    pub code_size_bytes: Option<i64>,
}
impl_resource!(LambdaFunction, function_name);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbInstance {
    pub identifier: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub storage_encrypted: Option<bool>,
    pub storage_type: Option<String>,
    pub multi_az: Option<bool>,
    pub backup_retention_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bucket {
    pub name: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}
impl_resource!(Bucket, name);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSummary {
    pub key: Option<String>,
    pub storage_class: Option<String>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Throughput {
    pub read_capacity_units: Option<i64>,
    pub write_capacity_units: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDescription {
    pub table_name: Option<String>,
    pub provisioned_throughput: Option<Throughput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub repository_name: Option<String>,
    pub repository_uri: Option<String>,
}
impl_resource!(Repository, repository_name);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceQuota {
    pub service_code: Option<String>,
    pub quota_code: Option<String>,
    pub quota_name: Option<String>,
    pub value: Option<f64>,
    /// Current consumption, when the provider reports it.
    pub usage: Option<f64>,
    pub adjustable: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_id_uses_placeholder() {
        let snap = Snapshot::default();
        assert_eq!(snap.resource_id(), UNKNOWN_RESOURCE_ID);
    }

    #[test]
    fn test_partial_records_deserialize() {
        let inst: Instance = serde_json::from_str(r#"{"instance_id":"i-1"}"#).unwrap();
        assert_eq!(inst.resource_id(), "i-1");
        assert!(inst.metadata_options.is_none());
        assert!(inst.security_groups.is_empty());
        assert!(!inst.is_running());
        assert!(!inst.is_spot());
    }
}
