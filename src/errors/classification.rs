use super::types::AuditError;

/// How far an error reaches: the whole run, one scan, or a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Configuration-level fault; the run (or the detection call) stops.
    Run,
    /// Enumeration fault; the affected scan produces no aggregate.
    Scan,
    /// A single resource's check failed; recorded and the batch continues.
    Resource,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub scope: ErrorScope,
}

impl AuditError {
    /// Classify this error by type and by how much work it invalidates.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            AuditError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                scope: ErrorScope::Run,
            },
            AuditError::MalformedPrefix { .. } => ErrorClassification {
                error_type: "MalformedPrefixError",
                scope: ErrorScope::Run,
            },
            AuditError::Inventory(_) => ErrorClassification {
                error_type: "InventoryError",
                scope: ErrorScope::Run,
            },
            AuditError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                scope: ErrorScope::Run,
            },
            AuditError::Enumeration { .. } => ErrorClassification {
                error_type: "EnumerationError",
                scope: ErrorScope::Scan,
            },
            AuditError::Io(_) => ErrorClassification {
                error_type: "IoError",
                scope: ErrorScope::Scan,
            },
            AuditError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                scope: ErrorScope::Scan,
            },
            AuditError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                scope: ErrorScope::Scan,
            },
            AuditError::Provider(_) => ErrorClassification {
                error_type: "ProviderError",
                scope: ErrorScope::Resource,
            },
            AuditError::WrongRegion { .. } => ErrorClassification {
                error_type: "WrongRegionError",
                scope: ErrorScope::Resource,
            },
            AuditError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                scope: ErrorScope::Resource,
            },
            AuditError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                scope: ErrorScope::Resource,
            },
        }
    }

    /// Process exit code used by the CLI when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::Config(_) => 2,
            AuditError::MalformedPrefix { .. } => 3,
            AuditError::Enumeration { .. } => 4,
            AuditError::Inventory(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_run_scoped() {
        let err = AuditError::Config("bad cap".into());
        let class = err.classify();
        assert_eq!(class.scope, ErrorScope::Run);
        assert_eq!(class.error_type, "ConfigError");
    }

    #[test]
    fn test_malformed_prefix_is_run_scoped() {
        let err = AuditError::MalformedPrefix {
            id: "subnet-1".into(),
            network: "10.0.0.0/33".into(),
            reason: "invalid prefix length".into(),
        };
        assert_eq!(err.classify().scope, ErrorScope::Run);
        assert!(err.to_string().contains("subnet-1"));
    }

    #[test]
    fn test_enumeration_error_is_scan_scoped() {
        let err = AuditError::enumeration("snapshots", "throttled");
        let class = err.classify();
        assert_eq!(class.scope, ErrorScope::Scan);
        assert_eq!(err.to_string(), "Failed to enumerate snapshots: throttled");
    }

    #[test]
    fn test_provider_error_is_resource_scoped() {
        let err = AuditError::Provider("access denied".into());
        assert_eq!(err.classify().scope, ErrorScope::Resource);
    }

    #[test]
    fn test_timeout_is_resource_scoped() {
        let err = AuditError::Timeout("metric query".into());
        assert_eq!(err.classify().scope, ErrorScope::Resource);
    }

    #[test]
    fn test_wrong_region_is_resource_scoped() {
        let err = AuditError::WrongRegion {
            resource: "logs-bucket".into(),
            region: Some("eu-west-1".into()),
        };
        assert_eq!(err.classify().scope, ErrorScope::Resource);
        assert_eq!(err.to_string(), "logs-bucket is located in another region (eu-west-1)");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AuditError::Config("x".into()).exit_code(), 2);
        assert_eq!(AuditError::enumeration("buckets", "x").exit_code(), 4);
        assert_eq!(AuditError::Internal("x".into()).exit_code(), 1);
    }
}
