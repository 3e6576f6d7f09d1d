use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "region": { "type": "string" },
            "sampling": {
                "type": "object",
                "properties": {
                    "cap": { "type": "integer", "minimum": 0 },
                    "seed": { "type": "integer", "minimum": 0 }
                }
            },
            "concurrency": {
                "type": "object",
                "properties": {
                    "default": { "type": "integer", "minimum": 1, "maximum": 1024 },
                    "buckets": { "type": "integer", "minimum": 1, "maximum": 1024 },
                    "instances": { "type": "integer", "minimum": 1, "maximum": 1024 },
                    "check_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "checks": {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": [
                        "snapshots", "security-groups", "elastic-ips", "subnets",
                        "volumes", "instances", "lambda", "rds", "s3",
                        "dynamodb", "ecr", "quotas"
                    ]
                }
            },
            "instances": {
                "type": "object",
                "properties": {
                    "cpu_threshold": { "type": "number", "exclusiveMinimum": 0, "maximum": 100 },
                    "timeframe_days": { "type": "integer", "minimum": 1 }
                }
            },
            "volumes": {
                "type": "object",
                "properties": {
                    "cost_per_gb_month": { "type": "number", "minimum": 0 }
                }
            },
            "runtimes": {
                "type": "object",
                "properties": {
                    "source_url": { "type": "string", "format": "uri" },
                    "deprecated": { "type": "array", "items": { "type": "string" } }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "format": { "type": "string", "enum": ["text", "json"] },
                    "bar_width": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});
