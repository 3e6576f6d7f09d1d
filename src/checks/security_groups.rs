use tracing::info;

use super::{AuditContext, AuditResult};
use crate::engine::{collect_pages, UNKNOWN_RESOURCE_ID};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{OpenPortIssue, SecurityGroupsSection, SourceRangeIssue};
use crate::models::resources::{Instance, SecurityGroup};

const AUDIT: &str = "security-groups";
const DEFAULT_GROUP_NAME: &str = "default";

pub const BROAD_PRIVATE_RANGES: [&str; 3] = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];
pub const OPEN_RANGES: [&str; 2] = ["0.0.0.0/0", "::/0"];

fn group_id(group: &SecurityGroup) -> String {
    group
        .group_id
        .clone()
        .unwrap_or_else(|| UNKNOWN_RESOURCE_ID.to_string())
}

/// Rules spanning more than one port. Rules missing either bound are not evaluated.
pub fn port_range_issues(groups: &[SecurityGroup]) -> Vec<OpenPortIssue> {
    groups
        .iter()
        .flat_map(|group| {
            group.permissions.iter().filter_map(move |rule| match (rule.from_port, rule.to_port) {
                (Some(from), Some(to)) if from != to => Some(OpenPortIssue {
                    security_group_id: group_id(group),
                    port_range: format!("{from}-{to}"),
                }),
                _ => None,
            })
        })
        .collect()
}

fn sources_matching(groups: &[SecurityGroup], wanted: &[&str], need_port: bool) -> Vec<SourceRangeIssue> {
    let mut issues = Vec::new();
    for group in groups {
        for rule in &group.permissions {
            if need_port && rule.from_port.is_none() {
                continue;
            }
            for range in &rule.ranges {
                let range = range.trim();
                if wanted.contains(&range) {
                    issues.push(SourceRangeIssue {
                        security_group_id: group_id(group),
                        port: rule.from_port,
                        source: range.to_string(),
                    });
                }
            }
        }
    }
    issues
}

/// Rules whose source is an entire RFC 1918 block.
pub fn broad_private_sources(groups: &[SecurityGroup]) -> Vec<SourceRangeIssue> {
    sources_matching(groups, &BROAD_PRIVATE_RANGES, false)
}

/// Rules open to every address. A rule without a from-port is not reported.
pub fn open_inbound_rules(groups: &[SecurityGroup]) -> Vec<SourceRangeIssue> {
    sources_matching(groups, &OPEN_RANGES, true)
}

pub fn default_group_instances(instances: &[Instance]) -> Vec<String> {
    instances
        .iter()
        .filter(|i| {
            i.security_groups
                .iter()
                .any(|g| g.group_name.as_deref() == Some(DEFAULT_GROUP_NAME))
        })
        .filter_map(|i| i.instance_id.clone())
        .collect()
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<SecurityGroupsSection>, AuditError> {
    let groups = collect_pages(AUDIT, None, |cursor| ctx.provider.list_security_groups(cursor)).await?;
    let instances = collect_pages("instances", None, |cursor| ctx.provider.list_instances(cursor)).await?;

    let section = SecurityGroupsSection {
        total_analyzed: groups.len(),
        open_port_ranges: port_range_issues(&groups),
        broad_private_sources: broad_private_sources(&groups),
        excessively_open_inbound_rules: open_inbound_rules(&groups),
        default_group_instances: default_group_instances(&instances),
    };

    let mut findings = Vec::new();
    for issue in &section.excessively_open_inbound_rules {
        let port = issue.port.map(|p| p.to_string()).unwrap_or_default();
        findings.push(
            Finding::new(AUDIT, Severity::High, FindingCategory::Exposure, "Inbound rule open to the internet")
                .resource(issue.security_group_id.as_str())
                .detail(format!("Port {} accepts traffic from {}.", port, issue.source))
                .recommend("Restrict the rule's source to known address ranges."),
        );
    }
    for issue in &section.open_port_ranges {
        findings.push(
            Finding::new(AUDIT, Severity::Medium, FindingCategory::NetworkHygiene, "Rule allows a port range")
                .resource(issue.security_group_id.as_str())
                .detail(format!("Ports {} are allowed.", issue.port_range))
                .recommend("Allow only the individual ports the workload needs."),
        );
    }
    for issue in &section.broad_private_sources {
        findings.push(
            Finding::new(AUDIT, Severity::Medium, FindingCategory::NetworkHygiene, "Rule allows a broad private range")
                .resource(issue.security_group_id.as_str())
                .detail(format!("Source {} covers an entire private block.", issue.source))
                .recommend("Narrow the source to the subnets that need access."),
        );
    }
    for id in &section.default_group_instances {
        findings.push(
            Finding::new(AUDIT, Severity::Low, FindingCategory::NetworkHygiene, "Instance uses the default security group")
                .resource(id.as_str())
                .recommend("Attach a purpose-built security group instead of 'default'."),
        );
    }

    info!(groups = groups.len(), findings = findings.len(), "Security group audit complete");
    Ok(AuditResult::new(section, findings))
}
