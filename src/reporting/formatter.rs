//! Text and JSON renderings of an [`AuditReport`].

use console::style;

use super::banner::account_banner;
use crate::engine::{render_bar, DistributionEntry};
use crate::errors::AuditError;
use crate::models::finding::{Finding, Severity};
use crate::models::report::*;

pub fn format_json_report(report: &AuditReport) -> Result<String, AuditError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human-readable report: account banner, one block per section, then findings.
pub fn format_text_report(report: &AuditReport, bar_width: usize) -> String {
    let mut out = String::new();
    out.push_str(&account_banner(&report.account_information));
    out.push('\n');

    let s = &report.sections;
    if let Some(ref sec) = s.snapshots {
        push_block(&mut out, "Public EBS Snapshots", snapshots_block(sec));
    }
    if let Some(ref sec) = s.security_groups {
        push_block(&mut out, "Security Groups", security_groups_block(sec));
    }
    if let Some(ref sec) = s.elastic_ips {
        push_block(&mut out, "Elastic IPs", elastic_ips_block(sec));
    }
    if let Some(ref sec) = s.subnets {
        push_block(&mut out, "Overlapping Subnets", subnets_block(sec));
    }
    if let Some(ref sec) = s.volumes {
        push_block(&mut out, "Orphaned EBS Volumes", volumes_block(sec));
    }
    if let Some(ref sec) = s.instances {
        push_block(&mut out, "EC2 Instances", instances_block(sec, bar_width));
    }
    if let Some(ref sec) = s.lambda {
        push_block(&mut out, "Lambda Runtimes", lambda_block(sec));
    }
    if let Some(ref sec) = s.rds {
        push_block(&mut out, "RDS Instances", rds_block(sec));
    }
    if let Some(ref sec) = s.s3 {
        push_block(&mut out, "S3 Buckets", s3_block(sec, bar_width));
    }
    if let Some(ref sec) = s.dynamo_db {
        push_block(&mut out, "DynamoDB Capacity", dynamodb_block(sec, bar_width));
    }
    if let Some(ref sec) = s.repositories {
        push_block(&mut out, "ECR Repositories", repositories_block(sec));
    }
    if let Some(ref sec) = s.service_quotas {
        push_block(&mut out, "Service Quotas", quotas_block(sec));
    }

    if !report.failures.is_empty() {
        let lines = report
            .failures
            .iter()
            .map(|f| format!("{} {} [{}]: {}", style("✗").red(), f.audit, f.error_type, f.message))
            .collect();
        push_block(&mut out, "Failed Audits", lines);
    }

    push_block(&mut out, "Findings", findings_block(&report.findings));
    out
}

fn push_block(out: &mut String, title: &str, lines: Vec<String>) {
    out.push_str(&format!("{}\n", style(title).bold().underlined()));
    for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
}

fn ok_line(msg: &str) -> String {
    format!("{} {}", style("✔").green(), msg)
}

/// One line per entry: name, bar, percentage and count.
pub fn format_distribution(entries: &[DistributionEntry], bar_width: usize) -> Vec<String> {
    let name_w = entries.iter().map(|e| e.category.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| {
            format!(
                "{:<name_w$}  {:<bar_width$}  {:>5.1}% ({})",
                e.category,
                style(render_bar(e.percentage, bar_width)).cyan(),
                e.percentage,
                e.count,
            )
        })
        .collect()
}

fn counts_line(analyzed: usize, skipped: usize, errors: usize) -> String {
    let mut line = format!("Analyzed: {analyzed}");
    if skipped > 0 {
        line.push_str(&format!(" | skipped: {skipped}"));
    }
    if errors > 0 {
        line.push_str(&format!(" | errors: {}", style(errors).yellow()));
    }
    line
}

fn snapshots_block(sec: &SnapshotsSection) -> Vec<String> {
    let mut lines = vec![counts_line(sec.total_analyzed, sec.skipped, sec.errors)];
    if sec.sampled {
        lines.push(format!(
            "Sampled {} of {} snapshots",
            sec.total_analyzed, sec.population
        ));
    }
    if sec.publicly_shared.is_empty() {
        lines.push(ok_line("No publicly shared snapshots"));
    }
    for id in &sec.publicly_shared {
        lines.push(format!("{} {} is publicly shared", Severity::Critical.marker(), id));
    }
    lines
}

fn security_groups_block(sec: &SecurityGroupsSection) -> Vec<String> {
    let mut lines = vec![format!("Analyzed: {}", sec.total_analyzed)];
    for issue in &sec.excessively_open_inbound_rules {
        lines.push(format!(
            "{} {} allows {} on port {}",
            Severity::High.marker(),
            issue.security_group_id,
            issue.source,
            issue.port.map(|p| p.to_string()).unwrap_or_else(|| "any".into())
        ));
    }
    for issue in &sec.open_port_ranges {
        lines.push(format!(
            "{} {} opens port range {}",
            Severity::Medium.marker(),
            issue.security_group_id,
            issue.port_range
        ));
    }
    for issue in &sec.broad_private_sources {
        lines.push(format!(
            "{} {} accepts the whole private range {}",
            Severity::Medium.marker(),
            issue.security_group_id,
            issue.source
        ));
    }
    if !sec.default_group_instances.is_empty() {
        lines.push(format!(
            "{} Instances in the default group: {}",
            Severity::Low.marker(),
            sec.default_group_instances.join(", ")
        ));
    }
    if lines.len() == 1 {
        lines.push(ok_line("No security group issues"));
    }
    lines
}

fn elastic_ips_block(sec: &ElasticIpsSection) -> Vec<String> {
    let mut lines = vec![format!("Analyzed: {}", sec.total_analyzed)];
    if sec.orphaned.is_empty() {
        lines.push(ok_line("Every address is associated"));
    } else {
        lines.push(format!(
            "{} Unassociated: {}",
            Severity::Low.marker(),
            sec.orphaned.join(", ")
        ));
    }
    lines
}

fn subnets_block(sec: &SubnetsSection) -> Vec<String> {
    let mut lines = vec![counts_line(sec.total_analyzed, sec.skipped, 0)];
    if sec.overlaps.is_empty() {
        lines.push(ok_line("No overlapping subnets"));
    }
    for pair in &sec.overlaps {
        lines.push(format!(
            "{} {} overlaps {}",
            Severity::Medium.marker(),
            pair.id_a,
            pair.id_b
        ));
    }
    lines
}

fn volumes_block(sec: &VolumesSection) -> Vec<String> {
    let mut lines = vec![format!("Analyzed: {}", sec.total_analyzed)];
    if sec.orphaned.is_empty() {
        lines.push(ok_line("No orphaned volumes"));
        return lines;
    }
    for v in &sec.orphaned {
        lines.push(format!(
            "{} {} ({} GB, ${:.2}/month)",
            Severity::Low.marker(),
            v.volume_id,
            v.size_gb,
            v.monthly_cost_usd
        ));
    }
    lines.push(format!(
        "Total: {} GB, ${:.2}/month",
        sec.total_orphaned_gb, sec.total_monthly_cost_usd
    ));
    lines
}

fn instances_block(sec: &InstancesSection, bar_width: usize) -> Vec<String> {
    let mut lines = vec![format!("Instances: {}", sec.total_instances)];
    if !sec.instances_using_imdsv1.is_empty() {
        lines.push(format!(
            "{} Using IMDSv1: {}",
            Severity::Medium.marker(),
            sec.instances_using_imdsv1.join(", ")
        ));
    }
    if !sec.lifecycle_distribution.is_empty() {
        lines.push("Lifecycle:".into());
        lines.extend(indent(format_distribution(&sec.lifecycle_distribution, bar_width)));
    }
    if !sec.type_distribution.is_empty() {
        lines.push("Instance types:".into());
        lines.extend(indent(format_distribution(&sec.type_distribution, bar_width)));
    }
    for r in &sec.reserved_purchases {
        lines.push(format!(
            "Reserved: {} x {} in {} ({:.1} years)",
            r.instance_count, r.instance_type, r.availability_zone, r.duration_years
        ));
    }
    let u = &sec.utilization;
    lines.push(format!(
        "CPU below {:.0}% over {} days: {} of {} evaluated",
        u.cpu_threshold,
        u.timeframe_days,
        u.underutilized.len(),
        u.evaluated
    ));
    for i in &u.underutilized {
        lines.push(format!(
            "  {} {} averages {:.1}% CPU",
            Severity::Low.marker(),
            i.instance_id,
            i.average_cpu
        ));
    }
    if u.errors > 0 {
        lines.push(format!("Metric errors: {}", style(u.errors).yellow()));
    }
    lines
}

fn indent(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|l| format!("  {l}"))
}

fn lambda_block(sec: &LambdaSection) -> Vec<String> {
    let mut lines = vec![counts_line(sec.total_analyzed, sec.skipped, 0)];
    if sec.outdated_runtimes.is_empty() {
        lines.push(ok_line("No deprecated runtimes"));
    }
    for f in &sec.outdated_runtimes {
        lines.push(format!(
            "{} {} runs {}",
            Severity::High.marker(),
            f.function_name,
            f.runtime
        ));
    }
    if let Some(ref storage) = sec.code_storage {
        let pct = storage
            .percentage
            .map(|p| format!(" ({p:.1}%)"))
            .unwrap_or_default();
        lines.push(format!(
            "Code storage: {:.2} GB of {:.0} GB{}",
            storage.used_gb, storage.quota_gb, pct
        ));
    }
    lines
}

fn rds_block(sec: &RdsSection) -> Vec<String> {
    let mut lines = vec![format!("Analyzed: {}", sec.total_analyzed)];
    let flagged: Vec<_> = sec.instances.iter().filter(|i| !i.issues.is_empty()).collect();
    if flagged.is_empty() {
        lines.push(ok_line("No database issues"));
    }
    for db in flagged {
        lines.push(format!(
            "{} {}: {}",
            Severity::High.marker(),
            db.identifier,
            db.issues.join(", ")
        ));
    }
    lines
}

fn s3_block(sec: &S3Section, bar_width: usize) -> Vec<String> {
    let mut lines = vec![counts_line(sec.total_analyzed, sec.skipped, sec.errors)];
    if sec.sampled {
        lines.push(format!(
            "Sampled {} of {} buckets",
            sec.total_analyzed, sec.total_buckets
        ));
    }
    for bucket in &sec.buckets {
        let marker = if bucket.has_lifecycle_policy {
            style("✔").green().to_string()
        } else {
            Severity::Low.marker().to_string()
        };
        lines.push(format!(
            "{} {} ({} objects sampled)",
            marker, bucket.name, bucket.objects_sampled
        ));
        lines.extend(indent(format_distribution(
            &bucket.storage_class_percentages,
            bar_width,
        )));
    }
    if let Some(pct) = sec.buckets_without_lifecycle_policy_percentage {
        lines.push(format!("Without lifecycle policy: {pct:.1}%"));
    }
    lines
}

fn dynamodb_block(sec: &DynamoDbSection, bar_width: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "Tables: {} | provisioned: {} | on-demand: {}",
        sec.total_tables, sec.provisioned_tables, sec.on_demand_tables
    )];
    if sec.skipped > 0 || sec.errors > 0 {
        lines.push(counts_line(
            sec.provisioned_tables + sec.on_demand_tables,
            sec.skipped,
            sec.errors,
        ));
    }
    lines.extend(format_distribution(&sec.capacity_distribution, bar_width));
    lines
}

fn repositories_block(sec: &RepositoriesSection) -> Vec<String> {
    let mut lines = vec![counts_line(sec.total_analyzed, sec.without_policy, sec.errors)];
    if sec.public_repositories.is_empty() {
        lines.push(ok_line("No public repositories"));
    }
    for name in &sec.public_repositories {
        lines.push(format!("{} {} is publicly accessible", Severity::High.marker(), name));
    }
    lines
}

fn quotas_block(sec: &QuotasSection) -> Vec<String> {
    let mut lines = vec![format!(
        "Quotas: {} | with usage data: {}",
        sec.total_quotas, sec.evaluated
    )];
    if sec.saturated.is_empty() {
        lines.push(ok_line("No quota near its limit"));
    }
    for q in &sec.saturated {
        lines.push(format!(
            "{} {} / {}: {:.0} of {:.0} ({:.1}%)",
            Severity::Medium.marker(),
            q.service_code,
            q.quota_name,
            q.usage,
            q.value,
            q.percentage
        ));
    }
    lines
}

fn findings_block(findings: &[Finding]) -> Vec<String> {
    if findings.is_empty() {
        return vec![ok_line("No findings")];
    }
    findings
        .iter()
        .map(|f| {
            let severity = format!("{:?}", f.severity).to_uppercase();
            let severity = match f.severity {
                Severity::Critical | Severity::High => style(severity).red().bold(),
                Severity::Medium => style(severity).yellow(),
                Severity::Low | Severity::Info => style(severity).dim(),
            };
            let mut line = format!("{} [{}] {}", f.severity.marker(), severity, f.title);
            if let Some(ref id) = f.resource_id {
                line.push_str(&format!(" ({id})"));
            }
            if !f.recommendation.is_empty() {
                line.push_str(&format!("\n      {}", style(&f.recommendation).dim()));
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::distribution;
    use crate::models::finding::FindingCategory;
    use chrono::Utc;

    fn report() -> AuditReport {
        AuditReport {
            run_id: "run-1".into(),
            generated_at: Utc::now(),
            tool_version: "0.0.0".into(),
            account_information: AccountInformation {
                account_id: "123456789012".into(),
                account_alias: "prod".into(),
                region_code: "us-east-1".into(),
                region_name: "US East (N. Virginia)".into(),
            },
            findings: vec![Finding::new(
                "snapshots",
                Severity::Critical,
                FindingCategory::Exposure,
                "Snapshot is publicly shared",
            )
            .resource("snap-1")],
            sections: ReportSections {
                snapshots: Some(SnapshotsSection {
                    population: 250,
                    total_analyzed: 100,
                    sampled: true,
                    publicly_shared: vec!["snap-1".into()],
                    ..Default::default()
                }),
                instances: Some(InstancesSection {
                    total_instances: 10,
                    type_distribution: distribution([("m5.large", 6), ("t3.micro", 4)]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            failures: vec![AuditFailure {
                audit: "subnets".into(),
                error_type: "MalformedPrefixError".into(),
                message: "bad prefix".into(),
            }],
        }
    }

    #[test]
    fn test_text_report_includes_selected_sections_only() {
        let text = format_text_report(&report(), 15);
        assert!(text.contains("Public EBS Snapshots"));
        assert!(text.contains("Sampled 100 of 250 snapshots"));
        assert!(text.contains("EC2 Instances"));
        assert!(!text.contains("S3 Buckets"));
        assert!(text.contains("Failed Audits"));
        assert!(text.contains("Snapshot is publicly shared (snap-1)"));
    }

    #[test]
    fn test_distribution_lines() {
        let lines = format_distribution(&distribution([("m5.large", 6), ("t3.micro", 4)]), 10);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("m5.large"));
        assert!(lines[0].contains("60.0% (6)"));
        assert!(lines[1].contains("40.0% (4)"));
    }

    #[test]
    fn test_json_report_uses_camel_case() {
        let json = format_json_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["accountInformation"]["accountId"], "123456789012");
        assert_eq!(value["sections"]["snapshots"]["population"], 250);
        assert!(value["sections"].get("s3").is_none());
        assert_eq!(value["failures"][0]["errorType"], "MalformedPrefixError");
    }
}
