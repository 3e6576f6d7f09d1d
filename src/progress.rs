use std::collections::HashMap;
use std::time::{Duration, Instant};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::engine::CheckStatus;
use crate::pipeline::AuditEvent;

/// Renders audit progress as indicatif bars on stderr.
pub struct AuditProgress {
    multi: MultiProgress,
    run_bar: Option<ProgressBar>,
    scan_bars: HashMap<String, ProgressBar>,
    status_bar: ProgressBar,
    findings_count: usize,
    check_failures: usize,
    start_time: Instant,
}

impl Default for AuditProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status_bar = multi.add(ProgressBar::new_spinner());
        if let Ok(s) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
            status_bar.set_style(s);
        }
        status_bar.set_message("Connecting to account...");
        status_bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            multi,
            run_bar: None,
            scan_bars: HashMap::new(),
            status_bar,
            findings_count: 0,
            check_failures: 0,
            start_time: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &AuditEvent) {
        match event {
            AuditEvent::RunStarted {
                provider,
                region,
                audits,
                ..
            } => {
                let bar = self
                    .multi
                    .insert_before(&self.status_bar, ProgressBar::new(*audits as u64));
                if let Ok(s) = ProgressStyle::default_bar()
                    .template("  {bar:30.cyan/dark_gray} {pos}/{len} audits | {msg}")
                {
                    bar.set_style(s.progress_chars("█▓░"));
                }
                bar.set_message(format!("Auditing {region} ({provider})"));
                self.run_bar = Some(bar);
                self.update_status();
            }
            AuditEvent::AuditStarted { audit } => {
                if let Some(bar) = &self.run_bar {
                    bar.set_message(audit.display_name().to_string());
                }
                self.update_status();
            }
            AuditEvent::ScanStarted { label, total } => {
                let bar = self
                    .multi
                    .insert_before(&self.status_bar, ProgressBar::new(*total as u64));
                if let Ok(s) = ProgressStyle::default_bar()
                    .template("    {spinner:.yellow} {msg} {bar:20.yellow/dark_gray} {pos}/{len}")
                {
                    bar.set_style(s.progress_chars("█▓░"));
                }
                bar.set_message(label.clone());
                bar.enable_steady_tick(Duration::from_millis(100));
                self.scan_bars.insert(label.clone(), bar);
            }
            AuditEvent::ItemChecked { label, status, .. } => {
                if let Some(bar) = self.scan_bars.get(label) {
                    bar.inc(1);
                }
                if *status == CheckStatus::Fail {
                    self.check_failures += 1;
                    self.update_status();
                }
            }
            AuditEvent::ScanFinished { label, .. } => {
                if let Some(bar) = self.scan_bars.remove(label) {
                    bar.finish_and_clear();
                }
            }
            AuditEvent::FindingDiscovered { .. } => {
                self.findings_count += 1;
                self.update_status();
            }
            AuditEvent::AuditCompleted { .. } => {
                if let Some(bar) = &self.run_bar {
                    bar.inc(1);
                }
            }
            AuditEvent::AuditFailed { audit, error } => {
                if let Some(bar) = &self.run_bar {
                    bar.inc(1);
                }
                self.println(&format!(
                    "  {} {} audit failed: {}",
                    style("⚠").yellow(),
                    audit.display_name(),
                    error
                ));
            }
            AuditEvent::RunCompleted {
                total_findings,
                failed_audits,
                duration_ms,
            } => {
                for (_, bar) in self.scan_bars.drain() {
                    bar.finish_and_clear();
                }
                if let Some(bar) = self.run_bar.take() {
                    bar.finish_and_clear();
                }
                let mut msg = format!(
                    "Audit complete: {} findings | {}",
                    total_findings,
                    format_elapsed(*duration_ms)
                );
                if *failed_audits > 0 {
                    msg.push_str(&format!(" | {failed_audits} audits failed"));
                }
                self.status_bar.finish_with_message(msg);
            }
        }
    }

    /// Stop every bar; used when the run ends without a completion event.
    pub fn abandon(&mut self) {
        for (_, bar) in self.scan_bars.drain() {
            bar.finish_and_clear();
        }
        if let Some(bar) = self.run_bar.take() {
            bar.abandon();
        }
        if !self.status_bar.is_finished() {
            self.status_bar.finish_and_clear();
        }
    }

    fn update_status(&self) {
        self.status_bar.set_message(format!(
            "{} | {} findings | {} check errors",
            format_elapsed(self.start_time.elapsed().as_millis() as u64),
            self.findings_count,
            self.check_failures,
        ));
    }

    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

/// Drain an event channel into a progress display until the sender closes.
pub async fn consume(mut rx: UnboundedReceiver<AuditEvent>) {
    let mut progress = AuditProgress::new();
    while let Some(event) = rx.recv().await {
        progress.handle_event(&event);
    }
    progress.abandon();
}

pub fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    if mins > 0 {
        format!("{}m{}s", mins, secs % 60)
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{ms}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(250), "250ms");
        assert_eq!(format_elapsed(4_200), "4s");
        assert_eq!(format_elapsed(125_000), "2m5s");
    }
}
