use console::{measure_text_width, style};

use crate::models::report::AccountInformation;

const MIN_INNER_WIDTH: usize = 40;

/// Boxed summary of the audited account, printed above the report.
pub fn account_banner(account: &AccountInformation) -> String {
    let rows = [
        ("Account ID", account.account_id.clone()),
        ("Account Alias", account.account_alias.clone()),
        (
            "Region",
            format!("{} ({})", account.region_code, account.region_name),
        ),
    ];
    let label_w = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let lines: Vec<String> = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "{}  {}",
                style(format!("{label:<label_w$}")).dim(),
                style(value).bold()
            )
        })
        .collect();

    let inner = lines
        .iter()
        .map(|l| measure_text_width(l))
        .max()
        .unwrap_or(0)
        .max(MIN_INNER_WIDTH);

    let mut out = String::new();
    out.push_str(&format!("╭{}╮\n", "─".repeat(inner + 2)));
    for line in &lines {
        let pad = inner - measure_text_width(line);
        out.push_str(&format!("│ {}{} │\n", line, " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯\n", "─".repeat(inner + 2)));
    out
}
