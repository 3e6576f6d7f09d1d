pub mod banner;
pub mod formatter;

pub use banner::account_banner;
pub use formatter::{format_distribution, format_json_report, format_text_report};
