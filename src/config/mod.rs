pub mod parser;
pub mod regions;
pub mod schema;
pub mod types;

pub use parser::{parse_config, parse_config_str, validate_settings};
pub use regions::{region_name, REGIONS};
pub use types::*;
