use console::style;

use crate::config::REGIONS;

pub fn handle_regions() {
    let code_w = REGIONS.iter().map(|(code, _)| code.len()).max().unwrap_or(0);
    for (code, name) in REGIONS {
        println!("{}  {}", style(format!("{code:<code_w$}")).cyan(), name);
    }
}
