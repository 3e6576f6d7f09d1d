pub mod finding;
pub mod report;
pub mod resources;

pub use finding::*;
pub use report::*;
pub use resources::*;
