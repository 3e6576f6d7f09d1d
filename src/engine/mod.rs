//! Bounded-concurrency resource audit engine.
//!
//! Enumerate ([`enumerate`]) → cap ([`sampler`]) → fan out checks
//! ([`scanner`]) → summarize ([`aggregate`]). [`overlap`] handles the
//! pairwise prefix comparison used by the subnet audit.

pub mod aggregate;
pub mod enumerate;
pub mod outcome;
pub mod overlap;
pub mod sampler;
pub mod scanner;

pub use aggregate::{aggregate, aggregate_by, distribution, presence_percentage, render_bar, DistributionEntry};
pub use enumerate::{collect_pages, Page};
pub use outcome::{BatchCounts, CheckOutcome, CheckStatus, Resource, ScanBatch, UNKNOWN_RESOURCE_ID};
pub use overlap::{find_overlaps, OverlapPair, PrefixRecord};
pub use sampler::{sample, Sampled, Sampler};
pub use scanner::{BoundedScanner, ProgressSink, ResourceCheck, ScanEvent};
