use std::collections::HashSet;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AuditError;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` once the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Drain a paginated listing, optionally stopping once `limit` items are held.
///
/// Any page error aborts the enumeration and is returned as
/// [`AuditError::Enumeration`]; partial results are discarded.
pub async fn collect_pages<T, F, Fut>(
    resource: &str,
    limit: Option<usize>,
    mut next_page: F,
) -> Result<Vec<T>, AuditError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, AuditError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = next_page(cursor.clone()).await.map_err(|e| match e {
            AuditError::Enumeration { .. } => e,
            other => AuditError::enumeration(resource, other),
        })?;
        pages += 1;
        items.extend(page.items);

        if let Some(max) = limit {
            if items.len() >= max {
                items.truncate(max);
                debug!(resource, pages, limit = max, "Enumeration stopped at limit");
                break;
            }
        }

        match page.next_cursor {
            None => break,
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(AuditError::enumeration(
                        resource,
                        format!("cursor '{next}' was already visited"),
                    ));
                }
                cursor = Some(next);
            }
        }
    }

    debug!(resource, pages, count = items.len(), "Enumeration complete");
    Ok(items)
}
