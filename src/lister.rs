//! Transparent pagination for listing operations that take `start` and `count`.

use crate::api::{BamApi, Params};
use crate::entity::{Entity, EntityId};
use crate::error::{BamError, Result};
use tracing::{debug, trace};

/// Page size used when the caller does not set `count`
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Call `operation` page by page and return every item in backend order.
///
/// `count` defaults to [`DEFAULT_PAGE_SIZE`] and `start` to 0. Paging stops at
/// the first page shorter than `count`, so a total that is an exact multiple
/// of the page size costs one extra call returning an empty page. A failed
/// page fails the whole listing.
pub async fn list_all<A>(api: &A, operation: &str, mut params: Params) -> Result<Vec<Entity>>
where
    A: BamApi + ?Sized,
{
    let count = match params.get("count").and_then(|c| c.parse::<usize>().ok()) {
        Some(count) if count > 0 => count,
        _ => DEFAULT_PAGE_SIZE,
    };
    let mut start = params
        .get("start")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);
    params.insert("count", count);

    let mut all = Vec::new();
    let mut pages = 0usize;
    loop {
        params.insert("start", start);
        let value = api.invoke(operation, &params).await?;
        // Advance by the raw page length, sentinel entries included
        let page_len = value.as_array().map_or(0, Vec::len);
        let page = Entity::list_from_response(value)
            .map_err(|e| BamError::invalid_response(operation, e.to_string()))?;
        pages += 1;
        trace!("{} page {} start={} returned {}", operation, pages, start, page_len);

        all.extend(page);
        start += page_len;
        if page_len < count {
            break;
        }
    }

    debug!("{} returned {} items in {} pages", operation, all.len(), pages);
    Ok(all)
}

/// All children of `parent_id` with the given type
pub async fn get_all_entities<A>(api: &A, parent_id: EntityId, kind: &str) -> Result<Vec<Entity>>
where
    A: BamApi + ?Sized,
{
    let params = Params::new()
        .set("parentId", parent_id)
        .set("type", kind)
        .set("start", 0)
        .set("count", DEFAULT_PAGE_SIZE);
    list_all(api, "getEntities", params).await
}
