//! Forward zone lookup by walking the label hierarchy under a View.

use crate::api::{BamApi, BamApiExt, types};
use crate::entity::{Entity, EntityId};
use crate::error::Result;
use tracing::debug;

/// Resolve a fully qualified zone name to its Zone entity under `view_id`.
///
/// Labels are looked up right to left, each one as a child of the previous
/// hit. The walk stops at the first miss, and only a match of the whole name
/// counts: if `a.in-addr.arpa` exists but `b.a.in-addr.arpa` does not, the
/// result is `None`. A single trailing dot on `zone_name` is ignored.
pub async fn find_zone<A>(api: &A, zone_name: &str, view_id: EntityId) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    let name = zone_name.strip_suffix('.').unwrap_or(zone_name);
    let labels: Vec<&str> = name.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        debug!("Zone name {:?} has an empty label", zone_name);
        return Ok(None);
    }

    let mut parent_id = view_id;
    let mut matched = String::new();
    let mut found = None;

    for label in labels.iter().rev() {
        match api.get_entity_by_name(parent_id, label, types::ZONE).await? {
            Some(zone) => {
                parent_id = zone.id;
                matched = format!("{}.{}", zone.name_or_empty(), matched);
                found = Some(zone);
            }
            None => {
                debug!("No zone {} under parent {}", label, parent_id);
                break;
            }
        }
    }

    if matched == format!("{}.", name) {
        Ok(found)
    } else {
        debug!("Zone {} only matched as far as {:?}", zone_name, matched);
        Ok(None)
    }
}
