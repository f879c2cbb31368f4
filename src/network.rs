//! Address-space lookups: networks and blocks by CIDR, addresses, DHCP ranges.

use crate::api::{BamApi, BamApiExt, types};
use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::reverse::{Cidr, parse_dotted_quad};
use std::net::Ipv4Addr;
use tracing::debug;

/// Address-space types tried for an exact CIDR match, most specific first
pub const CIDR_TYPES: [&str; 2] = [types::IP4_NETWORK, types::IP4_BLOCK];

/// Find the network or block whose CIDR is exactly `cidr`.
///
/// Networks are tried before blocks. An object that merely contains the
/// address (say `10.2.0.0/16` when `10.2.1.0/24` was asked for) is never
/// returned in its place.
pub async fn find_network<A>(
    api: &A,
    cidr: &Cidr,
    configuration_id: EntityId,
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    find_network_of_types(api, cidr, configuration_id, &CIDR_TYPES).await
}

/// [`find_network`] restricted to the given address-space types
pub async fn find_network_of_types<A>(
    api: &A,
    cidr: &Cidr,
    configuration_id: EntityId,
    kinds: &[&str],
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    let wanted = cidr.to_string();
    let address = cidr.addr().to_string();

    for kind in kinds {
        let Some(candidate) = api
            .get_ip_ranged_by_ip(configuration_id, kind, &address)
            .await?
        else {
            debug!("No {} contains {}", kind, address);
            continue;
        };

        match candidate.cidr() {
            Some(found) if found == wanted => {
                debug!("Found {} {} id={}", kind, wanted, candidate.id);
                return Ok(Some(candidate));
            }
            found => {
                debug!(
                    "Containing {} for {} is {:?}, not an exact match",
                    kind, wanted, found
                );
            }
        }
    }

    Ok(None)
}

/// The network containing `address`, whatever its size
pub async fn find_containing_network<A>(
    api: &A,
    address: Ipv4Addr,
    configuration_id: EntityId,
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    api.get_ip_ranged_by_ip(configuration_id, types::IP4_NETWORK, &address.to_string())
        .await
}

/// The IP4Address object for `address`
pub async fn find_address<A>(
    api: &A,
    address: Ipv4Addr,
    configuration_id: EntityId,
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    api.get_ip4_address(configuration_id, &address.to_string())
        .await
}

/// The DHCP range spanning exactly `start` to `end`
pub async fn find_dhcp_range<A>(
    api: &A,
    start: Ipv4Addr,
    end: Ipv4Addr,
    configuration_id: EntityId,
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    let start_text = start.to_string();
    let end_text = end.to_string();
    let range = api
        .get_ip_ranged_by_ip(configuration_id, types::DHCP4_RANGE, &start_text)
        .await?;

    Ok(range.filter(|range| {
        let exact = range.property("start") == Some(start_text.as_str())
            && range.property("end") == Some(end_text.as_str());
        if !exact {
            debug!(
                "DHCP range containing {} is {:?}-{:?}",
                start_text,
                range.property("start"),
                range.property("end")
            );
        }
        exact
    }))
}

/// Number of addresses in a DHCP range entity, from its `start` and `end`
pub fn range_size(range: &Entity) -> Option<u64> {
    let start = parse_dotted_quad(range.property("start")?)?;
    let end = parse_dotted_quad(range.property("end")?)?;
    let (start, end) = (u32::from(start), u32::from(end));
    (end >= start).then(|| u64::from(end - start) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Properties;
    use serde_json::Map;

    fn range(start: &str, end: &str) -> Entity {
        Entity {
            id: 1,
            name: None,
            kind: types::DHCP4_RANGE.to_string(),
            properties: Properties::new().with("start", start).with("end", end),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_range_size() {
        assert_eq!(range_size(&range("10.0.0.10", "10.0.0.20")), Some(11));
        assert_eq!(range_size(&range("10.0.0.10", "10.0.0.10")), Some(1));
        assert_eq!(range_size(&range("10.0.0.255", "10.0.1.0")), Some(2));
        assert_eq!(range_size(&range("10.0.0.20", "10.0.0.10")), None);
        assert_eq!(range_size(&range("nope", "10.0.0.10")), None);
    }
}
