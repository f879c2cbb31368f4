//! DHCP server and server-interface lookups.
//!
//! These names must resolve to exactly one object. Duplicates are reported as
//! [`BamError::Ambiguous`] so the caller can stop the run.

use crate::api::{BamApi, BamApiExt, types};
use crate::entity::{Entity, EntityId};
use crate::error::{AmbiguityKind, BamError, Result};
use crate::lister;
use tracing::{debug, info};

/// Server id for a server's interface domain name or its display name.
///
/// The interface search runs first; when nothing matches, the display name
/// is looked up under the Configuration.
pub async fn find_server_id<A>(
    api: &A,
    server_name: &str,
    configuration_id: EntityId,
) -> Result<EntityId>
where
    A: BamApi + ?Sized,
{
    // Two results are enough to detect a duplicate
    let interfaces = api
        .search_by_object_types(server_name, types::SERVER_INTERFACE, 0, 2)
        .await?;
    if interfaces.len() > 1 {
        return Err(ambiguous(
            AmbiguityKind::ServerInterface,
            server_name,
            &interfaces,
        ));
    }

    if let Some(interface) = interfaces.first() {
        if let Some(server) = api.get_parent(interface.id).await? {
            info!(
                "Server {} found by interface {} id={}",
                server_name, interface.id, server.id
            );
            return Ok(server.id);
        }
    }

    debug!("No interface named {}, trying server display name", server_name);
    Ok(find_server(api, server_name, configuration_id).await?.id)
}

/// The single interface of the server with display name `server_name`
pub async fn find_interface_id<A>(
    api: &A,
    server_name: &str,
    configuration_id: EntityId,
) -> Result<EntityId>
where
    A: BamApi + ?Sized,
{
    let server = find_server(api, server_name, configuration_id).await?;

    let interfaces =
        lister::get_all_entities(api, server.id, types::SERVER_INTERFACE).await?;
    match interfaces.as_slice() {
        [] => Err(BamError::InterfaceNotFound(server_name.to_string())),
        [interface] => {
            info!(
                "Server {} has interface {} id={}",
                server_name,
                interface.name_or_empty(),
                interface.id
            );
            Ok(interface.id)
        }
        _ => Err(ambiguous(
            AmbiguityKind::ServerInterface,
            server_name,
            &interfaces,
        )),
    }
}

/// The one Server with display name `server_name` under the Configuration
async fn find_server<A>(api: &A, server_name: &str, configuration_id: EntityId) -> Result<Entity>
where
    A: BamApi + ?Sized,
{
    let mut servers = api
        .get_entities_by_name(configuration_id, server_name, types::SERVER, 0, 2)
        .await?;
    match servers.len() {
        0 => Err(BamError::ServerNotFound(server_name.to_string())),
        1 => Ok(servers.remove(0)),
        _ => Err(ambiguous(AmbiguityKind::ServerName, server_name, &servers)),
    }
}

fn ambiguous(kind: AmbiguityKind, name: &str, candidates: &[Entity]) -> BamError {
    BamError::Ambiguous {
        kind,
        name: name.to_string(),
        candidates: candidates
            .iter()
            .map(|c| format!("{} ({})", c.name_or_empty(), c.id))
            .collect(),
    }
}
