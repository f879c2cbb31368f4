use super::{Summary, not_found, skip_line};
use crate::api::{BamApi, BamApiExt};
use crate::classify::Scope;
use crate::entity::{Entity, EntityId, Properties};
use crate::error::{BamError, Result};
use crate::input::TokenReader;
use crate::network;
use crate::reverse::{Cidr, parse_dotted_quad};
use std::io::Write;
use tracing::{Instrument, debug, info, info_span};

const DHCP_SERVICE: &str = "DHCP";
const MASTER_ROLE: &str = "MASTER";

/// Server interfaces the new DHCP roles point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleServers {
    pub primary_interface: EntityId,
    pub failover_interface: Option<EntityId>,
}

impl RoleServers {
    /// Role properties: the failover interface, when there is one
    pub fn role_properties(&self) -> Properties {
        match self.failover_interface {
            Some(id) => Properties::new().with("secondaryServerInterfaceId", id.to_string()),
            None => Properties::new(),
        }
    }
}

/// Replace the DHCP deployment roles of each network named in `input`.
///
/// A CIDR must match a network exactly; a bare address selects the network
/// containing it. Existing DHCP roles are deleted before the new MASTER role
/// is added.
pub async fn replace_dhcp_roles<A, W>(
    api: &A,
    scope: &Scope,
    servers: RoleServers,
    input: &mut TokenReader,
    out: &mut W,
) -> Result<Summary>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let mut summary = Summary::default();
    let properties = servers.role_properties();

    while let Some(token) = input.next_token().await? {
        let span = info_span!("network", token = %token);
        let processed = async {
            let network = match find_target_network(api, scope, &token).await {
                Ok(Some(network)) => network,
                Ok(None) => {
                    not_found(out, &mut summary, &token)?;
                    return Ok(false);
                }
                Err(err) => {
                    skip_line(out, &mut summary, &token, err)?;
                    return Ok(false);
                }
            };
            debug!("found entity {} {:?}", network.id, network.cidr());

            let role_id = replace_roles(api, &network, servers, &properties, out).await?;
            writeln!(out, "Network {} DHCP-roleid {} added", token, role_id)?;
            Ok::<_, BamError>(true)
        }
        .instrument(span)
        .await?;

        if processed {
            summary.processed += 1;
        }
    }

    info!("replace_dhcp_roles done: {:?}", summary);
    Ok(summary)
}

async fn find_target_network<A>(api: &A, scope: &Scope, token: &str) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    if token.contains('/') {
        let cidr: Cidr = token.parse()?;
        return network::find_network(api, &cidr, scope.configuration_id).await;
    }

    let address = parse_dotted_quad(token)
        .ok_or_else(|| BamError::InvalidIdentifier(token.to_string()))?;
    network::find_containing_network(api, address, scope.configuration_id).await
}

async fn replace_roles<A, W>(
    api: &A,
    network: &Entity,
    servers: RoleServers,
    properties: &Properties,
    out: &mut W,
) -> Result<EntityId>
where
    A: BamApi + ?Sized,
    W: Write,
{
    for role in api.get_deployment_roles(network.id).await? {
        if role.field("service") != Some(DHCP_SERVICE) {
            continue;
        }
        writeln!(
            out,
            "deleting existing role {} ({})",
            role.id,
            role.field("type").unwrap_or(&role.kind)
        )?;
        if let Some(message) = api.delete(role.id).await? {
            writeln!(out, "{}", message)?;
        }
    }

    if let Some(role) = api
        .get_dhcp_deployment_role(network.id, servers.primary_interface)
        .await?
    {
        writeln!(out, "role {} exists for network", role.id)?;
        return Ok(role.id);
    }

    let role_id = api
        .add_dhcp_deployment_role(
            network.id,
            servers.primary_interface,
            MASTER_ROLE,
            properties,
        )
        .await?;
    info!("Added DHCP role {} on network {}", role_id, network.id);
    Ok(role_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_properties() {
        let single = RoleServers {
            primary_interface: 10,
            failover_interface: None,
        };
        assert!(single.role_properties().is_empty());

        let pair = RoleServers {
            primary_interface: 10,
            failover_interface: Some(11),
        };
        assert_eq!(pair.role_properties().encode(), "secondaryServerInterfaceId=11|");
    }
}
