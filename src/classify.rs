//! Turning raw input tokens into backend entities.
//!
//! [`classify`] and [`resolve_identifier`] handle network-like tokens: reverse
//! zone names, CIDR blocks and forward zone names. [`ObjectRef`] handles the
//! identifiers taken by the lease-time commands: entity ids, addresses, CIDR
//! blocks and DHCP ranges.

use crate::api::{BamApi, BamApiExt, types};
use crate::entity::{Entity, EntityId};
use crate::error::{BamError, Result};
use crate::network;
use crate::reverse::{self, Cidr, parse_dotted_quad};
use crate::zone;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::{debug, info};

/// Marker that identifies a reverse zone name
const REVERSE_MARKER: &str = ".in-addr.arpa";

/// Configuration and View every lookup in a run is scoped under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub configuration_id: EntityId,
    pub view_id: Option<EntityId>,
}

impl Scope {
    /// Look up the Configuration (and View, if named). Missing ones are fatal.
    pub async fn resolve<A>(api: &A, configuration: &str, view: Option<&str>) -> Result<Self>
    where
        A: BamApi + ?Sized,
    {
        let configuration_id = api
            .get_entity_by_name(0, configuration, types::CONFIGURATION)
            .await?
            .ok_or_else(|| BamError::ConfigurationNotFound(configuration.to_string()))?
            .id;

        let view_id = match view {
            Some(view) => Some(
                api.get_entity_by_name(configuration_id, view, types::VIEW)
                    .await?
                    .ok_or_else(|| BamError::ViewNotFound(view.to_string()))?
                    .id,
            ),
            None => None,
        };

        debug!(
            "Scope: configuration {} id={} view={:?}",
            configuration, configuration_id, view_id
        );
        Ok(Self {
            configuration_id,
            view_id,
        })
    }
}

/// What a network-like token refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// `1.2.10.in-addr.arpa` and the block it covers
    ReverseZone { zone_name: String, cidr: Cidr },
    /// `10.2.1.0/24`, with its reverse zone when the prefix has one
    Network { cidr: Cidr, zone_name: Option<String> },
    /// Anything else is a forward zone name
    Zone(String),
}

impl Identifier {
    /// The block to resolve, for reverse zones and CIDRs
    pub fn cidr(&self) -> Option<&Cidr> {
        match self {
            Identifier::ReverseZone { cidr, .. } | Identifier::Network { cidr, .. } => Some(cidr),
            Identifier::Zone(_) => None,
        }
    }
}

/// Classify a trimmed token.
///
/// Reverse zone names are converted to their CIDR; CIDRs are validated
/// strictly and also given their reverse zone name for diagnostics. An
/// unsupported prefix such as /20 only leaves that name empty.
pub fn classify(token: &str) -> Result<Identifier> {
    if token.to_ascii_lowercase().contains(REVERSE_MARKER) {
        let cidr = reverse::zone_name_to_cidr(token)?;
        return Ok(Identifier::ReverseZone {
            zone_name: token.to_string(),
            cidr,
        });
    }

    if token.contains('/') {
        let cidr: Cidr = token.parse()?;
        let zone_name = reverse::cidr_zone_name(&cidr);
        return Ok(Identifier::Network { cidr, zone_name });
    }

    Ok(Identifier::Zone(token.to_string()))
}

/// Resolve a network-like token to a network, block or zone.
///
/// `Ok(None)` means the backend has no exact match. Malformed tokens are
/// per-line errors (see [`BamError::is_fatal`]).
pub async fn resolve_identifier<A>(api: &A, token: &str, scope: &Scope) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
{
    let identifier = classify(token)?;
    match &identifier {
        Identifier::ReverseZone { zone_name, cidr } => {
            info!("found in-addr: {} -> {}", zone_name, cidr);
        }
        Identifier::Network { cidr, zone_name } => {
            info!(
                "CIDR {}, zone {}, ip {}, prefix {}",
                cidr,
                zone_name.as_deref().unwrap_or("-"),
                cidr.addr(),
                cidr.prefix()
            );
        }
        Identifier::Zone(name) => debug!("zone name: {}", name),
    }

    match identifier {
        Identifier::ReverseZone { cidr, .. } | Identifier::Network { cidr, .. } => {
            network::find_network(api, &cidr, scope.configuration_id).await
        }
        Identifier::Zone(name) => {
            let view_id = scope.view_id.ok_or_else(|| BamError::MissingView(name.clone()))?;
            zone::find_zone(api, &name, view_id).await
        }
    }
}

/// Object types a lease-time identifier can be pinned to with `--type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Address,
    Block,
    Network,
    Range,
}

impl ObjectKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ObjectKind::Address => types::IP4_ADDRESS,
            ObjectKind::Block => types::IP4_BLOCK,
            ObjectKind::Network => types::IP4_NETWORK,
            ObjectKind::Range => types::DHCP4_RANGE,
        }
    }
}

impl FromStr for ObjectKind {
    type Err = BamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            types::IP4_ADDRESS => Ok(ObjectKind::Address),
            types::IP4_BLOCK => Ok(ObjectKind::Block),
            types::IP4_NETWORK => Ok(ObjectKind::Network),
            types::DHCP4_RANGE => Ok(ObjectKind::Range),
            other => Err(BamError::InvalidIdentifier(format!(
                "unknown object type {:?}, expected IP4Address, IP4Block, IP4Network or DHCP4Range",
                other
            ))),
        }
    }
}

/// A lease-time command target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    /// All digits
    Id(EntityId),
    /// `n.n.n.n`
    Address(Ipv4Addr),
    /// `n.n.n.n/p`, optionally pinned to one address-space type
    Network {
        cidr: Cidr,
        kind: Option<&'static str>,
    },
    /// `n.n.n.n-m.m.m.m`
    Range { start: Ipv4Addr, end: Ipv4Addr },
}

impl ObjectRef {
    /// Pattern-match a token, or interpret it as `kind` when given
    pub fn parse(token: &str, kind: Option<ObjectKind>) -> Result<Self> {
        let invalid = || BamError::InvalidIdentifier(token.to_string());

        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            let id: EntityId = token.parse().map_err(|_| invalid())?;
            return if id == 0 { Err(invalid()) } else { Ok(ObjectRef::Id(id)) };
        }

        let kind = match kind {
            Some(kind) => kind,
            None if token.contains('-') => ObjectKind::Range,
            None if token.contains('/') => {
                return Ok(ObjectRef::Network {
                    cidr: token.parse()?,
                    kind: None,
                });
            }
            None => ObjectKind::Address,
        };

        match kind {
            ObjectKind::Address => parse_dotted_quad(token)
                .map(ObjectRef::Address)
                .ok_or_else(invalid),
            ObjectKind::Block | ObjectKind::Network => Ok(ObjectRef::Network {
                cidr: token.parse()?,
                kind: Some(kind.type_name()),
            }),
            ObjectKind::Range => {
                let (start, end) = token.split_once('-').ok_or_else(invalid)?;
                let start = parse_dotted_quad(start.trim()).ok_or_else(invalid)?;
                let end = parse_dotted_quad(end.trim()).ok_or_else(invalid)?;
                Ok(ObjectRef::Range { start, end })
            }
        }
    }

    /// Fetch the referenced entity; `Ok(None)` when the backend has none
    pub async fn resolve<A>(&self, api: &A, scope: &Scope) -> Result<Option<Entity>>
    where
        A: BamApi + ?Sized,
    {
        let configuration_id = scope.configuration_id;
        match self {
            ObjectRef::Id(id) => api.get_entity_by_id(*id).await,
            ObjectRef::Address(address) => {
                network::find_address(api, *address, configuration_id).await
            }
            ObjectRef::Network { cidr, kind: None } => {
                network::find_network(api, cidr, configuration_id).await
            }
            ObjectRef::Network {
                cidr,
                kind: Some(kind),
            } => network::find_network_of_types(api, cidr, configuration_id, &[*kind]).await,
            ObjectRef::Range { start, end } => {
                network::find_dhcp_range(api, *start, *end, configuration_id).await
            }
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Id(id) => write!(f, "{}", id),
            ObjectRef::Address(address) => write!(f, "{}", address),
            ObjectRef::Network { cidr, .. } => write!(f, "{}", cidr),
            ObjectRef::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}
