use super::{Summary, describe, not_found, skip_line};
use crate::api::{BamApi, BamApiExt};
use crate::classify::{ObjectKind, ObjectRef, Scope};
use crate::entity::{Entity, EntityId, Properties};
use crate::error::{BamError, Result};
use crate::input::TokenReader;
use std::io::Write;
use tracing::{Instrument, debug, info, info_span};

/// DHCP options reported and set by the lease-time commands
pub const LEASE_OPTIONS: [&str; 3] = ["default-lease-time", "max-lease-time", "min-lease-time"];

const DHCP_SERVICE_OPTION: &str = "DHCPServiceOption";

/// Print the lease-time options set on, or inherited by, each object.
///
/// Without a server, options for every server are shown.
pub async fn get_lease_times<A, W>(
    api: &A,
    scope: &Scope,
    input: &mut TokenReader,
    kind: Option<ObjectKind>,
    server_id: Option<EntityId>,
    out: &mut W,
) -> Result<Summary>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let mut summary = Summary::default();
    let server = server_param(server_id, -1);

    while let Some(token) = input.next_token().await? {
        let span = info_span!("object", token = %token);
        let Some(entity) = resolve_object(api, scope, &token, kind, out, &mut summary)
            .instrument(span.clone())
            .await?
        else {
            continue;
        };

        async {
            if entity.cidr().is_some() {
                writeln!(out, "{}", describe(&entity))?;
            } else {
                writeln!(out, "{} Options:", describe(&entity))?;
            }

            let options = api
                .get_deployment_options(entity.id, DHCP_SERVICE_OPTION, server)
                .await?;
            debug!("{} deployment options on {}", options.len(), entity.id);
            for option in options
                .iter()
                .filter(|o| LEASE_OPTIONS.contains(&o.name_or_empty()))
            {
                writeln!(
                    out,
                    "    {:>18} {}   inherited: {}",
                    option.name_or_empty(),
                    option.field("value").unwrap_or(""),
                    option.property("inherited").unwrap_or("?")
                )?;
            }
            Ok::<_, BamError>(())
        }
        .instrument(span)
        .await?;

        summary.processed += 1;
    }

    info!("get_lease_times done: {:?}", summary);
    Ok(summary)
}

/// Set each lease-time option to `lease_time` where it is not already set.
///
/// With a server the option is scoped to it through the `server` property.
pub async fn add_lease_times<A, W>(
    api: &A,
    scope: &Scope,
    input: &mut TokenReader,
    kind: Option<ObjectKind>,
    server_id: Option<EntityId>,
    lease_time: &str,
    out: &mut W,
) -> Result<Summary>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let mut summary = Summary::default();
    let server = server_param(server_id, 0);
    let properties = match server_id {
        Some(id) => Properties::new().with("server", id.to_string()),
        None => Properties::new(),
    };

    while let Some(token) = input.next_token().await? {
        let span = info_span!("object", token = %token);
        let Some(entity) = resolve_object(api, scope, &token, kind, out, &mut summary)
            .instrument(span.clone())
            .await?
        else {
            continue;
        };

        async {
            writeln!(out, "For entity: {}", describe(&entity))?;

            for name in LEASE_OPTIONS {
                if let Some(option) = api
                    .get_dhcp_service_deployment_option(entity.id, name, server)
                    .await?
                {
                    writeln!(
                        out,
                        "    option {} already set to {}",
                        name,
                        option.field("value").unwrap_or("")
                    )?;
                    continue;
                }

                let option_id = api
                    .add_dhcp_service_deployment_option(entity.id, name, lease_time, &properties)
                    .await?;
                info!("Added {}={} on {} as {}", name, lease_time, entity.id, option_id);

                match api
                    .get_dhcp_service_deployment_option(entity.id, name, server)
                    .await?
                {
                    Some(option) => writeln!(
                        out,
                        "    Added deployment option: {}, value: {}, inherited: {}",
                        describe(&option),
                        option.field("value").unwrap_or(""),
                        option.property("inherited").unwrap_or("?")
                    )?,
                    None => writeln!(out, "    Added deployment option {} id={}", name, option_id)?,
                }
            }
            Ok::<_, BamError>(())
        }
        .instrument(span)
        .await?;

        summary.processed += 1;
    }

    info!("add_lease_times done: {:?}", summary);
    Ok(summary)
}

/// Parse and look up one identifier, reporting per-line problems.
///
/// `Ok(None)` means the line was reported and should be skipped.
async fn resolve_object<A, W>(
    api: &A,
    scope: &Scope,
    token: &str,
    kind: Option<ObjectKind>,
    out: &mut W,
    summary: &mut Summary,
) -> Result<Option<Entity>>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let object = match ObjectRef::parse(token, kind) {
        Ok(object) => object,
        Err(err) => {
            skip_line(out, summary, token, err)?;
            return Ok(None);
        }
    };

    match object.resolve(api, scope).await {
        Ok(Some(entity)) => {
            debug!("{} resolved to {} id={}", object, entity.kind, entity.id);
            Ok(Some(entity))
        }
        Ok(None) => {
            not_found(out, summary, token)?;
            Ok(None)
        }
        Err(err) => {
            skip_line(out, summary, token, err)?;
            Ok(None)
        }
    }
}

/// The `serverId` argument: the server's id, or `none` when unset
fn server_param(server_id: Option<EntityId>, none: i64) -> i64 {
    server_id
        .and_then(|id| i64::try_from(id).ok())
        .unwrap_or(none)
}
