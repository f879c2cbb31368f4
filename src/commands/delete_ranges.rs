use super::{Summary, not_found, skip_line};
use crate::api::{BamApi, BamApiExt, types};
use crate::classify::{Scope, resolve_identifier};
use crate::entity::Entity;
use crate::error::{BamError, Result};
use crate::input::TokenReader;
use crate::lister;
use crate::network::range_size;
use crate::reverse::Cidr;
use std::io::Write;
use tracing::{Instrument, debug, info, info_span};

/// Delete every DHCP range under each network named in `input`.
///
/// Tokens may be CIDRs, reverse zone names or forward zone names. With
/// `dry_run` the ranges are listed but left in place.
pub async fn delete_dhcp_ranges<A, W>(
    api: &A,
    scope: &Scope,
    input: &mut TokenReader,
    out: &mut W,
    dry_run: bool,
) -> Result<Summary>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let mut summary = Summary::default();

    while let Some(token) = input.next_token().await? {
        let span = info_span!("line", token = %token);
        let processed = async {
            let result = match resolve_identifier(api, &token, scope).await {
                Ok(Some(entity)) => delete_under(api, &token, &entity, out, dry_run).await,
                Ok(None) => return not_found(out, &mut summary, &token).map(|_| false),
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => Ok(true),
                Err(err) => skip_line(out, &mut summary, &token, err).map(|_| false),
            }
        }
        .instrument(span)
        .await?;

        if processed {
            summary.processed += 1;
        }
    }

    info!("delete_dhcp_ranges done: {:?}", summary);
    Ok(summary)
}

async fn delete_under<A, W>(
    api: &A,
    token: &str,
    entity: &Entity,
    out: &mut W,
    dry_run: bool,
) -> Result<()>
where
    A: BamApi + ?Sized,
    W: Write,
{
    let Some(cidr) = entity.cidr() else {
        return Err(BamError::InvalidIdentifier(format!(
            "{} is a {}, not a network",
            token, entity.kind
        )));
    };
    let size = cidr
        .parse::<Cidr>()
        .map(|c| c.size().to_string())
        .unwrap_or_else(|_| "?".to_string());
    writeln!(out, "Network: {}\t{} size {}", entity.name_or_empty(), cidr, size)?;

    let ranges = lister::get_all_entities(api, entity.id, types::DHCP4_RANGE).await?;
    debug!("{} has {} DHCP ranges", cidr, ranges.len());
    if ranges.is_empty() {
        writeln!(out, "    DHCP_range: none")?;
        return Ok(());
    }

    for range in &ranges {
        writeln!(
            out,
            "    DHCP_range: {}-{}\tsize {}",
            range.property("start").unwrap_or("?"),
            range.property("end").unwrap_or("?"),
            range_size(range).map_or_else(|| "?".to_string(), |n| n.to_string())
        )?;

        if dry_run {
            writeln!(out, "Not deleted (dry run)")?;
            continue;
        }

        match api.delete(range.id).await? {
            None => writeln!(out, "Deleted")?,
            Some(message) => writeln!(out, "{}", message)?,
        }
    }

    Ok(())
}
