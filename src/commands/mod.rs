//! Bulk workflows built on the resolvers.
//!
//! Every command reads identifiers one at a time, writes a human-readable
//! report to `out`, and keeps going after per-line failures. Fatal errors
//! (transport, ambiguity) are returned immediately.

pub mod delete_ranges;
pub mod deployment_role;
pub mod lease_time;

use crate::entity::Entity;
use crate::error::{BamError, Result};
use std::io::Write;
use tracing::warn;

pub use delete_ranges::delete_dhcp_ranges;
pub use deployment_role::{RoleServers, replace_dhcp_roles};
pub use lease_time::{add_lease_times, get_lease_times};

/// Per-run counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Tokens resolved and acted on
    pub processed: usize,
    /// Tokens with no matching object
    pub not_found: usize,
    /// Tokens rejected before or after lookup
    pub invalid: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.processed + self.not_found + self.invalid
    }
}

/// Report a per-line error and count it; fatal errors are handed back.
pub(crate) fn skip_line<W: Write>(
    out: &mut W,
    summary: &mut Summary,
    token: &str,
    err: BamError,
) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!("Skipping {}: {}", token, err);
    writeln!(out, "ERROR - {}", err)?;
    summary.invalid += 1;
    Ok(())
}

pub(crate) fn not_found<W: Write>(out: &mut W, summary: &mut Summary, token: &str) -> Result<()> {
    writeln!(out, "not found {}", token)?;
    summary.not_found += 1;
    Ok(())
}

/// `type: IP4Network, name: office, CIDR: 10.2.1.0/24` with empty fields left out
pub(crate) fn describe(entity: &Entity) -> String {
    let mut fields = Vec::new();
    if !entity.kind.is_empty() {
        fields.push(format!("type: {}", entity.kind));
    }
    if let Some(name) = entity.name.as_deref().filter(|n| !n.is_empty()) {
        fields.push(format!("name: {}", name));
    }
    for key in ["CIDR", "start", "end"] {
        if let Some(value) = entity.property(key) {
            fields.push(format!("{}: {}", key, value));
        }
    }
    fields.join(", ")
}
