//! CIDR parsing and conversion between CIDR blocks and `in-addr.arpa` zone names.
//!
//! Only the octet-aligned /8, /16 and /24 boundaries have a reverse zone;
//! every other prefix is rejected rather than approximated.

use crate::error::{BamError, Result};
use ipnetwork::Ipv4Network;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Suffix shared by all IPv4 reverse zones
pub const REVERSE_SUFFIX: &str = "in-addr.arpa";

lazy_static! {
    static ref CIDR_SHAPE: Regex = Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}/[0-9]{1,2}$")
        .expect("Failed to compile CIDR regex");
    static ref DOTTED_QUAD_SHAPE: Regex =
        Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").expect("Failed to compile address regex");
    static ref OCTET_LABEL: Regex =
        Regex::new(r"^[0-9]{1,3}$").expect("Failed to compile octet regex");
}

/// An IPv4 block in `a.b.c.d/prefix` form, parsed strictly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr(Ipv4Network);

impl Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        Ipv4Network::new(addr, prefix)
            .map(Self)
            .map_err(|_| BamError::InvalidCidr(format!("{}/{}", addr, prefix)))
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0.ip()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    /// Number of addresses covered by the block
    pub fn size(&self) -> u64 {
        match self.0.prefix() {
            0 => 1 << 32,
            _ => u64::from(self.0.size()),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.ip(), self.0.prefix())
    }
}

impl FromStr for Cidr {
    type Err = BamError;

    /// Accepts exactly `[0-9]{1,3}(\.[0-9]{1,3}){3}/[0-9]{1,2}` with octets
    /// up to 255 and a prefix up to 32.
    fn from_str(s: &str) -> Result<Self> {
        // ipnetwork alone would take a bare address as /32
        if !CIDR_SHAPE.is_match(s) {
            return Err(BamError::InvalidCidr(s.to_string()));
        }
        s.parse::<Ipv4Network>()
            .map(Self)
            .map_err(|_| BamError::InvalidCidr(s.to_string()))
    }
}

/// Parse a strict dotted quad: four groups of 1 to 3 digits, each <= 255
pub fn parse_dotted_quad(s: &str) -> Option<Ipv4Addr> {
    if !DOTTED_QUAD_SHAPE.is_match(s) {
        return None;
    }
    s.parse::<Ipv4Network>()
        .ok()
        .filter(|network| network.prefix() == 32)
        .map(|network| network.ip())
}

fn parse_octet(label: &str) -> Option<u8> {
    if !OCTET_LABEL.is_match(label) {
        return None;
    }
    label.parse().ok()
}

/// Convert a reverse zone name to the CIDR block it covers.
///
/// `1.2.10.in-addr.arpa` becomes `10.2.1.0/24`, `2.10.in-addr.arpa` becomes
/// `10.2.0.0/16` and `10.in-addr.arpa` becomes `10.0.0.0/8`.
pub fn zone_name_to_cidr(zone_name: &str) -> Result<Cidr> {
    let name = zone_name.trim_end_matches('.');
    let labels: Vec<&str> = name.split('.').collect();

    let suffix_at = labels
        .len()
        .checked_sub(2)
        .filter(|&at| labels[at..].join(".").eq_ignore_ascii_case(REVERSE_SUFFIX))
        .ok_or_else(|| BamError::InvalidZoneName(zone_name.to_string()))?;

    let octet_labels = &labels[..suffix_at];
    let prefix = match octet_labels.len() {
        1 => 8,
        2 => 16,
        3 => 24,
        _ => return Err(BamError::UnsupportedZoneDepth(zone_name.to_string())),
    };

    let mut octets = [0u8; 4];
    for (slot, label) in octets.iter_mut().zip(octet_labels.iter().rev()) {
        *slot = parse_octet(label).ok_or_else(|| BamError::InvalidZoneName(zone_name.to_string()))?;
    }

    Cidr::new(Ipv4Addr::from(octets), prefix)
}

/// Convert a CIDR string to its reverse zone name.
///
/// Fails with [`BamError::InvalidCidr`] when the string is not a strict
/// dotted-quad CIDR and with [`BamError::UnsupportedCidr`] for any prefix other
/// than /8, /16 or /24.
pub fn cidr_to_zone_name(cidr: &str) -> Result<String> {
    let parsed: Cidr = cidr.parse()?;
    cidr_zone_name(&parsed).ok_or_else(|| BamError::UnsupportedCidr(cidr.to_string()))
}

/// Reverse zone name of an already parsed block, if its prefix has one
pub fn cidr_zone_name(cidr: &Cidr) -> Option<String> {
    let labels = match cidr.prefix() {
        8 => 1,
        16 => 2,
        24 => 3,
        _ => return None,
    };
    let octets = cidr.addr().octets();
    let mut parts: Vec<String> = octets[..labels]
        .iter()
        .rev()
        .map(|octet| octet.to_string())
        .collect();
    parts.push(REVERSE_SUFFIX.to_string());
    Some(parts.join("."))
}
