//! Subnet, reservation and lease records.
//!
//! The JSON field names of these types are the HTTP API wire format.

use macaddr::MacAddr6;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Error;

pub const DEFAULT_LEASE_TIME: u32 = 86_400;
pub const MAX_LEASE_TIME: u32 = 172_800;

fn default_lease_time() -> u32 {
    DEFAULT_LEASE_TIME
}

fn max_lease_time() -> u32 {
    MAX_LEASE_TIME
}

/// One `subnet <network> netmask <netmask> { ... }` declaration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    pub network: String,
    pub netmask: String,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    pub routers: Option<String>,
    pub domain_name_servers: Option<String>,
    pub domain_name: Option<String>,
    pub default_lease_time: u32,
    pub max_lease_time: u32,
}

/// The client-submitted body for creating or replacing a [`Subnet`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetSpec {
    pub network: String,
    pub netmask: String,
    #[serde(default)]
    pub range_start: Option<String>,
    #[serde(default)]
    pub range_end: Option<String>,
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub domain_name_servers: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default = "default_lease_time")]
    pub default_lease_time: u32,
    #[serde(default = "max_lease_time")]
    pub max_lease_time: u32,
}

/// One `host <hostname> { ... }` static reservation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: String,
    pub hostname: String,
    pub mac: String,
    pub ip: String,
    /// Free text for operators. `dhcpd.conf` has no place for it, so it is never written to
    /// the remote server and is always `None` after a reload.
    pub description: Option<String>,
}

/// The client-submitted body for creating or replacing a [`Reservation`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReservationSpec {
    pub hostname: String,
    pub mac: String,
    pub ip: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A lease read from `dhcpd.leases`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub ip: String,
    pub mac: String,
    pub hostname: Option<String>,
    pub starts: Option<String>,
    pub ends: Option<String>,
    pub state: String,
}

/// Derive the stable id of a subnet from its declaration header.
///
/// Dots become hyphens and a contiguous netmask is written as its prefix length, e.g.
/// `192.168.1.0` / `255.255.255.0` → `192-168-1-0-24`. Other masks are appended in full.
#[must_use]
pub fn subnet_id(network: &str, netmask: &str) -> String {
    let network = network.replace('.', "-");
    match prefix_len(netmask) {
        Some(prefix) => format!("{network}-{prefix}"),
        None => format!("{network}-{}", netmask.replace('.', "-")),
    }
}

/// Derive the stable id of a reservation from its MAC address.
#[must_use]
pub fn reservation_id(mac: &str) -> String {
    mac.to_lowercase().replace(':', "-")
}

fn prefix_len(netmask: &str) -> Option<u32> {
    let bits = u32::from(Ipv4Addr::from_str(netmask).ok()?);
    let prefix = bits.leading_ones();
    (bits.checked_shl(prefix).unwrap_or(0) == 0).then_some(prefix)
}

pub(crate) fn is_ipv4(value: &str) -> bool {
    Ipv4Addr::from_str(value).is_ok()
}

/// Six colon-separated pairs of hex digits, in either case. `dhcpd` accepts no other
/// notation, so the dashed and dotted forms `MacAddr6` also parses are refused.
pub(crate) fn is_mac(value: &str) -> bool {
    value.len() == 17 && value.split(':').count() == 6 && MacAddr6::from_str(value).is_ok()
}

/// A name usable unquoted as a `host` declaration name.
pub(crate) fn is_hostname(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, ';' | '{' | '}' | '#' | '"'))
}

fn invalid(entity: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidEntity {
        entity,
        reason: reason.into(),
    }
}

fn check_ipv4(entity: &'static str, field: &str, value: &str) -> Result<(), Error> {
    if is_ipv4(value) {
        Ok(())
    } else {
        Err(invalid(
            entity,
            format!("{field} \"{value}\" is not a dotted-quad IPv4 address"),
        ))
    }
}

/// Option values are written as-is and read back as their words joined by single spaces, so
/// only values already in that form survive a reload.
fn check_option_value(entity: &'static str, field: &str, value: &str) -> Result<(), Error> {
    let words: Vec<&str> = value.split_whitespace().collect();
    if words.is_empty()
        || words.join(" ") != value
        || value.chars().any(char::is_control)
        || value.contains([';', '{', '}', '#', '"', '\\'])
    {
        return Err(invalid(entity, format!("{field} \"{value}\" is not allowed")));
    }
    Ok(())
}

impl SubnetSpec {
    /// Check that the subnet renders to a declaration `dhcpd` accepts and that parses back to
    /// the same values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntity`] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        const ENTITY: &str = "subnet";
        check_ipv4(ENTITY, "network", &self.network)?;
        check_ipv4(ENTITY, "netmask", &self.netmask)?;
        match (&self.range_start, &self.range_end) {
            (Some(start), Some(end)) => {
                check_ipv4(ENTITY, "range_start", start)?;
                check_ipv4(ENTITY, "range_end", end)?;
            }
            (None, None) => {}
            _ => {
                return Err(invalid(
                    ENTITY,
                    "range_start and range_end must be given together",
                ))
            }
        }
        if let Some(routers) = &self.routers {
            check_option_value(ENTITY, "routers", routers)?;
        }
        if let Some(servers) = &self.domain_name_servers {
            check_option_value(ENTITY, "domain_name_servers", servers)?;
        }
        if let Some(domain_name) = &self.domain_name {
            check_option_value(ENTITY, "domain_name", domain_name)?;
        }
        if self.default_lease_time == 0 || self.max_lease_time == 0 {
            return Err(invalid(ENTITY, "lease times must be greater than 0"));
        }
        Ok(())
    }
}

impl Subnet {
    #[must_use]
    pub fn from_spec(spec: SubnetSpec) -> Self {
        Self {
            id: subnet_id(&spec.network, &spec.netmask),
            network: spec.network,
            netmask: spec.netmask,
            range_start: spec.range_start,
            range_end: spec.range_end,
            routers: spec.routers,
            domain_name_servers: spec.domain_name_servers,
            domain_name: spec.domain_name,
            default_lease_time: spec.default_lease_time,
            max_lease_time: spec.max_lease_time,
        }
    }

    /// Both pool bounds, if the subnet has a complete range.
    #[must_use]
    pub fn range(&self) -> Option<(&str, &str)> {
        match (&self.range_start, &self.range_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

impl ReservationSpec {
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntity`] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        const ENTITY: &str = "reservation";
        if !is_hostname(&self.hostname) {
            return Err(invalid(
                ENTITY,
                format!("hostname \"{}\" is not allowed", self.hostname),
            ));
        }
        if !is_mac(&self.mac) {
            return Err(invalid(
                ENTITY,
                format!("mac \"{}\" is not a colon-separated MAC address", self.mac),
            ));
        }
        check_ipv4(ENTITY, "ip", &self.ip)
    }
}

impl Reservation {
    #[must_use]
    pub fn from_spec(spec: ReservationSpec) -> Self {
        Self {
            id: reservation_id(&spec.mac),
            hostname: spec.hostname,
            mac: spec.mac,
            ip: spec.ip,
            description: spec.description,
        }
    }

    /// Case-insensitive MAC address comparison.
    #[must_use]
    pub fn has_mac(&self, mac: &str) -> bool {
        self.mac.eq_ignore_ascii_case(mac)
    }
}
