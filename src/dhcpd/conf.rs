//! `dhcpd.conf` parser and serializer.
//!
//! Only top-level `subnet <network> netmask <netmask> { ... }` and `host <name> { ... }`
//! declarations are modelled. Inside them, unknown statements and nested blocks are left out
//! of the model and kept by [`ConfDocument`]. A declaration that can't be turned into a [`Subnet`] or [`Reservation`] without inventing a
//! required value is reported as [`Entry::Skipped`] instead of failing the whole document.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use crate::dhcpd::model::{
    is_hostname, is_ipv4, is_mac, reservation_id, subnet_id, Reservation, Subnet,
    DEFAULT_LEASE_TIME, MAX_LEASE_TIME,
};
use crate::dhcpd::syntax::{self, starts_with, unquote, Node};
use crate::error::Error;

/// The outcome of reading one top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Subnet(Subnet),
    Reservation(Reservation),
    Skipped(SkippedBlock),
}

/// A `subnet` or `host` declaration that was left out of the parse result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub kind: &'static str,
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The declaration header lacks the named word, e.g. `netmask`.
    MissingHeaderField(&'static str),
    /// A statement that must be present in the body is absent.
    MissingStatement(&'static str),
    InvalidAddress { field: &'static str, value: String },
    InvalidMac(String),
    InvalidHostname(String),
    /// A `range` statement without one or two addresses.
    InvalidRange(String),
    /// A lease time that isn't a number of seconds that fits in 32 bits.
    InvalidLeaseTime { field: &'static str, value: String },
    /// The input ended before the closing `}`.
    Unterminated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingHeaderField(field) => write!(f, "header has no {field}"),
            SkipReason::MissingStatement(statement) => write!(f, "no {statement} statement"),
            SkipReason::InvalidAddress { field, value } => {
                write!(f, "{field} \"{value}\" is not a dotted-quad IPv4 address")
            }
            SkipReason::InvalidMac(mac) => write!(f, "\"{mac}\" is not a MAC address"),
            SkipReason::InvalidHostname(name) => write!(f, "\"{name}\" is not a host name"),
            SkipReason::InvalidRange(range) => write!(f, "\"range {range}\" is not a valid range"),
            SkipReason::InvalidLeaseTime { field, value } => {
                write!(f, "{field} \"{value}\" is not a number of seconds")
            }
            SkipReason::Unterminated => write!(f, "block is never closed"),
        }
    }
}

impl From<SkippedBlock> for Error {
    fn from(skipped: SkippedBlock) -> Self {
        Error::MalformedBlock {
            kind: skipped.kind.to_string(),
            line: skipped.line,
            reason: skipped.reason.to_string(),
        }
    }
}

/// A parsed `dhcpd.conf` that remembers everything it doesn't model.
///
/// Global statements (`authoritative;`, `ddns-update-style none;`, ...), blocks other than
/// `subnet` and `host`, and skipped declarations are kept as `passthrough` nodes and written
/// back ahead of the modelled declarations. Statements and nested blocks of a declaration that
/// have no field in [`Subnet`] or [`Reservation`] (`pool { ... }`, `option subnet-mask ...;`,
/// a second `range`, ...) are kept in `subnet_extras` / `reservation_extras` under the
/// declaration's id and written back inside it. Comments are not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfDocument {
    pub passthrough: Vec<Node>,
    pub subnets: Vec<Subnet>,
    pub reservations: Vec<Reservation>,
    pub subnet_extras: HashMap<String, Vec<Node>>,
    pub reservation_extras: HashMap<String, Vec<Node>>,
    pub skipped: Vec<SkippedBlock>,
}

impl ConfDocument {
    /// Render the document: passthrough nodes first, then the declarations in the layout of
    /// [`serialize`], with their extra content before the closing `}`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.passthrough {
            node.render(&mut out, 0);
        }
        let blocks = self
            .subnets
            .iter()
            .map(|subnet| subnet_block(subnet, extras(&self.subnet_extras, &subnet.id)))
            .chain(self.reservations.iter().map(|reservation| {
                host_block(reservation, extras(&self.reservation_extras, &reservation.id))
            }));
        let declarations = blocks.collect::<Vec<_>>().join("\n");
        if !out.is_empty() && !declarations.is_empty() {
            out.push('\n');
        }
        out.push_str(&declarations);
        out
    }

    /// Carry the extra content of subnet `from` over to subnet `to`.
    pub fn rekey_subnet(&mut self, from: &str, to: &str) {
        rekey(&mut self.subnet_extras, from, to);
    }

    /// Carry the extra content of reservation `from` over to reservation `to`.
    pub fn rekey_reservation(&mut self, from: &str, to: &str) {
        rekey(&mut self.reservation_extras, from, to);
    }
}

fn extras<'a>(map: &'a HashMap<String, Vec<Node>>, id: &str) -> &'a [Node] {
    map.get(id).map_or(&[], Vec::as_slice)
}

fn rekey(map: &mut HashMap<String, Vec<Node>>, from: &str, to: &str) {
    if from == to {
        return;
    }
    if let Some(nodes) = map.remove(from) {
        map.entry(to.to_string()).or_default().extend(nodes);
    }
}

/// Parse `text`, leniently skipping malformed declarations.
#[must_use]
pub fn parse(text: &str) -> (Vec<Subnet>, Vec<Reservation>) {
    let doc = parse_document(text);
    (doc.subnets, doc.reservations)
}

/// Parse `text`, failing on the first malformed declaration.
///
/// # Errors
///
/// Returns [`Error::MalformedBlock`] for the first declaration the lenient [`parse`] would
/// skip.
pub fn parse_strict(text: &str) -> Result<(Vec<Subnet>, Vec<Reservation>), Error> {
    let doc = parse_document(text);
    match doc.skipped.into_iter().next() {
        Some(skipped) => Err(skipped.into()),
        None => Ok((doc.subnets, doc.reservations)),
    }
}

/// Parse every top-level `subnet` and `host` declaration of `text`, in source order.
#[must_use]
pub fn parse_entries(text: &str) -> Vec<Entry> {
    syntax::parse(text)
        .iter()
        .filter_map(read_declaration)
        .map(|declaration| match declaration {
            Ok(Declaration::Subnet(subnet, _)) => Entry::Subnet(subnet),
            Ok(Declaration::Host(reservation, _)) => Entry::Reservation(reservation),
            Err(skipped) => Entry::Skipped(skipped),
        })
        .collect()
}

/// Parse `text` into a [`ConfDocument`].
#[must_use]
pub fn parse_document(text: &str) -> ConfDocument {
    let mut doc = ConfDocument::default();
    for node in syntax::parse(text) {
        match read_declaration(&node) {
            Some(Ok(Declaration::Subnet(subnet, extra))) => {
                if !extra.is_empty() {
                    doc.subnet_extras
                        .entry(subnet.id.clone())
                        .or_default()
                        .extend(extra);
                }
                doc.subnets.push(subnet);
            }
            Some(Ok(Declaration::Host(reservation, extra))) => {
                if !extra.is_empty() {
                    doc.reservation_extras
                        .entry(reservation.id.clone())
                        .or_default()
                        .extend(extra);
                }
                doc.reservations.push(reservation);
            }
            Some(Err(skipped)) => {
                tracing::warn!(
                    "keeping {} block at line {} as written: {}",
                    skipped.kind,
                    skipped.line,
                    skipped.reason
                );
                doc.skipped.push(skipped);
                doc.passthrough.push(node);
            }
            None => {
                if matches!(node, Node::Block { closed: false, .. }) {
                    tracing::warn!("closing unterminated block at line {}", node.line());
                }
                doc.passthrough.push(node);
            }
        }
    }
    doc
}

/// Render subnets and reservations as `dhcpd.conf` declarations, in the order given.
///
/// A subnet with only one of `range_start` / `range_end` is written without a `range`
/// statement.
#[must_use]
pub fn serialize(subnets: &[Subnet], reservations: &[Reservation]) -> String {
    let mut blocks: Vec<String> = Vec::with_capacity(subnets.len() + reservations.len());
    blocks.extend(subnets.iter().map(|subnet| subnet_block(subnet, &[])));
    blocks.extend(reservations.iter().map(|reservation| host_block(reservation, &[])));
    blocks.join("\n")
}

fn subnet_block(subnet: &Subnet, extra: &[Node]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "subnet {} netmask {} {{",
        subnet.network, subnet.netmask
    );
    match subnet.range() {
        Some((start, end)) => {
            let _ = writeln!(out, "    range {start} {end};");
        }
        None if subnet.range_start.is_some() || subnet.range_end.is_some() => {
            tracing::warn!("omitting one-sided range of subnet {}", subnet.id);
        }
        None => {}
    }
    if let Some(routers) = &subnet.routers {
        let _ = writeln!(out, "    option routers {routers};");
    }
    if let Some(servers) = &subnet.domain_name_servers {
        let _ = writeln!(out, "    option domain-name-servers {servers};");
    }
    if let Some(domain_name) = &subnet.domain_name {
        let _ = writeln!(out, "    option domain-name \"{domain_name}\";");
    }
    let _ = writeln!(out, "    default-lease-time {};", subnet.default_lease_time);
    let _ = writeln!(out, "    max-lease-time {};", subnet.max_lease_time);
    for node in extra {
        node.render(&mut out, 1);
    }
    out.push_str("}\n");
    out
}

fn host_block(reservation: &Reservation, extra: &[Node]) -> String {
    let mut out = format!(
        "host {} {{\n    hardware ethernet {};\n    fixed-address {};\n",
        reservation.hostname, reservation.mac, reservation.ip
    );
    for node in extra {
        node.render(&mut out, 1);
    }
    out.push_str("}\n");
    out
}

/// A modelled declaration and the nodes of its body that have no field in the model.
enum Declaration {
    Subnet(Subnet, Vec<Node>),
    Host(Reservation, Vec<Node>),
}

/// `None` for anything but a `subnet` or `host` block.
fn read_declaration(node: &Node) -> Option<Result<Declaration, SkippedBlock>> {
    let Node::Block {
        header,
        body,
        line,
        closed,
    } = node
    else {
        return None;
    };
    let (kind, read): (&'static str, fn(&[String], &[Node]) -> Result<Declaration, SkipReason>) =
        match header.first().map(String::as_str) {
            Some("subnet") => ("subnet", read_subnet),
            Some("host") => ("host", read_host),
            _ => return None,
        };
    let declaration = if *closed {
        read(header, body)
    } else {
        Err(SkipReason::Unterminated)
    };
    Some(declaration.map_err(|reason| SkippedBlock {
        kind,
        line: *line,
        reason,
    }))
}

fn join_value(words: &[String]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

fn lease_time(field: &'static str, value: &str) -> Result<u32, SkipReason> {
    value.parse().map_err(|_| SkipReason::InvalidLeaseTime {
        field,
        value: value.to_string(),
    })
}

const DEFAULT_TIME: &str = "default-lease-time";
const MAX_TIME: &str = "max-lease-time";

fn read_subnet(header: &[String], body: &[Node]) -> Result<Declaration, SkipReason> {
    // subnet <network> netmask <netmask>
    let network = header
        .get(1)
        .ok_or(SkipReason::MissingHeaderField("network"))?;
    if header.get(2).map(String::as_str) != Some("netmask") {
        return Err(SkipReason::MissingHeaderField("netmask"));
    }
    let netmask = header
        .get(3)
        .ok_or(SkipReason::MissingHeaderField("netmask"))?;
    for (field, value) in [("network", network), ("netmask", netmask)] {
        if !is_ipv4(value) {
            return Err(SkipReason::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    let mut subnet = Subnet {
        id: subnet_id(network, netmask),
        network: network.clone(),
        netmask: netmask.clone(),
        range_start: None,
        range_end: None,
        routers: None,
        domain_name_servers: None,
        domain_name: None,
        default_lease_time: DEFAULT_LEASE_TIME,
        max_lease_time: MAX_LEASE_TIME,
    };
    let mut extra = Vec::new();
    // The first statement for each field is modelled, repeats are kept as written.
    let mut seen: HashSet<&'static str> = HashSet::new();

    for node in body {
        let Node::Statement { words, .. } = node else {
            extra.push(node.clone());
            continue;
        };
        let modelled = match words.as_slice() {
            [keyword, rest @ ..] if keyword == "range" && seen.insert("range") => {
                // `range dynamic-bootp A B;` is a range too.
                let bounds = match rest {
                    [flag, bounds @ ..] if flag == "dynamic-bootp" => bounds,
                    bounds => bounds,
                };
                // A single address is a range of one.
                let (start, end) = match bounds {
                    [start, end] => (start, end),
                    [start] => (start, start),
                    _ => return Err(SkipReason::InvalidRange(rest.join(" "))),
                };
                for value in [start, end] {
                    if !is_ipv4(value) {
                        return Err(SkipReason::InvalidAddress {
                            field: "range",
                            value: value.clone(),
                        });
                    }
                }
                subnet.range_start = Some(start.clone());
                subnet.range_end = Some(end.clone());
                true
            }
            [option, name, rest @ ..] if option == "option" && !rest.is_empty() => {
                match name.as_str() {
                    "routers" if seen.insert("routers") => {
                        subnet.routers = join_value(rest);
                        true
                    }
                    "domain-name-servers" if seen.insert("domain-name-servers") => {
                        subnet.domain_name_servers = join_value(rest);
                        true
                    }
                    "domain-name" if seen.insert("domain-name") => {
                        subnet.domain_name = join_value(rest).map(|v| unquote(&v).to_string());
                        true
                    }
                    _ => false,
                }
            }
            [keyword, value] if keyword == "default-lease-time" && seen.insert(DEFAULT_TIME) => {
                subnet.default_lease_time = lease_time(DEFAULT_TIME, value)?;
                true
            }
            [keyword, value] if keyword == "max-lease-time" && seen.insert(MAX_TIME) => {
                subnet.max_lease_time = lease_time(MAX_TIME, value)?;
                true
            }
            _ => false,
        };
        if !modelled {
            extra.push(node.clone());
        }
    }
    Ok(Declaration::Subnet(subnet, extra))
}

fn read_host(header: &[String], body: &[Node]) -> Result<Declaration, SkipReason> {
    let name = header.get(1).ok_or(SkipReason::MissingHeaderField("name"))?;
    let hostname = unquote(name);
    if !is_hostname(hostname) {
        return Err(SkipReason::InvalidHostname(name.clone()));
    }

    let mut mac = None;
    let mut ip = None;
    let mut extra = Vec::new();
    for node in body {
        match node {
            Node::Statement { words, .. }
                if mac.is_none() && starts_with(words, &["hardware", "ethernet"]) =>
            {
                mac = Some(words.get(2).cloned().unwrap_or_default());
            }
            Node::Statement { words, .. }
                if ip.is_none() && starts_with(words, &["fixed-address"]) =>
            {
                ip = Some(words.get(1).cloned().unwrap_or_default());
            }
            node => extra.push(node.clone()),
        }
    }

    let mac = mac.ok_or(SkipReason::MissingStatement("hardware ethernet"))?;
    if !is_mac(&mac) {
        return Err(SkipReason::InvalidMac(mac));
    }
    let ip = ip.ok_or(SkipReason::MissingStatement("fixed-address"))?;
    if !is_ipv4(&ip) {
        return Err(SkipReason::InvalidAddress {
            field: "fixed-address",
            value: ip,
        });
    }

    let reservation = Reservation {
        id: reservation_id(&mac),
        hostname: hostname.to_string(),
        mac,
        ip,
        description: None,
    };
    Ok(Declaration::Host(reservation, extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCENARIO_A: &str = r#"
subnet 192.168.1.0 netmask 255.255.255.0 {
    range 192.168.1.100 192.168.1.200;
    option routers 192.168.1.1;
    option domain-name-servers 192.168.1.10;
    option domain-name "test.local";
    default-lease-time 86400;
    max-lease-time 172800;
}
host printer {
    hardware ethernet 00:11:22:33:44:55;
    fixed-address 192.168.1.50;
}
"#;

    fn subnet(network: &str, netmask: &str) -> Subnet {
        Subnet {
            id: subnet_id(network, netmask),
            network: network.into(),
            netmask: netmask.into(),
            range_start: None,
            range_end: None,
            routers: None,
            domain_name_servers: None,
            domain_name: None,
            default_lease_time: DEFAULT_LEASE_TIME,
            max_lease_time: MAX_LEASE_TIME,
        }
    }

    fn reservation(hostname: &str, mac: &str, ip: &str) -> Reservation {
        Reservation {
            id: reservation_id(mac),
            hostname: hostname.into(),
            mac: mac.into(),
            ip: ip.into(),
            description: None,
        }
    }

    #[test]
    fn test_parse_simple_config() {
        let (subnets, reservations) = parse(SCENARIO_A);
        assert_eq!(
            subnets,
            vec![Subnet {
                range_start: Some("192.168.1.100".into()),
                range_end: Some("192.168.1.200".into()),
                routers: Some("192.168.1.1".into()),
                domain_name_servers: Some("192.168.1.10".into()),
                domain_name: Some("test.local".into()),
                ..subnet("192.168.1.0", "255.255.255.0")
            }]
        );
        assert_eq!(subnets[0].id, "192-168-1-0-24");
        assert_eq!(
            reservations,
            vec![reservation("printer", "00:11:22:33:44:55", "192.168.1.50")]
        );
        assert_eq!(reservations[0].id, "00-11-22-33-44-55");
    }

    #[test]
    fn test_serialize_subnet_without_range() {
        let subnets = vec![Subnet {
            default_lease_time: 3600,
            max_lease_time: 7200,
            ..subnet("10.0.0.0", "255.0.0.0")
        }];
        let text = serialize(&subnets, &[]);
        assert_eq!(
            text,
            "subnet 10.0.0.0 netmask 255.0.0.0 {\n    default-lease-time 3600;\n    max-lease-time 7200;\n}\n"
        );
        assert!(!text.contains("range"));
    }

    #[test]
    fn test_serialize_layout() {
        let (subnets, reservations) = parse(SCENARIO_A);
        let text = serialize(&subnets, &reservations);
        assert_eq!(
            text,
            "subnet 192.168.1.0 netmask 255.255.255.0 {
    range 192.168.1.100 192.168.1.200;
    option routers 192.168.1.1;
    option domain-name-servers 192.168.1.10;
    option domain-name \"test.local\";
    default-lease-time 86400;
    max-lease-time 172800;
}

host printer {
    hardware ethernet 00:11:22:33:44:55;
    fixed-address 192.168.1.50;
}
"
        );
        assert_eq!(parse(&text), (subnets, reservations));
    }

    #[test]
    fn test_serialize_omits_partial_range() {
        let subnets = vec![Subnet {
            range_start: Some("10.0.0.10".into()),
            ..subnet("10.0.0.0", "255.0.0.0")
        }];
        let text = serialize(&subnets, &[]);
        assert!(!text.contains("range"));
        let (parsed, _) = parse(&text);
        assert_eq!(parsed[0].range_start, None);
        assert_eq!(parsed[0].range_end, None);
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(parse(""), (vec![], vec![]));
        let text = serialize(&[], &[]);
        assert!(text.trim().is_empty());
        assert_eq!(parse(&text), (vec![], vec![]));
    }

    #[test]
    fn test_order_preserved_across_kinds() {
        let text = "
host b { hardware ethernet 00:00:00:00:00:02; fixed-address 10.0.0.2; }
subnet 10.1.0.0 netmask 255.255.0.0 { }
host a { hardware ethernet 00:00:00:00:00:01; fixed-address 10.0.0.1; }
subnet 10.0.0.0 netmask 255.255.0.0 { }
";
        let (subnets, reservations) = parse(text);
        let networks: Vec<_> = subnets.iter().map(|s| s.network.as_str()).collect();
        let hosts: Vec<_> = reservations.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(networks, ["10.1.0.0", "10.0.0.0"]);
        assert_eq!(hosts, ["b", "a"]);
    }

    #[test]
    fn test_defaults_when_lease_times_missing() {
        let (subnets, _) = parse("subnet 10.0.0.0 netmask 255.0.0.0 {}");
        assert_eq!(subnets[0].default_lease_time, 86_400);
        assert_eq!(subnets[0].max_lease_time, 172_800);
    }

    #[test]
    fn test_unknown_statements_ignored() {
        let text = r#"
option domain-name "global";
authoritative;
subnet 10.0.0.0 netmask 255.0.0.0 {
    option broadcast-address 10.255.255.255;
    ddns-updates off;
    pool { range 10.0.0.50 10.0.0.60; }
    range dynamic-bootp 10.0.0.5 10.0.0.9;
}
"#;
        let (subnets, _) = parse(text);
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].range(), Some(("10.0.0.5", "10.0.0.9")));
        assert_eq!(subnets[0].domain_name, None);
    }

    #[test]
    fn test_comments_ignored() {
        let text = "
# subnet 10.9.0.0 netmask 255.255.0.0 { }
host printer { # office
    hardware ethernet 00:11:22:33:44:55; # label on the back
    # fixed-address 10.0.0.9;
    fixed-address 10.0.0.5;
}
";
        let (subnets, reservations) = parse(text);
        assert!(subnets.is_empty());
        assert_eq!(
            reservations,
            vec![reservation("printer", "00:11:22:33:44:55", "10.0.0.5")]
        );
    }

    #[test]
    fn test_multiple_dns_servers() {
        let (subnets, _) = parse(
            "subnet 10.0.0.0 netmask 255.0.0.0 { option domain-name-servers 10.0.0.2, 10.0.0.3; }",
        );
        assert_eq!(
            subnets[0].domain_name_servers.as_deref(),
            Some("10.0.0.2, 10.0.0.3")
        );
        let text = serialize(&subnets, &[]);
        assert!(text.contains("option domain-name-servers 10.0.0.2, 10.0.0.3;"));
    }

    #[test]
    fn test_malformed_blocks_skipped() {
        let text = "
subnet 10.0.0.0 { }
subnet 10.0.0.0 netmask { }
subnet 10.0.0.300 netmask 255.0.0.0 { }
subnet 10.1.0.0 netmask 255.255.0.0 { range 10.1.0.5 10.1.0.6 10.1.0.7; }
host nomac { fixed-address 10.0.0.1; }
host noip { hardware ethernet 00:11:22:33:44:55; }
host badmac { hardware ethernet 00:11:22:33:44; fixed-address 10.0.0.1; }
host badip { hardware ethernet 00:11:22:33:44:55; fixed-address 10.0.0; }
subnet 10.2.0.0 netmask 255.255.0.0 { }
host ok { hardware ethernet 00:11:22:33:44:66; fixed-address 10.2.0.1; }
";
        let entries = parse_entries(text);
        let reasons: Vec<_> = entries
            .iter()
            .filter_map(|e| match e {
                Entry::Skipped(s) => Some((s.kind, s.line, s.reason.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("subnet", 2, SkipReason::MissingHeaderField("netmask")),
                ("subnet", 3, SkipReason::MissingHeaderField("netmask")),
                (
                    "subnet",
                    4,
                    SkipReason::InvalidAddress {
                        field: "network",
                        value: "10.0.0.300".into()
                    }
                ),
                (
                    "subnet",
                    5,
                    SkipReason::InvalidRange("10.1.0.5 10.1.0.6 10.1.0.7".into())
                ),
                ("host", 6, SkipReason::MissingStatement("hardware ethernet")),
                ("host", 7, SkipReason::MissingStatement("fixed-address")),
                ("host", 8, SkipReason::InvalidMac("00:11:22:33:44".into())),
                (
                    "host",
                    9,
                    SkipReason::InvalidAddress {
                        field: "fixed-address",
                        value: "10.0.0".into()
                    }
                ),
            ]
        );

        let (subnets, reservations) = parse(text);
        assert_eq!(subnets, vec![subnet("10.2.0.0", "255.255.0.0")]);
        assert_eq!(
            reservations,
            vec![reservation("ok", "00:11:22:33:44:66", "10.2.0.1")]
        );
    }

    #[test]
    fn test_single_address_range() {
        let (subnets, _) = parse("subnet 10.0.0.0 netmask 255.0.0.0 { range 10.0.0.7; }");
        assert_eq!(subnets[0].range(), Some(("10.0.0.7", "10.0.0.7")));

        let (subnets, _) = parse("subnet 10.0.0.0 netmask 255.0.0.0 { range 10.0.0.7 x; }");
        assert!(subnets.is_empty());
    }

    #[test]
    fn test_unterminated_block_skipped() {
        let text = "subnet 10.2.0.0 netmask 255.255.0.0 { }\nhost cut { hardware ethernet 00:11:22:33:44:66;";
        let (subnets, reservations) = parse(text);
        assert_eq!(subnets.len(), 1);
        assert!(reservations.is_empty());
        assert!(matches!(
            parse_entries(text).last(),
            Some(Entry::Skipped(SkippedBlock {
                reason: SkipReason::Unterminated,
                ..
            }))
        ));
    }

    #[test]
    fn test_parse_strict() {
        assert!(parse_strict(SCENARIO_A).is_ok());
        let err = parse_strict("host x { fixed-address 10.0.0.1; }").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedBlock { ref kind, line: 1, .. } if kind == "host"
        ));
    }

    #[test]
    fn test_mac_case_preserved() {
        let (_, reservations) =
            parse("host x { hardware ethernet AA:bb:CC:dd:EE:ff; fixed-address 10.0.0.1; }");
        assert_eq!(reservations[0].mac, "AA:bb:CC:dd:EE:ff");
        assert_eq!(reservations[0].id, "aa-bb-cc-dd-ee-ff");
    }

    #[test]
    fn test_quoted_host_name() {
        let (_, reservations) =
            parse("host \"printer\" { hardware ethernet 00:11:22:33:44:55; fixed-address 10.0.0.1; }");
        assert_eq!(reservations[0].hostname, "printer");
    }

    #[test]
    fn test_document_keeps_passthrough() {
        let text = "# global settings
ddns-update-style none;
authoritative;
subnet 10.0.0.0 netmask 255.0.0.0 { }
shared-network lan {
    option domain-name \"lan\";
}
host broken { }
";
        let doc = parse_document(text);
        assert_eq!(doc.passthrough.len(), 4);
        assert_eq!(doc.subnets.len(), 1);
        assert_eq!(doc.skipped.len(), 1);
        assert_eq!(
            doc.render(),
            "ddns-update-style none;
authoritative;
shared-network lan {
    option domain-name \"lan\";
}
host broken {
}

subnet 10.0.0.0 netmask 255.0.0.0 {
    default-lease-time 86400;
    max-lease-time 172800;
}
"
        );
        let rendered = doc.render();
        assert_eq!(parse_document(&rendered).render(), rendered);
    }

    #[test]
    fn test_document_keeps_declaration_extras() {
        let text = "subnet 10.0.0.0 netmask 255.0.0.0 {
    option subnet-mask 255.0.0.0;
    range 10.0.0.5 10.0.0.9;
    range 10.0.1.5 10.0.1.9;
    pool {
        range 10.0.2.5 10.0.2.9;
    }
}
host nas {
    hardware ethernet 00:11:22:33:44:77;
    fixed-address nas.corp.local;
}
host printer {
    option host-name \"printer\";
    hardware ethernet 00:11:22:33:44:55;
    fixed-address 10.0.0.50;
}
";
        let doc = parse_document(text);
        assert_eq!(doc.subnets[0].range(), Some(("10.0.0.5", "10.0.0.9")));
        assert_eq!(doc.skipped.len(), 1);
        assert_eq!(
            doc.render(),
            "host nas {
    hardware ethernet 00:11:22:33:44:77;
    fixed-address nas.corp.local;
}

subnet 10.0.0.0 netmask 255.0.0.0 {
    range 10.0.0.5 10.0.0.9;
    default-lease-time 86400;
    max-lease-time 172800;
    option subnet-mask 255.0.0.0;
    range 10.0.1.5 10.0.1.9;
    pool {
        range 10.0.2.5 10.0.2.9;
    }
}

host printer {
    hardware ethernet 00:11:22:33:44:55;
    fixed-address 10.0.0.50;
    option host-name \"printer\";
}
"
        );
        let rendered = doc.render();
        assert_eq!(parse_document(&rendered).render(), rendered);
        assert_eq!(parse(&rendered), parse(text));
    }

    #[test]
    fn test_document_rekey_moves_extras() {
        let mut doc = parse_document(
            "subnet 10.0.0.0 netmask 255.0.0.0 { pool { range 10.0.0.5 10.0.0.9; } }",
        );
        doc.subnets[0] = subnet("10.0.0.0", "255.255.0.0");
        doc.rekey_subnet("10-0-0-0-8", "10-0-0-0-16");
        assert!(doc.render().contains("netmask 255.255.0.0 {"));
        assert!(doc.render().contains("    pool {\n        range 10.0.0.5 10.0.0.9;\n    }\n"));
        assert!(!doc.subnet_extras.contains_key("10-0-0-0-8"));
    }

    #[test]
    fn test_unreadable_lease_time_skipped() {
        let text = "subnet 10.0.0.0 netmask 255.0.0.0 { default-lease-time 4294967296; }\n\
                    subnet 10.1.0.0 netmask 255.255.0.0 { max-lease-time forever; }\n";
        let entries = parse_entries(text);
        assert_eq!(
            entries,
            vec![
                Entry::Skipped(SkippedBlock {
                    kind: "subnet",
                    line: 1,
                    reason: SkipReason::InvalidLeaseTime {
                        field: "default-lease-time",
                        value: "4294967296".into()
                    },
                }),
                Entry::Skipped(SkippedBlock {
                    kind: "subnet",
                    line: 2,
                    reason: SkipReason::InvalidLeaseTime {
                        field: "max-lease-time",
                        value: "forever".into()
                    },
                }),
            ]
        );
        let rendered = parse_document(text).render();
        assert!(rendered.contains("default-lease-time 4294967296;"));
        assert!(rendered.contains("max-lease-time forever;"));
    }

    #[test]
    fn test_document_empty() {
        assert_eq!(parse_document("").render(), "");
    }
}
