//! `dhcpd.leases` parser.
//!
//! The lease file is an append-only journal: every renewal appends a new `lease <ip> { ... }`
//! block, so the last block listed for an address is its current state.

use std::collections::HashMap;

use crate::dhcpd::model::{is_ipv4, is_mac, Lease};
use crate::dhcpd::syntax::{self, starts_with, unquote, Node};

const DEFAULT_STATE: &str = "active";

/// The current lease of every address, one per IP.
///
/// When an address has several blocks the last one wins. Leases are ordered by the first
/// appearance of their address in the file. An address whose last block names no client
/// (`hardware ethernet` missing, as in many abandoned leases) is left out.
#[must_use]
pub fn parse_leases(text: &str) -> Vec<Lease> {
    let mut current: Vec<Option<Lease>> = Vec::new();
    let mut by_ip: HashMap<String, usize> = HashMap::new();
    for (ip, lease) in lease_blocks(text) {
        match by_ip.get(&ip) {
            Some(&idx) => current[idx] = lease,
            None => {
                by_ip.insert(ip, current.len());
                current.push(lease);
            }
        }
    }
    current.into_iter().flatten().collect()
}

/// Every well-formed `lease` block, in file order, including superseded ones.
#[must_use]
pub fn parse_lease_blocks(text: &str) -> Vec<Lease> {
    lease_blocks(text)
        .into_iter()
        .filter_map(|(_, lease)| lease)
        .collect()
}

/// Every closed `lease` block with a valid address, paired with its lease if it has a valid
/// `hardware ethernet`.
fn lease_blocks(text: &str) -> Vec<(String, Option<Lease>)> {
    syntax::parse(text)
        .iter()
        .filter_map(|node| match node {
            Node::Block {
                header,
                body,
                line,
                closed,
            } if header.first().map(String::as_str) == Some("lease") => {
                let block = read_lease(header, body, *closed);
                match &block {
                    None => tracing::debug!("skipping lease block at line {line}"),
                    Some((ip, None)) => {
                        tracing::debug!("lease block for {ip} at line {line} has no client");
                    }
                    Some(_) => {}
                }
                block
            }
            _ => None,
        })
        .collect()
}

fn read_lease(header: &[String], body: &[Node], closed: bool) -> Option<(String, Option<Lease>)> {
    if !closed {
        return None;
    }
    let ip = header.get(1).filter(|ip| is_ipv4(ip))?;

    let mut lease = Lease {
        ip: ip.clone(),
        mac: String::new(),
        hostname: None,
        starts: None,
        ends: None,
        state: DEFAULT_STATE.to_string(),
    };
    for node in body {
        let Node::Statement { words, .. } = node else {
            continue;
        };
        match words.as_slice() {
            [keyword, when @ ..] if keyword == "starts" => lease.starts = timestamp(when),
            [keyword, when @ ..] if keyword == "ends" => lease.ends = timestamp(when),
            [keyword, name, ..] if keyword == "client-hostname" => {
                lease.hostname = Some(unquote(name).to_string());
            }
            // `next binding state` and `rewind binding state` describe the future, not now.
            words if starts_with(words, &["binding", "state"]) => {
                if let Some(state) = words.get(2) {
                    lease.state = state.clone();
                }
            }
            words if starts_with(words, &["hardware", "ethernet"]) => {
                if let Some(mac) = words.get(2) {
                    lease.mac = mac.clone();
                }
            }
            _ => {}
        }
    }
    Some((ip.clone(), is_mac(&lease.mac).then_some(lease)))
}

/// `<weekday> YYYY/MM/DD HH:MM:SS` keeps the date and time. `never`, `epoch N` and other forms
/// are kept as written.
fn timestamp(words: &[String]) -> Option<String> {
    match words {
        [] => None,
        [weekday, date, time] if weekday.len() == 1 && weekday.chars().all(|c| c.is_ascii_digit()) => {
            Some(format!("{date} {time}"))
        }
        words => Some(words.join(" ")),
    }
}
