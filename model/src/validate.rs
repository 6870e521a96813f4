// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Field-level syntax checks shared by all key types

use std::fmt::Display;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::errors::{UpllError, UpllResult};
use crate::types::MacAddr;

pub const MAX_LEN_NAME: usize = 31;
pub const MAX_LEN_CTRLR_ID: usize = 31;
pub const MAX_LEN_DOMAIN_ID: usize = 31;
pub const MAX_LEN_DESCRIPTION: usize = 127;
pub const MAX_LEN_LOGICAL_PORT_ID: usize = 319;
pub const DEFAULT_DOMAIN_ID: &str = "(DEFAULT)";

/// Object names: 1..=31 alphanumeric or '_' characters, starting with an alphanumeric
pub fn check_name(what: &'static str, name: &str) -> UpllResult<()> {
    if name.is_empty() || name.len() > MAX_LEN_NAME {
        return Err(UpllError::syntax(
            what,
            format!("'{name}' must have 1 to {MAX_LEN_NAME} characters"),
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(UpllError::syntax(
            what,
            format!("'{name}' must start with an alphanumeric character"),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UpllError::syntax(
            what,
            format!("'{name}' has characters other than alphanumerics and '_'"),
        ));
    }
    Ok(())
}

/// Like [`check_name`] but the empty string is accepted
pub fn check_optional_name(what: &'static str, name: &str) -> UpllResult<()> {
    if name.is_empty() {
        Ok(())
    } else {
        check_name(what, name)
    }
}

fn check_id(what: &'static str, id: &str, max: usize) -> UpllResult<()> {
    if id.is_empty() || id.len() > max {
        return Err(UpllError::syntax(
            what,
            format!("'{id}' must have 1 to {max} characters"),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UpllError::syntax(
            what,
            format!("'{id}' has characters other than alphanumerics, '_' and '-'"),
        ));
    }
    Ok(())
}

pub fn check_ctrlr_id(id: &str) -> UpllResult<()> {
    check_id("controller_id", id, MAX_LEN_CTRLR_ID)
}

pub fn check_domain_id(id: &str) -> UpllResult<()> {
    if id == DEFAULT_DOMAIN_ID {
        return Ok(());
    }
    check_id("domain_id", id, MAX_LEN_DOMAIN_ID)
}

/// Descriptions: up to 127 printable ASCII characters
pub fn check_description(what: &'static str, desc: &str) -> UpllResult<()> {
    if desc.len() > MAX_LEN_DESCRIPTION {
        return Err(UpllError::syntax(
            what,
            format!("longer than {MAX_LEN_DESCRIPTION} characters"),
        ));
    }
    if !desc.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err(UpllError::syntax(what, "non-printable characters"));
    }
    Ok(())
}

pub fn check_range<T: PartialOrd + Display>(
    what: &'static str,
    value: T,
    min: T,
    max: T,
) -> UpllResult<()> {
    if value < min || value > max {
        return Err(UpllError::syntax(
            what,
            format!("{value} is out of range [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// An IPv4 address usable by a host or as a next-hop
pub fn check_host_ipv4(what: &'static str, addr: Ipv4Addr) -> UpllResult<()> {
    if addr.is_unspecified() || addr.is_multicast() || addr.is_broadcast() || addr.is_loopback()
    {
        return Err(UpllError::syntax(what, format!("{addr} is not a host address")));
    }
    Ok(())
}

/// The IPv4 network `addr/prefixlen`, host bits included
pub fn ipv4_net(what: &'static str, addr: Ipv4Addr, prefixlen: u8) -> UpllResult<Ipv4Net> {
    Ipv4Net::new(addr, prefixlen)
        .map_err(|e| UpllError::syntax(what, format!("{addr}/{prefixlen}: {e}")))
}

/// A destination prefix: `addr` must have no bits set beyond `prefixlen`
pub fn check_network_prefix(
    what: &'static str,
    addr: Ipv4Addr,
    prefixlen: u8,
) -> UpllResult<Ipv4Net> {
    let net = ipv4_net(what, addr, prefixlen)?;
    if net.trunc() != net {
        return Err(UpllError::syntax(
            what,
            format!("{net} has host bits set (mask {})", net.netmask()),
        ));
    }
    Ok(net)
}

/// Tell if two IPv4 subnets overlap
#[must_use]
pub fn subnets_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(b) || b.contains(a)
}

/// A MAC address usable as a unicast source or destination
pub fn check_unicast_mac(what: &'static str, mac: MacAddr) -> UpllResult<()> {
    if mac.is_zero() || mac.is_broadcast() || mac.is_multicast() {
        return Err(UpllError::syntax(what, format!("{mac} is not a unicast address")));
    }
    Ok(())
}
