// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Enumerations and small value types shared by the whole model

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Configuration views
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Datatype {
    Candidate,
    Running,
    Startup,
    State,
    Import,
    Audit,
}

/// Operations of configuration requests
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Read,
    ReadSibling,
    ReadSiblingBegin,
    ReadSiblingCount,
}
impl Operation {
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
    #[must_use]
    pub fn is_read(self) -> bool {
        !self.is_write()
    }
}

/// Validity of one attribute of a value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidFlag {
    Invalid,
    Valid,
    ValidNoValue,
    NotSupported,
    ValueNotModified,
}

/// Application status of a row or of one of its attributes
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigStatus {
    Applied,
    NotApplied,
    PartiallyApplied,
    #[default]
    Invalid,
    NotSupported,
}
impl ConfigStatus {
    /// Combine the statuses of the same row on distinct controllers
    #[must_use]
    pub fn merge(self, other: ConfigStatus) -> ConfigStatus {
        match (self, other) {
            (ConfigStatus::Invalid, x) | (x, ConfigStatus::Invalid) => x,
            (a, b) if a == b => a,
            _ => ConfigStatus::PartiallyApplied,
        }
    }
}

/// Operational status reported by controllers
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminStatus {
    Enable,
    Disable,
}

/// Direction of a flow-filter
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    In,
    Out,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowAction {
    Pass,
    Drop,
    Redirect,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IpType {
    Ip,
    Ipv6,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoutingType {
    QinQ,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VunknownType {
    Bridge,
    Router,
}

/// An Ethernet MAC address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mac = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut mac {
            let part = parts.next().ok_or_else(|| format!("'{s}' is too short"))?;
            if part.len() != 2 {
                return Err(format!("'{s}' has a malformed octet '{part}'"));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|e| format!("'{s}': {e}"))?;
        }
        if parts.next().is_some() {
            return Err(format!("'{s}' is too long"));
        }
        Ok(MacAddr(mac))
    }
}
impl TryFrom<String> for MacAddr {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        MacAddr::from_str(&value)
    }
}
impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

/// Mapping of a vnode interface onto a physical port
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMap {
    pub logical_port_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    #[serde(default)]
    pub tagged: bool,
}
impl Display for PortMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.logical_port_id)?;
        if let Some(vlan) = self.vlan_id {
            write!(f, " vlan {vlan}")?;
            if self.tagged {
                write!(f, " tagged")?;
            }
        }
        Ok(())
    }
}
