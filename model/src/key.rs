// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Keys of configuration objects.
//!
//! Each key struct embeds the key of its parent, so the parent key of any object is a
//! field projection. When serialized, the embedded keys are flattened: a vBridge
//! interface key reads `{kt: vbr_if, vtn_name: .., vbridge_name: .., if_name: ..}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::{UpllError, UpllResult};
use crate::keytype::KeyType;
use crate::types::Direction;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VtnKey {
    pub vtn_name: String,
}
impl VtnKey {
    pub fn new(vtn_name: impl Into<String>) -> Self {
        Self {
            vtn_name: vtn_name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VbrKey {
    #[serde(flatten)]
    pub vtn: VtnKey,
    pub vbridge_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VbrIfKey {
    #[serde(flatten)]
    pub vbr: VbrKey,
    pub if_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VrtKey {
    #[serde(flatten)]
    pub vtn: VtnKey,
    pub vrouter_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VrtIfKey {
    #[serde(flatten)]
    pub vrt: VrtKey,
    pub if_name: String,
}

/// A static route of a vRouter. The network monitor group is optional (empty).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaticIpRouteKey {
    #[serde(flatten)]
    pub vrt: VrtKey,
    pub dst_addr: Ipv4Addr,
    pub dst_prefixlen: u8,
    pub next_hop_addr: Ipv4Addr,
    #[serde(default)]
    pub nwm_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VtermKey {
    #[serde(flatten)]
    pub vtn: VtnKey,
    pub vterminal_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VtermIfKey {
    #[serde(flatten)]
    pub vterm: VtermKey,
    pub if_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VunknownKey {
    #[serde(flatten)]
    pub vtn: VtnKey,
    pub vunknown_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VunkIfKey {
    #[serde(flatten)]
    pub vunk: VunknownKey,
    pub if_name: String,
}

/// The flow-filter of an interface, for one direction
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IfFlowFilterKey<I> {
    #[serde(flatten)]
    pub if_key: I,
    pub direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IfFlowFilterEntryKey<I> {
    #[serde(flatten)]
    pub ff: IfFlowFilterKey<I>,
    pub sequence_num: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowListKey {
    pub flowlist_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnifiedNetworkKey {
    pub unified_nw_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnwSpineDomainKey {
    #[serde(flatten)]
    pub unw: UnifiedNetworkKey,
    pub spine_id: String,
}

/// Interfaces that may carry flow-filters
pub trait FlowFilterIf:
    Clone + Debug + Eq + Ord + Hash + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const IF_KT: KeyType;
    const FF_KT: KeyType;
    const ENTRY_KT: KeyType;

    fn vtn(&self) -> &VtnKey;
    fn into_key(self) -> ConfigKey;
    fn wrap_ff(key: IfFlowFilterKey<Self>) -> ConfigKey;
    fn wrap_entry(key: IfFlowFilterEntryKey<Self>) -> ConfigKey;
    fn ff_of(key: &ConfigKey) -> Option<&IfFlowFilterKey<Self>>;
    fn entry_of(key: &ConfigKey) -> Option<&IfFlowFilterEntryKey<Self>>;
}

impl FlowFilterIf for VbrIfKey {
    const IF_KT: KeyType = KeyType::VbrIf;
    const FF_KT: KeyType = KeyType::VbrIfFlowFilter;
    const ENTRY_KT: KeyType = KeyType::VbrIfFlowFilterEntry;

    fn vtn(&self) -> &VtnKey {
        &self.vbr.vtn
    }
    fn into_key(self) -> ConfigKey {
        ConfigKey::VbrIf(self)
    }
    fn wrap_ff(key: IfFlowFilterKey<Self>) -> ConfigKey {
        ConfigKey::VbrIfFlowFilter(key)
    }
    fn wrap_entry(key: IfFlowFilterEntryKey<Self>) -> ConfigKey {
        ConfigKey::VbrIfFlowFilterEntry(key)
    }
    fn ff_of(key: &ConfigKey) -> Option<&IfFlowFilterKey<Self>> {
        match key {
            ConfigKey::VbrIfFlowFilter(k) => Some(k),
            _ => None,
        }
    }
    fn entry_of(key: &ConfigKey) -> Option<&IfFlowFilterEntryKey<Self>> {
        match key {
            ConfigKey::VbrIfFlowFilterEntry(k) => Some(k),
            _ => None,
        }
    }
}

impl FlowFilterIf for VtermIfKey {
    const IF_KT: KeyType = KeyType::VtermIf;
    const FF_KT: KeyType = KeyType::VtermIfFlowFilter;
    const ENTRY_KT: KeyType = KeyType::VtermIfFlowFilterEntry;

    fn vtn(&self) -> &VtnKey {
        &self.vterm.vtn
    }
    fn into_key(self) -> ConfigKey {
        ConfigKey::VtermIf(self)
    }
    fn wrap_ff(key: IfFlowFilterKey<Self>) -> ConfigKey {
        ConfigKey::VtermIfFlowFilter(key)
    }
    fn wrap_entry(key: IfFlowFilterEntryKey<Self>) -> ConfigKey {
        ConfigKey::VtermIfFlowFilterEntry(key)
    }
    fn ff_of(key: &ConfigKey) -> Option<&IfFlowFilterKey<Self>> {
        match key {
            ConfigKey::VtermIfFlowFilter(k) => Some(k),
            _ => None,
        }
    }
    fn entry_of(key: &ConfigKey) -> Option<&IfFlowFilterEntryKey<Self>> {
        match key {
            ConfigKey::VtermIfFlowFilterEntry(k) => Some(k),
            _ => None,
        }
    }
}

/// The key of any configuration object
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kt", rename_all = "snake_case")]
pub enum ConfigKey {
    Root,
    FlowList(FlowListKey),
    UnifiedNetwork(UnifiedNetworkKey),
    UnwSpineDomain(UnwSpineDomainKey),
    Vtn(VtnKey),
    Vbridge(VbrKey),
    VbrIf(VbrIfKey),
    VbrIfFlowFilter(IfFlowFilterKey<VbrIfKey>),
    VbrIfFlowFilterEntry(IfFlowFilterEntryKey<VbrIfKey>),
    Vrouter(VrtKey),
    VrtIf(VrtIfKey),
    StaticIpRoute(StaticIpRouteKey),
    Vterminal(VtermKey),
    VtermIf(VtermIfKey),
    VtermIfFlowFilter(IfFlowFilterKey<VtermIfKey>),
    VtermIfFlowFilterEntry(IfFlowFilterEntryKey<VtermIfKey>),
    Vunknown(VunknownKey),
    VunkIf(VunkIfKey),
}

impl ConfigKey {
    #[must_use]
    pub fn vtn(name: &str) -> Self {
        ConfigKey::Vtn(VtnKey::new(name))
    }
    #[must_use]
    pub fn flowlist(name: &str) -> Self {
        ConfigKey::FlowList(FlowListKey {
            flowlist_name: name.to_owned(),
        })
    }

    #[must_use]
    pub fn key_type(&self) -> KeyType {
        match self {
            ConfigKey::Root => KeyType::Root,
            ConfigKey::FlowList(_) => KeyType::FlowList,
            ConfigKey::UnifiedNetwork(_) => KeyType::UnifiedNetwork,
            ConfigKey::UnwSpineDomain(_) => KeyType::UnwSpineDomain,
            ConfigKey::Vtn(_) => KeyType::Vtn,
            ConfigKey::Vbridge(_) => KeyType::Vbridge,
            ConfigKey::VbrIf(_) => KeyType::VbrIf,
            ConfigKey::VbrIfFlowFilter(_) => KeyType::VbrIfFlowFilter,
            ConfigKey::VbrIfFlowFilterEntry(_) => KeyType::VbrIfFlowFilterEntry,
            ConfigKey::Vrouter(_) => KeyType::Vrouter,
            ConfigKey::VrtIf(_) => KeyType::VrtIf,
            ConfigKey::StaticIpRoute(_) => KeyType::StaticIpRoute,
            ConfigKey::Vterminal(_) => KeyType::Vterminal,
            ConfigKey::VtermIf(_) => KeyType::VtermIf,
            ConfigKey::VtermIfFlowFilter(_) => KeyType::VtermIfFlowFilter,
            ConfigKey::VtermIfFlowFilterEntry(_) => KeyType::VtermIfFlowFilterEntry,
            ConfigKey::Vunknown(_) => KeyType::Vunknown,
            ConfigKey::VunkIf(_) => KeyType::VunkIf,
        }
    }

    /// The key of the parent object. The root has no parent.
    #[must_use]
    pub fn parent_key(&self) -> Option<ConfigKey> {
        let parent = match self {
            ConfigKey::Root => return None,
            ConfigKey::FlowList(_) | ConfigKey::UnifiedNetwork(_) | ConfigKey::Vtn(_) => {
                ConfigKey::Root
            }
            ConfigKey::UnwSpineDomain(k) => ConfigKey::UnifiedNetwork(k.unw.clone()),
            ConfigKey::Vbridge(k) => ConfigKey::Vtn(k.vtn.clone()),
            ConfigKey::VbrIf(k) => ConfigKey::Vbridge(k.vbr.clone()),
            ConfigKey::VbrIfFlowFilter(k) => ConfigKey::VbrIf(k.if_key.clone()),
            ConfigKey::VbrIfFlowFilterEntry(k) => ConfigKey::VbrIfFlowFilter(k.ff.clone()),
            ConfigKey::Vrouter(k) => ConfigKey::Vtn(k.vtn.clone()),
            ConfigKey::VrtIf(k) => ConfigKey::Vrouter(k.vrt.clone()),
            ConfigKey::StaticIpRoute(k) => ConfigKey::Vrouter(k.vrt.clone()),
            ConfigKey::Vterminal(k) => ConfigKey::Vtn(k.vtn.clone()),
            ConfigKey::VtermIf(k) => ConfigKey::Vterminal(k.vterm.clone()),
            ConfigKey::VtermIfFlowFilter(k) => ConfigKey::VtermIf(k.if_key.clone()),
            ConfigKey::VtermIfFlowFilterEntry(k) => ConfigKey::VtermIfFlowFilter(k.ff.clone()),
            ConfigKey::Vunknown(k) => ConfigKey::Vtn(k.vtn.clone()),
            ConfigKey::VunkIf(k) => ConfigKey::Vunknown(k.vunk.clone()),
        };
        Some(parent)
    }

    fn vtn_key(&self) -> Option<&VtnKey> {
        match self {
            ConfigKey::Root
            | ConfigKey::FlowList(_)
            | ConfigKey::UnifiedNetwork(_)
            | ConfigKey::UnwSpineDomain(_) => None,
            ConfigKey::Vtn(k) => Some(k),
            ConfigKey::Vbridge(k) => Some(&k.vtn),
            ConfigKey::VbrIf(k) => Some(&k.vbr.vtn),
            ConfigKey::VbrIfFlowFilter(k) => Some(k.if_key.vtn()),
            ConfigKey::VbrIfFlowFilterEntry(k) => Some(k.ff.if_key.vtn()),
            ConfigKey::Vrouter(k) => Some(&k.vtn),
            ConfigKey::VrtIf(k) => Some(&k.vrt.vtn),
            ConfigKey::StaticIpRoute(k) => Some(&k.vrt.vtn),
            ConfigKey::Vterminal(k) => Some(&k.vtn),
            ConfigKey::VtermIf(k) => Some(&k.vterm.vtn),
            ConfigKey::VtermIfFlowFilter(k) => Some(k.if_key.vtn()),
            ConfigKey::VtermIfFlowFilterEntry(k) => Some(k.ff.if_key.vtn()),
            ConfigKey::Vunknown(k) => Some(&k.vtn),
            ConfigKey::VunkIf(k) => Some(&k.vunk.vtn),
        }
    }

    fn vtn_key_mut(&mut self) -> Option<&mut VtnKey> {
        match self {
            ConfigKey::Root
            | ConfigKey::FlowList(_)
            | ConfigKey::UnifiedNetwork(_)
            | ConfigKey::UnwSpineDomain(_) => None,
            ConfigKey::Vtn(k) => Some(k),
            ConfigKey::Vbridge(k) => Some(&mut k.vtn),
            ConfigKey::VbrIf(k) => Some(&mut k.vbr.vtn),
            ConfigKey::VbrIfFlowFilter(k) => Some(&mut k.if_key.vbr.vtn),
            ConfigKey::VbrIfFlowFilterEntry(k) => Some(&mut k.ff.if_key.vbr.vtn),
            ConfigKey::Vrouter(k) => Some(&mut k.vtn),
            ConfigKey::VrtIf(k) => Some(&mut k.vrt.vtn),
            ConfigKey::StaticIpRoute(k) => Some(&mut k.vrt.vtn),
            ConfigKey::Vterminal(k) => Some(&mut k.vtn),
            ConfigKey::VtermIf(k) => Some(&mut k.vterm.vtn),
            ConfigKey::VtermIfFlowFilter(k) => Some(&mut k.if_key.vterm.vtn),
            ConfigKey::VtermIfFlowFilterEntry(k) => Some(&mut k.ff.if_key.vterm.vtn),
            ConfigKey::Vunknown(k) => Some(&mut k.vtn),
            ConfigKey::VunkIf(k) => Some(&mut k.vunk.vtn),
        }
    }

    /// The name of the VTN this object belongs to, if any
    #[must_use]
    pub fn vtn_name(&self) -> Option<&str> {
        self.vtn_key().map(|k| k.vtn_name.as_str())
    }

    /// The same key, in a VTN named `name`. Keys outside VTNs are returned unchanged.
    #[must_use]
    pub fn with_vtn_name(&self, name: &str) -> ConfigKey {
        let mut key = self.clone();
        if let Some(vtn) = key.vtn_key_mut() {
            name.clone_into(&mut vtn.vtn_name);
        }
        key
    }

    #[must_use]
    pub fn flowlist_name(&self) -> Option<&str> {
        match self {
            ConfigKey::FlowList(k) => Some(&k.flowlist_name),
            _ => None,
        }
    }

    /// The same key with the flow list renamed. Other keys are returned unchanged.
    #[must_use]
    pub fn with_flowlist_name(&self, name: &str) -> ConfigKey {
        match self {
            ConfigKey::FlowList(_) => ConfigKey::flowlist(name),
            _ => self.clone(),
        }
    }

    /// Tell if `ancestor` is this key or one of its ancestors
    #[must_use]
    pub fn is_within(&self, ancestor: &ConfigKey) -> bool {
        std::iter::successors(Some(self.clone()), ConfigKey::parent_key).any(|k| k == *ancestor)
    }

    /// Build the key of a child of type `kt` whose last key field is `leaf`.
    /// Static routes are keyed by several fields and cannot be built this way.
    pub fn child_key(&self, kt: KeyType, leaf: &str) -> UpllResult<ConfigKey> {
        let leaf_s = leaf.to_owned();
        let child = match (self, kt) {
            (ConfigKey::Root, KeyType::Vtn) => ConfigKey::vtn(leaf),
            (ConfigKey::Root, KeyType::FlowList) => ConfigKey::flowlist(leaf),
            (ConfigKey::Root, KeyType::UnifiedNetwork) => {
                ConfigKey::UnifiedNetwork(UnifiedNetworkKey {
                    unified_nw_id: leaf_s,
                })
            }
            (ConfigKey::UnifiedNetwork(k), KeyType::UnwSpineDomain) => {
                ConfigKey::UnwSpineDomain(UnwSpineDomainKey {
                    unw: k.clone(),
                    spine_id: leaf_s,
                })
            }
            (ConfigKey::Vtn(k), KeyType::Vbridge) => ConfigKey::Vbridge(VbrKey {
                vtn: k.clone(),
                vbridge_name: leaf_s,
            }),
            (ConfigKey::Vtn(k), KeyType::Vrouter) => ConfigKey::Vrouter(VrtKey {
                vtn: k.clone(),
                vrouter_name: leaf_s,
            }),
            (ConfigKey::Vtn(k), KeyType::Vterminal) => ConfigKey::Vterminal(VtermKey {
                vtn: k.clone(),
                vterminal_name: leaf_s,
            }),
            (ConfigKey::Vtn(k), KeyType::Vunknown) => ConfigKey::Vunknown(VunknownKey {
                vtn: k.clone(),
                vunknown_name: leaf_s,
            }),
            (ConfigKey::Vbridge(k), KeyType::VbrIf) => ConfigKey::VbrIf(VbrIfKey {
                vbr: k.clone(),
                if_name: leaf_s,
            }),
            (ConfigKey::Vrouter(k), KeyType::VrtIf) => ConfigKey::VrtIf(VrtIfKey {
                vrt: k.clone(),
                if_name: leaf_s,
            }),
            (ConfigKey::Vterminal(k), KeyType::VtermIf) => ConfigKey::VtermIf(VtermIfKey {
                vterm: k.clone(),
                if_name: leaf_s,
            }),
            (ConfigKey::Vunknown(k), KeyType::VunkIf) => ConfigKey::VunkIf(VunkIfKey {
                vunk: k.clone(),
                if_name: leaf_s,
            }),
            (ConfigKey::VbrIf(k), KeyType::VbrIfFlowFilter) => {
                ConfigKey::VbrIfFlowFilter(IfFlowFilterKey {
                    if_key: k.clone(),
                    direction: parse_leaf("direction", leaf)?,
                })
            }
            (ConfigKey::VtermIf(k), KeyType::VtermIfFlowFilter) => {
                ConfigKey::VtermIfFlowFilter(IfFlowFilterKey {
                    if_key: k.clone(),
                    direction: parse_leaf("direction", leaf)?,
                })
            }
            (ConfigKey::VbrIfFlowFilter(k), KeyType::VbrIfFlowFilterEntry) => {
                ConfigKey::VbrIfFlowFilterEntry(IfFlowFilterEntryKey {
                    ff: k.clone(),
                    sequence_num: parse_leaf("sequence_num", leaf)?,
                })
            }
            (ConfigKey::VtermIfFlowFilter(k), KeyType::VtermIfFlowFilterEntry) => {
                ConfigKey::VtermIfFlowFilterEntry(IfFlowFilterEntryKey {
                    ff: k.clone(),
                    sequence_num: parse_leaf("sequence_num", leaf)?,
                })
            }
            _ => {
                return Err(UpllError::BadRequest(format!(
                    "cannot build a {kt} key under {self}"
                )));
            }
        };
        Ok(child)
    }

    /// Key columns and their values, outermost first
    #[must_use]
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let mut cols = self.parent_key().map(|p| p.columns()).unwrap_or_default();
        match self {
            ConfigKey::Root => {}
            ConfigKey::FlowList(k) => cols.push(("flowlist_name", k.flowlist_name.clone())),
            ConfigKey::UnifiedNetwork(k) => {
                cols.push(("unified_nw_id", k.unified_nw_id.clone()));
            }
            ConfigKey::UnwSpineDomain(k) => cols.push(("spine_id", k.spine_id.clone())),
            ConfigKey::Vtn(k) => cols.push(("vtn_name", k.vtn_name.clone())),
            ConfigKey::Vbridge(k) => cols.push(("vbridge_name", k.vbridge_name.clone())),
            ConfigKey::Vrouter(k) => cols.push(("vrouter_name", k.vrouter_name.clone())),
            ConfigKey::Vterminal(k) => cols.push(("vterminal_name", k.vterminal_name.clone())),
            ConfigKey::Vunknown(k) => cols.push(("vunknown_name", k.vunknown_name.clone())),
            ConfigKey::VbrIf(VbrIfKey { if_name, .. })
            | ConfigKey::VrtIf(VrtIfKey { if_name, .. })
            | ConfigKey::VtermIf(VtermIfKey { if_name, .. })
            | ConfigKey::VunkIf(VunkIfKey { if_name, .. }) => {
                cols.push(("if_name", if_name.clone()));
            }
            ConfigKey::StaticIpRoute(k) => {
                cols.push(("dst_addr", k.dst_addr.to_string()));
                cols.push(("dst_prefixlen", k.dst_prefixlen.to_string()));
                cols.push(("next_hop_addr", k.next_hop_addr.to_string()));
                cols.push(("nwm_name", k.nwm_name.clone()));
            }
            ConfigKey::VbrIfFlowFilter(k) => cols.push(("direction", k.direction.to_string())),
            ConfigKey::VtermIfFlowFilter(k) => {
                cols.push(("direction", k.direction.to_string()));
            }
            ConfigKey::VbrIfFlowFilterEntry(k) => {
                cols.push(("sequence_num", k.sequence_num.to_string()));
            }
            ConfigKey::VtermIfFlowFilterEntry(k) => {
                cols.push(("sequence_num", k.sequence_num.to_string()));
            }
        }
        cols
    }
}

fn parse_leaf<T: FromStr>(what: &'static str, leaf: &str) -> UpllResult<T>
where
    T::Err: Display,
{
    leaf.parse()
        .map_err(|e: T::Err| UpllError::syntax(what, format!("'{leaf}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vbr_if_key() -> ConfigKey {
        ConfigKey::vtn("vtn1")
            .child_key(KeyType::Vbridge, "vbr1")
            .unwrap()
            .child_key(KeyType::VbrIf, "if1")
            .unwrap()
    }

    #[test]
    fn parent_chain() {
        let entry = vbr_if_key()
            .child_key(KeyType::VbrIfFlowFilter, "in")
            .unwrap()
            .child_key(KeyType::VbrIfFlowFilterEntry, "10")
            .unwrap();
        assert_eq!(entry.key_type(), KeyType::VbrIfFlowFilterEntry);
        let kts: Vec<KeyType> = std::iter::successors(Some(entry.clone()), ConfigKey::parent_key)
            .map(|k| k.key_type())
            .collect();
        assert_eq!(
            kts,
            vec![
                KeyType::VbrIfFlowFilterEntry,
                KeyType::VbrIfFlowFilter,
                KeyType::VbrIf,
                KeyType::Vbridge,
                KeyType::Vtn,
                KeyType::Root
            ]
        );
        // the key hierarchy agrees with the key type hierarchy
        for k in std::iter::successors(Some(entry.clone()), ConfigKey::parent_key) {
            assert_eq!(
                k.parent_key().map(|p| p.key_type()),
                k.key_type().parent()
            );
        }
        assert!(entry.is_within(&ConfigKey::vtn("vtn1")));
        assert!(!entry.is_within(&ConfigKey::vtn("vtn2")));
        assert_eq!(entry.vtn_name(), Some("vtn1"));
    }

    #[test]
    fn child_key_errors() {
        let vtn = ConfigKey::vtn("vtn1");
        assert!(vtn.child_key(KeyType::VbrIf, "if1").is_err());
        assert!(vtn.child_key(KeyType::StaticIpRoute, "x").is_err());
        let vbr_if = vbr_if_key();
        assert!(vbr_if.child_key(KeyType::VbrIfFlowFilter, "sideways").is_err());
        let ff = vbr_if.child_key(KeyType::VbrIfFlowFilter, "out").unwrap();
        assert!(ff.child_key(KeyType::VbrIfFlowFilterEntry, "70000").is_err());
    }

    #[test]
    fn vtn_rename() {
        let key = vbr_if_key().with_vtn_name("renamed");
        assert_eq!(key.vtn_name(), Some("renamed"));
        assert_eq!(
            key.parent_key().unwrap().parent_key().unwrap(),
            ConfigKey::vtn("renamed")
        );
        let fl = ConfigKey::flowlist("fl1");
        assert_eq!(fl.with_vtn_name("x"), fl);
        assert_eq!(fl.with_flowlist_name("fl2").flowlist_name(), Some("fl2"));
    }

    #[test]
    fn columns_and_display() {
        let key = vbr_if_key();
        assert_eq!(
            key.columns(),
            vec![
                ("vtn_name", "vtn1".to_owned()),
                ("vbridge_name", "vbr1".to_owned()),
                ("if_name", "if1".to_owned())
            ]
        );
        assert_eq!(
            key.to_string(),
            "vbr_if{vtn_name=vtn1,vbridge_name=vbr1,if_name=if1}"
        );
        assert_eq!(ConfigKey::Root.to_string(), "root{}");
        let names: Vec<&str> = key.columns().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, KeyType::VbrIf.key_columns());
    }

    #[test]
    fn serde_flattened() {
        let yaml = "kt: static_ip_route\nvtn_name: vtn1\nvrouter_name: vrt1\n\
                    dst_addr: 10.1.0.0\ndst_prefixlen: 16\nnext_hop_addr: 10.0.0.254\n";
        let key: ConfigKey = serde_yaml_ng::from_str(yaml).unwrap();
        let ConfigKey::StaticIpRoute(route) = &key else {
            unreachable!("unexpected key {key}");
        };
        assert_eq!(route.dst_prefixlen, 16);
        assert_eq!(route.nwm_name, "");
        assert_eq!(route.vrt.vtn.vtn_name, "vtn1");

        let entry = vbr_if_key()
            .child_key(KeyType::VbrIfFlowFilter, "in")
            .unwrap()
            .child_key(KeyType::VbrIfFlowFilterEntry, "3")
            .unwrap();
        let text = serde_yaml_ng::to_string(&entry).unwrap();
        assert!(text.contains("kt: vbr_if_flow_filter_entry"));
        assert!(text.contains("direction: in"));
        let back: ConfigKey = serde_yaml_ng::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }
}
