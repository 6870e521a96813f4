// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Values of configuration objects

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::attr::{Attr, AttrVal};
use crate::attr_val;
use crate::errors::{UpllError, UpllResult};
use crate::keytype::KeyType;
use crate::types::{
    AdminStatus, FlowAction, IpType, MacAddr, PortMap, RoutingType, ValidFlag, VunknownType,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtnVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
}
attr_val!(VtnVal { description });

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbrVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub controller_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub domain_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub host_addr: Attr<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub host_addr_prefixlen: Attr<u8>,
}
attr_val!(VbrVal {
    controller_id,
    domain_id,
    description,
    host_addr,
    host_addr_prefixlen
});

/// Value of vBridge and vTerminal interfaces
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub admin_status: Attr<AdminStatus>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub portmap: Attr<PortMap>,
}
attr_val!(IfVal {
    admin_status,
    description,
    portmap
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrtVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub controller_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub domain_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub dhcp_relay_admin_status: Attr<AdminStatus>,
}
attr_val!(VrtVal {
    controller_id,
    domain_id,
    description,
    dhcp_relay_admin_status
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrtIfVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub ip_addr: Attr<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub prefixlen: Attr<u8>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub mac_addr: Attr<MacAddr>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub admin_status: Attr<AdminStatus>,
}
attr_val!(VrtIfVal {
    description,
    ip_addr,
    prefixlen,
    mac_addr,
    admin_status
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIpRouteVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub group_metric: Attr<u16>,
}
attr_val!(StaticIpRouteVal { group_metric });

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtermVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub controller_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub domain_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
}
attr_val!(VtermVal {
    controller_id,
    domain_id,
    description
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VunknownVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub vunknown_type: Attr<VunknownType>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub domain_id: Attr<String>,
}
attr_val!(VunknownVal {
    description,
    vunknown_type,
    domain_id
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VunkIfVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub description: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub admin_status: Attr<AdminStatus>,
}
attr_val!(VunkIfVal {
    description,
    admin_status
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowFilterEntryVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub flowlist_name: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub action: Attr<FlowAction>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub redirect_node: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub redirect_port: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub modify_dst_mac: Attr<MacAddr>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub modify_src_mac: Attr<MacAddr>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub nwm_name: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub dscp: Attr<u8>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub priority: Attr<u8>,
}
attr_val!(FlowFilterEntryVal {
    flowlist_name,
    action,
    redirect_node,
    redirect_port,
    modify_dst_mac,
    modify_src_mac,
    nwm_name,
    dscp,
    priority
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowListVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub ip_type: Attr<IpType>,
}
attr_val!(FlowListVal { ip_type });

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedNetworkVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub routing_type: Attr<RoutingType>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub is_default: Attr<bool>,
}
attr_val!(UnifiedNetworkVal {
    routing_type,
    is_default
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwSpineDomainVal {
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub spine_controller_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub spine_domain_id: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_invalid")]
    pub unw_label_id: Attr<String>,
}
attr_val!(UnwSpineDomainVal {
    spine_controller_id,
    spine_domain_id,
    unw_label_id
});

/// The value of any configuration object that has one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kt", rename_all = "snake_case")]
pub enum ConfigVal {
    FlowList(FlowListVal),
    UnifiedNetwork(UnifiedNetworkVal),
    UnwSpineDomain(UnwSpineDomainVal),
    Vtn(VtnVal),
    Vbridge(VbrVal),
    VbrIf(IfVal),
    VbrIfFlowFilterEntry(FlowFilterEntryVal),
    Vrouter(VrtVal),
    VrtIf(VrtIfVal),
    StaticIpRoute(StaticIpRouteVal),
    Vterminal(VtermVal),
    VtermIf(IfVal),
    VtermIfFlowFilterEntry(FlowFilterEntryVal),
    Vunknown(VunknownVal),
    VunkIf(VunkIfVal),
}

/// Run `$body` with `$v` bound to the value struct of any variant
macro_rules! with_val {
    ($val:expr, $v:ident => $body:expr) => {
        match $val {
            ConfigVal::FlowList($v) => $body,
            ConfigVal::UnifiedNetwork($v) => $body,
            ConfigVal::UnwSpineDomain($v) => $body,
            ConfigVal::Vtn($v) => $body,
            ConfigVal::Vbridge($v) => $body,
            ConfigVal::VbrIf($v) | ConfigVal::VtermIf($v) => $body,
            ConfigVal::VbrIfFlowFilterEntry($v) | ConfigVal::VtermIfFlowFilterEntry($v) => $body,
            ConfigVal::Vrouter($v) => $body,
            ConfigVal::VrtIf($v) => $body,
            ConfigVal::StaticIpRoute($v) => $body,
            ConfigVal::Vterminal($v) => $body,
            ConfigVal::Vunknown($v) => $body,
            ConfigVal::VunkIf($v) => $body,
        }
    };
}

/// Run `$body` with `$a` and `$b` bound to the value structs of two values of the same
/// key type. Evaluates to `None` when key types differ.
macro_rules! with_val_pair {
    ($x:expr, $y:expr, $a:ident, $b:ident => $body:expr) => {
        match ($x, $y) {
            (ConfigVal::FlowList($a), ConfigVal::FlowList($b)) => Some($body),
            (ConfigVal::UnifiedNetwork($a), ConfigVal::UnifiedNetwork($b)) => Some($body),
            (ConfigVal::UnwSpineDomain($a), ConfigVal::UnwSpineDomain($b)) => Some($body),
            (ConfigVal::Vtn($a), ConfigVal::Vtn($b)) => Some($body),
            (ConfigVal::Vbridge($a), ConfigVal::Vbridge($b)) => Some($body),
            (ConfigVal::VbrIf($a), ConfigVal::VbrIf($b))
            | (ConfigVal::VtermIf($a), ConfigVal::VtermIf($b)) => Some($body),
            (ConfigVal::VbrIfFlowFilterEntry($a), ConfigVal::VbrIfFlowFilterEntry($b))
            | (ConfigVal::VtermIfFlowFilterEntry($a), ConfigVal::VtermIfFlowFilterEntry($b)) => {
                Some($body)
            }
            (ConfigVal::Vrouter($a), ConfigVal::Vrouter($b)) => Some($body),
            (ConfigVal::VrtIf($a), ConfigVal::VrtIf($b)) => Some($body),
            (ConfigVal::StaticIpRoute($a), ConfigVal::StaticIpRoute($b)) => Some($body),
            (ConfigVal::Vterminal($a), ConfigVal::Vterminal($b)) => Some($body),
            (ConfigVal::Vunknown($a), ConfigVal::Vunknown($b)) => Some($body),
            (ConfigVal::VunkIf($a), ConfigVal::VunkIf($b)) => Some($body),
            _ => None,
        }
    };
}

impl ConfigVal {
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        match self {
            ConfigVal::FlowList(_) => KeyType::FlowList,
            ConfigVal::UnifiedNetwork(_) => KeyType::UnifiedNetwork,
            ConfigVal::UnwSpineDomain(_) => KeyType::UnwSpineDomain,
            ConfigVal::Vtn(_) => KeyType::Vtn,
            ConfigVal::Vbridge(_) => KeyType::Vbridge,
            ConfigVal::VbrIf(_) => KeyType::VbrIf,
            ConfigVal::VbrIfFlowFilterEntry(_) => KeyType::VbrIfFlowFilterEntry,
            ConfigVal::Vrouter(_) => KeyType::Vrouter,
            ConfigVal::VrtIf(_) => KeyType::VrtIf,
            ConfigVal::StaticIpRoute(_) => KeyType::StaticIpRoute,
            ConfigVal::Vterminal(_) => KeyType::Vterminal,
            ConfigVal::VtermIf(_) => KeyType::VtermIf,
            ConfigVal::VtermIfFlowFilterEntry(_) => KeyType::VtermIfFlowFilterEntry,
            ConfigVal::Vunknown(_) => KeyType::Vunknown,
            ConfigVal::VunkIf(_) => KeyType::VunkIf,
        }
    }

    /// An empty value (all attributes invalid) for a key type
    #[must_use]
    pub fn empty(kt: KeyType) -> Option<ConfigVal> {
        let val = match kt {
            KeyType::Root | KeyType::VbrIfFlowFilter | KeyType::VtermIfFlowFilter => {
                return None;
            }
            KeyType::FlowList => ConfigVal::FlowList(FlowListVal::default()),
            KeyType::UnifiedNetwork => ConfigVal::UnifiedNetwork(UnifiedNetworkVal::default()),
            KeyType::UnwSpineDomain => ConfigVal::UnwSpineDomain(UnwSpineDomainVal::default()),
            KeyType::Vtn => ConfigVal::Vtn(VtnVal::default()),
            KeyType::Vbridge => ConfigVal::Vbridge(VbrVal::default()),
            KeyType::VbrIf => ConfigVal::VbrIf(IfVal::default()),
            KeyType::VbrIfFlowFilterEntry => {
                ConfigVal::VbrIfFlowFilterEntry(FlowFilterEntryVal::default())
            }
            KeyType::Vrouter => ConfigVal::Vrouter(VrtVal::default()),
            KeyType::VrtIf => ConfigVal::VrtIf(VrtIfVal::default()),
            KeyType::StaticIpRoute => ConfigVal::StaticIpRoute(StaticIpRouteVal::default()),
            KeyType::Vterminal => ConfigVal::Vterminal(VtermVal::default()),
            KeyType::VtermIf => ConfigVal::VtermIf(IfVal::default()),
            KeyType::VtermIfFlowFilterEntry => {
                ConfigVal::VtermIfFlowFilterEntry(FlowFilterEntryVal::default())
            }
            KeyType::Vunknown => ConfigVal::Vunknown(VunknownVal::default()),
            KeyType::VunkIf => ConfigVal::VunkIf(VunkIfVal::default()),
        };
        Some(val)
    }

    /// Attribute names, in declaration order
    #[must_use]
    pub fn attr_names(&self) -> &'static [&'static str] {
        fn names<T: AttrVal>(_: &T) -> &'static [&'static str] {
            T::ATTRS
        }
        with_val!(self, v => names(v))
    }

    #[must_use]
    pub fn valid_flags(&self) -> Vec<ValidFlag> {
        with_val!(self, v => v.valid_flags())
    }

    #[must_use]
    pub fn attr_strings(&self) -> Vec<String> {
        with_val!(self, v => v.attr_strings())
    }

    #[must_use]
    pub fn any_pending(&self) -> bool {
        with_val!(self, v => v.any_pending())
    }

    /// Apply the attributes set in `update` on top of this value
    pub fn merge_from(&mut self, update: &ConfigVal) -> UpllResult<()> {
        let (kt, other_kt) = (self.key_type(), update.key_type());
        with_val_pair!(self, update, a, b => a.merge_from(b)).ok_or_else(|| {
            UpllError::BadRequest(format!("cannot merge a {other_kt} value into a {kt}"))
        })
    }

    /// Keep only the attributes that differ from `prior`. Returns whether anything is
    /// left to apply; values of distinct key types always differ.
    pub fn compare_valid_value(&mut self, prior: &ConfigVal, audit: bool) -> bool {
        with_val_pair!(self, prior, a, b => a.compare_valid_value(b, audit)).unwrap_or(true)
    }

    /// The controller and domain a vnode value is bound to
    #[must_use]
    pub fn ctrlr_domain(&self) -> Option<(&str, &str)> {
        let (ctrlr, domain) = match self {
            ConfigVal::Vbridge(v) => (&v.controller_id, &v.domain_id),
            ConfigVal::Vrouter(v) => (&v.controller_id, &v.domain_id),
            ConfigVal::Vterminal(v) => (&v.controller_id, &v.domain_id),
            ConfigVal::UnwSpineDomain(v) => (&v.spine_controller_id, &v.spine_domain_id),
            _ => return None,
        };
        Some((ctrlr.value()?.as_str(), domain.value()?.as_str()))
    }

    /// The flow list a flow-filter entry refers to
    #[must_use]
    pub fn flowlist_ref(&self) -> Option<&str> {
        match self {
            ConfigVal::VbrIfFlowFilterEntry(v) | ConfigVal::VtermIfFlowFilterEntry(v) => {
                v.flowlist_name.value().map(String::as_str)
            }
            _ => None,
        }
    }

    /// Point a flow-filter entry to another flow list. Other values are left alone.
    pub fn set_flowlist_ref(&mut self, name: &str) {
        if let ConfigVal::VbrIfFlowFilterEntry(v) | ConfigVal::VtermIfFlowFilterEntry(v) = self
        {
            v.flowlist_name = Attr::Valid(name.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn empty_values_match_key_types() {
        for kt in KeyType::iter() {
            let val = ConfigVal::empty(kt);
            assert_eq!(val.is_some(), kt.has_value(), "{kt}");
            if let Some(val) = val {
                assert_eq!(val.key_type(), kt);
                assert!(!val.any_pending());
                assert_eq!(val.attr_names().len(), val.valid_flags().len());
            }
        }
    }

    #[test]
    fn merge_and_compare() {
        let mut running = ConfigVal::Vbridge(VbrVal {
            controller_id: "c1".to_owned().into(),
            domain_id: "d1".to_owned().into(),
            description: "old".to_owned().into(),
            ..Default::default()
        });
        let update = ConfigVal::Vbridge(VbrVal {
            description: "new".to_owned().into(),
            host_addr: Attr::Valid(Ipv4Addr::new(10, 0, 0, 1)),
            ..Default::default()
        });
        let prior = running.clone();
        running.merge_from(&update).unwrap();
        assert_eq!(running.ctrlr_domain(), Some(("c1", "d1")));

        let mut delta = running.clone();
        assert!(delta.compare_valid_value(&prior, false));
        assert_eq!(
            delta.valid_flags(),
            vec![
                ValidFlag::Invalid,
                ValidFlag::Invalid,
                ValidFlag::Valid,
                ValidFlag::Valid,
                ValidFlag::Invalid
            ]
        );
        let mut same = prior.clone();
        assert!(!same.compare_valid_value(&prior, true));

        let bad = ConfigVal::Vtn(VtnVal::default());
        assert!(running.merge_from(&bad).is_err());
    }

    #[test]
    fn flowlist_reference() {
        let mut val = ConfigVal::VtermIfFlowFilterEntry(FlowFilterEntryVal {
            flowlist_name: "fl1".to_owned().into(),
            action: FlowAction::Pass.into(),
            ..Default::default()
        });
        assert_eq!(val.flowlist_ref(), Some("fl1"));
        val.set_flowlist_ref("fl2");
        assert_eq!(val.flowlist_ref(), Some("fl2"));
    }

    #[test]
    fn serde_tagged() {
        let yaml = "kt: vrt_if\nip_addr: 192.168.1.1\nprefixlen: 24\n\
                    mac_addr: \"02:00:00:00:00:01\"\ndescription: null\n";
        let val: ConfigVal = serde_yaml_ng::from_str(yaml).unwrap();
        let ConfigVal::VrtIf(v) = &val else {
            unreachable!("unexpected value {val:?}");
        };
        assert_eq!(v.ip_addr, Attr::Valid(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(v.prefixlen, Attr::Valid(24));
        assert_eq!(v.description, Attr::ValidNoValue);
        assert_eq!(v.admin_status, Attr::Invalid);
    }
}
