// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Static IP routes of vRouters

use std::net::Ipv4Addr;

use model::key::StaticIpRouteKey;
use model::validate::{
    check_host_ipv4, check_name, check_network_prefix, check_optional_name, check_range,
};
use model::{ConfigKey, ConfigVal, KeyType, Operation, UpllError, UpllResult};

use super::{CtrlrScope, MoMgr, check_attr, wrong_key, wrong_val};

/// Routes are keyed by destination, prefix length, next hop and an optional network
/// monitor group. The route is sent to the controller of its vRouter.
pub struct IpRouteMoMgr;

impl IpRouteMoMgr {
    fn parse_addr(what: &'static str, s: &str) -> UpllResult<Ipv4Addr> {
        s.trim()
            .parse()
            .map_err(|e| UpllError::syntax(what, format!("'{s}': {e}")))
    }
}

impl MoMgr for IpRouteMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::StaticIpRoute
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::StaticIpRoute(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vrt.vtn.vtn_name)?;
        check_name("vrouter_name", &k.vrt.vrouter_name)?;
        check_range("dst_prefixlen", k.dst_prefixlen, 0, 32)?;
        check_network_prefix("dst_addr", k.dst_addr, k.dst_prefixlen)?;
        check_host_ipv4("next_hop_addr", k.next_hop_addr)?;
        check_optional_name("nwm_name", &k.nwm_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::StaticIpRoute(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.group_metric, |m| check_range("group_metric", *m, 1, u16::MAX))
    }

    /// Route leaves read `dst_addr/dst_prefixlen,next_hop_addr[,nwm_name]`
    fn get_child_config_key(&self, parent: &ConfigKey, leaf: &str) -> UpllResult<ConfigKey> {
        let ConfigKey::Vrouter(vrt) = parent else {
            return Err(UpllError::BadRequest(format!(
                "static routes are not children of {parent}"
            )));
        };
        let mut fields = leaf.split(',');
        let (Some(dst), Some(next_hop)) = (fields.next(), fields.next()) else {
            return Err(UpllError::syntax("static_ip_route", format!("malformed route '{leaf}'")));
        };
        let nwm_name = fields.next().unwrap_or_default().trim().to_owned();
        let (dst_addr, dst_prefixlen) = match dst.split_once('/') {
            Some((addr, len)) => (
                Self::parse_addr("dst_addr", addr)?,
                len.trim()
                    .parse::<u8>()
                    .map_err(|e| UpllError::syntax("dst_prefixlen", format!("'{len}': {e}")))?,
            ),
            None => (Self::parse_addr("dst_addr", dst)?, 32),
        };
        Ok(ConfigKey::StaticIpRoute(StaticIpRouteKey {
            vrt: vrt.clone(),
            dst_addr,
            dst_prefixlen,
            next_hop_addr: Self::parse_addr("next_hop_addr", next_hop)?,
            nwm_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Attr;
    use model::val::StaticIpRouteVal;

    fn vrt() -> ConfigKey {
        ConfigKey::vtn("vtn1").child_key(KeyType::Vrouter, "rt1").unwrap()
    }

    #[test]
    fn route_keys() {
        let mgr = IpRouteMoMgr;
        let key = mgr
            .get_child_config_key(&vrt(), "10.1.0.0/16,10.0.0.254")
            .unwrap();
        assert!(mgr.validate_key(&key).is_ok());
        assert_eq!(mgr.get_parent_config_key(&key), Some(vrt()));
        let ConfigKey::StaticIpRoute(route) = &key else {
            unreachable!();
        };
        assert_eq!(route.dst_prefixlen, 16);
        assert_eq!(route.nwm_name, "");

        let host_bits = mgr
            .get_child_config_key(&vrt(), "10.1.0.1/16,10.0.0.254,nwm1")
            .unwrap();
        assert!(matches!(
            mgr.validate_key(&host_bits),
            Err(UpllError::CfgSyntax("dst_addr", _))
        ));
        let default_route = mgr.get_child_config_key(&vrt(), "0.0.0.0/0,10.0.0.1").unwrap();
        assert!(mgr.validate_key(&default_route).is_ok());
        let bad_hop = mgr.get_child_config_key(&vrt(), "10.2.0.0/16,255.255.255.255").unwrap();
        assert!(mgr.validate_key(&bad_hop).is_err());

        assert!(mgr.get_child_config_key(&vrt(), "10.1.0.0/16").is_err());
        assert!(mgr.get_child_config_key(&vrt(), "10.1.0.0/x,10.0.0.1").is_err());
        assert!(mgr.get_child_config_key(&ConfigKey::vtn("vtn1"), "10.1.0.0/16,10.0.0.1").is_err());
    }

    #[test]
    fn group_metric() {
        let mgr = IpRouteMoMgr;
        let val = |m| {
            ConfigVal::StaticIpRoute(StaticIpRouteVal {
                group_metric: Attr::Valid(m),
            })
        };
        assert!(mgr.validate_value(&val(1), Operation::Create).is_ok());
        assert!(mgr.validate_value(&val(0), Operation::Create).is_err());
    }
}
