// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! vRouters and their interfaces

use tracing::debug;

use model::validate::{
    check_description, check_host_ipv4, check_name, check_range, check_unicast_mac, ipv4_net,
    subnets_overlap,
};
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::{
    CtrlrScope, MoMgr, check_attr, check_ctrlr_dom_attrs, check_vnode_leaf, check_vnode_name,
    current_val, effective_val, immutable, wrong_key, wrong_val,
};
use crate::table::ConfigDb;

pub struct VrtMoMgr;

impl MoMgr for VrtMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::Vrouter
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Own
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        if !matches!(key, ConfigKey::Vrouter(_)) {
            return Err(wrong_key(self.key_type(), key));
        }
        check_vnode_leaf("vrouter_name", key)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::Vrouter(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_ctrlr_dom_attrs(&v.controller_id, &v.domain_id, op)?;
        check_attr(&v.description, |d| check_description("description", d))
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        match (op, &ckv.val, current_val(db, dt, &ckv.key)) {
            (Operation::Create, _, _) => check_vnode_name(&ckv.key, db, dt),
            (Operation::Update, Some(ConfigVal::Vrouter(u)), Some(ConfigVal::Vrouter(c))) => {
                immutable("controller_id", &u.controller_id, &c.controller_id)?;
                immutable("domain_id", &u.domain_id, &c.domain_id)
            }
            _ => Ok(()),
        }
    }
}

pub struct VrtIfMoMgr;

impl MoMgr for VrtIfMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::VrtIf
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Inherit
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::VrtIf(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("vtn_name", &k.vrt.vtn.vtn_name)?;
        check_name("vrouter_name", &k.vrt.vrouter_name)?;
        check_name("if_name", &k.if_name)
    }
    fn validate_value(&self, val: &ConfigVal, _op: Operation) -> UpllResult<()> {
        let ConfigVal::VrtIf(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        check_attr(&v.description, |d| check_description("description", d))?;
        check_attr(&v.ip_addr, |a| check_host_ipv4("ip_addr", *a))?;
        check_attr(&v.prefixlen, |p| check_range("prefixlen", *p, 1, 30))?;
        check_attr(&v.mac_addr, |m| check_unicast_mac("mac_addr", *m))
    }

    /// The address and prefix length of an interface go together, and the subnets of
    /// the interfaces of a vRouter must not overlap
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        let Some(ConfigVal::VrtIf(v)) = effective_val(ckv, db, dt, op)? else {
            return Ok(());
        };
        let subnet = match (v.ip_addr.value(), v.prefixlen.value()) {
            (Some(addr), Some(len)) => ipv4_net("ip_addr", *addr, *len)?,
            (None, None) => return Ok(()),
            _ => {
                return Err(UpllError::CfgSemantic(
                    "ip_addr and prefixlen must be set together".to_owned(),
                ));
            }
        };
        let Some(vrt) = ckv.key.parent_key() else {
            return Ok(());
        };
        for (sibling, record) in db.children(dt, &vrt, KeyType::VrtIf) {
            if *sibling == ckv.key {
                continue;
            }
            let Some(ConfigVal::VrtIf(other)) = &record.val else {
                continue;
            };
            if let (Some(addr), Some(len)) = (other.ip_addr.value(), other.prefixlen.value())
                && let Ok(theirs) = ipv4_net("ip_addr", *addr, *len)
                && subnets_overlap(&subnet, &theirs)
            {
                debug!("{} overlaps {sibling}", ckv.key);
                return Err(UpllError::CfgSemantic(format!(
                    "subnet {} overlaps with that of {sibling}",
                    subnet.trunc()
                )));
            }
        }
        Ok(())
    }
}
