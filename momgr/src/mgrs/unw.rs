// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Unified networks and their spine domains

use tracing::debug;

use model::validate::{check_ctrlr_id, check_domain_id, check_name, check_optional_name};
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::{
    CtrlrScope, MoMgr, check_attr, current_val, effective_val, immutable, mandatory, wrong_key,
    wrong_val,
};
use crate::table::ConfigDb;

/// Unified networks only exist in this layer; at most one of them is the default
pub struct UnifiedNetworkMoMgr;

impl MoMgr for UnifiedNetworkMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::UnifiedNetwork
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::None
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::UnifiedNetwork(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("unified_nw_id", &k.unified_nw_id)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::UnifiedNetwork(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        mandatory("routing_type", &v.routing_type, op)
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        let Some(ConfigVal::UnifiedNetwork(v)) = effective_val(ckv, db, dt, op)? else {
            return Ok(());
        };
        if v.is_default.value() != Some(&true) {
            return Ok(());
        }
        let other_default = db
            .table(dt, KeyType::UnifiedNetwork)
            .into_iter()
            .flat_map(|t| t.iter())
            .find(|(k, r)| {
                **k != ckv.key
                    && matches!(
                        &r.val,
                        Some(ConfigVal::UnifiedNetwork(o)) if o.is_default.value() == Some(&true)
                    )
            });
        if let Some((other, _)) = other_default {
            return Err(UpllError::CfgSemantic(format!(
                "{other} is already the default unified network"
            )));
        }
        Ok(())
    }
}

/// Spine domains of a unified network. Each one is bound to a controller and domain,
/// and no two spine domains of the configuration may share them.
pub struct UNWSpineDomainMoMgr;

impl MoMgr for UNWSpineDomainMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::UnwSpineDomain
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::Own
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::UnwSpineDomain(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("unified_nw_id", &k.unw.unified_nw_id)?;
        check_name("spine_id", &k.spine_id)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::UnwSpineDomain(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        mandatory("spine_controller_id", &v.spine_controller_id, op)?;
        mandatory("spine_domain_id", &v.spine_domain_id, op)?;
        check_attr(&v.spine_controller_id, |c| check_ctrlr_id(c))?;
        check_attr(&v.spine_domain_id, |d| check_domain_id(d))?;
        check_attr(&v.unw_label_id, |l| check_optional_name("unw_label_id", l))
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        if let (
            Operation::Update,
            Some(ConfigVal::UnwSpineDomain(u)),
            Some(ConfigVal::UnwSpineDomain(c)),
        ) = (op, &ckv.val, current_val(db, dt, &ckv.key))
        {
            immutable("spine_controller_id", &u.spine_controller_id, &c.spine_controller_id)?;
            immutable("spine_domain_id", &u.spine_domain_id, &c.spine_domain_id)?;
        }
        if op != Operation::Create {
            return Ok(());
        }
        let Some(bound) = ckv.val.as_ref().and_then(ConfigVal::ctrlr_domain) else {
            return Ok(());
        };
        let clash = db
            .table(dt, KeyType::UnwSpineDomain)
            .into_iter()
            .flat_map(|t| t.iter())
            .find(|(k, r)| {
                **k != ckv.key && r.val.as_ref().and_then(ConfigVal::ctrlr_domain) == Some(bound)
            });
        if let Some((other, _)) = clash {
            debug!("{} and {other} are both at {}/{}", ckv.key, bound.0, bound.1);
            return Err(UpllError::CfgSemantic(format!(
                "controller {} domain {} is already used by {other}",
                bound.0, bound.1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Record;
    use model::types::RoutingType;
    use model::val::{UnifiedNetworkVal, UnwSpineDomainVal};

    fn unw(name: &str) -> ConfigKey {
        ConfigKey::Root.child_key(KeyType::UnifiedNetwork, name).unwrap()
    }

    fn spine(ctrlr: &str, domain: &str) -> ConfigVal {
        ConfigVal::UnwSpineDomain(UnwSpineDomainVal {
            spine_controller_id: ctrlr.to_owned().into(),
            spine_domain_id: domain.to_owned().into(),
            ..Default::default()
        })
    }

    #[test]
    fn single_default() {
        let mgr = UnifiedNetworkMoMgr;
        let dt = Datatype::Candidate;
        let val = |is_default: bool| {
            ConfigVal::UnifiedNetwork(UnifiedNetworkVal {
                routing_type: RoutingType::QinQ.into(),
                is_default: is_default.into(),
            })
        };
        let mut db = ConfigDb::new();
        db.put(dt, unw("unw1"), Record::new(Some(val(true)), None));
        let second = ConfigKeyVal::with_val(unw("unw2"), val(true));
        assert!(mgr.validate_semantics(&second, &db, dt, Operation::Create).is_err());
        let plain = ConfigKeyVal::with_val(unw("unw2"), val(false));
        assert!(mgr.validate_semantics(&plain, &db, dt, Operation::Create).is_ok());
        let again = ConfigKeyVal::with_val(unw("unw1"), val(true));
        assert!(mgr.validate_semantics(&again, &db, dt, Operation::Update).is_ok());
        let unset = ConfigVal::UnifiedNetwork(UnifiedNetworkVal::default());
        assert!(mgr.validate_value(&unset, Operation::Create).is_err());
    }

    #[test]
    fn distinct_spine_domains() {
        let mgr = UNWSpineDomainMoMgr;
        let dt = Datatype::Candidate;
        let sd1 = mgr.get_child_config_key(&unw("unw1"), "sd1").unwrap();
        let sd2 = mgr.get_child_config_key(&unw("unw1"), "sd2").unwrap();
        assert!(mgr.validate_key(&sd1).is_ok());
        assert!(mgr.validate_value(&spine("c1", "d1"), Operation::Create).is_ok());
        assert!(mgr.validate_value(&spine("c1", ""), Operation::Create).is_err());

        let mut db = ConfigDb::new();
        db.put(dt, sd1.clone(), Record::new(Some(spine("c1", "d1")), None));
        let same = ConfigKeyVal::with_val(sd2.clone(), spine("c1", "d1"));
        assert!(mgr.validate_semantics(&same, &db, dt, Operation::Create).is_err());
        let other = ConfigKeyVal::with_val(sd2, spine("c1", "d2"));
        assert!(mgr.validate_semantics(&other, &db, dt, Operation::Create).is_ok());
        let moved = ConfigKeyVal::with_val(sd1, spine("c2", "d1"));
        assert!(matches!(
            mgr.validate_semantics(&moved, &db, dt, Operation::Update),
            Err(UpllError::CfgSemantic(_))
        ));
    }
}
