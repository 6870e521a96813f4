// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use model::validate::check_name;
use model::{
    ConfigKey, ConfigKeyVal, ConfigVal, Datatype, KeyType, Operation, UpllError, UpllResult,
};

use super::{CtrlrScope, MoMgr, current_val, immutable, mandatory, wrong_key, wrong_val};
use crate::table::ConfigDb;

/// Flow lists are global. A flow list is sent to the controllers of the flow-filter
/// entries that refer to it, and cannot be deleted while referred to.
pub struct FlowListMoMgr;

impl FlowListMoMgr {
    /// The flow-filter entries referring to a flow list
    #[must_use]
    pub fn referrers(db: &ConfigDb, dt: Datatype, name: &str) -> Vec<ConfigKey> {
        [KeyType::VbrIfFlowFilterEntry, KeyType::VtermIfFlowFilterEntry]
            .into_iter()
            .filter_map(|kt| db.table(dt, kt))
            .flat_map(|t| t.iter())
            .filter(|(_, r)| r.val.as_ref().and_then(ConfigVal::flowlist_ref) == Some(name))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl MoMgr for FlowListMoMgr {
    fn key_type(&self) -> KeyType {
        KeyType::FlowList
    }
    fn ctrlr_scope(&self) -> CtrlrScope {
        CtrlrScope::FlowListRefs
    }
    fn validate_key(&self, key: &ConfigKey) -> UpllResult<()> {
        let ConfigKey::FlowList(k) = key else {
            return Err(wrong_key(self.key_type(), key));
        };
        check_name("flowlist_name", &k.flowlist_name)
    }
    fn validate_value(&self, val: &ConfigVal, op: Operation) -> UpllResult<()> {
        let ConfigVal::FlowList(v) = val else {
            return Err(wrong_val(self.key_type(), val));
        };
        mandatory("ip_type", &v.ip_type, op)
    }
    fn validate_semantics(
        &self,
        ckv: &ConfigKeyVal,
        db: &ConfigDb,
        dt: Datatype,
        op: Operation,
    ) -> UpllResult<()> {
        match (op, &ckv.val, current_val(db, dt, &ckv.key)) {
            (Operation::Update, Some(ConfigVal::FlowList(u)), Some(ConfigVal::FlowList(c))) => {
                immutable("ip_type", &u.ip_type, &c.ip_type)
            }
            (Operation::Delete, _, _) => {
                let name = ckv.key.flowlist_name().unwrap_or_default();
                match Self::referrers(db, dt, name).first() {
                    Some(user) => Err(UpllError::CfgSemantic(format!(
                        "flow list '{name}' is in use by {user}"
                    ))),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Record;
    use model::types::IpType;
    use model::val::{FlowFilterEntryVal, FlowListVal};

    #[test]
    fn referenced_flowlist_is_kept() {
        let mgr = FlowListMoMgr;
        let dt = Datatype::Candidate;
        let fl = ConfigKey::flowlist("fl1");
        let mut db = ConfigDb::new();
        let ip = ConfigVal::FlowList(FlowListVal {
            ip_type: IpType::Ip.into(),
        });
        db.put(dt, fl.clone(), Record::new(Some(ip), None));
        let delete = ConfigKeyVal::new(fl.clone());
        assert!(mgr.validate_semantics(&delete, &db, dt, Operation::Delete).is_ok());

        let entry_key = ConfigKey::vtn("vtn1")
            .child_key(KeyType::Vbridge, "br")
            .unwrap()
            .child_key(KeyType::VbrIf, "if")
            .unwrap()
            .child_key(KeyType::VbrIfFlowFilter, "in")
            .unwrap()
            .child_key(KeyType::VbrIfFlowFilterEntry, "1")
            .unwrap();
        let entry = ConfigVal::VbrIfFlowFilterEntry(FlowFilterEntryVal {
            flowlist_name: "fl1".to_owned().into(),
            ..Default::default()
        });
        db.put(dt, entry_key.clone(), Record::new(Some(entry), None));
        assert_eq!(FlowListMoMgr::referrers(&db, dt, "fl1"), vec![entry_key]);
        assert!(matches!(
            mgr.validate_semantics(&delete, &db, dt, Operation::Delete),
            Err(UpllError::CfgSemantic(_))
        ));

        let v6 = ConfigKeyVal::with_val(
            fl,
            ConfigVal::FlowList(FlowListVal {
                ip_type: IpType::Ipv6.into(),
            }),
        );
        assert!(mgr.validate_semantics(&v6, &db, dt, Operation::Update).is_err());
    }
}
