// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Create, update, delete and read requests on configuration objects

use tracing::{debug, info};

use model::{ConfigKey, ConfigKeyVal, ConfigVal, Datatype, Operation, UpllError, UpllResult};

use crate::configmgr::MgrState;
use crate::mgrs::{CtrlrScope, MoMgr};
use crate::session::{RequestHeader, UpllResponse};
use crate::table::Record;

impl MgrState {
    /// Apply a validated write request to the candidate configuration
    pub(crate) fn write(&mut self, header: &RequestHeader, ckv: ConfigKeyVal) -> UpllResult<()> {
        let dt = header.datatype;
        let mgr = self.mgrs.get(ckv.key_type())?;
        match header.operation {
            Operation::Create => {
                if self.db.exists(dt, &ckv.key) {
                    return Err(UpllError::InstanceExists(ckv.key));
                }
                if let Some(parent) = mgr.get_parent_config_key(&ckv.key)
                    && !self.db.exists(dt, &parent)
                {
                    return Err(UpllError::ParentDoesNotExist(ckv.key));
                }
                mgr.validate_semantics(&ckv, &self.db, dt, Operation::Create)?;
                // a reset on a new object leaves the attribute unset
                let val = match (ConfigVal::empty(ckv.key.key_type()), ckv.val) {
                    (Some(mut empty), Some(given)) => {
                        empty.merge_from(&given)?;
                        Some(empty)
                    }
                    (empty, given) => given.or(empty),
                };
                let ctrlr_dom = self
                    .mgrs
                    .resolve_ctrlr_dom(&self.db, dt, &ckv.key, val.as_ref());
                if mgr.ctrlr_scope() == CtrlrScope::Own
                    && let Some(cd) = &ctrlr_dom
                    && !self.drivers.contains(&cd.ctrlr)
                {
                    return Err(UpllError::CfgSemantic(format!(
                        "unknown controller '{}'",
                        cd.ctrlr
                    )));
                }
                info!("{dt}: created {}", ckv.key);
                self.db.insert(dt, ckv.key, Record::new(val, ctrlr_dom))
            }
            Operation::Update => {
                if !self.db.exists(dt, &ckv.key) {
                    return Err(UpllError::NoSuchInstance(ckv.key));
                }
                mgr.validate_semantics(&ckv, &self.db, dt, Operation::Update)?;
                let (Some(update), Some(record)) = (&ckv.val, self.db.get_mut(dt, &ckv.key))
                else {
                    return Ok(());
                };
                match &mut record.val {
                    Some(val) => val.merge_from(update)?,
                    None => record.val = Some(update.clone()),
                }
                info!("{dt}: updated {}", ckv.key);
                Ok(())
            }
            Operation::Delete => {
                if !self.db.exists(dt, &ckv.key) {
                    return Err(UpllError::NoSuchInstance(ckv.key));
                }
                mgr.validate_semantics(&ckv, &self.db, dt, Operation::Delete)?;
                let removed = self.db.remove_subtree(dt, &ckv.key);
                info!("{dt}: deleted {} ({} objects)", ckv.key, removed.len());
                Ok(())
            }
            op => Err(UpllError::NoSuchOperation(op, ckv.key_type())),
        }
    }

    /// A row as returned by reads. State reads carry the operational status.
    fn read_row(&self, dt: Datatype, key: &ConfigKey, record: &Record) -> ConfigKeyVal {
        let mut ckv = record.to_ckv(key);
        if dt == Datatype::State {
            ckv.oper_status = Some(self.oper.oper_status(&self.db, key));
        }
        ckv
    }

    /// Serve a validated read request. State reads look at the running configuration.
    pub(crate) fn read(
        &self,
        header: &RequestHeader,
        ckv: &ConfigKeyVal,
    ) -> UpllResult<UpllResponse> {
        let dt = header.datatype;
        let table_dt = if dt == Datatype::State {
            Datatype::Running
        } else {
            dt
        };
        let limit = match header.max_rep_count {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let kt = ckv.key_type();
        let siblings = || {
            let parent = ckv.key.parent_key().unwrap_or(ConfigKey::Root);
            self.db.children(table_dt, &parent, kt)
        };
        let found: Vec<ConfigKeyVal> = match header.operation {
            Operation::Read => {
                let record = self
                    .db
                    .get(table_dt, &ckv.key)
                    .ok_or_else(|| UpllError::NoSuchInstance(ckv.key.clone()))?;
                vec![self.read_row(dt, &ckv.key, record)]
            }
            Operation::ReadSiblingBegin => siblings()
                .into_iter()
                .take(limit)
                .map(|(k, r)| self.read_row(dt, k, r))
                .collect(),
            Operation::ReadSibling => siblings()
                .into_iter()
                .filter(|(k, _)| **k > ckv.key)
                .take(limit)
                .map(|(k, r)| self.read_row(dt, k, r))
                .collect(),
            Operation::ReadSiblingCount => {
                let count = u32::try_from(siblings().len()).unwrap_or(u32::MAX);
                return Ok(UpllResponse {
                    count: Some(count),
                    ..UpllResponse::success()
                });
            }
            op => return Err(UpllError::NoSuchOperation(op, kt)),
        };
        debug!("{dt}: read {} {kt} objects", found.len());
        Ok(UpllResponse {
            count: u32::try_from(found.len()).ok(),
            ..UpllResponse::success().with_ckvs(found)
        })
    }
}
