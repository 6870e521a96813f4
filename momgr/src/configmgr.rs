// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The configuration manager: entry point of every request.
//!
//! Requests are serialized by a [`TaskScheduler`]: a request waits for its turn
//! according to its priority, then runs alone against the configuration.

use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use model::{ConfigKeyVal, Datatype, UpllError, UpllResult};
use scheduler::{TaskPriority, TaskScheduler};

use crate::bindinfo::dump_datatype;
use crate::driver::DriverRegistry;
use crate::import::ImportState;
use crate::mgrs::MoMgrRegistry;
use crate::rename::RenameTable;
use crate::session::{ConfigLock, RequestHeader, UpllRequest, UpllResponse};
use crate::state::StateDb;
use crate::table::ConfigDb;

/// Everything a request may look at or change
pub(crate) struct MgrState {
    pub(crate) db: ConfigDb,
    pub(crate) mgrs: MoMgrRegistry,
    pub(crate) drivers: DriverRegistry,
    pub(crate) renames: RenameTable,
    pub(crate) lock: ConfigLock,
    pub(crate) oper: StateDb,
    pub(crate) import: Option<ImportState>,
    pub(crate) startup_path: Option<PathBuf>,
}

impl MgrState {
    fn new(drivers: DriverRegistry, startup_path: Option<PathBuf>) -> Self {
        Self {
            db: ConfigDb::new(),
            mgrs: MoMgrRegistry::new(),
            drivers,
            renames: RenameTable::new(),
            lock: ConfigLock::new(),
            oper: StateDb::new(),
            import: None,
            startup_path,
        }
    }

    fn dispatch(&mut self, request: UpllRequest) -> UpllResult<UpllResponse> {
        let done = Ok(UpllResponse::success());
        match request {
            UpllRequest::AcquireConfigMode { session_id } => {
                let config_id = self.lock.acquire(session_id)?;
                Ok(UpllResponse {
                    config_id: Some(config_id),
                    ..UpllResponse::success()
                })
            }
            UpllRequest::ReleaseConfigMode {
                session_id,
                config_id,
            } => {
                self.lock.release(session_id, config_id)?;
                done
            }
            UpllRequest::Config { header, ckv } => self.config_request(&header, ckv),
            UpllRequest::Commit {
                session_id,
                config_id,
            } => {
                self.lock.check(session_id, config_id)?;
                self.commit()?;
                done
            }
            UpllRequest::AbortCandidate {
                session_id,
                config_id,
            } => {
                self.lock.check(session_id, config_id)?;
                self.abort_candidate();
                done
            }
            UpllRequest::IsCandidateDirty => {
                let dirty = self.is_candidate_dirty();
                Ok(UpllResponse::success().with_message(if dirty { "dirty" } else { "clean" }))
            }
            UpllRequest::Audit { ctrlr } => {
                let pushed = self.audit(&ctrlr)?;
                Ok(UpllResponse {
                    count: Some(pushed),
                    ..UpllResponse::success()
                })
            }
            UpllRequest::SaveStartup => {
                self.save_startup()?;
                done
            }
            UpllRequest::LoadStartup => {
                self.load_startup()?;
                self.audit_connected();
                done
            }
            UpllRequest::ClearStartup => {
                self.clear_startup()?;
                done
            }
            UpllRequest::Import {
                session_id,
                config_id,
                ctrlr,
            } => {
                self.lock.check(session_id, config_id)?;
                let count = self.import_ctrlr_config(&ctrlr)?;
                Ok(UpllResponse {
                    count: Some(count),
                    ..UpllResponse::success()
                })
            }
            UpllRequest::RenameImported {
                session_id,
                config_id,
                kt,
                old_name,
                new_name,
            } => {
                self.lock.check(session_id, config_id)?;
                self.rename_imported(kt, &old_name, &new_name)?;
                done
            }
            UpllRequest::MergeImport {
                session_id,
                config_id,
            } => {
                self.lock.check(session_id, config_id)?;
                self.merge_import()?;
                done
            }
            UpllRequest::ClearImport {
                session_id,
                config_id,
            } => {
                self.lock.check(session_id, config_id)?;
                self.clear_import();
                done
            }
            UpllRequest::ControllerConnect { ctrlr } => {
                self.controller_connect(&ctrlr)?;
                done
            }
            UpllRequest::ControllerDisconnect { ctrlr } => {
                self.controller_disconnect(&ctrlr)?;
                done
            }
            UpllRequest::OperStatus { ctrlr, key, status } => {
                if !self.drivers.contains(&ctrlr) {
                    return Err(UpllError::DriverNotPresent(ctrlr));
                }
                if !self.db.exists(Datatype::Running, &key) {
                    return Err(UpllError::NoSuchInstance(key));
                }
                self.oper.set(key, status);
                done
            }
            UpllRequest::Dump { datatype } => {
                Ok(UpllResponse::success().with_message(dump_datatype(&self.db, datatype)))
            }
        }
    }

    /// Requests on configuration objects. Writes need config mode.
    fn config_request(
        &mut self,
        header: &RequestHeader,
        ckv: ConfigKeyVal,
    ) -> UpllResult<UpllResponse> {
        if header.operation.is_write() {
            self.lock.check(header.session_id, header.config_id)?;
        }
        self.mgrs
            .get(ckv.key_type())?
            .validate_message(header, &ckv)?;
        if header.operation.is_write() {
            self.write(header, ckv)?;
            Ok(UpllResponse::success())
        } else {
            self.read(header, &ckv)
        }
    }

    /// Audit every connected controller, after the configuration was replaced
    fn audit_connected(&mut self) {
        let ctrlrs: Vec<String> = self.drivers.names().map(str::to_owned).collect();
        for ctrlr in ctrlrs {
            if !self.drivers.is_connected(&ctrlr) {
                continue;
            }
            if let Err(e) = self.audit(&ctrlr) {
                error!("Audit of controller {ctrlr} failed: {e}");
            }
        }
    }

    fn controller_connect(&mut self, ctrlr: &str) -> UpllResult<()> {
        if !self.drivers.contains(ctrlr) {
            return Err(UpllError::DriverNotPresent(ctrlr.to_owned()));
        }
        info!("Controller {ctrlr} is up");
        self.drivers.set_down(ctrlr, false);
        if self.drivers.is_connected(ctrlr) {
            self.audit(ctrlr)?;
        } else {
            warn!("Driver of controller {ctrlr} can't reach it: not auditing");
        }
        Ok(())
    }

    fn controller_disconnect(&mut self, ctrlr: &str) -> UpllResult<()> {
        if !self.drivers.contains(ctrlr) {
            return Err(UpllError::DriverNotPresent(ctrlr.to_owned()));
        }
        warn!("Controller {ctrlr} is down");
        self.drivers.set_down(ctrlr, true);
        self.oper.ctrlr_disconnected(&self.db, ctrlr);
        Ok(())
    }
}

fn priority(request: &UpllRequest) -> TaskPriority {
    match request {
        UpllRequest::Config { header, .. } if header.operation.is_read() => TaskPriority::Low,
        UpllRequest::IsCandidateDirty | UpllRequest::Dump { .. } => TaskPriority::Low,
        UpllRequest::AcquireConfigMode { .. }
        | UpllRequest::ReleaseConfigMode { .. }
        | UpllRequest::Config { .. }
        | UpllRequest::AbortCandidate { .. }
        | UpllRequest::OperStatus { .. } => TaskPriority::Normal,
        UpllRequest::Commit { .. }
        | UpllRequest::Audit { .. }
        | UpllRequest::SaveStartup
        | UpllRequest::ClearStartup
        | UpllRequest::Import { .. }
        | UpllRequest::RenameImported { .. }
        | UpllRequest::MergeImport { .. }
        | UpllRequest::ClearImport { .. } => TaskPriority::High,
        UpllRequest::LoadStartup
        | UpllRequest::ControllerConnect { .. }
        | UpllRequest::ControllerDisconnect { .. } => TaskPriority::Critical,
    }
}

/// The configuration manager
pub struct UpllConfigMgr {
    scheduler: TaskScheduler,
    inner: Mutex<MgrState>,
}

impl UpllConfigMgr {
    /// A config manager for the controllers of `drivers`. When a startup path is
    /// given, the startup configuration is saved to and loaded from that file.
    #[must_use]
    pub fn new(drivers: DriverRegistry, startup_path: Option<PathBuf>) -> Self {
        Self {
            scheduler: TaskScheduler::new("upll-config"),
            inner: Mutex::new(MgrState::new(drivers, startup_path)),
        }
    }

    /// Process one request
    pub fn handle(&self, request: UpllRequest) -> UpllResponse {
        let name = request.name();
        let _permit = self.scheduler.allow_execution(priority(&request), &name);
        debug!("Processing request '{name}'");
        let result = self.inner.lock().dispatch(request);
        match &result {
            Ok(_) => debug!("Request '{name}' succeeded"),
            Err(e) => warn!("Request '{name}' failed: {e}"),
        }
        result.into()
    }

    /// Load the startup configuration and audit the connected controllers
    pub fn startup(&self) -> UpllResponse {
        self.handle(UpllRequest::LoadStartup)
    }

    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;
    use model::{ConfigKey, Operation, ResultCode};

    #[test]
    fn request_priorities() {
        let read = UpllRequest::Config {
            header: crate::session::RequestHeaderBuilder::default()
                .operation(Operation::Read)
                .build()
                .unwrap(),
            ckv: ConfigKeyVal::new(ConfigKey::vtn("vtn1")),
        };
        assert_eq!(priority(&read), TaskPriority::Low);
        assert_eq!(priority(&UpllRequest::LoadStartup), TaskPriority::Critical);
        assert_eq!(
            priority(&UpllRequest::Commit {
                session_id: 1,
                config_id: 1
            }),
            TaskPriority::High
        );
    }

    #[test]
    fn writes_need_config_mode() {
        let mut drivers = DriverRegistry::new();
        drivers.add(Box::new(MemoryDriver::new("c1")));
        let mgr = UpllConfigMgr::new(drivers, None);
        let create = |session_id, config_id| UpllRequest::Config {
            header: crate::session::RequestHeaderBuilder::default()
                .session_id(session_id)
                .config_id(config_id)
                .operation(Operation::Create)
                .build()
                .unwrap(),
            ckv: ConfigKeyVal::new(ConfigKey::vtn("vtn1")),
        };
        let resp = mgr.handle(create(1, 1));
        assert_eq!(resp.result_code, ResultCode::NotAllowedAtThisTime);
        let resp = mgr.handle(UpllRequest::AcquireConfigMode { session_id: 1 });
        let config_id = resp.config_id.unwrap();
        assert!(mgr.handle(create(1, config_id)).is_success());
        assert_eq!(
            mgr.handle(create(1, config_id)).result_code,
            ResultCode::InstanceExists
        );
        assert_eq!(
            mgr.handle(create(2, config_id)).result_code,
            ResultCode::ConfigModeBusy
        );
        assert!(mgr.scheduler().running_task().is_none());
    }
}
