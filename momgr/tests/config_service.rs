// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use upll_momgr as momgr;

use model::types::{FlowAction, IpType};
use model::val::{FlowFilterEntryVal, FlowListVal, VbrVal, VtnVal};
use model::{
    Attr, ConfigKey, ConfigKeyVal, ConfigStatus, ConfigVal, CtrlrDom, Datatype, KeyType,
    OperStatus, Operation, ResultCode, ValidFlag,
};
use momgr::driver::DriverRequest;
use momgr::{
    Driver, DriverRegistry, FailPoint, MemoryDriver, RequestHeaderBuilder, UpllConfigMgr,
    UpllRequest, UpllResponse,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tracing_test::traced_test;

const SESSION: u32 = 7;

/// A config manager with two simulated controllers, c1 and c2, and a session in
/// config mode
struct Fixture {
    mgr: UpllConfigMgr,
    c1: MemoryDriver,
    c2: MemoryDriver,
    config_id: u32,
}

impl Fixture {
    fn new() -> Self {
        Self::with_startup(None)
    }

    fn with_startup(path: Option<PathBuf>) -> Self {
        let c1 = MemoryDriver::new("c1");
        let c2 = MemoryDriver::new("c2");
        let mut drivers = DriverRegistry::new();
        drivers.add(Box::new(c1.clone()));
        drivers.add(Box::new(c2.clone()));
        let mgr = UpllConfigMgr::new(drivers, path);
        let config_id = mgr
            .handle(UpllRequest::AcquireConfigMode {
                session_id: SESSION,
            })
            .config_id
            .unwrap();
        Self {
            mgr,
            c1,
            c2,
            config_id,
        }
    }

    fn request(&self, op: Operation, dt: Datatype, ckv: ConfigKeyVal) -> UpllResponse {
        let header = RequestHeaderBuilder::default()
            .session_id(SESSION)
            .config_id(self.config_id)
            .operation(op)
            .datatype(dt)
            .build()
            .unwrap();
        self.mgr.handle(UpllRequest::Config { header, ckv })
    }

    fn create(&self, key: &ConfigKey, val: Option<ConfigVal>) -> UpllResponse {
        let mut ckv = ConfigKeyVal::new(key.clone());
        ckv.val = val;
        self.request(Operation::Create, Datatype::Candidate, ckv)
    }

    fn commit(&self) -> UpllResponse {
        self.mgr.handle(UpllRequest::Commit {
            session_id: SESSION,
            config_id: self.config_id,
        })
    }

    fn read(&self, dt: Datatype, key: &ConfigKey) -> ConfigKeyVal {
        let resp = self.request(Operation::Read, dt, ConfigKeyVal::new(key.clone()));
        assert!(resp.is_success(), "{}", resp.message);
        resp.ckvs.into_iter().next().unwrap()
    }

    fn status(&self, key: &ConfigKey) -> ConfigStatus {
        self.read(Datatype::Running, key).cs_row
    }
}

fn vbr_key(vtn: &str, vbr: &str) -> ConfigKey {
    ConfigKey::vtn(vtn).child_key(KeyType::Vbridge, vbr).unwrap()
}

fn vbr_at(ctrlr: &str) -> Option<ConfigVal> {
    Some(ConfigVal::Vbridge(VbrVal {
        controller_id: ctrlr.to_owned().into(),
        domain_id: "d1".to_owned().into(),
        ..Default::default()
    }))
}

fn described_vbr(description: &str) -> ConfigVal {
    ConfigVal::Vbridge(VbrVal {
        description: description.to_owned().into(),
        ..Default::default()
    })
}

#[test]
#[traced_test]
fn commit_fans_out_to_controllers() {
    let fx = Fixture::new();
    let vtn = ConfigKey::vtn("vtn1");
    assert!(fx.create(&vtn, None).is_success());
    assert!(fx.create(&vbr_key("vtn1", "br1"), vbr_at("c1")).is_success());
    assert!(fx.create(&vbr_key("vtn1", "br2"), vbr_at("c2")).is_success());
    let dirty = fx.mgr.handle(UpllRequest::IsCandidateDirty);
    assert_eq!(dirty.message, "dirty");

    assert!(fx.commit().is_success());
    assert!(fx.c1.contains(&vtn));
    assert!(fx.c1.contains(&vbr_key("vtn1", "br1")));
    assert!(!fx.c1.contains(&vbr_key("vtn1", "br2")));
    assert!(fx.c2.contains(&vbr_key("vtn1", "br2")));
    assert_eq!(fx.status(&vtn), ConfigStatus::Applied);
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "clean");

    // only the changed attribute is sent
    let update = ConfigKeyVal::with_val(vbr_key("vtn1", "br1"), described_vbr("first"));
    assert!(fx.request(Operation::Update, Datatype::Candidate, update).is_success());
    assert!(fx.commit().is_success());
    let last = fx.c1.history().pop().unwrap();
    assert_eq!(last.op, Operation::Update);
    assert_eq!(last.ckv.val, Some(described_vbr("first")));
    assert_eq!(fx.c2.commits(), 1);

    // deleting the VTN removes it everywhere
    let delete = ConfigKeyVal::new(vtn.clone());
    assert!(fx.request(Operation::Delete, Datatype::Candidate, delete).is_success());
    assert!(fx.commit().is_success());
    assert!(fx.c1.config().is_empty());
    assert!(fx.c2.config().is_empty());
}

#[test]
#[traced_test]
fn failed_vote_aborts_everywhere() {
    let fx = Fixture::new();
    fx.create(&ConfigKey::vtn("vtn1"), None);
    fx.create(&vbr_key("vtn1", "br1"), vbr_at("c1"));
    fx.create(&vbr_key("vtn1", "br2"), vbr_at("c2"));
    fx.c2.fail_at(Some(FailPoint::Vote));

    let resp = fx.commit();
    assert_eq!(resp.result_code, ResultCode::CommitFailed);
    assert!(fx.c1.config().is_empty());
    assert!(fx.c2.config().is_empty());
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "dirty");

    fx.c2.fail_at(None);
    assert!(fx.commit().is_success());
    assert_eq!(fx.c1.commits(), 1);
    assert_eq!(fx.c2.commits(), 1);
}

#[test]
#[traced_test]
fn disconnected_controller_catches_up_on_reconnect() {
    let fx = Fixture::new();
    let vtn = ConfigKey::vtn("vtn1");
    let br2 = vbr_key("vtn1", "br2");
    fx.create(&vtn, None);
    fx.create(&vbr_key("vtn1", "br1"), vbr_at("c1"));
    fx.create(&br2, vbr_at("c2"));
    fx.mgr.handle(UpllRequest::ControllerDisconnect {
        ctrlr: "c2".to_owned(),
    });

    assert!(fx.commit().is_success());
    assert_eq!(fx.status(&br2), ConfigStatus::NotApplied);
    assert_eq!(fx.status(&vtn), ConfigStatus::PartiallyApplied);
    assert!(fx.c2.config().is_empty());

    // a commit that does not touch c2 keeps its objects not applied
    fx.create(&vbr_key("vtn1", "br3"), vbr_at("c1"));
    assert!(fx.commit().is_success());
    assert_eq!(fx.status(&br2), ConfigStatus::NotApplied);

    let resp = fx.mgr.handle(UpllRequest::ControllerConnect {
        ctrlr: "c2".to_owned(),
    });
    assert!(resp.is_success(), "{}", resp.message);
    assert!(fx.c2.contains(&br2));
    assert!(fx.c2.contains(&vtn));
    assert_eq!(fx.status(&br2), ConfigStatus::Applied);
    assert_eq!(fx.status(&vtn), ConfigStatus::Applied);
}

#[test]
#[traced_test]
fn audit_repairs_controller() {
    let fx = Fixture::new();
    let br1 = vbr_key("vtn1", "br1");
    fx.create(&ConfigKey::vtn("vtn1"), None);
    fx.create(&br1, vbr_at("c1"));
    assert!(fx.commit().is_success());

    // the controller lost br1 and gained an object nobody configured
    let stray = vbr_key("vtn1", "stray");
    let mut behind_our_back = fx.c1.clone();
    behind_our_back.begin_tx().unwrap();
    behind_our_back
        .send(&DriverRequest {
            op: Operation::Delete,
            ckv: ConfigKeyVal::new(br1.clone()),
        })
        .unwrap();
    behind_our_back.vote().unwrap();
    behind_our_back.commit().unwrap();
    fx.c1.preload(ConfigKeyVal::new(stray.clone()));

    let resp = fx.mgr.handle(UpllRequest::Audit {
        ctrlr: "c1".to_owned(),
    });
    assert!(resp.is_success(), "{}", resp.message);
    assert_eq!(resp.count, Some(2));
    assert!(!fx.c1.contains(&stray));
    assert!(fx.c1.contains(&br1));

    // nothing left to do
    let resp = fx.mgr.handle(UpllRequest::Audit {
        ctrlr: "c1".to_owned(),
    });
    assert_eq!(resp.count, Some(0));

    fx.c1.disconnect();
    let resp = fx.mgr.handle(UpllRequest::Audit {
        ctrlr: "c1".to_owned(),
    });
    assert_eq!(resp.result_code, ResultCode::CtrlrDisconnected);
    let resp = fx.mgr.handle(UpllRequest::Audit {
        ctrlr: "c9".to_owned(),
    });
    assert_eq!(resp.result_code, ResultCode::DriverNotPresent);
}

#[test]
#[traced_test]
fn import_rename_and_merge() {
    let fx = Fixture::new();
    let tenant = ConfigKey::vtn("tenant");
    let mine = ConfigVal::Vtn(VtnVal {
        description: "mine".to_owned().into(),
    });
    assert!(fx.create(&tenant, Some(mine)).is_success());

    // c1 already holds a VTN of the same name
    let mut br = ConfigKeyVal::with_val(vbr_key("tenant", "br"), vbr_at("c1").unwrap());
    br.ctrlr_dom = Some(CtrlrDom::new("c1", "d1"));
    fx.c1
        .preload(ConfigKeyVal::with_val(tenant.clone(), ConfigVal::Vtn(VtnVal::default())));
    fx.c1.preload(br);

    let import = UpllRequest::Import {
        session_id: SESSION,
        config_id: fx.config_id,
        ctrlr: "c1".to_owned(),
    };
    let resp = fx.mgr.handle(import.clone());
    assert_eq!(resp.count, Some(2));
    assert_eq!(
        fx.mgr.handle(import).result_code,
        ResultCode::NotAllowedAtThisTime
    );

    let merge = UpllRequest::MergeImport {
        session_id: SESSION,
        config_id: fx.config_id,
    };
    assert_eq!(fx.mgr.handle(merge.clone()).result_code, ResultCode::MergeConflict);

    let rename = |kt, old: &str, new: &str| UpllRequest::RenameImported {
        session_id: SESSION,
        config_id: fx.config_id,
        kt,
        old_name: old.to_owned(),
        new_name: new.to_owned(),
    };
    assert_eq!(
        fx.mgr.handle(rename(KeyType::Vbridge, "br", "br2")).result_code,
        ResultCode::BadRequest
    );
    assert_eq!(
        fx.mgr.handle(rename(KeyType::Vtn, "nope", "x")).result_code,
        ResultCode::NoSuchInstance
    );
    assert!(fx.mgr.handle(rename(KeyType::Vtn, "tenant", "tenant_c1")).is_success());
    let resp = fx.mgr.handle(merge);
    assert!(resp.is_success(), "{}", resp.message);

    let merged = vbr_key("tenant_c1", "br");
    assert_eq!(fx.read(Datatype::Candidate, &merged).key, merged);
    assert_eq!(fx.status(&merged), ConfigStatus::Applied);
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "dirty");

    // the controller keeps its own name for the VTN
    let update = ConfigKeyVal::with_val(merged, described_vbr("imported"));
    assert!(fx.request(Operation::Update, Datatype::Candidate, update).is_success());
    assert!(fx.commit().is_success());
    let last = fx.c1.history().pop().unwrap();
    assert_eq!(last.op, Operation::Update);
    assert_eq!(last.ckv.key, vbr_key("tenant", "br"));
    assert!(fx.c1.contains(&tenant));
}

#[test]
#[traced_test]
fn deleted_vtn_gives_its_name_back() {
    let fx = Fixture::new();
    let mut br = ConfigKeyVal::with_val(vbr_key("tenant", "br"), vbr_at("c1").unwrap());
    br.ctrlr_dom = Some(CtrlrDom::new("c1", "d1"));
    fx.c1.preload(ConfigKeyVal::new(ConfigKey::vtn("tenant")));
    fx.c1.preload(br);
    assert!(
        fx.mgr
            .handle(UpllRequest::Import {
                session_id: SESSION,
                config_id: fx.config_id,
                ctrlr: "c1".to_owned(),
            })
            .is_success()
    );
    assert!(
        fx.mgr
            .handle(UpllRequest::RenameImported {
                session_id: SESSION,
                config_id: fx.config_id,
                kt: KeyType::Vtn,
                old_name: "tenant".to_owned(),
                new_name: "tenant_c1".to_owned(),
            })
            .is_success()
    );
    assert!(
        fx.mgr
            .handle(UpllRequest::MergeImport {
                session_id: SESSION,
                config_id: fx.config_id,
            })
            .is_success()
    );
    let dump = |dt| fx.mgr.handle(UpllRequest::Dump { datatype: dt }).message;
    assert!(dump(Datatype::Running).contains("tenant_c1 | br"));
    assert!(dump(Datatype::Running).contains("| imported,renamed"));

    // the controller name is known again after a reload
    assert!(fx.mgr.handle(UpllRequest::SaveStartup).is_success());
    assert!(fx.mgr.handle(UpllRequest::LoadStartup).is_success());
    assert!(dump(Datatype::Running).contains("| renamed"));
    assert!(fx.c1.contains(&vbr_key("tenant", "br")));

    let delete = ConfigKeyVal::new(ConfigKey::vtn("tenant_c1"));
    assert!(fx.request(Operation::Delete, Datatype::Candidate, delete).is_success());
    assert!(fx.commit().is_success());
    assert!(!fx.c1.contains(&vbr_key("tenant", "br")));
    assert!(!fx.c1.contains(&ConfigKey::vtn("tenant")));

    // a new VTN of the same name is sent under that name
    assert!(fx.create(&ConfigKey::vtn("tenant_c1"), None).is_success());
    assert!(fx.create(&vbr_key("tenant_c1", "fresh"), vbr_at("c1")).is_success());
    assert!(fx.commit().is_success());
    let fresh = vbr_key("tenant_c1", "fresh");
    assert!(
        fx.c1
            .history()
            .iter()
            .any(|r| r.op == Operation::Create && r.ckv.key == fresh)
    );
    assert!(fx.c1.contains(&ConfigKey::vtn("tenant_c1")));
    assert!(!fx.c1.contains(&ConfigKey::vtn("tenant")));
    assert!(!dump(Datatype::Running).contains("renamed"));
}

#[test]
#[traced_test]
fn abort_restores_running() {
    let fx = Fixture::new();
    let br1 = vbr_key("vtn1", "br1");
    assert!(fx.create(&ConfigKey::vtn("vtn1"), None).is_success());
    assert!(fx.create(&br1, vbr_at("c1")).is_success());
    assert!(fx.commit().is_success());
    let commits = fx.c1.commits();

    let update = ConfigKeyVal::with_val(br1.clone(), described_vbr("edited"));
    assert!(fx.request(Operation::Update, Datatype::Candidate, update).is_success());
    assert!(fx.create(&vbr_key("vtn1", "br2"), vbr_at("c2")).is_success());
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "dirty");

    let abort = UpllRequest::AbortCandidate {
        session_id: SESSION,
        config_id: fx.config_id,
    };
    let stale = UpllRequest::AbortCandidate {
        session_id: SESSION,
        config_id: fx.config_id + 1,
    };
    assert_ne!(fx.mgr.handle(stale).result_code, ResultCode::Success);
    assert!(fx.mgr.handle(abort).is_success());
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "clean");
    assert_eq!(
        fx.read(Datatype::Candidate, &br1),
        fx.read(Datatype::Running, &br1)
    );
    let resp = fx.request(
        Operation::Read,
        Datatype::Candidate,
        ConfigKeyVal::new(vbr_key("vtn1", "br2")),
    );
    assert_eq!(resp.result_code, ResultCode::NoSuchInstance);
    let dump = |dt| fx.mgr.handle(UpllRequest::Dump { datatype: dt }).message;
    assert_eq!(
        dump(Datatype::Candidate).replace("candidate", "running"),
        dump(Datatype::Running)
    );

    // nothing left to send
    assert!(fx.commit().is_success());
    assert_eq!(fx.c1.commits(), commits);
    assert_eq!(fx.c2.commits(), 0);
}

#[test]
#[traced_test]
fn reset_attributes_are_unset_on_create() {
    let fx = Fixture::new();
    assert!(fx.create(&ConfigKey::vtn("vtn1"), None).is_success());
    let br1 = vbr_key("vtn1", "br1");
    let with_reset = ConfigVal::Vbridge(VbrVal {
        controller_id: "c1".to_owned().into(),
        domain_id: "d1".to_owned().into(),
        description: Attr::ValidNoValue,
        ..Default::default()
    });
    assert!(fx.create(&br1, Some(with_reset)).is_success());
    assert_eq!(fx.read(Datatype::Candidate, &br1).val, vbr_at("c1"));

    assert!(fx.commit().is_success());
    let sent = fx
        .c1
        .history()
        .into_iter()
        .find(|r| r.ckv.key == br1)
        .unwrap();
    assert_eq!(sent.op, Operation::Create);
    assert!(!sent.ckv.val.unwrap().valid_flags().contains(&ValidFlag::ValidNoValue));
}

#[test]
#[traced_test]
fn cleared_import_leaves_configuration_alone() {
    let fx = Fixture::new();
    fx.c1.preload(ConfigKeyVal::new(ConfigKey::vtn("remote")));
    let resp = fx.mgr.handle(UpllRequest::Import {
        session_id: SESSION,
        config_id: fx.config_id,
        ctrlr: "c1".to_owned(),
    });
    assert_eq!(resp.count, Some(1));
    let resp = fx.request(
        Operation::ReadSiblingCount,
        Datatype::Import,
        ConfigKeyVal::new(ConfigKey::vtn("remote")),
    );
    assert_eq!(resp.count, Some(1));

    assert!(
        fx.mgr
            .handle(UpllRequest::ClearImport {
                session_id: SESSION,
                config_id: fx.config_id,
            })
            .is_success()
    );
    let resp = fx.mgr.handle(UpllRequest::MergeImport {
        session_id: SESSION,
        config_id: fx.config_id,
    });
    assert_eq!(resp.result_code, ResultCode::NotAllowedAtThisTime);
    assert_eq!(fx.mgr.handle(UpllRequest::IsCandidateDirty).message, "clean");
}

#[test]
#[traced_test]
fn startup_survives_restart() {
    let path = std::env::temp_dir().join(format!("upll-startup-it-{}.yaml", std::process::id()));
    let br1 = vbr_key("vtn1", "br1");
    {
        let fx = Fixture::with_startup(Some(path.clone()));
        fx.create(&ConfigKey::vtn("vtn1"), None);
        fx.create(&br1, vbr_at("c1"));
        assert!(fx.commit().is_success());
        assert!(fx.mgr.handle(UpllRequest::SaveStartup).is_success());
        assert!(path.exists());
    }

    // fresh controllers: loading audits them
    let fx = Fixture::with_startup(Some(path.clone()));
    assert!(fx.c1.config().is_empty());
    fx.c2.disconnect();
    let resp = fx.mgr.startup();
    assert!(resp.is_success(), "{}", resp.message);
    assert!(fx.c1.contains(&br1));
    assert_eq!(fx.status(&br1), ConfigStatus::Applied);
    assert_eq!(fx.read(Datatype::Candidate, &br1).key, br1);
    assert_eq!(fx.read(Datatype::Startup, &br1).key, br1);

    assert!(fx.mgr.handle(UpllRequest::ClearStartup).is_success());
    assert!(!path.exists());
}

#[test]
#[traced_test]
fn sibling_reads_and_state() {
    let fx = Fixture::new();
    fx.create(&ConfigKey::vtn("vtn1"), None);
    for name in ["a", "b", "c"] {
        assert!(fx.create(&vbr_key("vtn1", name), vbr_at("c1")).is_success());
    }
    assert!(fx.commit().is_success());

    let read = |op, max_rep_count, key: ConfigKey| {
        let header = RequestHeaderBuilder::default()
            .operation(op)
            .datatype(Datatype::Running)
            .max_rep_count(max_rep_count)
            .build()
            .unwrap();
        fx.mgr.handle(UpllRequest::Config {
            header,
            ckv: ConfigKeyVal::new(key),
        })
    };
    let names = |resp: &UpllResponse| -> Vec<ConfigKey> {
        resp.ckvs.iter().map(|ckv| ckv.key.clone()).collect()
    };
    let resp = read(Operation::ReadSiblingBegin, 2, vbr_key("vtn1", "z"));
    assert_eq!(names(&resp), vec![vbr_key("vtn1", "a"), vbr_key("vtn1", "b")]);
    let resp = read(Operation::ReadSibling, 0, vbr_key("vtn1", "a"));
    assert_eq!(names(&resp), vec![vbr_key("vtn1", "b"), vbr_key("vtn1", "c")]);
    let resp = read(Operation::ReadSiblingCount, 0, vbr_key("vtn1", "a"));
    assert_eq!(resp.count, Some(3));
    let resp = read(Operation::Read, 0, vbr_key("vtn1", "zz"));
    assert_eq!(resp.result_code, ResultCode::NoSuchInstance);

    for name in ["a", "b", "c"] {
        fx.mgr.handle(UpllRequest::OperStatus {
            ctrlr: "c1".to_owned(),
            key: vbr_key("vtn1", name),
            status: OperStatus::Up,
        });
    }
    let state = fx.read(Datatype::State, &ConfigKey::vtn("vtn1"));
    assert_eq!(state.oper_status, Some(OperStatus::Up));

    fx.mgr.handle(UpllRequest::ControllerDisconnect {
        ctrlr: "c1".to_owned(),
    });
    let state = fx.read(Datatype::State, &vbr_key("vtn1", "a"));
    assert_eq!(state.oper_status, Some(OperStatus::Unknown));
}

#[test]
#[traced_test]
fn flow_filters_follow_their_interface() {
    let fx = Fixture::new();
    let flowlist = ConfigKey::flowlist("web");
    let ip = Some(ConfigVal::FlowList(FlowListVal {
        ip_type: IpType::Ip.into(),
    }));
    assert!(fx.create(&flowlist, ip).is_success());
    fx.create(&ConfigKey::vtn("vtn1"), None);
    fx.create(&vbr_key("vtn1", "br1"), vbr_at("c1"));
    let vbr_if = vbr_key("vtn1", "br1").child_key(KeyType::VbrIf, "if1").unwrap();
    assert!(fx.create(&vbr_if, None).is_success());
    let filter = vbr_if.child_key(KeyType::VbrIfFlowFilter, "in").unwrap();
    assert!(fx.create(&filter, None).is_success());

    let entry = |seq: &str, action: FlowAction| {
        let key = filter
            .child_key(KeyType::VbrIfFlowFilterEntry, seq)
            .unwrap();
        let val = ConfigVal::VbrIfFlowFilterEntry(FlowFilterEntryVal {
            flowlist_name: "web".to_owned().into(),
            action: action.into(),
            ..Default::default()
        });
        (key, Some(val))
    };
    let (redirect, val) = entry("20", FlowAction::Redirect);
    assert_eq!(fx.create(&redirect, val).result_code, ResultCode::CfgSemantic);
    let (pass, val) = entry("10", FlowAction::Pass);
    assert!(fx.create(&pass, val).is_success());

    assert!(fx.commit().is_success());
    assert!(fx.c1.contains(&flowlist));
    assert!(fx.c1.contains(&pass));
    assert!(!fx.c2.contains(&flowlist));

    let delete = ConfigKeyVal::new(flowlist.clone());
    let resp = fx.request(Operation::Delete, Datatype::Candidate, delete);
    assert_eq!(resp.result_code, ResultCode::CfgSemantic);
}
