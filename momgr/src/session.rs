// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Requests and responses of the configuration service, and the config mode lock

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use model::{
    ConfigKey, ConfigKeyVal, Datatype, KeyType, OperStatus, Operation, ResultCode, UpllError,
    UpllResult,
};

/// Identifies a configuration request and what it does
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    #[builder(default)]
    #[serde(default)]
    pub session_id: u32,
    #[builder(default)]
    #[serde(default)]
    pub config_id: u32,
    pub operation: Operation,
    #[builder(default = Datatype::Candidate)]
    #[serde(default = "candidate")]
    pub datatype: Datatype,
    /// maximum number of objects in a read response; 0 means no limit
    #[builder(default)]
    #[serde(default)]
    pub max_rep_count: u32,
}

fn candidate() -> Datatype {
    Datatype::Candidate
}

/// Requests to the configuration manager
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "request", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpllRequest {
    AcquireConfigMode {
        session_id: u32,
    },
    ReleaseConfigMode {
        session_id: u32,
        config_id: u32,
    },
    Config {
        header: RequestHeader,
        ckv: ConfigKeyVal,
    },
    Commit {
        session_id: u32,
        config_id: u32,
    },
    AbortCandidate {
        session_id: u32,
        config_id: u32,
    },
    IsCandidateDirty,
    Audit {
        ctrlr: String,
    },
    SaveStartup,
    LoadStartup,
    ClearStartup,
    Import {
        session_id: u32,
        config_id: u32,
        ctrlr: String,
    },
    RenameImported {
        session_id: u32,
        config_id: u32,
        kt: KeyType,
        old_name: String,
        new_name: String,
    },
    MergeImport {
        session_id: u32,
        config_id: u32,
    },
    ClearImport {
        session_id: u32,
        config_id: u32,
    },
    ControllerConnect {
        ctrlr: String,
    },
    ControllerDisconnect {
        ctrlr: String,
    },
    OperStatus {
        ctrlr: String,
        key: ConfigKey,
        status: OperStatus,
    },
    Dump {
        datatype: Datatype,
    },
}

impl UpllRequest {
    /// A short name for logs and the task scheduler
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            UpllRequest::Config { header, ckv } => {
                format!("{} {} {}", header.operation, header.datatype, ckv.key_type())
            }
            other => {
                let kind: &'static str = other.into();
                kind.to_owned()
            }
        }
    }
}

/// Responses of the configuration manager
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpllResponse {
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ckvs: Vec<ConfigKeyVal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<u32>,
}

impl UpllResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            result_code: ResultCode::Success,
            message: String::new(),
            ckvs: vec![],
            count: None,
            config_id: None,
        }
    }
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
    #[must_use]
    pub fn with_ckvs(mut self, ckvs: Vec<ConfigKeyVal>) -> Self {
        self.ckvs = ckvs;
        self
    }
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result_code == ResultCode::Success
    }
}

impl From<UpllError> for UpllResponse {
    fn from(error: UpllError) -> Self {
        Self {
            result_code: error.result_code(),
            message: error.to_string(),
            ..Self::success()
        }
    }
}

impl From<UpllResult<UpllResponse>> for UpllResponse {
    fn from(result: UpllResult<UpllResponse>) -> Self {
        result.unwrap_or_else(UpllResponse::from)
    }
}

/// Exclusive right of one session to edit the candidate configuration
#[derive(Debug, Default)]
pub struct ConfigLock {
    /// session holding config mode and the config id it was given
    owner: Option<(u32, u32)>,
    last_config_id: u32,
}

impl ConfigLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter config mode. A session already in config mode gets its config id back.
    pub fn acquire(&mut self, session_id: u32) -> UpllResult<u32> {
        match self.owner {
            Some((owner, config_id)) if owner == session_id => Ok(config_id),
            Some((owner, _)) => {
                warn!("Session {session_id} can't enter config mode: held by {owner}");
                Err(UpllError::ConfigModeBusy(owner))
            }
            None => {
                self.last_config_id += 1;
                let config_id = self.last_config_id;
                self.owner = Some((session_id, config_id));
                info!("Session {session_id} entered config mode, config id {config_id}");
                Ok(config_id)
            }
        }
    }

    pub fn release(&mut self, session_id: u32, config_id: u32) -> UpllResult<()> {
        self.check(session_id, config_id)?;
        self.owner = None;
        info!("Session {session_id} left config mode");
        Ok(())
    }

    /// Check that a session is in config mode with the given config id
    pub fn check(&self, session_id: u32, config_id: u32) -> UpllResult<()> {
        match self.owner {
            None => Err(UpllError::NotAllowedAtThisTime(
                "no session is in config mode".to_owned(),
            )),
            Some((owner, _)) if owner != session_id => Err(UpllError::ConfigModeBusy(owner)),
            Some((_, id)) if id != config_id => {
                debug!("Session {session_id} used config id {config_id} instead of {id}");
                Err(UpllError::InvalidConfigId(config_id))
            }
            Some(_) => Ok(()),
        }
    }

    #[must_use]
    pub fn owner(&self) -> Option<u32> {
        self.owner.map(|(session, _)| session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_mode() {
        let mut lock = ConfigLock::new();
        assert!(lock.check(1, 1).is_err());
        let id = lock.acquire(1).unwrap();
        assert_eq!(lock.acquire(1), Ok(id));
        assert_eq!(lock.acquire(2), Err(UpllError::ConfigModeBusy(1)));
        assert_eq!(lock.check(2, id), Err(UpllError::ConfigModeBusy(1)));
        assert_eq!(lock.check(1, id + 1), Err(UpllError::InvalidConfigId(id + 1)));
        lock.release(1, id).unwrap();
        assert_eq!(lock.owner(), None);
        let next = lock.acquire(2).unwrap();
        assert_ne!(next, id);
    }

    #[test]
    fn header_builder() {
        let header = RequestHeaderBuilder::default()
            .operation(Operation::ReadSiblingBegin)
            .max_rep_count(10)
            .build()
            .unwrap();
        assert_eq!(header.datatype, Datatype::Candidate);
        assert_eq!(header.session_id, 0);
        assert!(RequestHeaderBuilder::default().build().is_err());
    }

    #[test]
    fn request_yaml() {
        let yaml = "request: config\n\
                    header:\n  session_id: 1\n  config_id: 1\n  operation: create\n\
                    ckv:\n  key:\n    kt: vtn\n    vtn_name: vtn1\n\
                    \x20 val:\n    kt: vtn\n    description: first\n";
        let request: UpllRequest = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(request.name(), "create candidate vtn");
        let UpllRequest::Config { header, ckv } = &request else {
            unreachable!();
        };
        assert_eq!(header.datatype, Datatype::Candidate);
        assert_eq!(ckv.key, ConfigKey::vtn("vtn1"));

        let commit: UpllRequest =
            serde_yaml_ng::from_str("request: commit\nsession_id: 1\nconfig_id: 1\n").unwrap();
        assert_eq!(commit.name(), "commit");
        let dirty: UpllRequest = serde_yaml_ng::from_str("request: is_candidate_dirty\n").unwrap();
        assert_eq!(dirty, UpllRequest::IsCandidateDirty);
    }
}
