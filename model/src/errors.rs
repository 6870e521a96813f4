// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Failures of configuration requests.
//! Every error maps to one [`ResultCode`], which is what is reported to clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::ConfigKey;
use crate::keytype::KeyType;
use crate::types::{Datatype, Operation};

/// Result codes reported back to clients
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultCode {
    Success,
    CfgSyntax,
    CfgSemantic,
    InstanceExists,
    NoSuchInstance,
    ParentDoesNotExist,
    NoSuchOperation,
    NoSuchDatatype,
    BadRequest,
    NotAllowedAtThisTime,
    CtrlrDisconnected,
    DriverNotPresent,
    MergeConflict,
    InvalidConfigId,
    ConfigModeBusy,
    AuditFailed,
    CommitFailed,
    Generic,
}

/// The reasons why a configuration request may be rejected or fail
#[derive(Debug, Error, PartialEq)]
pub enum UpllError {
    #[error("Bad {0}: {1}")]
    CfgSyntax(&'static str, String),
    #[error("Semantic error: {0}")]
    CfgSemantic(String),
    #[error("Instance {0} already exists")]
    InstanceExists(ConfigKey),
    #[error("No such instance: {0}")]
    NoSuchInstance(ConfigKey),
    #[error("Parent of {0} does not exist")]
    ParentDoesNotExist(ConfigKey),
    #[error("Operation {0} is not supported for key type {1}")]
    NoSuchOperation(Operation, KeyType),
    #[error("Datatype {0} is not valid for operation {1}")]
    NoSuchDatatype(Datatype, Operation),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not allowed at this time: {0}")]
    NotAllowedAtThisTime(String),
    #[error("Controller '{0}' is disconnected")]
    CtrlrDisconnected(String),
    #[error("No driver for controller '{0}'")]
    DriverNotPresent(String),
    #[error("Imported {0} conflicts with the candidate configuration")]
    MergeConflict(ConfigKey),
    #[error("Invalid config id {0}")]
    InvalidConfigId(u32),
    #[error("Config mode is held by session {0}")]
    ConfigModeBusy(u32),
    #[error("Audit of controller '{0}' failed: {1}")]
    AuditFailed(String, String),
    #[error("Commit failed at controller '{ctrlr}': {reason}")]
    CommitFailed { ctrlr: String, reason: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpllError {
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            UpllError::CfgSyntax(..) => ResultCode::CfgSyntax,
            UpllError::CfgSemantic(_) => ResultCode::CfgSemantic,
            UpllError::InstanceExists(_) => ResultCode::InstanceExists,
            UpllError::NoSuchInstance(_) => ResultCode::NoSuchInstance,
            UpllError::ParentDoesNotExist(_) => ResultCode::ParentDoesNotExist,
            UpllError::NoSuchOperation(..) => ResultCode::NoSuchOperation,
            UpllError::NoSuchDatatype(..) => ResultCode::NoSuchDatatype,
            UpllError::BadRequest(_) => ResultCode::BadRequest,
            UpllError::NotAllowedAtThisTime(_) => ResultCode::NotAllowedAtThisTime,
            UpllError::CtrlrDisconnected(_) => ResultCode::CtrlrDisconnected,
            UpllError::DriverNotPresent(_) => ResultCode::DriverNotPresent,
            UpllError::MergeConflict(_) => ResultCode::MergeConflict,
            UpllError::InvalidConfigId(_) => ResultCode::InvalidConfigId,
            UpllError::ConfigModeBusy(_) => ResultCode::ConfigModeBusy,
            UpllError::AuditFailed(..) => ResultCode::AuditFailed,
            UpllError::CommitFailed { .. } => ResultCode::CommitFailed,
            UpllError::Internal(_) => ResultCode::Generic,
        }
    }
    /// Shorthand for syntax errors
    pub fn syntax(what: &'static str, reason: impl Into<String>) -> Self {
        UpllError::CfgSyntax(what, reason.into())
    }
}

/// Result-like type for configuration operations
pub type UpllResult<T> = Result<T, UpllError>;
