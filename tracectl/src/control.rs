// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetDbByTag;
use crate::targets::{DECLARED_TARGETS, TargetDecl};

/// Failures when (re)configuring tracing
#[derive(Debug, Error, PartialEq)]
pub enum TraceCtlError {
    #[error("Invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("Invalid level '{0}'")]
    BadLevel(String),
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
}

#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub target: &'static str,
    pub name: &'static str,
    pub level: LevelFilter,
    pub tags: Vec<&'static str>,
}
impl From<&TargetDecl> for TargetCfg {
    fn from(&(target, name, level, tags): &TargetDecl) -> Self {
        // a target can always be addressed by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TargetDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, BTreeSet<&'static str>>,
}

impl TargetDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for decl in DECLARED_TARGETS {
            db.register(TargetCfg::from(decl));
        }
        db
    }
    fn register(&mut self, tcfg: TargetCfg) {
        for tag in &tcfg.tags {
            self.tags.entry(*tag).or_default().insert(tcfg.target);
        }
        if let Some(prior) = self.targets.insert(tcfg.target, tcfg) {
            warn!("Tracing target {} declared more than once", prior.target);
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for t in self.targets.values() {
            match format!("{}={}", t.target, t.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => error!("Bad directive for target {}: {e}", t.target),
            }
        }
        filter
    }
    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> Result<usize, TraceCtlError> {
        let Some(members) = self.tags.get(tag) else {
            return Err(TraceCtlError::UnknownTag(tag.to_owned()));
        };
        let mut changed = 0;
        for target in members {
            if let Some(tcfg) = self.targets.get_mut(target)
                && tcfg.level != level
            {
                tcfg.level = level;
                changed += 1;
            }
        }
        Ok(changed)
    }
    pub(crate) fn targets_with_tag(&self, tag: &str) -> impl Iterator<Item = &TargetCfg> {
        let members = self.tags.get(tag);
        self.targets
            .values()
            .filter(move |t| members.is_some_and(|m| m.contains(t.target)))
    }
}

/// Handle to the process-wide tracing configuration
pub struct TracingControl {
    db: Mutex<TargetDb>,
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetDb::new(LevelFilter::INFO);
        let (filter, reload_handle) = reload::Layer::new(db.env_filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        // in tests, another subscriber may have been installed already
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            warn!("Tracing subscriber already set: {e}");
        }
        Self {
            db: Mutex::new(db),
            reload_handle,
        }
    }
    fn reload(&self, db: &TargetDb) {
        if let Err(e) = self.reload_handle.reload(db.env_filter()) {
            error!("Failed to reload tracing filter: {e}");
        }
    }

    pub fn init() {
        get_trace_ctl();
    }
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        if db.level != level {
            db.level = level;
            self.reload(&db);
            info!("Default tracing level is now {level}");
        }
    }
    #[must_use]
    pub fn default_level(&self) -> LevelFilter {
        self.db.lock().level
    }
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        db.targets.values_mut().for_each(|t| t.level = level);
        self.reload(&db);
    }
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        let mut db = self.db.lock();
        let changed = db.set_tag_level(tag, level)?;
        if changed > 0 {
            self.reload(&db);
        }
        info!("Tracing level for tag '{tag}' set to {level} ({changed} targets changed)");
        Ok(())
    }

    /// Parse a comma-separated list of tag=level items.
    fn parse_config(input: &str) -> Result<Vec<(String, LevelFilter)>, TraceCtlError> {
        input
            .split(',')
            .map(str::trim)
            .map(|item| {
                let (tag, level) = item
                    .split_once('=')
                    .ok_or_else(|| TraceCtlError::Syntax(item.to_owned()))?;
                let level = LevelFilter::from_str(level.trim())
                    .map_err(|_| TraceCtlError::BadLevel(level.trim().to_owned()))?;
                Ok((tag.trim().to_owned(), level))
            })
            .collect()
    }

    /// Configure tracing from a string like `default=warn,all=info,tx=debug`.
    /// `default` sets the level of undeclared targets and `all` that of every
    /// declared target. Other items are tags and are applied last, in order.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_config(input)?;
        for (tag, level) in &config {
            match tag.as_str() {
                "default" => self.set_default_level(*level),
                "all" => self.set_level_all(*level),
                _ => {}
            }
        }
        for (tag, level) in config
            .iter()
            .filter(|(tag, _)| tag != "default" && tag != "all")
        {
            self.set_tag_level(tag, *level)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db.lock().targets.get(target).cloned()
    }
    #[must_use]
    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.db.lock().targets_with_tag(tag).cloned().collect()
    }
    #[must_use]
    pub fn get_tags(&self) -> Vec<&'static str> {
        self.db.lock().tags.keys().copied().collect()
    }
    #[must_use]
    pub fn as_config_string(&self) -> String {
        let db = self.db.lock();
        let mut out = format!("default={}", db.level);
        for t in db.targets.values() {
            out += &format!(",{}={}", t.name, t.level);
        }
        out
    }
    pub fn dump(&self) {
        let db = self.db.lock();
        info!("{}", *db);
    }
    pub fn dump_targets_by_tag(&self) {
        let db = self.db.lock();
        info!("{}", TargetDbByTag(&db));
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process-wide [`TracingControl`], initializing tracing on first use
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_target;
    use serial_test::serial;

    const TAG: &str = "test-common";

    trace_target!("test-t1" => "t1", LevelFilter::DEBUG, &[TAG]);
    trace_target!("test-t2" => "t2", LevelFilter::ERROR, &[TAG]);
    trace_target!("test-lonely" => "lonely", LevelFilter::TRACE, &[]);

    #[test]
    #[serial]
    fn targets_are_collected_at_link_time() {
        let tctl = get_trace_ctl();
        assert!(tctl.get_target("test-t1").is_some());
        assert!(tctl.get_target("test-lonely").is_some());
        // the crate's own module-path target
        assert!(tctl.get_target("upll_tracectl").is_some());
        // the name of a target is always usable as a tag
        assert!(tctl.get_tags().contains(&"lonely"));
        assert_eq!(tctl.get_targets_by_tag("lonely")[0].target, "test-lonely");
    }

    #[test]
    #[serial]
    fn tag_level_applies_to_all_members() {
        let tctl = get_trace_ctl();
        tctl.set_tag_level(TAG, LevelFilter::OFF).unwrap();
        let members = tctl.get_targets_by_tag(TAG);
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|t| t.level == LevelFilter::OFF));
        assert_eq!(
            tctl.set_tag_level("no-such-tag", LevelFilter::OFF),
            Err(TraceCtlError::UnknownTag("no-such-tag".to_owned()))
        );
    }

    #[test]
    #[serial]
    fn setup_from_string() {
        let tctl = get_trace_ctl();
        tctl.setup_from_string("default=warn, all=info, lonely=error")
            .unwrap();
        assert_eq!(tctl.default_level(), LevelFilter::WARN);
        assert_eq!(tctl.get_target("test-t2").unwrap().level, LevelFilter::INFO);
        assert_eq!(
            tctl.get_target("test-lonely").unwrap().level,
            LevelFilter::ERROR
        );
        assert!(tctl.as_config_string().starts_with("default=warn"));

        assert!(matches!(
            tctl.setup_from_string("test-t1=loud"),
            Err(TraceCtlError::BadLevel(_))
        ));
        assert!(matches!(
            tctl.setup_from_string("test-t1=info,oops"),
            Err(TraceCtlError::Syntax(_))
        ));
        tctl.dump();
        tctl.dump_targets_by_tag();
    }
}
