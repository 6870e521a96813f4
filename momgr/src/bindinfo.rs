// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Column descriptions of configuration tables, used to render rows

use std::fmt::{self, Display};

use model::{ConfigKey, ConfigVal, Datatype, KeyType};

use crate::table::{ConfigDb, Record};

/// What a column holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColumnKind {
    Key,
    Value,
    Ctrlr,
    Domain,
    Status,
    Flags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// The columns of the table of one key type
#[derive(Clone, Debug)]
pub struct BindInfo {
    pub kt: KeyType,
    pub columns: Vec<Column>,
}

impl BindInfo {
    #[must_use]
    pub fn new(kt: KeyType) -> Self {
        let column = |kind: ColumnKind| move |name: &'static str| Column { name, kind };
        let mut columns: Vec<Column> = kt
            .key_columns()
            .into_iter()
            .map(column(ColumnKind::Key))
            .collect();
        if let Some(val) = ConfigVal::empty(kt) {
            columns.extend(val.attr_names().iter().copied().map(column(ColumnKind::Value)));
        }
        columns.push(Column {
            name: "ctrlr_name",
            kind: ColumnKind::Ctrlr,
        });
        columns.push(Column {
            name: "domain_id",
            kind: ColumnKind::Domain,
        });
        columns.push(Column {
            name: "cs_rowstatus",
            kind: ColumnKind::Status,
        });
        columns.push(Column {
            name: "flags",
            kind: ColumnKind::Flags,
        });
        Self { kt, columns }
    }

    /// The cells of a row, one per column
    #[must_use]
    pub fn render(&self, key: &ConfigKey, record: &Record) -> Vec<String> {
        let mut cells: Vec<String> = key.columns().into_iter().map(|(_, v)| v).collect();
        if let Some(val) = &record.val {
            cells.extend(val.attr_strings());
        }
        let (ctrlr, domain) = record
            .ctrlr_dom
            .as_ref()
            .map_or(("-".to_owned(), "-".to_owned()), |cd| {
                (cd.ctrlr.clone(), cd.domain.clone())
            });
        cells.push(ctrlr);
        cells.push(domain);
        cells.push(record.cs_row.to_string());
        cells.push(record.flags.to_string());
        cells
    }

    /// Render a whole table: a header line and one line per row
    #[must_use]
    pub fn dump(&self, db: &ConfigDb, dt: Datatype) -> String {
        TableDump { info: self, db, dt }.to_string()
    }
}

struct TableDump<'a> {
    info: &'a BindInfo,
    db: &'a ConfigDb,
    dt: Datatype,
}

impl Display for TableDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<&str> = self.info.columns.iter().map(|c| c.name).collect();
        writeln!(f, "{} {}:", self.dt, self.info.kt)?;
        writeln!(f, "  {}", header.join(" | "))?;
        if let Some(table) = self.db.table(self.dt, self.info.kt) {
            for (key, record) in table.iter() {
                writeln!(f, "  {}", self.info.render(key, record).join(" | "))?;
            }
        }
        Ok(())
    }
}

/// Render every non-empty table of a datatype, in key tree order
#[must_use]
pub fn dump_datatype(db: &ConfigDb, dt: Datatype) -> String {
    model::key_tree()
        .preorder()
        .filter(|kt| db.table(dt, *kt).is_some_and(|t| !t.is_empty()))
        .map(|kt| BindInfo::new(kt).dump(db, dt))
        .collect()
}
