//! `;`-delimited address tables.
//!
//! Two layouts are understood, both without a header row:
//!
//! * [`TableLayout::Simple`]: `description;<unused>;address`
//! * [`TableLayout::Switch`]:
//!   `location;input_description;input_address;output_description;output_address`
//!
//! In the switch layout the output address is the state that gets polled and the
//! input address is the HR toggle bit forced by the switch commands. Descriptions
//! and the location are lowercased.
//!
//! Rows that fail to parse are collected in [`AddressTable::rejected`] and the rest
//! of the table still loads.

use crate::PollTarget;
use hostlink_core::{Address, AddressError};
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableLayout {
    #[default]
    Simple,
    Switch,
}

impl TableLayout {
    pub const fn field_count(self) -> usize {
        match self {
            Self::Simple => 3,
            Self::Switch => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("{column} {token:?}: {source}")]
    Address {
        column: &'static str,
        token: String,
        source: AddressError,
    },
}

#[derive(Debug)]
pub struct RejectedRow {
    /// 1-based line number in the source.
    pub line: u64,
    pub error: RowError,
}

#[derive(Debug, Deserialize)]
struct SimpleRecord {
    description: String,
    _unused: IgnoredAny,
    address: String,
}

#[derive(Debug, Deserialize)]
struct SwitchRecord {
    location: String,
    input_description: String,
    input_address: String,
    output_description: String,
    output_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRow {
    pub location: String,
    pub input_description: String,
    pub input_address: Address,
    pub output_description: String,
    pub output_address: Address,
}

impl SwitchRow {
    /// The polled state: named after the output, read from the output address.
    pub fn target(&self) -> PollTarget {
        PollTarget::new(self.output_description.clone(), self.output_address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    Simple(PollTarget),
    Switch(SwitchRow),
}

impl TableRow {
    pub fn target(&self) -> PollTarget {
        match self {
            Self::Simple(target) => target.clone(),
            Self::Switch(row) => row.target(),
        }
    }
}

fn parse_address(column: &'static str, token: &str) -> Result<Address, RowError> {
    Address::parse(token).map_err(|source| RowError::Address {
        column,
        token: token.to_string(),
        source,
    })
}

fn parse_row(record: &csv::StringRecord, layout: TableLayout) -> Result<TableRow, RowError> {
    let expected = layout.field_count();
    if record.len() < expected {
        return Err(RowError::FieldCount {
            expected,
            found: record.len(),
        });
    }
    let record: csv::StringRecord = record.iter().take(expected).collect();

    match layout {
        TableLayout::Simple => {
            let row: SimpleRecord = record.deserialize(None)?;
            Ok(TableRow::Simple(PollTarget::new(
                row.description,
                parse_address("address", &row.address)?,
            )))
        }
        TableLayout::Switch => {
            let row: SwitchRecord = record.deserialize(None)?;
            Ok(TableRow::Switch(SwitchRow {
                location: row.location.to_lowercase(),
                input_description: row.input_description.to_lowercase(),
                input_address: parse_address("input_address", &row.input_address)?,
                output_description: row.output_description.to_lowercase(),
                output_address: parse_address("output_address", &row.output_address)?,
            }))
        }
    }
}

#[derive(Debug, Default)]
pub struct AddressTable {
    rows: Vec<TableRow>,
    rejected: Vec<RejectedRow>,
}

impl AddressTable {
    pub fn from_path(path: impl AsRef<Path>, layout: TableLayout) -> Result<Self, TableError> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_reader(file, layout)?;
        debug!(
            path = %path.as_ref().display(),
            rows = table.rows.len(),
            rejected = table.rejected.len(),
            "loaded address table"
        );
        Ok(table)
    }

    pub fn from_reader<R: io::Read>(reader: R, layout: TableLayout) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::default();
        for record in rdr.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    let line = err.position().map_or(0, |pos| pos.line());
                    table.reject(line, RowError::Malformed(err));
                    continue;
                }
            };
            if record.iter().all(str::is_empty) {
                continue;
            }

            let line = record.position().map_or(0, |pos| pos.line());
            match parse_row(&record, layout) {
                Ok(row) => table.rows.push(row),
                Err(error) => table.reject(line, error),
            }
        }
        Ok(table)
    }

    fn reject(&mut self, line: u64, error: RowError) {
        warn!(line, error = %error, "skipping address table row");
        self.rejected.push(RejectedRow { line, error });
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn targets(&self) -> Vec<PollTarget> {
        self.rows.iter().map(TableRow::target).collect()
    }

    pub fn switches(&self) -> impl Iterator<Item = &SwitchRow> {
        self.rows.iter().filter_map(|row| match row {
            TableRow::Switch(switch) => Some(switch),
            TableRow::Simple(_) => None,
        })
    }
}
