//! The PAM asset table, parsed once and cached.
//!
//! Every inference pass and the merge pass replay [`AssetTable::rows`], so the
//! asset file is read from disk exactly once per run.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    error::MigrationError,
    fields::Field,
    io_utils,
    rows::{RowOutcome, check_arity, column_position},
};

pub const CODE_COLUMN: &str = "code";
pub const LOCALIZED_COLUMN: &str = "localized";

/// Positions of the columns the engine reads by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetColumns {
    pub code: usize,
    pub localized: Option<usize>,
    pub categories: Option<usize>,
    pub tags: Option<usize>,
    pub end_of_use: Option<usize>,
    pub description: Option<usize>,
}

impl AssetColumns {
    pub fn resolve(headers: &[String]) -> Result<Self, MigrationError> {
        let code = column_position(headers, CODE_COLUMN).ok_or_else(|| {
            MigrationError::MissingColumn {
                table: "assets",
                column: CODE_COLUMN.to_string(),
            }
        })?;
        Ok(Self {
            code,
            localized: column_position(headers, LOCALIZED_COLUMN),
            categories: column_position(headers, Field::Categories.as_str()),
            tags: column_position(headers, Field::Tags.as_str()),
            end_of_use: column_position(headers, Field::EndOfUse.as_str()),
            description: column_position(headers, Field::Description.as_str()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    pub line: usize,
    pub code: String,
    pub localized: Option<String>,
    pub categories: Option<String>,
    pub tags: Option<String>,
    pub end_of_use: Option<String>,
    pub description: Option<String>,
    /// Every cell of the source row, in header order.
    pub fields: Vec<String>,
}

impl AssetRow {
    pub fn parse(
        columns: &AssetColumns,
        header_len: usize,
        line: usize,
        record: Vec<String>,
    ) -> RowOutcome<AssetRow> {
        if let Some(reason) = check_arity(header_len, &record) {
            return RowOutcome::Skip(reason);
        }
        let cell = |idx: Option<usize>| idx.map(|idx| record[idx].clone());
        RowOutcome::Row(AssetRow {
            line,
            code: record[columns.code].clone(),
            localized: cell(columns.localized),
            categories: cell(columns.categories),
            tags: cell(columns.tags),
            end_of_use: cell(columns.end_of_use),
            description: cell(columns.description),
            fields: record,
        })
    }

    pub fn is_localized(&self) -> bool {
        self.localized.as_deref() == Some("1")
    }

    pub fn category_tokens(&self) -> impl Iterator<Item = &str> {
        split_tokens(self.categories.as_deref())
    }

    pub fn tag_tokens(&self) -> impl Iterator<Item = &str> {
        split_tokens(self.tags.as_deref())
    }
}

fn split_tokens(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or("")
        .split(',')
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Clone)]
pub struct AssetTable {
    pub source_name: String,
    pub headers: Vec<String>,
    pub columns: AssetColumns,
    pub rows: Vec<AssetRow>,
    pub skipped: usize,
}

impl AssetTable {
    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        Self::from_reader(&mut reader, path.display().to_string(), encoding)
            .with_context(|| format!("Loading assets from {path:?}"))
    }

    pub fn from_reader<R: Read>(
        reader: &mut csv::Reader<R>,
        source_name: String,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let (headers, records) = io_utils::read_table(reader, encoding)?;
        let columns = AssetColumns::resolve(&headers)?;
        let mut rows = Vec::with_capacity(records.len());
        let mut skipped = 0usize;
        for (line, record) in records {
            match AssetRow::parse(&columns, headers.len(), line, record) {
                RowOutcome::Row(row) => rows.push(row),
                RowOutcome::Skip(reason) => {
                    debug!("Skipping asset line {line} of {source_name}: {reason}");
                    skipped += 1;
                }
            }
        }
        Ok(Self {
            source_name,
            headers,
            columns,
            rows,
            skipped,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        column_position(&self.headers, name).is_some()
    }

    /// Fails with `EmptyInput` when no well-formed rows were read.
    pub fn ensure_not_empty(&self) -> Result<(), MigrationError> {
        if self.rows.is_empty() {
            Err(MigrationError::EmptyInput {
                source_name: self.source_name.clone(),
            })
        } else {
            Ok(())
        }
    }
}
