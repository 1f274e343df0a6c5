//! Variation indexing.
//!
//! The variation file is streamed once. Each well-formed row lands in the
//! bucket of its asset code, and the distinct channels and locales are
//! collected in first-seen order along the way so that the merged header is
//! deterministic.

use std::{
    collections::{HashMap, HashSet},
    io::Read,
    path::Path,
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    error::MigrationError,
    io_utils,
    rows::{RowOutcome, check_arity, column_position},
};

pub const ASSET_COLUMN: &str = "asset";
pub const CHANNEL_COLUMN: &str = "channel";
pub const LOCALE_COLUMN: &str = "locale";
pub const REFERENCE_FILE_COLUMN: &str = "reference_file";
pub const VARIATION_FILE_COLUMN: &str = "variation_file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationColumns {
    asset: usize,
    channel: usize,
    locale: usize,
    reference_file: usize,
    variation_file: usize,
}

impl VariationColumns {
    pub fn resolve(headers: &[String]) -> Result<Self, MigrationError> {
        let find = |name: &str| {
            column_position(headers, name).ok_or_else(|| MigrationError::MissingColumn {
                table: "variations",
                column: name.to_string(),
            })
        };
        Ok(Self {
            asset: find(ASSET_COLUMN)?,
            channel: find(CHANNEL_COLUMN)?,
            locale: find(LOCALE_COLUMN)?,
            reference_file: find(REFERENCE_FILE_COLUMN)?,
            variation_file: find(VARIATION_FILE_COLUMN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationRow {
    pub line: usize,
    pub asset: String,
    pub channel: String,
    pub locale: String,
    pub reference_file: String,
    pub variation_file: String,
}

impl VariationRow {
    pub fn parse(
        columns: &VariationColumns,
        header_len: usize,
        line: usize,
        record: &[String],
    ) -> RowOutcome<VariationRow> {
        if let Some(reason) = check_arity(header_len, record) {
            return RowOutcome::Skip(reason);
        }
        RowOutcome::Row(VariationRow {
            line,
            asset: record[columns.asset].clone(),
            channel: record[columns.channel].clone(),
            locale: record[columns.locale].clone(),
            reference_file: record[columns.reference_file].clone(),
            variation_file: record[columns.variation_file].clone(),
        })
    }

    pub fn is_localized(&self) -> bool {
        !self.locale.is_empty()
    }

    /// Human-readable identification used in error messages.
    pub fn describe(&self) -> String {
        format!(
            "on line {} (asset '{}', channel '{}', locale '{}', reference_file '{}', variation_file '{}')",
            self.line, self.asset, self.channel, self.locale, self.reference_file, self.variation_file
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariationIndex {
    buckets: HashMap<String, Vec<VariationRow>>,
    channels: Vec<String>,
    locales: Vec<String>,
    row_count: usize,
    skipped: usize,
}

impl VariationIndex {
    pub fn build(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        Self::from_reader(&mut reader, encoding)
            .with_context(|| format!("Indexing variations from {path:?}"))
    }

    pub fn from_reader<R: Read>(
        reader: &mut csv::Reader<R>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let headers = io_utils::reader_headers(reader, encoding).context("Reading headers")?;
        let columns = VariationColumns::resolve(&headers)?;
        let mut index = VariationIndex::default();
        let mut seen_channels = HashSet::new();
        let mut seen_locales = HashSet::new();

        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let line = io_utils::record_line(&record, row_idx);
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {line}"))?;
            let row = match VariationRow::parse(&columns, headers.len(), line, &decoded) {
                RowOutcome::Row(row) => row,
                RowOutcome::Skip(reason) => {
                    debug!("Skipping variation line {line}: {reason}");
                    index.skipped += 1;
                    continue;
                }
            };
            if !row.channel.is_empty() && seen_channels.insert(row.channel.clone()) {
                index.channels.push(row.channel.clone());
            }
            if !row.locale.is_empty() && seen_locales.insert(row.locale.clone()) {
                index.locales.push(row.locale.clone());
            }
            index.insert(row);
        }

        debug!(
            "Indexed {} variation(s) for {} asset(s)",
            index.row_count,
            index.buckets.len()
        );
        Ok(index)
    }

    fn insert(&mut self, row: VariationRow) {
        self.row_count += 1;
        self.buckets.entry(row.asset.clone()).or_default().push(row);
    }

    /// Variations for `asset_code` in file order; empty when none exist.
    pub fn lookup(&self, asset_code: &str) -> &[VariationRow] {
        self.buckets
            .get(asset_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn asset_codes(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}
