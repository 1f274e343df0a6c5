//! I/O utilities for the PAM export dialect.
//!
//! PAM exports are `;`-delimited, `"`-enclosed and newline-terminated. Readers
//! are built flexible so that short or long rows reach the arity check in
//! [`crate::rows`] instead of aborting the parse. Writers stage output in a
//! `.partial` sibling that is renamed into place once the run succeeds.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::{QuoteStyle, Terminator};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_DELIMITER: u8 = b';';
pub const FIELD_ENCLOSURE: u8 = b'"';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .quote(FIELD_ENCLOSURE)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn csv_writer<W>(writer: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote(FIELD_ENCLOSURE)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .double_quote(true);
    builder.from_writer(writer)
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    Ok(csv_writer(BufWriter::new(file), delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// File line on which `record` starts. Quoted fields may span lines, so the
/// record index alone is not enough.
pub fn record_line(record: &csv::ByteRecord, row_idx: usize) -> usize {
    record
        .position()
        .map(|position| position.line() as usize)
        .unwrap_or(row_idx + 2)
}

/// Reads every record of `reader`, returning the decoded header and raw rows.
/// Row numbers are 1-based file lines (the header is line 1).
pub fn read_table<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<(Vec<String>, Vec<(usize, Vec<String>)>)>
where
    R: Read,
{
    let headers = reader_headers(reader, encoding).context("Reading headers")?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let line = record_line(&record, row_idx);
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding line {line}"))?;
        rows.push((line, decoded));
    }
    Ok((headers, rows))
}

pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Moves a completed partial file over `target`.
pub fn commit_partial(partial: &Path, target: &Path) -> Result<()> {
    fs::rename(partial, target)
        .with_context(|| format!("Moving {partial:?} to {target:?}"))
}

/// Removes a partial file left behind by a failed run.
pub fn discard_partial(partial: &Path) {
    if partial.exists()
        && let Err(err) = fs::remove_file(partial)
    {
        log::warn!("Unable to remove partial output {partial:?}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_appends_suffix() {
        let target = Path::new("/tmp/out/merged.csv");
        assert_eq!(partial_path(target), PathBuf::from("/tmp/out/merged.csv.partial"));
    }

    #[test]
    fn flexible_reader_keeps_short_rows() {
        let data = "code;localized;categories\nA1;0;shoes\nA2;1\n";
        let mut reader = open_csv_reader(data.as_bytes(), DEFAULT_DELIMITER);
        let headers = reader_headers(&mut reader, UTF_8).expect("headers");
        assert_eq!(headers, vec!["code", "localized", "categories"]);
        let lengths = reader
            .byte_records()
            .map(|record| record.expect("record").len())
            .collect::<Vec<_>>();
        assert_eq!(lengths, vec![3, 2]);
    }

    #[test]
    fn multiline_fields_keep_file_line_numbers() {
        let data = "code;localized\n\"a\nb\";0\nA2;0\n";
        let mut reader = open_csv_reader(data.as_bytes(), DEFAULT_DELIMITER);
        let (_, rows) = read_table(&mut reader, UTF_8).expect("table");
        let lines = rows.iter().map(|(line, _)| *line).collect::<Vec<_>>();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(rows[0].1[0], "a\nb");
    }

    #[test]
    fn unknown_encoding_is_reported() {
        let err = resolve_encoding(Some("klingon")).unwrap_err();
        assert!(err.to_string().contains("Unknown encoding"));
        assert_eq!(resolve_encoding(Some("latin1")).expect("latin1").name(), "windows-1252");
    }
}
