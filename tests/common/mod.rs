#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const VARIATIONS_HEADER: &str = "asset;channel;locale;reference_file;variation_file";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes an assets file from a header and data lines.
    pub fn assets(&self, header: &str, lines: &[&str]) -> PathBuf {
        self.write("assets.csv", &table(header, lines))
    }

    /// Writes a variations file with the standard header.
    pub fn variations(&self, lines: &[&str]) -> PathBuf {
        self.write("variations.csv", &table(VARIATIONS_HEADER, lines))
    }
}

fn table(header: &str, lines: &[&str]) -> String {
    let mut contents = String::from(header);
    contents.push('\n');
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    contents
}

/// Parses a merged `;` file into its header and rows.
pub fn read_merged(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .expect("open merged file");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (headers, rows)
}

/// Value of `column` in `row` according to `headers`.
pub fn cell<'a>(headers: &[String], row: &'a [String], column: &str) -> &'a str {
    let idx = headers
        .iter()
        .position(|header| header == column)
        .unwrap_or_else(|| panic!("column {column} missing from {headers:?}"));
    &row[idx]
}
