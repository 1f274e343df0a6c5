//! Row parsing outcomes shared by the asset and variation readers.
//!
//! A record either becomes a typed row or is skipped. Fatal conditions travel
//! on the error side of the surrounding `Result`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Field count differs from the header count.
    FieldCount { expected: usize, found: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FieldCount { expected, found } => {
                write!(f, "expected {expected} field(s), found {found}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<T> {
    Row(T),
    Skip(SkipReason),
}

/// Applies the header-arity rule before a typed row is built.
pub fn check_arity(header_len: usize, record: &[String]) -> Option<SkipReason> {
    (record.len() != header_len).then_some(SkipReason::FieldCount {
        expected: header_len,
        found: record.len(),
    })
}

/// Position of `name` in `headers`.
pub fn column_position(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_mismatch_produces_skip_reason() {
        let record = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(check_arity(3, &record), None);
        assert_eq!(
            check_arity(4, &record),
            Some(SkipReason::FieldCount {
                expected: 4,
                found: 3
            })
        );
    }
}
