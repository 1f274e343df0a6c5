//! Schema inference over the cached asset rows.
//!
//! Each function is a single scan of the rows handed to it. Malformed rows
//! never reach this module: [`crate::assets::AssetTable`] drops them at parse
//! time.

use std::{collections::HashSet, fmt, sync::OnceLock};

use regex::Regex;

use crate::{
    assets::AssetRow,
    config::{ReferenceType, Toggle},
    error::MigrationError,
};

pub const DEFAULT_CATEGORY_LIMIT: usize = 100;
pub const DEFAULT_TAG_LIMIT: usize = 100;

fn option_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid option code pattern"))
}

pub fn is_option_code(token: &str) -> bool {
    option_code_pattern().is_match(token)
}

pub fn infer_reference_type<'a, I>(rows: I, source_name: &str) -> Result<ReferenceType, MigrationError>
where
    I: IntoIterator<Item = &'a AssetRow>,
{
    let mut found_localized = false;
    let mut found_non_localized = false;
    for row in rows {
        if row.is_localized() {
            found_localized = true;
        } else {
            found_non_localized = true;
        }
        if found_localized && found_non_localized {
            break;
        }
    }
    match (found_localized, found_non_localized) {
        (true, true) => Ok(ReferenceType::Both),
        (true, false) => Ok(ReferenceType::Localizable),
        (false, true) => Ok(ReferenceType::NonLocalizable),
        (false, false) => Err(MigrationError::EmptyInput {
            source_name: source_name.to_string(),
        }),
    }
}

/// `Yes` as soon as two distinct categories have been seen.
pub fn infer_with_categories<'a, I>(rows: I) -> Toggle
where
    I: IntoIterator<Item = &'a AssetRow>,
{
    let mut seen = HashSet::new();
    for row in rows {
        for token in row.category_tokens() {
            seen.insert(token);
            if seen.len() > 1 {
                return Toggle::Yes;
            }
        }
    }
    Toggle::No
}

/// `Yes` when at least one asset carries an end-of-use value.
pub fn infer_with_end_of_use<'a, I>(rows: I) -> Toggle
where
    I: IntoIterator<Item = &'a AssetRow>,
{
    let found = rows
        .into_iter()
        .any(|row| row.end_of_use.as_deref().is_some_and(|value| !value.is_empty()));
    Toggle::from(found)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCount {
    Exact(usize),
    MoreThan(usize),
}

impl fmt::Display for TokenCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCount::Exact(count) => write!(f, "{count}"),
            TokenCount::MoreThan(limit) => write!(f, "> {limit}"),
        }
    }
}

/// Distinct tokens of one column, gathered until `limit` is exceeded.
#[derive(Debug, Clone)]
pub struct TokenScan {
    limit: usize,
    tokens: Vec<String>,
    seen: HashSet<String>,
    exceeded: bool,
    invalid: Option<String>,
}

impl TokenScan {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            tokens: Vec::new(),
            seen: HashSet::new(),
            exceeded: false,
            invalid: None,
        }
    }

    /// Feeds one token. Returns `false` once scanning can stop.
    pub fn push(&mut self, token: &str) -> bool {
        if self.exceeded {
            return false;
        }
        if self.seen.contains(token) {
            return true;
        }
        if self.seen.len() == self.limit {
            self.exceeded = true;
            self.tokens.clear();
            self.seen.clear();
            return false;
        }
        if self.invalid.is_none() && !is_option_code(token) {
            self.invalid = Some(token.to_string());
        }
        self.seen.insert(token.to_string());
        self.tokens.push(token.to_string());
        true
    }

    pub fn count(&self) -> TokenCount {
        if self.exceeded {
            TokenCount::MoreThan(self.limit)
        } else {
            TokenCount::Exact(self.tokens.len())
        }
    }

    /// First token rejected by the option-code pattern.
    pub fn invalid_token(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    pub fn decision(&self) -> Toggle {
        Toggle::from(!self.exceeded && self.invalid.is_none())
    }

    /// Distinct tokens in first-seen order; empty once the limit was exceeded.
    pub fn into_options(self) -> Vec<String> {
        self.tokens
    }
}

pub fn scan_tokens<'a, I>(tokens: I, limit: usize) -> TokenScan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scan = TokenScan::new(limit);
    for token in tokens {
        if !scan.push(token) {
            break;
        }
    }
    scan
}

/// `Yes` iff there are at most `limit` distinct tokens and all are option codes.
pub fn infer_convert_to_option<'a, I>(tokens: I, limit: usize) -> Toggle
where
    I: IntoIterator<Item = &'a str>,
{
    scan_tokens(tokens, limit).decision()
}

pub fn scan_categories(rows: &[AssetRow], limit: usize) -> TokenScan {
    scan_tokens(rows.iter().flat_map(|row| row.category_tokens()), limit)
}

pub fn scan_tags(rows: &[AssetRow], limit: usize) -> TokenScan {
    scan_tokens(rows.iter().flat_map(|row| row.tag_tokens()), limit)
}
