//! Logical field names and their physical column names.
//!
//! The merge output and the family descriptor agree on attribute codes through
//! a single [`FieldNameProvider`]. By default every logical name maps to
//! itself; a JSON mapping file can rename any of them.

use std::{collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Reference,
    ReferenceLocalizable,
    VariationScopable,
    VariationLocalizableScopable,
    Categories,
    Tags,
    Description,
    EndOfUse,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Reference,
        Field::ReferenceLocalizable,
        Field::VariationScopable,
        Field::VariationLocalizableScopable,
        Field::Categories,
        Field::Tags,
        Field::Description,
        Field::EndOfUse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Reference => "reference",
            Field::ReferenceLocalizable => "reference_localizable",
            Field::VariationScopable => "variation_scopable",
            Field::VariationLocalizableScopable => "variation_localizable_scopable",
            Field::Categories => "categories",
            Field::Tags => "tags",
            Field::Description => "description",
            Field::EndOfUse => "end_of_use",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNameProvider {
    names: BTreeMap<Field, String>,
}

impl Default for FieldNameProvider {
    fn default() -> Self {
        let names = Field::ALL
            .into_iter()
            .map(|field| (field, field.as_str().to_string()))
            .collect();
        Self { names }
    }
}

impl FieldNameProvider {
    /// Loads a provider from an optional JSON mapping file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Unable to open mapping file {path:?}"))?;
                let mapping: BTreeMap<String, String> = serde_json::from_str(&raw)
                    .with_context(|| format!("Parsing mapping JSON from {path:?}"))?;
                Ok(Self::from_mapping(mapping)?)
            }
        }
    }

    pub fn from_mapping<I, K, V>(mapping: I) -> Result<Self, MigrationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut provider = Self::default();
        for (key, value) in mapping {
            let key = key.as_ref();
            let field = Field::from_name(key).ok_or_else(|| MigrationError::UnknownMappingKey {
                key: key.to_string(),
                allowed: Field::ALL.map(Field::as_str).join(", "),
            })?;
            provider.names.insert(field, value.into());
        }
        Ok(provider)
    }

    pub fn get(&self, field: Field) -> &str {
        self.names
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.as_str())
    }

    /// Maps an asset-file header to its output name. Headers that are not a
    /// logical field name pass through unchanged.
    pub fn map_header<'a>(&'a self, header: &'a str) -> &'a str {
        match Field::from_name(header) {
            Some(field) => self.get(field),
            None => header,
        }
    }

    pub fn reference(&self) -> String {
        self.get(Field::Reference).to_string()
    }

    pub fn reference_localizable(&self, locale: &str) -> String {
        format!("{}-{locale}", self.get(Field::ReferenceLocalizable))
    }

    pub fn variation_scopable(&self, channel: &str) -> String {
        format!("{}-{channel}", self.get(Field::VariationScopable))
    }

    pub fn variation_localizable_scopable(&self, locale: &str, channel: &str) -> String {
        format!(
            "{}-{locale}-{channel}",
            self.get(Field::VariationLocalizableScopable)
        )
    }
}
