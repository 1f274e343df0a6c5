//! Migration options and their resolution into a [`SchemaConfig`].
//!
//! Callers may leave most decisions on `auto`; those are settled here by
//! replaying the cached asset rows through [`crate::inference`]. The result is
//! immutable for the rest of the run and is shared by the merge and the family
//! descriptor.

use std::fmt;

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    assets::{AssetTable, LOCALIZED_COLUMN},
    error::MigrationError,
    fields::{Field, FieldNameProvider},
    inference::{self, DEFAULT_CATEGORY_LIMIT, DEFAULT_TAG_LIMIT, TokenCount, TokenScan},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceType {
    Localizable,
    #[value(alias = "non_localizable")]
    NonLocalizable,
    Both,
}

impl ReferenceType {
    /// Whether variations carrying a locale can be stored.
    pub fn accepts_localized(self) -> bool {
        matches!(self, ReferenceType::Localizable | ReferenceType::Both)
    }

    /// Whether variations without a locale can be stored.
    pub fn accepts_non_localized(self) -> bool {
        matches!(self, ReferenceType::NonLocalizable | ReferenceType::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Localizable => "localizable",
            ReferenceType::NonLocalizable => "non-localizable",
            ReferenceType::Both => "both",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Toggle {
    Yes,
    No,
}

impl Toggle {
    pub fn is_yes(self) -> bool {
        self == Toggle::Yes
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value { Toggle::Yes } else { Toggle::No }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Toggle::Yes => "yes",
            Toggle::No => "no",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ReferenceChoice {
    Localizable,
    #[value(alias = "non_localizable")]
    NonLocalizable,
    Both,
    Auto,
}

impl ReferenceChoice {
    fn fixed(self) -> Option<ReferenceType> {
        match self {
            ReferenceChoice::Localizable => Some(ReferenceType::Localizable),
            ReferenceChoice::NonLocalizable => Some(ReferenceType::NonLocalizable),
            ReferenceChoice::Both => Some(ReferenceType::Both),
            ReferenceChoice::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Choice {
    Yes,
    No,
    Auto,
}

impl Choice {
    fn fixed(self) -> Option<Toggle> {
        match self {
            Choice::Yes => Some(Toggle::Yes),
            Choice::No => Some(Toggle::No),
            Choice::Auto => None,
        }
    }
}

/// Caller-supplied options, possibly left on `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaOptions {
    pub reference_type: ReferenceChoice,
    pub with_categories: Choice,
    pub with_variations: Toggle,
    pub with_end_of_use: Choice,
    pub convert_category_to_option: Choice,
    pub convert_tag_to_option: Choice,
    pub category_limit: usize,
    pub tag_limit: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            reference_type: ReferenceChoice::Auto,
            with_categories: Choice::Auto,
            with_variations: Toggle::Yes,
            with_end_of_use: Choice::Auto,
            convert_category_to_option: Choice::Auto,
            convert_tag_to_option: Choice::Auto,
            category_limit: DEFAULT_CATEGORY_LIMIT,
            tag_limit: DEFAULT_TAG_LIMIT,
        }
    }
}

/// Option codes gathered for a column converted to `multiple_options`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionList {
    pub count: Option<TokenCount>,
    pub codes: Vec<String>,
}

/// Fully resolved decisions for one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConfig {
    pub reference_type: ReferenceType,
    pub with_categories: Toggle,
    pub with_variations: Toggle,
    pub with_end_of_use: Toggle,
    pub convert_category_to_option: Toggle,
    pub convert_tag_to_option: Toggle,
    pub categories: OptionList,
    pub tags: OptionList,
    pub fields: FieldNameProvider,
}

impl SchemaConfig {
    /// A config with every decision fixed and no option lists.
    pub fn new(reference_type: ReferenceType, fields: FieldNameProvider) -> Self {
        Self {
            reference_type,
            with_categories: Toggle::Yes,
            with_variations: Toggle::Yes,
            with_end_of_use: Toggle::Yes,
            convert_category_to_option: Toggle::No,
            convert_tag_to_option: Toggle::No,
            categories: OptionList::default(),
            tags: OptionList::default(),
            fields,
        }
    }

    pub fn resolve(
        options: &SchemaOptions,
        assets: &AssetTable,
        fields: FieldNameProvider,
    ) -> Result<Self, MigrationError> {
        let reference_type = match options.reference_type.fixed() {
            Some(fixed) => fixed,
            None => {
                if !assets.has_column(LOCALIZED_COLUMN) {
                    return Err(MigrationError::MissingColumn {
                        table: "assets",
                        column: LOCALIZED_COLUMN.to_string(),
                    });
                }
                let inferred =
                    inference::infer_reference_type(&assets.rows, &assets.source_name)?;
                info!("Reference type inferred from asset rows: {inferred}");
                inferred
            }
        };

        let with_categories = options.with_categories.fixed().unwrap_or_else(|| {
            let inferred = inference::infer_with_categories(&assets.rows);
            info!("Import of {} inferred: {inferred}", Field::Categories);
            inferred
        });

        let with_end_of_use = options.with_end_of_use.fixed().unwrap_or_else(|| {
            let inferred = inference::infer_with_end_of_use(&assets.rows);
            info!("Import of {} inferred: {inferred}", Field::EndOfUse);
            inferred
        });

        let (convert_category_to_option, categories) = if with_categories.is_yes() {
            resolve_options(
                Field::Categories,
                options.convert_category_to_option,
                options.category_limit,
                |limit| inference::scan_categories(&assets.rows, limit),
            )
        } else {
            (Toggle::No, OptionList::default())
        };

        let (convert_tag_to_option, tags) = resolve_options(
            Field::Tags,
            options.convert_tag_to_option,
            options.tag_limit,
            |limit| inference::scan_tags(&assets.rows, limit),
        );

        Ok(Self {
            reference_type,
            with_categories,
            with_variations: options.with_variations,
            with_end_of_use,
            convert_category_to_option,
            convert_tag_to_option,
            categories,
            tags,
            fields,
        })
    }
}

/// Settles one `convert_*_to_option` choice. A column without any token is
/// always imported as text.
fn resolve_options<F>(field: Field, choice: Choice, limit: usize, scan: F) -> (Toggle, OptionList)
where
    F: Fn(usize) -> TokenScan,
{
    let (decision, options) = scan_options(field, choice, limit, scan);
    if decision.is_yes() && options.codes.is_empty() {
        info!("No {field} found, importing them as text");
        return (Toggle::No, options);
    }
    (decision, options)
}

fn scan_options<F>(field: Field, choice: Choice, limit: usize, scan: F) -> (Toggle, OptionList)
where
    F: Fn(usize) -> TokenScan,
{
    match choice {
        Choice::No => (Toggle::No, OptionList::default()),
        Choice::Yes => {
            let scan = scan(usize::MAX);
            if let Some(token) = scan.invalid_token() {
                warn!("Option '{token}' for {field} is not a valid option code");
            }
            let count = Some(scan.count());
            (
                Toggle::Yes,
                OptionList {
                    count,
                    codes: scan.into_options(),
                },
            )
        }
        Choice::Auto => {
            let scan = scan(limit);
            let decision = scan.decision();
            let count = scan.count();
            match (decision, scan.invalid_token()) {
                (Toggle::Yes, _) if count != TokenCount::Exact(0) => {
                    info!("{count} distinct {field} found, importing them as options")
                }
                (Toggle::Yes, _) => {}
                (Toggle::No, Some(token)) => info!(
                    "'{token}' is not a valid option code, importing {field} as text"
                ),
                (Toggle::No, None) => info!(
                    "{count} distinct {field} found (limit {limit}), importing them as text"
                ),
            }
            let codes = if decision.is_yes() {
                scan.into_options()
            } else {
                Vec::new()
            };
            (
                decision,
                OptionList {
                    count: Some(count),
                    codes,
                },
            )
        }
    }
}
