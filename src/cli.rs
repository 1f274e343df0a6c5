use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Choice, ReferenceChoice, SchemaOptions, Toggle};

#[derive(Debug, Parser)]
#[command(author, version, about = "Migrate PAM assets into Asset Manager import files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge a PAM assets file and a PAM variations file into one importable file
    #[command(alias = "merge-files")]
    Merge(MergeArgs),
    /// Show the schema decisions resolved for a PAM assets file
    Infer(InferArgs),
    /// Write the asset family descriptor matching the merged file
    #[command(alias = "create-family")]
    Family(FamilyArgs),
}

/// Options shared by every command that resolves a schema.
#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// Whether the reference is localizable (localizable, non-localizable, both, auto)
    #[arg(long = "reference-type", alias = "reference_type", value_enum, default_value = "auto")]
    pub reference_type: ReferenceChoice,
    /// Keep the categories column (yes, no, auto)
    #[arg(long = "with-categories", alias = "with_categories", value_enum, default_value = "auto")]
    pub with_categories: Choice,
    /// Generate variation columns (yes, no)
    #[arg(long = "with-variations", alias = "with_variations", value_enum, default_value = "yes")]
    pub with_variations: Toggle,
    /// Keep the end_of_use column (yes, no, auto)
    #[arg(long = "with-end-of-use", alias = "with_end_of_use", value_enum, default_value = "auto")]
    pub with_end_of_use: Choice,
    /// Import categories as options instead of text (yes, no, auto)
    #[arg(
        long = "convert-category-to-option",
        alias = "convert_category_to_option",
        value_enum,
        default_value = "auto"
    )]
    pub convert_category_to_option: Choice,
    /// Import tags as options instead of text (yes, no, auto)
    #[arg(
        long = "convert-tag-to-option",
        alias = "convert_tag_to_option",
        value_enum,
        default_value = "auto"
    )]
    pub convert_tag_to_option: Choice,
    /// Maximum distinct categories converted to options when on auto
    #[arg(long = "category-limit", default_value_t = crate::inference::DEFAULT_CATEGORY_LIMIT)]
    pub category_limit: usize,
    /// Maximum distinct tags converted to options when on auto
    #[arg(long = "tag-limit", default_value_t = crate::inference::DEFAULT_TAG_LIMIT)]
    pub tag_limit: usize,
    /// JSON file renaming logical fields (e.g. {"reference": "main_image"})
    #[arg(long)]
    pub mapping: Option<PathBuf>,
    /// CSV delimiter character (supports ';', ',', 'tab', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ";")]
    pub delimiter: u8,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl SchemaArgs {
    pub fn options(&self) -> SchemaOptions {
        SchemaOptions {
            reference_type: self.reference_type,
            with_categories: self.with_categories,
            with_variations: self.with_variations,
            with_end_of_use: self.with_end_of_use,
            convert_category_to_option: self.convert_category_to_option,
            convert_tag_to_option: self.convert_tag_to_option,
            category_limit: self.category_limit,
            tag_limit: self.tag_limit,
        }
    }
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Path to the PAM assets CSV file
    pub assets: PathBuf,
    /// Path to the PAM variations CSV file
    pub variations: PathBuf,
    /// Path of the merged CSV file to create
    pub target: PathBuf,
    #[command(flatten)]
    pub schema: SchemaArgs,
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Path to the PAM assets CSV file
    pub assets: PathBuf,
    #[command(flatten)]
    pub schema: SchemaArgs,
}

#[derive(Debug, Args)]
pub struct FamilyArgs {
    /// Code of the asset family to describe
    pub family_code: String,
    /// Path to the PAM assets CSV file
    pub assets: PathBuf,
    /// Destination descriptor (.yaml or .json)
    pub output: PathBuf,
    #[command(flatten)]
    pub schema: SchemaArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
