pub mod assets;
pub mod cli;
pub mod config;
pub mod error;
pub mod family;
pub mod fields;
pub mod inference;
pub mod io_utils;
pub mod merge;
pub mod rows;
pub mod table;
pub mod variations;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, info};

use crate::{
    assets::AssetTable,
    cli::{Cli, Commands, InferArgs, SchemaArgs},
    config::{OptionList, SchemaConfig},
    fields::FieldNameProvider,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pam_asset_migrator", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => merge::execute(&args),
        Commands::Infer(args) => handle_infer(&args),
        Commands::Family(args) => family::execute(&args),
    }
}

/// Loads the asset table once and resolves every `auto` decision against it.
pub(crate) fn load_assets_and_config(
    path: &Path,
    args: &SchemaArgs,
    encoding: &'static Encoding,
) -> Result<(AssetTable, SchemaConfig)> {
    let fields = FieldNameProvider::load(args.mapping.as_deref())?;
    let assets = AssetTable::load(path, args.delimiter, encoding)?;
    info!(
        "Read {} asset(s) from {:?} ({} malformed row(s) skipped)",
        assets.rows.len(),
        path,
        assets.skipped
    );
    let config = SchemaConfig::resolve(&args.options(), &assets, fields)
        .with_context(|| format!("Resolving schema for {path:?}"))?;
    Ok((assets, config))
}

fn handle_infer(args: &InferArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.schema.input_encoding.as_deref())?;
    let (assets, config) = load_assets_and_config(&args.assets, &args.schema, encoding)?;
    let rows = vec![
        vec!["assets".to_string(), assets.rows.len().to_string()],
        vec!["reference_type".to_string(), config.reference_type.to_string()],
        vec!["with_categories".to_string(), config.with_categories.to_string()],
        vec!["with_variations".to_string(), config.with_variations.to_string()],
        vec!["with_end_of_use".to_string(), config.with_end_of_use.to_string()],
        vec![
            "convert_category_to_option".to_string(),
            describe_conversion(config.convert_category_to_option, &config.categories),
        ],
        vec![
            "convert_tag_to_option".to_string(),
            describe_conversion(config.convert_tag_to_option, &config.tags),
        ],
    ];
    table::print_table(&["setting".to_string(), "value".to_string()], &rows);
    Ok(())
}

fn describe_conversion(decision: config::Toggle, options: &OptionList) -> String {
    match options.count {
        Some(count) => format!("{decision} ({count} distinct)"),
        None => decision.to_string(),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
