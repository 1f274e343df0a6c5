//! Merges PAM assets and their variations into one Asset Manager import file.
//!
//! The output header is the asset header (minus excluded columns, with
//! logical field names mapped) followed by the generated reference and
//! variation columns. Each asset row yields exactly one merged row; its
//! variations fill the generated cells and the asset's own values are copied
//! last, so they win whenever a name collides.

use std::{
    collections::{HashMap, HashSet},
    io::Write,
    path::Path,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    assets::{AssetRow, AssetTable},
    cli::MergeArgs,
    config::SchemaConfig,
    error::MigrationError,
    fields::Field,
    io_utils,
    variations::{VariationIndex, VariationRow},
};

/// Column order of the merged file and the source of every asset column.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    asset_columns: Vec<(usize, usize)>,
}

impl OutputLayout {
    pub fn new(
        asset_headers: &[String],
        config: &SchemaConfig,
        channels: &[String],
        locales: &[String],
    ) -> Self {
        let mut layout = Self {
            headers: Vec::new(),
            positions: HashMap::new(),
            asset_columns: Vec::new(),
        };

        for (source, header) in asset_headers.iter().enumerate() {
            if is_excluded(header, config) {
                continue;
            }
            let target = layout.headers.len();
            let name = config.fields.map_header(header).to_string();
            layout.positions.entry(name.clone()).or_insert(target);
            layout.headers.push(name);
            layout.asset_columns.push((source, target));
        }

        let fields = &config.fields;
        let with_variations = config.with_variations.is_yes();
        if config.reference_type.accepts_non_localized() {
            layout.push_generated(fields.reference());
        }
        for locale in locales {
            layout.push_generated(fields.reference_localizable(locale));
        }
        for channel in channels {
            if with_variations {
                layout.push_generated(fields.variation_scopable(channel));
            }
            if with_variations && config.reference_type.accepts_localized() {
                for locale in locales {
                    layout.push_generated(fields.variation_localizable_scopable(locale, channel));
                }
            }
        }
        layout
    }

    /// Generated names already taken by an asset column keep the asset position.
    fn push_generated(&mut self, name: String) {
        if self.positions.contains_key(&name) {
            debug!("Column '{name}' is provided by the asset file");
            return;
        }
        self.positions.insert(name.clone(), self.headers.len());
        self.headers.push(name);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    fn set(&self, row: &mut MergedRow, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) => row.cells[idx] = Some(value.to_string()),
            None => debug!("No output column '{name}', value '{value}' dropped"),
        }
    }
}

fn is_excluded(header: &str, config: &SchemaConfig) -> bool {
    (header == Field::Categories.as_str() && !config.with_categories.is_yes())
        || (header == Field::EndOfUse.as_str() && !config.with_end_of_use.is_yes())
}

/// One output row aligned with [`OutputLayout::headers`]; `None` is null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    cells: Vec<Option<String>>,
}

impl MergedRow {
    fn empty(len: usize) -> Self {
        Self {
            cells: vec![None; len],
        }
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    pub fn get<'a>(&'a self, layout: &OutputLayout, name: &str) -> Option<&'a str> {
        layout
            .position(name)
            .and_then(|idx| self.cells[idx].as_deref())
    }

    /// Nulls are written as empty fields.
    pub fn to_record(&self) -> Vec<&str> {
        self.cells
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(""))
            .collect()
    }
}

pub fn merge_row(
    layout: &OutputLayout,
    config: &SchemaConfig,
    asset: &AssetRow,
    variations: &[VariationRow],
) -> Result<MergedRow, MigrationError> {
    let fields = &config.fields;
    let with_variations = config.with_variations.is_yes();
    let mut row = MergedRow::empty(layout.len());

    for variation in variations {
        if variation.is_localized() {
            if !config.reference_type.accepts_localized() {
                return Err(MigrationError::UnexpectedLocale {
                    record: variation.describe(),
                    locale: variation.locale.clone(),
                });
            }
            layout.set(
                &mut row,
                &fields.reference_localizable(&variation.locale),
                &variation.reference_file,
            );
            if with_variations {
                layout.set(
                    &mut row,
                    &fields.variation_localizable_scopable(&variation.locale, &variation.channel),
                    &variation.variation_file,
                );
            }
        } else {
            if !config.reference_type.accepts_non_localized() {
                return Err(MigrationError::MissingLocale {
                    record: variation.describe(),
                });
            }
            layout.set(&mut row, &fields.reference(), &variation.reference_file);
            if with_variations {
                layout.set(
                    &mut row,
                    &fields.variation_scopable(&variation.channel),
                    &variation.variation_file,
                );
            }
        }
    }

    for &(source, target) in &layout.asset_columns {
        row.cells[target] = asset.fields.get(source).cloned();
    }
    Ok(row)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub assets_written: usize,
    pub assets_skipped: usize,
    pub variations_merged: usize,
    pub variations_skipped: usize,
    pub orphan_variations: usize,
}

/// Writes the merged header and one row per asset to `writer`.
pub fn merge_into<W: Write>(
    writer: &mut csv::Writer<W>,
    assets: &AssetTable,
    index: &VariationIndex,
    config: &SchemaConfig,
) -> Result<MergeSummary, MigrationError> {
    assets.ensure_not_empty()?;
    let layout = OutputLayout::new(&assets.headers, config, index.channels(), index.locales());
    writer.write_record(layout.headers())?;

    let mut summary = MergeSummary {
        assets_skipped: assets.skipped,
        variations_skipped: index.skipped(),
        ..MergeSummary::default()
    };
    for asset in &assets.rows {
        let variations = index.lookup(&asset.code);
        let row = merge_row(&layout, config, asset, variations)?;
        writer.write_record(row.to_record())?;
        summary.assets_written += 1;
        summary.variations_merged += variations.len();
    }
    writer.flush()?;

    let codes = assets
        .rows
        .iter()
        .map(|row| row.code.as_str())
        .collect::<HashSet<_>>();
    summary.orphan_variations = index
        .asset_codes()
        .filter(|code| !codes.contains(code))
        .map(|code| index.lookup(code).len())
        .sum();
    if summary.orphan_variations > 0 {
        warn!(
            "{} variation(s) reference assets absent from {}",
            summary.orphan_variations, assets.source_name
        );
    }
    Ok(summary)
}

/// Merges into `target` through a `.partial` file that only replaces the
/// target once every row was written.
pub fn merge_to_path(
    target: &Path,
    delimiter: u8,
    assets: &AssetTable,
    index: &VariationIndex,
    config: &SchemaConfig,
) -> Result<MergeSummary> {
    let partial = io_utils::partial_path(target);
    let outcome = io_utils::open_csv_writer(&partial, delimiter).and_then(|mut writer| {
        merge_into(&mut writer, assets, index, config)
            .with_context(|| format!("Merging into {target:?}"))
    });
    match outcome {
        Ok(summary) => {
            io_utils::commit_partial(&partial, target)?;
            Ok(summary)
        }
        Err(err) => {
            io_utils::discard_partial(&partial);
            Err(err)
        }
    }
}

pub fn execute(args: &MergeArgs) -> Result<()> {
    let delimiter = args.schema.delimiter;
    let encoding = io_utils::resolve_encoding(args.schema.input_encoding.as_deref())?;
    info!(
        "Merging '{}' with '{}' into '{}' (delimiter '{}')",
        args.assets.display(),
        args.variations.display(),
        args.target.display(),
        crate::printable_delimiter(delimiter)
    );

    let (assets, config) = crate::load_assets_and_config(&args.assets, &args.schema, encoding)?;
    if !config.with_categories.is_yes() && assets.has_column(Field::Categories.as_str()) {
        info!(
            "Column '{}' of {:?} will not be merged",
            Field::Categories,
            args.assets
        );
    }

    info!("Indexing variations...");
    let index = VariationIndex::build(&args.variations, delimiter, encoding)?;
    debug!(
        "Channels: {:?}, locales: {:?}",
        index.channels(),
        index.locales()
    );

    let summary = merge_to_path(&args.target, delimiter, &assets, &index, &config)?;
    if summary.assets_skipped > 0 || summary.variations_skipped > 0 {
        info!(
            "Skipped {} malformed asset row(s) and {} malformed variation row(s)",
            summary.assets_skipped, summary.variations_skipped
        );
    }
    info!(
        "{} asset(s) with {} variation(s) written to {:?}",
        summary.assets_written, summary.variations_merged, args.target
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ReferenceType, Toggle},
        fields::FieldNameProvider,
    };

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn asset(code: &str) -> AssetRow {
        AssetRow {
            line: 2,
            code: code.to_string(),
            localized: Some("0".to_string()),
            categories: Some("shoes,red".to_string()),
            tags: None,
            end_of_use: Some("2030-01-01".to_string()),
            description: None,
            fields: strings(&[code, "0", "shoes,red", "2030-01-01"]),
        }
    }

    fn variation(channel: &str, locale: &str, reference: &str, file: &str) -> VariationRow {
        VariationRow {
            line: 2,
            asset: "A1".to_string(),
            channel: channel.to_string(),
            locale: locale.to_string(),
            reference_file: reference.to_string(),
            variation_file: file.to_string(),
        }
    }

    fn asset_headers() -> Vec<String> {
        strings(&["code", "localized", "categories", "end_of_use"])
    }

    #[test]
    fn header_for_both_reference_types() {
        let config = SchemaConfig::new(ReferenceType::Both, FieldNameProvider::default());
        let layout = OutputLayout::new(
            &asset_headers(),
            &config,
            &strings(&["web", "print"]),
            &strings(&["fr_FR"]),
        );
        assert_eq!(
            layout.headers(),
            strings(&[
                "code",
                "localized",
                "categories",
                "end_of_use",
                "reference",
                "reference_localizable-fr_FR",
                "variation_scopable-web",
                "variation_localizable_scopable-fr_FR-web",
                "variation_scopable-print",
                "variation_localizable_scopable-fr_FR-print",
            ])
        );
    }

    #[test]
    fn header_drops_excluded_columns_and_variations() {
        let mut config =
            SchemaConfig::new(ReferenceType::NonLocalizable, FieldNameProvider::default());
        config.with_categories = Toggle::No;
        config.with_end_of_use = Toggle::No;
        config.with_variations = Toggle::No;
        let layout = OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &[]);
        assert_eq!(layout.headers(), strings(&["code", "localized", "reference"]));
    }

    #[test]
    fn header_applies_field_mapping() {
        let fields = FieldNameProvider::from_mapping([
            ("categories", "pam_categories"),
            ("reference", "main_media"),
        ])
        .expect("mapping");
        let config = SchemaConfig::new(ReferenceType::NonLocalizable, fields);
        let layout = OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &[]);
        assert_eq!(
            layout.headers(),
            strings(&[
                "code",
                "localized",
                "pam_categories",
                "end_of_use",
                "main_media",
                "variation_scopable-web",
            ])
        );
    }

    #[test]
    fn non_localized_variation_fills_reference_and_channel() {
        let config = SchemaConfig::new(ReferenceType::NonLocalizable, FieldNameProvider::default());
        let layout = OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &[]);
        let row = merge_row(
            &layout,
            &config,
            &asset("A1"),
            &[variation("web", "", "r.jpg", "v.jpg")],
        )
        .expect("merged");
        assert_eq!(row.get(&layout, "reference"), Some("r.jpg"));
        assert_eq!(row.get(&layout, "variation_scopable-web"), Some("v.jpg"));
        assert_eq!(row.get(&layout, "categories"), Some("shoes,red"));
    }

    #[test]
    fn missing_variation_cells_stay_null() {
        let config = SchemaConfig::new(ReferenceType::Both, FieldNameProvider::default());
        let layout = OutputLayout::new(
            &asset_headers(),
            &config,
            &strings(&["web", "print"]),
            &strings(&["fr_FR"]),
        );
        let row = merge_row(&layout, &config, &asset("A1"), &[]).expect("merged");
        assert_eq!(row.get(&layout, "code"), Some("A1"));
        assert_eq!(row.get(&layout, "reference"), None);
        assert_eq!(row.cells().iter().filter(|cell| cell.is_none()).count(), 6);
    }

    #[test]
    fn localized_variation_rejected_for_non_localizable_family() {
        let config = SchemaConfig::new(ReferenceType::NonLocalizable, FieldNameProvider::default());
        let layout =
            OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &strings(&["fr_FR"]));
        let err = merge_row(
            &layout,
            &config,
            &asset("A1"),
            &[variation("web", "fr_FR", "r.jpg", "v.jpg")],
        )
        .unwrap_err();
        assert!(err.is_schema_mismatch());
        assert!(err.to_string().contains("fr_FR"));
    }

    #[test]
    fn non_localized_variation_rejected_for_localizable_family() {
        let config = SchemaConfig::new(ReferenceType::Localizable, FieldNameProvider::default());
        let layout = OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &[]);
        let err = merge_row(
            &layout,
            &config,
            &asset("A1"),
            &[variation("web", "", "r.jpg", "v.jpg")],
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::MissingLocale { .. }));
    }

    #[test]
    fn later_variation_overwrites_earlier_one() {
        let config = SchemaConfig::new(ReferenceType::Localizable, FieldNameProvider::default());
        let layout =
            OutputLayout::new(&asset_headers(), &config, &strings(&["web"]), &strings(&["en_US"]));
        let row = merge_row(
            &layout,
            &config,
            &asset("A1"),
            &[
                variation("web", "en_US", "old.jpg", "old_web.jpg"),
                variation("web", "en_US", "new.jpg", "new_web.jpg"),
            ],
        )
        .expect("merged");
        assert_eq!(row.get(&layout, "reference_localizable-en_US"), Some("new.jpg"));
        assert_eq!(
            row.get(&layout, "variation_localizable_scopable-en_US-web"),
            Some("new_web.jpg")
        );
    }

    #[test]
    fn asset_value_wins_on_name_collision() {
        let config = SchemaConfig::new(ReferenceType::NonLocalizable, FieldNameProvider::default());
        let headers = strings(&["code", "reference"]);
        let layout = OutputLayout::new(&headers, &config, &strings(&["web"]), &[]);
        assert_eq!(
            layout.headers(),
            strings(&["code", "reference", "variation_scopable-web"])
        );
        let mut row_source = asset("A1");
        row_source.fields = strings(&["A1", "legacy.jpg"]);
        let row = merge_row(
            &layout,
            &config,
            &row_source,
            &[variation("web", "", "r.jpg", "v.jpg")],
        )
        .expect("merged");
        assert_eq!(row.get(&layout, "reference"), Some("legacy.jpg"));
        assert_eq!(row.to_record(), vec!["A1", "legacy.jpg", "v.jpg"]);
    }

    #[test]
    fn variation_without_channel_only_sets_reference() {
        let config = SchemaConfig::new(ReferenceType::NonLocalizable, FieldNameProvider::default());
        let layout = OutputLayout::new(&asset_headers(), &config, &[], &[]);
        let row = merge_row(
            &layout,
            &config,
            &asset("A1"),
            &[variation("", "", "r.jpg", "v.jpg")],
        )
        .expect("merged");
        assert_eq!(row.get(&layout, "reference"), Some("r.jpg"));
        assert_eq!(row.cells().len(), layout.len());
    }
}
