//! Asset family descriptor.
//!
//! Describes the attributes a family creator has to provision so that every
//! column of the merged file maps onto an attribute: media attributes for the
//! reference and variation columns, text or `multiple_options` attributes for
//! the descriptive fields. The descriptor is written as YAML, or as JSON when
//! the destination ends in `.json`.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    cli::FamilyArgs,
    config::{ReferenceType, SchemaConfig, Toggle},
    fields::Field,
    io_utils,
};

pub const MEDIA_TYPE_IMAGE: &str = "image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    MediaFile,
    Text,
    MultipleOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub code: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub value_per_locale: bool,
    pub value_per_channel: bool,
    pub is_required_for_completeness: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl AttributeDescriptor {
    fn media(code: &str, value_per_locale: bool, value_per_channel: bool) -> Self {
        Self {
            code: code.to_string(),
            attribute_type: AttributeType::MediaFile,
            value_per_locale,
            value_per_channel,
            is_required_for_completeness: false,
            media_type: Some(MEDIA_TYPE_IMAGE.to_string()),
            options: Vec::new(),
        }
    }

    fn text(code: &str) -> Self {
        Self {
            code: code.to_string(),
            attribute_type: AttributeType::Text,
            value_per_locale: false,
            value_per_channel: false,
            is_required_for_completeness: false,
            media_type: None,
            options: Vec::new(),
        }
    }

    fn text_or_options(code: &str, convert: Toggle, options: &[String]) -> Self {
        let mut attribute = Self::text(code);
        if convert.is_yes() && !options.is_empty() {
            attribute.attribute_type = AttributeType::MultipleOptions;
            attribute.options = options.to_vec();
        }
        attribute
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDescriptor {
    pub code: String,
    pub reference_type: ReferenceType,
    pub attribute_as_main_media: String,
    pub attributes: Vec<AttributeDescriptor>,
}

impl FamilyDescriptor {
    pub fn build(code: &str, config: &SchemaConfig) -> Self {
        let fields = &config.fields;
        let with_variations = config.with_variations.is_yes();
        let mut attributes = Vec::new();

        if config.reference_type.accepts_non_localized() {
            attributes.push(AttributeDescriptor::media(
                fields.get(Field::Reference),
                false,
                false,
            ));
            if with_variations {
                attributes.push(AttributeDescriptor::media(
                    fields.get(Field::VariationScopable),
                    false,
                    true,
                ));
            }
        }
        if config.reference_type.accepts_localized() {
            attributes.push(AttributeDescriptor::media(
                fields.get(Field::ReferenceLocalizable),
                true,
                false,
            ));
            if with_variations {
                attributes.push(AttributeDescriptor::media(
                    fields.get(Field::VariationLocalizableScopable),
                    true,
                    true,
                ));
            }
        }

        attributes.push(AttributeDescriptor::text(fields.get(Field::Description)));
        if config.with_categories.is_yes() {
            attributes.push(AttributeDescriptor::text_or_options(
                fields.get(Field::Categories),
                config.convert_category_to_option,
                &config.categories.codes,
            ));
        }
        attributes.push(AttributeDescriptor::text_or_options(
            fields.get(Field::Tags),
            config.convert_tag_to_option,
            &config.tags.codes,
        ));
        if config.with_end_of_use.is_yes() {
            attributes.push(AttributeDescriptor::text(fields.get(Field::EndOfUse)));
        }

        let main_media = if config.reference_type.accepts_non_localized() {
            Field::Reference
        } else if with_variations {
            Field::VariationLocalizableScopable
        } else {
            Field::ReferenceLocalizable
        };

        Self {
            code: code.to_string(),
            reference_type: config.reference_type,
            attribute_as_main_media: fields.get(main_media).to_string(),
            attributes,
        }
    }

    pub fn attribute(&self, code: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attribute| attribute.code == code)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating descriptor {path:?}"))?;
        if is_json(path) {
            serde_json::to_writer_pretty(file, self).context("Writing descriptor JSON")
        } else {
            serde_yaml::to_writer(file, self).context("Writing descriptor YAML")
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening descriptor {path:?}"))?;
        let reader = BufReader::new(file);
        if is_json(path) {
            serde_json::from_reader(reader).context("Parsing descriptor JSON")
        } else {
            serde_yaml::from_reader(reader).context("Parsing descriptor YAML")
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn execute(args: &FamilyArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.schema.input_encoding.as_deref())?;
    let (_, config) = crate::load_assets_and_config(&args.assets, &args.schema, encoding)?;
    let descriptor = FamilyDescriptor::build(&args.family_code, &config);
    descriptor
        .save(&args.output)
        .with_context(|| format!("Writing family descriptor to {:?}", args.output))?;
    info!(
        "Family '{}' with {} attribute(s) written to {:?} (main media '{}')",
        descriptor.code,
        descriptor.attributes.len(),
        args.output,
        descriptor.attribute_as_main_media
    );
    Ok(())
}
