use std::collections::HashSet;

use encoding_rs::UTF_8;
use proptest::prelude::*;

use pam_asset_migrator::{
    assets::AssetTable,
    config::{ReferenceType, SchemaConfig, Toggle},
    fields::FieldNameProvider,
    inference::{infer_convert_to_option, infer_reference_type, is_option_code, scan_tokens},
    io_utils,
    merge::merge_into,
    variations::VariationIndex,
};

fn asset_table(data: &str) -> AssetTable {
    let mut reader = io_utils::open_csv_reader(data.as_bytes(), b';');
    AssetTable::from_reader(&mut reader, "assets.csv".to_string(), UTF_8).expect("asset table")
}

fn empty_index() -> VariationIndex {
    let data = "asset;channel;locale;reference_file;variation_file\n";
    let mut reader = io_utils::open_csv_reader(data.as_bytes(), b';');
    VariationIndex::from_reader(&mut reader, UTF_8).expect("variation index")
}

fn asset_line(idx: usize, localized: bool, well_formed: bool) -> String {
    let flag = if localized { "1" } else { "0" };
    if well_formed {
        format!("A{idx};{flag};tag{}", idx % 3)
    } else {
        format!("A{idx};{flag}")
    }
}

#[test]
fn option_code_pattern_accepts_word_characters_only() {
    assert!(is_option_code("summer_2024"));
    assert!(!is_option_code("summer sale"));
    assert!(!is_option_code("été"));
    assert!(!is_option_code(""));
}

#[test]
fn convert_decision_flips_exactly_past_the_limit() {
    let tokens = ["a", "b", "c", "a", "b"];
    assert_eq!(infer_convert_to_option(tokens, 3), Toggle::Yes);
    assert_eq!(infer_convert_to_option(tokens, 2), Toggle::No);
}

proptest! {
    #[test]
    fn merged_output_has_one_row_per_well_formed_asset(
        shape in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..40)
    ) {
        let mut data = String::from("code;localized;tags\n");
        for (idx, (localized, well_formed)) in shape.iter().enumerate() {
            data.push_str(&asset_line(idx, *localized, *well_formed));
            data.push('\n');
        }
        let assets = asset_table(&data);
        let expected = shape.iter().filter(|(_, well_formed)| *well_formed).count();
        prop_assert_eq!(assets.rows.len(), expected);
        prop_assert_eq!(assets.skipped, shape.len() - expected);

        let config = SchemaConfig::new(ReferenceType::Both, FieldNameProvider::default());
        let mut writer = io_utils::csv_writer(Vec::new(), b';');
        let result = merge_into(&mut writer, &assets, &empty_index(), &config);
        if expected == 0 {
            prop_assert!(result.is_err());
        } else {
            let summary = result.expect("merge");
            prop_assert_eq!(summary.assets_written, expected);
            let bytes = writer.into_inner().expect("flush");
            let lines = String::from_utf8(bytes).expect("utf8").lines().count();
            prop_assert_eq!(lines, expected + 1);
        }
    }

    #[test]
    fn reference_type_depends_only_on_flags_seen(
        flags in proptest::collection::vec(any::<bool>(), 1..40)
    ) {
        let mut data = String::from("code;localized\n");
        for (idx, localized) in flags.iter().enumerate() {
            data.push_str(&format!("A{idx};{}\n", if *localized { "1" } else { "0" }));
        }
        let assets = asset_table(&data);
        let inferred = infer_reference_type(&assets.rows, &assets.source_name).expect("inferred");
        let any_localized = flags.iter().any(|flag| *flag);
        let any_plain = flags.iter().any(|flag| !*flag);
        let expected = match (any_localized, any_plain) {
            (true, true) => ReferenceType::Both,
            (true, false) => ReferenceType::Localizable,
            _ => ReferenceType::NonLocalizable,
        };
        prop_assert_eq!(inferred, expected);

        let reversed = assets.rows.iter().rev();
        prop_assert_eq!(infer_reference_type(reversed, &assets.source_name).expect("reversed"), inferred);
    }

    #[test]
    fn conversion_follows_distinct_count_and_code_validity(
        tokens in proptest::collection::vec("[a-z_]{1,3}|[a-z]{1,2} [a-z]", 0..60),
        limit in 1usize..20
    ) {
        let distinct = tokens.iter().map(String::as_str).collect::<HashSet<_>>();
        let all_codes = distinct.iter().all(|token| is_option_code(token));
        let expected = Toggle::from(distinct.len() <= limit && all_codes);
        let scan = scan_tokens(tokens.iter().map(String::as_str), limit);
        prop_assert_eq!(scan.decision(), expected);
        if expected.is_yes() {
            prop_assert_eq!(scan.into_options().len(), distinct.len());
        }
    }
}
