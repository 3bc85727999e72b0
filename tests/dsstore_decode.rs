//! `.DS_Store` decoding against synthesized containers.

mod common;

use common::{
    alias, bplist, container, ds_store, ds_store_two_level, internal_node, leaf_node,
    master_block, Plist, RawRecord,
};
use finderz::dsstore::{
    self, DirectoryCache, DsStoreDecoder, DsStoreError, IconPosition, Setting, ViewStyle,
    WindowBounds,
};
use tempfile::TempDir;

fn folder_records() -> Vec<RawRecord> {
    let icvp = bplist(&[
        ("iconSize", Plist::Real(48.0)),
        ("textSize", Plist::Int(13)),
        ("labelOnBottom", Plist::Bool(false)),
        ("showItemInfo", Plist::Bool(true)),
        ("arrangeBy", Plist::Str("dateModified".into())),
        ("backgroundType", Plist::Int(2)),
        ("backgroundImageAlias", Plist::Data(alias("sunset.jpg"))),
    ]);
    let lsvp = bplist(&[("sortColumn", Plist::Str("kind".into()))]);
    let bwsp = bplist(&[("WindowBounds", Plist::Str("{{120, 80}, {900, 600}}".into()))]);
    vec![
        RawRecord::type_code(".", b"vmod", b"Nlsv"),
        RawRecord::blob(".", b"icvp", &icvp),
        RawRecord::blob(".", b"lsvp", &lsvp),
        RawRecord::blob(".", b"bwsp", &bwsp),
        RawRecord::iloc("beach.png", 100, 200),
        RawRecord::iloc("Zebra.png", -5, 7),
        RawRecord::long("beach.png", b"lclr", 2),
        RawRecord::ustr("beach.png", b"cmmt", "sunset, day two"),
        // 2024-01-01T00:00:00Z as Mac ticks.
        RawRecord::dutc(".", b"moDD", 3_786_912_000u64 << 16),
    ]
}

#[test]
fn decodes_folder_and_file_settings() {
    let record = dsstore::decode_bytes(&ds_store(folder_records())).unwrap();

    assert_eq!(record.view_style(), ViewStyle::List);
    assert_eq!(record.icon_size(), 48);
    assert_eq!(record.text_size(), 13);
    assert!(!record.label_on_bottom());
    assert!(record.show_item_info());
    // lsvp sortColumn wins over icvp arrangeBy.
    assert_eq!(record.sort_column(), "kind");
    assert_eq!(record.background_image(), Some("sunset.jpg"));
    assert_eq!(
        record.window_bounds(),
        WindowBounds {
            x: 120,
            y: 80,
            width: 900,
            height: 600
        }
    );
    assert_eq!(
        record.modified().map(|d| d.to_rfc3339()),
        Some("2024-01-01T00:00:00+00:00".to_string())
    );

    assert_eq!(
        record.icon_position("beach.png"),
        Some(IconPosition { x: 100, y: 200 })
    );
    assert_eq!(
        record.icon_position("Zebra.png"),
        Some(IconPosition { x: -5, y: 7 })
    );
    assert_eq!(record.color_label("beach.png"), Some(2));
    assert_eq!(record.comment("beach.png"), Some("sunset, day two"));
    assert_eq!(record.record_count(), 9);
    assert!(record.is_explicit(Setting::ViewStyle));
    assert!(record.is_explicit(Setting::IconSize));
    assert!(!record.is_explicit(Setting::ShowIconPreview));
}

#[test]
fn decoding_is_deterministic() {
    let bytes = ds_store(folder_records());
    let first = dsstore::decode_bytes(&bytes).unwrap();
    let second = dsstore::decode_bytes(&bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn record_order_does_not_change_the_result() {
    let records = folder_records();
    let sorted = dsstore::decode_bytes(&ds_store(records.clone())).unwrap();

    let mut reversed = common::sorted(records.clone());
    reversed.reverse();
    let count = reversed.len() as u32;
    let unsorted = container(&[master_block(1, 0, count, 1), leaf_node(&reversed)], 0);
    assert_eq!(dsstore::decode_bytes(&unsorted).unwrap(), sorted);

    let split = dsstore::decode_bytes(&ds_store_two_level(records, 2)).unwrap();
    assert_eq!(split, sorted);
}

#[test]
fn two_level_tree_yields_records_in_key_order() {
    let names = ["a", "B", "c", "d", "E", "f", "g", "h", "i"];
    let records: Vec<RawRecord> = names
        .iter()
        .enumerate()
        .map(|(i, n)| RawRecord::iloc(n, i as i32, 0))
        .collect();
    let record = dsstore::decode_bytes(&ds_store_two_level(records, 2)).unwrap();

    assert_eq!(record.record_count(), names.len());
    let keys: Vec<&str> = record.icon_positions().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), names.len());
    for (i, n) in names.iter().enumerate() {
        assert_eq!(record.icon_position(n), Some(IconPosition { x: i as i32, y: 0 }));
    }
}

#[test]
fn zero_records_gives_defaults() {
    let record = dsstore::decode_bytes(&ds_store(Vec::new())).unwrap();
    assert_eq!(record.view_style(), ViewStyle::Icon);
    assert_eq!(record.icon_size(), 64);
    assert_eq!(record.text_size(), 12);
    assert!(record.label_on_bottom());
    assert!(record.show_icon_preview());
    assert!(!record.show_item_info());
    assert_eq!(record.sort_column(), "name");
    assert_eq!(record.background_image(), None);
    assert_eq!(record.record_count(), 0);
    assert!(!record.is_explicit(Setting::ViewStyle));
}

#[test]
fn magic_mismatch_is_format_error() {
    let good = ds_store(folder_records());
    for index in 4..8 {
        let mut bad = good.clone();
        bad[index] ^= 0x01;
        assert!(
            matches!(dsstore::decode_bytes(&bad), Err(DsStoreError::Format(_))),
            "byte {index}"
        );
    }
}

#[test]
fn truncation_is_format_error() {
    let good = ds_store(folder_records());
    for len in [0, 3, 20, 35, 40, good.len() / 2] {
        assert!(
            matches!(dsstore::decode_bytes(&good[..len]), Err(DsStoreError::Format(_))),
            "truncated to {len}"
        );
    }
}

#[test]
fn missing_dsdb_is_format_error() {
    let mut bytes = ds_store(folder_records());
    let pos = bytes
        .windows(4)
        .rposition(|w| w == b"DSDB")
        .unwrap();
    bytes[pos..pos + 4].copy_from_slice(b"XXXX");
    let err = dsstore::decode_bytes(&bytes).unwrap_err();
    assert!(err.to_string().contains("DSDB"));
}

#[test]
fn node_cycle_is_format_error() {
    // Root is an internal node whose rightmost child is itself.
    let bytes = container(&[master_block(1, 1, 1, 1), internal_node(&[], 1)], 0);
    assert!(matches!(
        dsstore::decode_bytes(&bytes),
        Err(DsStoreError::Format(_))
    ));
}

#[test]
fn excessive_depth_is_format_error() {
    let levels = dsstore::MAX_TREE_DEPTH + 1;
    let bytes = container(&[master_block(1, levels, 1, 1), leaf_node(&[])], 0);
    assert!(matches!(
        dsstore::decode_bytes(&bytes),
        Err(DsStoreError::Format(_))
    ));
}

#[test]
fn leaf_where_internal_expected_is_format_error() {
    let leaf = leaf_node(&[RawRecord::iloc("a", 1, 1)]);
    let bytes = container(&[master_block(1, 1, 1, 1), leaf], 0);
    assert!(matches!(
        dsstore::decode_bytes(&bytes),
        Err(DsStoreError::Format(_))
    ));
}

#[test]
fn child_outside_block_table_is_format_error() {
    let bytes = container(
        &[
            master_block(1, 1, 2, 2),
            internal_node(&[(9, RawRecord::iloc("a", 1, 1))], 2),
            leaf_node(&[RawRecord::iloc("b", 1, 1)]),
        ],
        0,
    );
    assert!(matches!(
        dsstore::decode_bytes(&bytes),
        Err(DsStoreError::Format(_))
    ));
}

#[test]
fn unknown_structure_type_is_unsupported() {
    let bytes = ds_store(vec![RawRecord::new("a", b"Iloc", b"wxyz", vec![0; 8])]);
    assert!(matches!(
        dsstore::decode_bytes(&bytes),
        Err(DsStoreError::Unsupported(_))
    ));
}

#[test]
fn malformed_payloads_are_skipped() {
    let bytes = ds_store(vec![
        RawRecord::blob(".", b"icvp", b"not a plist"),
        RawRecord::blob("a.png", b"Iloc", &[1, 2]),
        RawRecord::long("a.png", b"lclr", 42),
        RawRecord::long(".", b"zzzz", 1),
        RawRecord::iloc("b.png", 3, 4),
    ]);
    let record = dsstore::decode_bytes(&bytes).unwrap();
    assert_eq!(record.icon_size(), 64);
    assert_eq!(record.icon_position("a.png"), None);
    assert_eq!(record.color_label("a.png"), None);
    assert_eq!(record.icon_position("b.png"), Some(IconPosition { x: 3, y: 4 }));
}

#[test]
fn file_size_limit_rejects_large_files() {
    let dir = TempDir::new().unwrap();
    let path = common::write(dir.path(), ".DS_Store", &ds_store(folder_records()));
    let err = DsStoreDecoder::new()
        .with_max_file_size(64)
        .decode(&path)
        .unwrap_err();
    assert!(matches!(err, DsStoreError::Format(_)));
    assert!(DsStoreDecoder::new().decode(&path).is_ok());
}

#[test]
fn directory_cache_revalidates_on_change() {
    let dir = TempDir::new().unwrap();
    let cache = DirectoryCache::new(8);
    assert!(cache.get(dir.path()).unwrap().is_none());

    common::write(
        dir.path(),
        ".DS_Store",
        &ds_store(vec![RawRecord::type_code(".", b"vmod", b"Nlsv")]),
    );
    let first = cache.get(dir.path()).unwrap().unwrap();
    assert_eq!(first.view_style(), ViewStyle::List);
    let again = cache.get(dir.path()).unwrap().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &again));

    // Different length forces a re-decode even within the mtime granularity.
    common::write(
        dir.path(),
        ".DS_Store",
        &ds_store(vec![
            RawRecord::type_code(".", b"vmod", b"clmv"),
            RawRecord::iloc("x", 0, 0),
        ]),
    );
    let changed = cache.get(dir.path()).unwrap().unwrap();
    assert_eq!(changed.view_style(), ViewStyle::Column);

    std::fs::remove_file(dir.path().join(".DS_Store")).unwrap();
    assert!(cache.get(dir.path()).unwrap().is_none());
    assert!(cache.is_empty());
}
