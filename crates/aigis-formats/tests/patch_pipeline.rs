#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Patch pipeline over whole object graphs

mod fixtures;

use aigis_formats::allz::Allz;
use aigis_formats::archive::EntryPayload;
use aigis_formats::bits::ControlWidths;
use aigis_formats::patch::MemorySource;
use aigis_formats::table::{FieldValue, Table};
use aigis_formats::{
    AlFormat, AlObject, Error, ErrorKind, FailurePolicy, PatchContext, TranslationSource,
    TranslationTable, parse, patch, serialize,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn table_of(object: &AlObject) -> &Table {
    match object {
        AlObject::Table(table) => table,
        AlObject::Compressed(allz) => table_of(&allz.inner),
        other => panic!("expected a table, got {:?}", other.magic()),
    }
}

fn archive_entry<'a>(object: &'a AlObject, name: &str) -> &'a AlObject {
    let AlObject::Archive(archive) = object else {
        panic!("expected an archive, got {:?}", object.magic());
    };
    archive
        .entry(name)
        .and_then(|e| e.object())
        .unwrap_or_else(|| panic!("no object entry {name}"))
}

/// v3 root holding a pooled table, a compressed table, text and a nested v2 archive
fn game_archive() -> Vec<u8> {
    let compressed = Allz::new(
        AlObject::from_bytes(&fixtures::table(0x14)).unwrap(),
        ControlWidths::default(),
    );
    let compressed = serialize(&AlObject::Compressed(compressed)).unwrap();
    let nested = fixtures::archive_v2(&[("SkillText.atb", fixtures::table(0x1E))]);

    fixtures::archive_v3(
        &[
            ("UnitName.atb", fixtures::table(0x1E)),
            ("Compressed.atb", compressed),
            ("readme.txt", "剣".as_bytes().to_vec()),
            ("Pack.aar", nested),
        ],
        0xA0,
    )
}

async fn resolve(source: MemorySource, name: &str, policy: FailurePolicy) -> PatchContext {
    let source: Arc<dyn TranslationSource> = Arc::new(source);
    PatchContext::resolve(&source, name, policy).await.unwrap()
}

#[tokio::test]
async fn identity_patch_is_byte_exact() {
    let data = game_archive();
    let object = parse(&data).unwrap();
    let patched = patch(&object, &PatchContext::identity("")).await.unwrap();
    assert_eq!(serialize(&patched).unwrap(), data);

    // A scope that resolves nothing behaves the same
    let context = resolve(
        MemorySource::new().with_folder("Other.aar", MemorySource::new()),
        "Root.aar",
        FailurePolicy::Propagate,
    )
    .await;
    let patched = patch(&object, &context).await.unwrap();
    assert_eq!(serialize(&patched).unwrap(), data);
}

#[tokio::test]
async fn scoped_translation_reaches_every_level() {
    let sword = TranslationTable::from_pairs([("剣", "Great Sword")]);
    let shield = TranslationTable::from_pairs([("盾", "Shield")]);
    let source = MemorySource::new().with_folder(
        "Root.aar",
        MemorySource::new()
            .with_table("UnitName.atb", sword.clone())
            .with_table("Compressed.atb", shield)
            .with_table("readme.txt", sword.clone())
            .with_folder(
                "Pack.aar",
                MemorySource::new().with_table("SkillText.atb", sword),
            ),
    );
    let context = resolve(source, "Root.aar", FailurePolicy::Propagate).await;

    let data = game_archive();
    let object = parse(&data).unwrap();
    let patched = patch(&object, &context).await.unwrap();

    let unit = table_of(archive_entry(&patched, "UnitName.atb"));
    assert_eq!(unit.strings(), vec!["Great Sword", "盾", "Great Sword"]);
    let compressed = table_of(archive_entry(&patched, "Compressed.atb"));
    assert_eq!(compressed.strings(), vec!["剣", "Shield", "剣"]);
    let skill = table_of(archive_entry(archive_entry(&patched, "Pack.aar"), "SkillText.atb"));
    assert_eq!(skill.strings(), vec!["Great Sword", "盾", "Great Sword"]);

    // Text entries are never translated
    let AlObject::Archive(root) = &patched else {
        panic!("expected an archive");
    };
    assert_eq!(
        root.entry("readme.txt").unwrap().payload,
        EntryPayload::Text("剣".as_bytes().to_vec())
    );

    // The input graph is untouched
    assert_eq!(serialize(&object).unwrap(), data);

    // The rebuilt bytes parse to the same patched graph, ALLZ re-encoded
    let rebuilt = serialize(&patched).unwrap();
    let reparsed = parse(&rebuilt).unwrap();
    let compressed = table_of(archive_entry(&reparsed, "Compressed.atb"));
    assert_eq!(compressed.strings(), vec!["剣", "Shield", "剣"]);
    assert_eq!(table_of(archive_entry(&reparsed, "UnitName.atb")), unit);
}

#[tokio::test]
async fn pool_holds_each_referenced_string_once() {
    let table = AlObject::from_bytes(&fixtures::table(0x14)).unwrap();
    let context = PatchContext::with_table(
        "UnitName.atb",
        Arc::new(TranslationTable::from_pairs([("剣", "Sword"), ("盾", "Shield")])),
    );
    let patched = patch(&table, &context).await.unwrap();
    let patched = table_of(&patched);

    let pool = patched.pool.as_ref().unwrap();
    assert_eq!(pool.entries().count(), 2);
    assert_eq!(pool.as_bytes(), b"\0Sword\0Shield\0");
    let refs: Vec<_> = patched.rows.iter().map(|r| r.values[1]).collect();
    assert_eq!(
        refs,
        vec![
            FieldValue::StringRef(1),
            FieldValue::StringRef(7),
            FieldValue::StringRef(1),
        ]
    );
    assert_eq!(patched.pool_location.unwrap().size, 14);
}

#[tokio::test]
async fn growing_pool_moves_the_name_footer() {
    let data = fixtures::table(0x1E);
    let table = AlObject::from_bytes(&data).unwrap();
    let original_names = table_of(&table).names_start.unwrap();

    let context = PatchContext::with_table(
        "UnitName.atb",
        Arc::new(TranslationTable::from_pairs([("剣", "Great Sword")])),
    );
    let patched = patch(&table, &context).await.unwrap();

    // Pool grows from 9 to 17 bytes: two more aligned words
    let patched_table = table_of(&patched);
    assert_eq!(patched_table.pool_location.unwrap().size, 17);
    assert_eq!(patched_table.names_start, Some(original_names + 8));

    let rebuilt = serialize(&patched).unwrap();
    assert_eq!(rebuilt.len(), data.len() + 8);
    let footer_at = patched_table.names_start.unwrap() as usize;
    assert_eq!(&rebuilt[footer_at..footer_at + 4], &1u32.to_le_bytes());
    let reparsed = Table::from_bytes(&rebuilt).unwrap();
    assert_eq!(reparsed.footer.unwrap().name, b"UnitTable");
}

#[tokio::test]
async fn failure_policy_decides_archive_outcome() {
    let bad = TranslationTable::from_pairs([("盾", "bad\0value")]);
    let source = || {
        MemorySource::new().with_folder(
            "Root.aar",
            MemorySource::new().with_table("UnitName.atb", bad.clone()),
        )
    };
    let data = game_archive();
    let object = parse(&data).unwrap();

    let context = resolve(source(), "Root.aar", FailurePolicy::Propagate).await;
    let err = patch(&object, &context).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Patch);
    let Error::Patch { path, .. } = &err else {
        panic!("expected a patch error, got {err:?}");
    };
    assert_eq!(path, "Root.aar/UnitName.atb");

    let context = resolve(source(), "Root.aar", FailurePolicy::KeepOriginal).await;
    let patched = patch(&object, &context).await.unwrap();
    assert_eq!(serialize(&patched).unwrap(), data);
}
