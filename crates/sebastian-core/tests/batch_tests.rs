mod common;

use std::fs;

use common::{make_batch, entry, write_language, BATCH_DATE};
use sebastian_core::batch::{scan_batch_folders, validate_batch_selection};
use sebastian_core::{BatchName, Error, Language};
use tempfile::tempdir;

#[test]
fn test_scan_finds_complete_batches_and_ignores_others() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_batch(root, "251126", "REGULAR", &[entry("K1", "2025-01-01 10:00")]);
    make_batch(root, "251127", "EXTRA0", &[entry("K2", "2025-01-01 10:00")]);
    fs::create_dir_all(root.join("Output")).unwrap();
    fs::create_dir_all(root.join("251128_EXTRA21")).unwrap();
    fs::write(root.join("251129_REGULAR"), b"a file, not a folder").unwrap();

    let batches = scan_batch_folders(root).unwrap();
    assert_eq!(
        batches.keys().copied().collect::<Vec<_>>(),
        vec![BatchName::Regular, BatchName::Extra(0)]
    );
    let regular = &batches[&BatchName::Regular];
    assert!(regular.is_valid());
    assert_eq!(regular.date, "251126");
    assert_eq!(regular.folder_name(), "251126_REGULAR");
    assert_eq!(batches[&BatchName::Extra(0)].date, "251127");
}

#[test]
fn test_scan_records_missing_and_duplicate_languages() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_batch(root, BATCH_DATE, "REGULAR", &[entry("K1", "")]);

    let folder = root.join("251127_EXTRA3");
    fs::create_dir_all(&folder).unwrap();
    for lang in [Language::En, Language::Ct, Language::Cs, Language::Ja] {
        write_language(&folder, "251127", "EXTRA3", lang, &[]);
    }
    // second EN file with another date prefix, and a file for the wrong batch
    write_language(&folder, "251130", "EXTRA3", Language::En, &[]);
    write_language(&folder, "251127", "EXTRA4", Language::Th, &[]);

    let batches = scan_batch_folders(root).unwrap();
    let extra = &batches[&BatchName::Extra(3)];
    assert!(!extra.is_valid());
    assert_eq!(extra.file_count(), 3);
    assert_eq!(
        extra.missing_languages,
        vec![Language::Th, Language::PtBr, Language::Ru]
    );
    assert_eq!(
        extra.duplicate_languages[&Language::En],
        vec![
            "251127_EN_EXTRA3.xlsx".to_string(),
            "251130_EN_EXTRA3.xlsx".to_string()
        ]
    );

    let selected = [BatchName::Regular, BatchName::Extra(3)];
    match validate_batch_selection(&selected, Some(BatchName::Regular), &batches) {
        Err(Error::BatchDuplicateLanguage { batch, language, .. }) => {
            assert_eq!(batch, BatchName::Extra(3));
            assert_eq!(language, Language::En);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_scan_requires_regular() {
    let tmp = tempdir().unwrap();
    make_batch(tmp.path(), BATCH_DATE, "EXTRA0", &[entry("K1", "")]);
    let err = scan_batch_folders(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::RegularBatchMissing));
    assert_eq!(err.code(), "BATCH_REGULAR_MISSING");
}

#[test]
fn test_scan_missing_root() {
    let tmp = tempdir().unwrap();
    let err = scan_batch_folders(&tmp.path().join("nowhere")).unwrap_err();
    assert!(matches!(err, Error::RootFolderMissing { .. }));
}

#[test]
fn test_later_folder_wins_name_collision() {
    let tmp = tempdir().unwrap();
    make_batch(tmp.path(), "251126", "REGULAR", &[entry("K1", "")]);
    make_batch(tmp.path(), "251201", "REGULAR", &[entry("K1", "")]);
    let batches = scan_batch_folders(tmp.path()).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[&BatchName::Regular].date, "251201");
}
