use std::collections::BTreeSet;

use super::{Batch, BatchMap, BatchName};
use crate::error::Error;

/// Check a user selection before any spreadsheet is opened.
///
/// Rules, in order: a base is designated, the base is selected, at least two
/// distinct batches are selected, the base is valid, every selected batch is
/// valid. The first violation is returned.
pub fn validate_batch_selection(
    selected: &[BatchName],
    base: Option<BatchName>,
    batches: &BatchMap,
) -> Result<(), Error> {
    let base = base.ok_or(Error::BaseBatchUnset)?;

    if !selected.contains(&base) {
        return Err(Error::BaseBatchNotSelected { base });
    }

    let distinct: BTreeSet<BatchName> = selected.iter().copied().collect();
    if distinct.len() < 2 {
        return Err(Error::SelectionTooFew {
            count: distinct.len(),
        });
    }

    let base_batch = batches
        .get(&base)
        .ok_or(Error::UnknownBatch { batch: base })?;
    if !base_batch.is_valid() {
        return Err(batch_defect(base_batch));
    }

    for name in selected {
        let batch = batches
            .get(name)
            .ok_or(Error::UnknownBatch { batch: *name })?;
        if !batch.is_valid() {
            return Err(batch_defect(batch));
        }
    }

    Ok(())
}

/// Duplicate language files are reported before missing ones.
fn batch_defect(batch: &Batch) -> Error {
    match batch.duplicate_languages.iter().next() {
        Some((language, files)) => Error::BatchDuplicateLanguage {
            batch: batch.name,
            language: *language,
            files: files.clone(),
        },
        None => Error::BatchIncomplete {
            batch: batch.name,
            missing: batch.missing_languages.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn batch(name: BatchName, langs: &[Language], dupes: &[Language]) -> Batch {
        let files = langs
            .iter()
            .map(|l| (*l, PathBuf::from(format!("{}_{}.xlsx", l, name))))
            .collect();
        let duplicate_languages: BTreeMap<Language, Vec<String>> = dupes
            .iter()
            .map(|l| (*l, vec![format!("a_{}", l), format!("b_{}", l)]))
            .collect();
        let missing_languages = Language::ALL
            .into_iter()
            .filter(|l| !langs.contains(l) && !dupes.contains(l))
            .collect();
        Batch {
            name,
            date: "251126".to_string(),
            folder: PathBuf::from(format!("251126_{}", name)),
            files,
            missing_languages,
            duplicate_languages,
        }
    }

    fn map(batches: Vec<Batch>) -> BatchMap {
        batches.into_iter().map(|b| (b.name, b)).collect()
    }

    #[test]
    fn test_valid_selection() {
        let batches = map(vec![
            batch(BatchName::Regular, &Language::ALL, &[]),
            batch(BatchName::Extra(0), &Language::ALL, &[]),
        ]);
        let selected = [BatchName::Regular, BatchName::Extra(0)];
        assert!(validate_batch_selection(&selected, Some(BatchName::Regular), &batches).is_ok());
    }

    #[test]
    fn test_rule_order() {
        let batches = map(vec![
            batch(BatchName::Regular, &Language::ALL, &[]),
            batch(BatchName::Extra(0), &Language::ALL[..5], &[]),
        ]);

        let err = validate_batch_selection(&[BatchName::Regular], None, &batches).unwrap_err();
        assert!(matches!(err, Error::BaseBatchUnset));

        let err = validate_batch_selection(&[BatchName::Regular], Some(BatchName::Extra(0)), &batches)
            .unwrap_err();
        assert!(matches!(err, Error::BaseBatchNotSelected { base: BatchName::Extra(0) }));

        let err = validate_batch_selection(&[BatchName::Regular], Some(BatchName::Regular), &batches)
            .unwrap_err();
        assert!(matches!(err, Error::SelectionTooFew { count: 1 }));

        let selected = [BatchName::Regular, BatchName::Extra(0)];
        let err = validate_batch_selection(&selected, Some(BatchName::Extra(0)), &batches).unwrap_err();
        match err {
            Error::BatchIncomplete { batch, missing } => {
                assert_eq!(batch, BatchName::Extra(0));
                assert_eq!(missing, vec![Language::PtBr, Language::Ru]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_language_reported_before_missing() {
        let batches = map(vec![
            batch(BatchName::Regular, &Language::ALL, &[]),
            batch(BatchName::Extra(2), &Language::ALL[1..6], &[Language::En]),
        ]);
        let selected = [BatchName::Regular, BatchName::Extra(2)];
        let err = validate_batch_selection(&selected, Some(BatchName::Regular), &batches).unwrap_err();
        match err {
            Error::BatchDuplicateLanguage { batch, language, files } => {
                assert_eq!(batch, BatchName::Extra(2));
                assert_eq!(language, Language::En);
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_batch() {
        let batches = map(vec![batch(BatchName::Regular, &Language::ALL, &[])]);
        let selected = [BatchName::Regular, BatchName::Extra(9)];
        let err = validate_batch_selection(&selected, Some(BatchName::Regular), &batches).unwrap_err();
        assert!(matches!(err, Error::UnknownBatch { batch: BatchName::Extra(9) }));
    }

    #[test]
    fn test_repeated_name_counts_once() {
        let batches = map(vec![
            batch(BatchName::Regular, &Language::ALL, &[]),
            batch(BatchName::Extra(0), &Language::ALL, &[]),
        ]);
        let selected = [BatchName::Regular, BatchName::Regular, BatchName::Regular];
        let err = validate_batch_selection(&selected, Some(BatchName::Regular), &batches).unwrap_err();
        assert!(matches!(err, Error::SelectionTooFew { count: 1 }));
    }

    #[test]
    fn test_base_with_duplicate_language_names_it() {
        let batches = map(vec![
            batch(BatchName::Regular, &Language::ALL[1..], &[Language::En]),
            batch(BatchName::Extra(0), &Language::ALL, &[]),
        ]);
        let selected = [BatchName::Regular, BatchName::Extra(0)];
        let err = validate_batch_selection(&selected, Some(BatchName::Regular), &batches).unwrap_err();
        match err {
            Error::BatchDuplicateLanguage { batch, language, .. } => {
                assert_eq!(batch, BatchName::Regular);
                assert_eq!(language, Language::En);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
