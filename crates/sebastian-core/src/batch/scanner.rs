use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{Batch, BatchMap, BatchName};
use crate::error::Error;
use crate::language::Language;

lazy_static! {
    static ref BATCH_FOLDER_PATTERN: Regex =
        Regex::new(r"^([0-9]{6})_(REGULAR|EXTRA([0-9]{1,2}))$").expect("valid folder pattern");
    static ref BATCH_FILE_PATTERN: Regex =
        Regex::new(r"^([0-9]{6})_(EN|CT|CS|JA|TH|PT-BR|RU)_(.+)\.xlsx$").expect("valid file pattern");
}

/// Split a batch folder name into its date and batch name.
/// Returns `None` for anything that is not a batch folder.
pub fn parse_batch_folder_name(folder_name: &str) -> Option<(String, BatchName, String)> {
    let caps = BATCH_FOLDER_PATTERN.captures(folder_name)?;
    let label = caps[2].to_string();
    let name = label.parse::<BatchName>().ok()?;
    Some((caps[1].to_string(), name, label))
}

/// Language of a batch file, if its name matches and its suffix equals the batch label.
pub fn language_of_batch_file(file_name: &str, batch_label: &str) -> Option<Language> {
    let caps = BATCH_FILE_PATTERN.captures(file_name)?;
    if &caps[3] != batch_label {
        return None;
    }
    caps[2].parse().ok()
}

/// Enumerate the immediate subfolders of `root` and build the batch map.
///
/// Folders that do not look like batches are skipped silently. Fails when the
/// root is missing or when no REGULAR batch exists.
pub fn scan_batch_folders(root: &Path) -> Result<BatchMap, Error> {
    if !root.is_dir() {
        return Err(Error::RootFolderMissing {
            path: root.to_path_buf(),
        });
    }

    let mut folders: Vec<(String, PathBuf)> = Vec::new();
    for entry in read_dir(root)? {
        let path = entry.path();
        if path.is_dir() {
            folders.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    // later dates sort last and win a name collision
    folders.sort();

    let mut batches = BatchMap::new();
    for (folder_name, path) in folders {
        let Some((date, name, label)) = parse_batch_folder_name(&folder_name) else {
            debug!("Ignoring non-batch folder {}", folder_name);
            continue;
        };

        let batch = scan_batch_files(&path, name, &label, date)?;
        debug!(
            "Batch {}: {}/{} languages, missing {:?}, duplicated {:?}",
            name,
            batch.file_count(),
            Language::ALL.len(),
            batch.missing_languages,
            batch.duplicate_languages.keys().collect::<Vec<_>>()
        );
        if let Some(previous) = batches.insert(name, batch) {
            warn!(
                "Batch {} found in both {} and {}, using the latter",
                name,
                previous.folder.display(),
                path.display()
            );
        }
    }

    if !batches.contains_key(&BatchName::Regular) {
        return Err(Error::RegularBatchMissing);
    }

    info!("Found {} batch folder(s) in {}", batches.len(), root.display());
    Ok(batches)
}

fn scan_batch_files(
    folder: &Path,
    name: BatchName,
    label: &str,
    date: String,
) -> Result<Batch, Error> {
    let mut candidates: BTreeMap<Language, Vec<(String, PathBuf)>> = BTreeMap::new();

    for entry in read_dir(folder)? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if let Some(lang) = language_of_batch_file(&file_name, label) {
            candidates.entry(lang).or_default().push((file_name, path));
        }
    }

    let mut files = BTreeMap::new();
    let mut duplicate_languages = BTreeMap::new();
    for (lang, mut found) in candidates {
        if found.len() == 1 {
            let (_, path) = found.remove(0);
            files.insert(lang, path);
        } else {
            let mut names: Vec<String> = found.into_iter().map(|(n, _)| n).collect();
            names.sort();
            duplicate_languages.insert(lang, names);
        }
    }

    let missing_languages = Language::ALL
        .into_iter()
        .filter(|l| !files.contains_key(l) && !duplicate_languages.contains_key(l))
        .collect();

    Ok(Batch {
        name,
        date,
        folder: folder.to_path_buf(),
        files,
        missing_languages,
        duplicate_languages,
    })
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", dir.display(), err),
        )
    })?;
    let mut out = Vec::new();
    for entry in entries {
        out.push(entry.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name_pattern() {
        let (date, name, label) = parse_batch_folder_name("251126_REGULAR").unwrap();
        assert_eq!(date, "251126");
        assert_eq!(name, BatchName::Regular);
        assert_eq!(label, "REGULAR");

        assert_eq!(
            parse_batch_folder_name("251127_EXTRA20").map(|(_, n, _)| n),
            Some(BatchName::Extra(20))
        );
        assert!(parse_batch_folder_name("251127_EXTRA21").is_none());
        assert!(parse_batch_folder_name("251127_EXTRA123").is_none());
        assert!(parse_batch_folder_name("Output").is_none());
        assert!(parse_batch_folder_name("25112_REGULAR").is_none());
        assert!(parse_batch_folder_name("251126_REGULAR_old").is_none());
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(
            language_of_batch_file("251126_PT-BR_REGULAR.xlsx", "REGULAR"),
            Some(Language::PtBr)
        );
        assert_eq!(language_of_batch_file("251126_EN_EXTRA1.xlsx", "REGULAR"), None);
        assert_eq!(language_of_batch_file("251126_DE_REGULAR.xlsx", "REGULAR"), None);
        assert_eq!(language_of_batch_file("251126_EN_REGULAR.xls", "REGULAR"), None);
        assert_eq!(language_of_batch_file("~$251126_EN_REGULAR.xlsx", "REGULAR"), None);
    }
}
