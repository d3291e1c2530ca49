use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{LanguageRows, HEADER};
use crate::error::Error;
use crate::language::Language;
use crate::progress::ProgressReporter;
use crate::xlsx::{SheetLayout, Workbook, Worksheet};

pub fn output_file_name(date_prefix: &str, lang: Language) -> String {
    format!("{}_{}.xlsx", date_prefix, lang)
}

/// Write `{date_prefix}_{LANG}.xlsx` for every language into `output_dir`.
///
/// Existing targets are confirmed once through the reporter; declining returns
/// `Error::Cancelled` before anything is written. A failed write keeps the files
/// already written and names them in the error.
pub fn save_merged_batches(
    rows: &LanguageRows,
    output_dir: &Path,
    date_prefix: &str,
    reporter: &dyn ProgressReporter,
) -> Result<BTreeMap<Language, PathBuf>, Error> {
    fs::create_dir_all(output_dir).map_err(|source| Error::OutputDirCreate {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let existing: Vec<String> = Language::ALL
        .into_iter()
        .map(|lang| output_file_name(date_prefix, lang))
        .filter(|name| output_dir.join(name).exists())
        .collect();
    if !existing.is_empty() {
        debug!("Output already present: {:?}", existing);
        if !reporter.confirm_overwrite(&existing) {
            info!("Overwrite declined, nothing written");
            return Err(Error::Cancelled);
        }
    }

    let mut saved = BTreeMap::new();
    for lang in Language::ALL {
        let path = output_dir.join(output_file_name(date_prefix, lang));

        let mut sheet = Worksheet::new("Sheet1").with_layout(SheetLayout::language_table());
        sheet.push_text_row(&HEADER);
        for row in rows.get(&lang).into_iter().flatten() {
            sheet.push_row(row.to_cells());
        }
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        workbook.save(&path).map_err(|source| Error::OutputWrite {
            language: lang,
            path: path.clone(),
            written: saved.keys().copied().collect(),
            source,
        })?;
        debug!("Saved {}", path.display());
        saved.insert(lang, path);
    }

    info!("Saved {} file(s) to {}", saved.len(), output_dir.display());
    Ok(saved)
}
