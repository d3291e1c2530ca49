use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use super::{LanguageRows, Row, HEADER};
use crate::batch::{BatchMap, BatchName};
use crate::error::Error;
use crate::language::Language;
use crate::progress::ProgressReporter;
use crate::xlsx::read_active_sheet;

/// Rows each language contributed from one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLoad {
    pub batch: BatchName,
    pub counts: BTreeMap<Language, usize>,
}

impl BatchLoad {
    pub fn count(&self, lang: Language) -> usize {
        self.counts.get(&lang).copied().unwrap_or(0)
    }
}

/// Concatenated per-language streams, plus the per-batch bookkeeping needed to
/// split them back up.
#[derive(Debug, Clone, Default)]
pub struct LoadedStreams {
    pub order: Vec<BatchName>,
    pub rows: LanguageRows,
    pub batch_loads: Vec<BatchLoad>,
}

impl LoadedStreams {
    pub fn rows_for(&self, lang: Language) -> &[Row] {
        self.rows.get(&lang).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

/// Read one per-language workbook: verify the header and return every row with a KEY.
pub fn load_language_file(path: &Path) -> Result<Vec<Row>, Error> {
    let sheet = read_active_sheet(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let actual = sheet.header();
    if actual != HEADER {
        return Err(Error::InvalidHeader {
            file: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            expected: HEADER.iter().map(|h| h.to_string()).collect(),
            actual,
        });
    }

    Ok(sheet
        .data_rows()
        .map(Row::from_cells)
        .filter(Row::has_key)
        .collect())
}

/// Load every language of every batch, batch by batch in `order`.
///
/// Cancellation is polled before each batch. Header validation runs on every file.
pub fn load_batches(
    order: &[BatchName],
    batches: &BatchMap,
    reporter: &dyn ProgressReporter,
) -> Result<LoadedStreams, Error> {
    let mut streams = LoadedStreams {
        order: order.to_vec(),
        rows: Language::ALL.into_iter().map(|l| (l, Vec::new())).collect(),
        batch_loads: Vec::with_capacity(order.len()),
    };
    let total = order.len().max(1);

    for (idx, name) in order.iter().enumerate() {
        if reporter.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let percent = 5 + (idx * 40 / total) as u8;
        reporter.on_progress(
            percent,
            &format!("Reading batch {} ({}/{})", name, idx + 1, order.len()),
        );

        let batch = batches
            .get(name)
            .ok_or(Error::UnknownBatch { batch: *name })?;
        let mut counts = BTreeMap::new();
        for lang in Language::ALL {
            let path = batch.files.get(&lang).ok_or_else(|| Error::BatchIncomplete {
                batch: *name,
                missing: vec![lang],
            })?;
            let rows = load_language_file(path)?;
            debug!("{} {}: {} rows from {}", name, lang, rows.len(), path.display());
            counts.insert(lang, rows.len());
            streams.rows.entry(lang).or_default().extend(rows);
        }
        streams.batch_loads.push(BatchLoad {
            batch: *name,
            counts,
        });
    }

    Ok(streams)
}
