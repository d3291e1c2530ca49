use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{parse_cell_ref, XlsxError};

/// Cell text of one worksheet, dense by row and column. `None` is an absent or blank cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    rows: Vec<Vec<Option<String>>>,
}

impl SheetData {
    pub fn from_rows(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First row as plain strings, with trailing blank cells dropped.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self
            .rows
            .first()
            .map(|row| row.iter().map(|c| c.clone().unwrap_or_default()).collect())
            .unwrap_or_default();
        while header.last().is_some_and(|h| h.is_empty()) {
            header.pop();
        }
        header
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().skip(1).map(|r| r.as_slice())
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(value);
    }
}

/// Read the active worksheet (the workbook's `activeTab`, else the first sheet).
pub fn read_active_sheet(path: &Path) -> Result<SheetData, XlsxError> {
    let file = File::open(path)?;
    let mut zip = ZipArchive::new(file)?;

    let workbook = read_part(&mut zip, "xl/workbook.xml")?
        .ok_or_else(|| XlsxError::Malformed("missing xl/workbook.xml".to_string()))?;
    let (sheet_rel_ids, active_tab) = parse_workbook(&workbook)?;

    let rels = read_part(&mut zip, "xl/_rels/workbook.xml.rels")?
        .ok_or_else(|| XlsxError::Malformed("missing xl/_rels/workbook.xml.rels".to_string()))?;
    let relationships = parse_relationships(&rels)?;

    let rel_id = sheet_rel_ids
        .get(active_tab)
        .or_else(|| sheet_rel_ids.first())
        .ok_or_else(|| XlsxError::Malformed("workbook has no sheets".to_string()))?;
    let sheet_target = relationships
        .iter()
        .find(|r| &r.id == rel_id)
        .map(|r| resolve_target(&r.target))
        .ok_or_else(|| XlsxError::Malformed(format!("no relationship for sheet {}", rel_id)))?;

    let shared_strings_path = relationships
        .iter()
        .find(|r| r.kind.ends_with("/sharedStrings"))
        .map(|r| resolve_target(&r.target))
        .unwrap_or_else(|| "xl/sharedStrings.xml".to_string());
    let shared_strings = match read_part(&mut zip, &shared_strings_path)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_xml = read_part(&mut zip, &sheet_target)?
        .ok_or_else(|| XlsxError::Malformed(format!("missing sheet part {}", sheet_target)))?;
    let sheet = parse_sheet(&sheet_target, &sheet_xml, &shared_strings)?;
    debug!(
        "Read {} rows from {} ({})",
        sheet.row_count(),
        path.display(),
        sheet_target
    );
    Ok(sheet)
}

fn read_part<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxError> {
    match zip.by_name(name) {
        Ok(mut file) => {
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            Ok(Some(data))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn xml_error(part: &str, source: impl Into<quick_xml::Error>) -> XlsxError {
    XlsxError::Xml {
        part: part.to_string(),
        source: source.into(),
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8], part: &str) -> Result<Option<String>, XlsxError> {
    for a in e.attributes() {
        let a = a.map_err(|err| xml_error(part, err))?;
        if a.key.local_name().as_ref() == local {
            let value = a.unescape_value().map_err(|err| xml_error(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_workbook(xml: &[u8]) -> Result<(Vec<String>, usize), XlsxError> {
    const PART: &str = "xl/workbook.xml";
    let mut reader = Reader::from_reader(xml);
    let mut sheets = Vec::new();
    let mut active_tab = 0usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(PART, e))?
        {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    if let Some(id) = attr(&e, b"id", PART)? {
                        sheets.push(id);
                    }
                }
                b"workbookView" => {
                    if let Some(tab) = attr(&e, b"activeTab", PART)? {
                        active_tab = tab.parse().unwrap_or(0);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok((sheets, active_tab))
}

struct Relationship {
    id: String,
    target: String,
    kind: String,
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, XlsxError> {
    const PART: &str = "xl/_rels/workbook.xml.rels";
    let mut reader = Reader::from_reader(xml);
    let mut relationships = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(PART, e))?
        {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr(&e, b"Id", PART)?.unwrap_or_default();
                let target = attr(&e, b"Target", PART)?.unwrap_or_default();
                let kind = attr(&e, b"Type", PART)?.unwrap_or_default();
                relationships.push(Relationship { id, target, kind });
            }
            _ => {}
        }
    }
    Ok(relationships)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, XlsxError> {
    const PART: &str = "xl/sharedStrings.xml";
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // phonetic runs (<rPh>) carry reading hints, not cell text
    let mut in_phonetic = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(PART, e))?
        {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| xml_error(PART, e))?;
                current.push_str(&text);
            }
            Event::CData(t) if in_text => current.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    value: String,
    has_value: bool,
}

fn parse_sheet(part: &str, xml: &[u8], shared: &[String]) -> Result<SheetData, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut sheet = SheetData::default();
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_phonetic = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(part, e))?
        {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    start_row(&e, part, &mut next_row)?;
                    next_col = 0;
                }
                b"c" => {
                    let (row, col) = cell_position(&e, part, next_row, next_col)?;
                    next_col = col + 1;
                    cell = Some(PendingCell {
                        row,
                        col,
                        kind: attr(&e, b"t", part)?,
                        ..PendingCell::default()
                    });
                }
                b"rPh" => in_phonetic = true,
                b"v" | b"t" if cell.is_some() && !in_phonetic => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    start_row(&e, part, &mut next_row)?;
                    next_row += 1;
                }
                b"c" => {
                    let (_, col) = cell_position(&e, part, next_row, next_col)?;
                    next_col = col + 1;
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    let text = t.unescape().map_err(|e| xml_error(part, e))?;
                    c.value.push_str(&text);
                    c.has_value = true;
                }
            }
            Event::CData(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&String::from_utf8_lossy(&t));
                    c.has_value = true;
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => {
                    if let Some(c) = cell.as_mut() {
                        c.has_value = true;
                    }
                    in_value = false;
                }
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        if let Some(value) = resolve_cell(c.kind.as_deref(), c.value, c.has_value, shared)? {
                            sheet.set(c.row, c.col, value);
                        }
                    }
                }
                b"row" => next_row += 1,
                _ => {}
            },
            _ => {}
        }
    }
    Ok(sheet)
}

fn start_row(e: &BytesStart<'_>, part: &str, next_row: &mut usize) -> Result<(), XlsxError> {
    if let Some(r) = attr(e, b"r", part)? {
        if let Ok(n) = r.parse::<usize>() {
            if n > 0 {
                *next_row = n - 1;
            }
        }
    }
    Ok(())
}

fn cell_position(
    e: &BytesStart<'_>,
    part: &str,
    row: usize,
    col: usize,
) -> Result<(usize, usize), XlsxError> {
    Ok(attr(e, b"r", part)?
        .and_then(|r| parse_cell_ref(&r))
        .unwrap_or((row, col)))
}

fn resolve_cell(
    kind: Option<&str>,
    raw: String,
    has_value: bool,
    shared: &[String],
) -> Result<Option<String>, XlsxError> {
    if !has_value {
        return Ok(None);
    }
    let value = match kind {
        Some("s") => {
            let idx: usize = raw
                .trim()
                .parse()
                .map_err(|_| XlsxError::Malformed(format!("bad shared string index {:?}", raw)))?;
            shared
                .get(idx)
                .cloned()
                .ok_or_else(|| XlsxError::Malformed(format!("shared string {} out of range", idx)))?
        }
        Some("b") => {
            if raw.trim() == "1" {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        _ => raw,
    };
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_strings_with_runs_and_phonetics() {
        let xml = br#"<sst xmlns="x"><si><t>plain</t></si><si><r><t>ri</t></r><r><t xml:space="preserve">ch </t></r><rPh><t>ignored</t></rPh></si><si/><si><t>a &amp; b</t></si></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["plain", "rich ", "", "a & b"]);
    }

    #[test]
    fn test_sheet_cells_by_reference() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>inline</t></is></c></row>
            <row r="3"><c r="B3"><v>42</v></c><c r="D3" t="b"><v>1</v></c><c r="E3" s="2"/></row>
        </sheetData></worksheet>"#;
        let shared = vec!["shared".to_string()];
        let sheet = parse_sheet("sheet1", xml, &shared).unwrap();
        let rows = sheet.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].as_deref(), Some("shared"));
        assert_eq!(rows[0][1], None);
        assert_eq!(rows[0][2].as_deref(), Some("inline"));
        assert!(rows[1].is_empty());
        assert_eq!(rows[2][1].as_deref(), Some("42"));
        assert_eq!(rows[2][3].as_deref(), Some("TRUE"));
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_cells_without_reference_follow_position() {
        let xml = br#"<worksheet><sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c t="inlineStr"><is><t>b</t></is></c></row><row><c t="inlineStr"><is><t>c</t></is></c></row></sheetData></worksheet>"#;
        let sheet = parse_sheet("sheet1", xml, &[]).unwrap();
        assert_eq!(sheet.header(), vec!["a", "b"]);
        assert_eq!(sheet.rows()[1][0].as_deref(), Some("c"));
    }

    #[test]
    fn test_header_drops_trailing_blanks() {
        let sheet = SheetData::from_rows(vec![vec![
            Some("Table".to_string()),
            None,
            Some("KEY".to_string()),
            None,
            None,
        ]]);
        assert_eq!(sheet.header(), vec!["Table", "", "KEY"]);
    }
}
