use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::layout::STYLES_XML;
use super::{column_letter, CellStyle, SheetLayout, XlsxError};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Overrides the layout's row style when set.
    pub style: Option<CellStyle>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            value: if value.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(value)
            },
            style: None,
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            style: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            value: CellValue::Empty,
            style: None,
        }
    }

    pub fn styled(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<Cell>>,
    layout: SheetLayout,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            layout: SheetLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    pub fn push_text_row<S: AsRef<str>>(&mut self, values: &[S]) {
        self.rows
            .push(values.iter().map(|v| Cell::text(v.as_ref())).collect());
    }

    fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(self.layout.column_widths.len())
    }

    fn used_range(&self) -> String {
        let last_col = column_letter(self.column_count().max(1) - 1);
        format!("A1:{}{}", last_col, self.rows.len().max(1))
    }

    fn to_xml(&self, selected: bool) -> Vec<u8> {
        let mut out = String::with_capacity(256 + self.rows.len() * 256);
        out.push_str(XML_DECL);
        out.push_str(&format!(
            r#"<worksheet xmlns="{}" xmlns:r="{}">"#,
            NS_MAIN, NS_REL
        ));
        out.push_str(&format!(r#"<dimension ref="{}"/>"#, self.used_range()));

        out.push_str("<sheetViews><sheetView");
        if selected {
            out.push_str(r#" tabSelected="1""#);
        }
        out.push_str(r#" workbookViewId="0">"#);
        if self.layout.freeze_header {
            out.push_str(
                r#"<pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/><selection pane="bottomLeft" activeCell="A2" sqref="A2"/>"#,
            );
        }
        out.push_str("</sheetView></sheetViews>");
        out.push_str(r#"<sheetFormatPr defaultRowHeight="15"/>"#);

        if !self.layout.column_widths.is_empty() {
            out.push_str("<cols>");
            for (idx, width) in self.layout.column_widths.iter().enumerate() {
                out.push_str(&format!(
                    r#"<col min="{n}" max="{n}" width="{w}" customWidth="1"/>"#,
                    n = idx + 1,
                    w = width
                ));
            }
            out.push_str("</cols>");
        }

        let column_count = self.column_count();
        out.push_str("<sheetData>");
        for (row_idx, row) in self.rows.iter().enumerate() {
            let is_header = row_idx == 0;
            let row_style = if is_header {
                self.layout.header_style
            } else {
                self.layout.data_style
            };
            out.push_str(&format!(r#"<row r="{}""#, row_idx + 1));
            if let (false, Some(height)) = (is_header, self.layout.data_row_height) {
                out.push_str(&format!(r#" ht="{}" customHeight="1""#, height));
            }
            out.push('>');

            // styled rows cover the full column span so blank cells keep the look
            let span = if row_style == CellStyle::Plain {
                row.len()
            } else {
                column_count
            };
            for col_idx in 0..span {
                let cell = row.get(col_idx);
                let style = cell.and_then(|c| c.style).unwrap_or(row_style);
                let reference = format!("{}{}", column_letter(col_idx), row_idx + 1);
                let value = cell.map(|c| &c.value).unwrap_or(&CellValue::Empty);
                write_cell(&mut out, &reference, value, style);
            }
            out.push_str("</row>");
        }
        out.push_str("</sheetData>");

        if self.layout.auto_filter && !self.rows.is_empty() {
            out.push_str(&format!(r#"<autoFilter ref="{}"/>"#, self.used_range()));
        }
        out.push_str(
            r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
        );
        out.push_str("</worksheet>");
        out.into_bytes()
    }
}

fn write_cell(out: &mut String, reference: &str, value: &CellValue, style: CellStyle) {
    let style_attr = if style == CellStyle::Plain {
        String::new()
    } else {
        format!(r#" s="{}""#, style.index())
    };
    match value {
        CellValue::Empty => {
            if style != CellStyle::Plain {
                out.push_str(&format!(r#"<c r="{}"{}/>"#, reference, style_attr));
            }
        }
        CellValue::Text(text) => {
            out.push_str(&format!(
                r#"<c r="{}"{} t="inlineStr"><is><t xml:space="preserve">"#,
                reference, style_attr
            ));
            let dropped = escape_text_into(out, text);
            if dropped > 0 {
                warn!(
                    "Dropped {} control character(s) XML cannot store from cell {}",
                    dropped, reference
                );
            }
            out.push_str("</t></is></c>");
        }
        CellValue::Number(n) => {
            out.push_str(&format!(
                r#"<c r="{}"{}><v>{}</v></c>"#,
                reference, style_attr, n
            ));
        }
    }
}

/// Escape `text` for XML 1.0. Control characters XML cannot carry are dropped
/// and the count is returned.
fn escape_text_into(out: &mut String, text: &str) -> usize {
    let mut dropped = 0;
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' => dropped += 1,
            _ => out.push(ch),
        }
    }
    dropped
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_text_into(&mut out, text);
    out
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Worksheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn save(&self, path: &Path) -> Result<(), XlsxError> {
        if self.sheets.is_empty() {
            return Err(XlsxError::Malformed("workbook has no sheets".to_string()));
        }

        let file = File::create(path)?;
        let mut zout = ZipWriter::new(file);
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types().into_bytes()),
            ("_rels/.rels".to_string(), root_rels().into_bytes()),
            ("xl/workbook.xml".to_string(), self.workbook_xml().into_bytes()),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                self.workbook_rels().into_bytes(),
            ),
            ("xl/styles.xml".to_string(), STYLES_XML.as_bytes().to_vec()),
        ];
        for (idx, sheet) in self.sheets.iter().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", idx + 1),
                sheet.to_xml(idx == 0),
            ));
        }

        for (name, data) in parts {
            zout.start_file(name.as_str(), opts)?;
            zout.write_all(&data)?;
        }
        zout.finish()?;
        debug!("Wrote {} sheet(s) to {}", self.sheets.len(), path.display());
        Ok(())
    }

    fn content_types(&self) -> String {
        let mut out = String::from(XML_DECL);
        out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
        out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        out.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
        for idx in 1..=self.sheets.len() {
            out.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                idx
            ));
        }
        out.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
        out.push_str("</Types>");
        out
    }

    fn workbook_xml(&self) -> String {
        let mut out = String::from(XML_DECL);
        out.push_str(&format!(
            r#"<workbook xmlns="{}" xmlns:r="{}"><bookViews><workbookView activeTab="0"/></bookViews><sheets>"#,
            NS_MAIN, NS_REL
        ));
        for (idx, sheet) in self.sheets.iter().enumerate() {
            out.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_attr(&sheet.name),
                idx + 1,
                idx + 1
            ));
        }
        out.push_str("</sheets>");

        let filtered: Vec<(usize, &Worksheet)> = self
            .sheets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.layout.auto_filter && !s.rows.is_empty())
            .collect();
        if !filtered.is_empty() {
            out.push_str("<definedNames>");
            for (idx, sheet) in filtered {
                let range = sheet.used_range().replace(':', ":$");
                out.push_str(&format!(
                    r#"<definedName name="_xlnm._FilterDatabase" localSheetId="{}" hidden="1">'{}'!${}</definedName>"#,
                    idx,
                    escape_attr(&sheet.name.replace('\'', "''")),
                    absolute_range(&range)
                ));
            }
            out.push_str("</definedNames>");
        }
        out.push_str("</workbook>");
        out
    }

    fn workbook_rels(&self) -> String {
        let mut out = String::from(XML_DECL);
        out.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for idx in 1..=self.sheets.len() {
            out.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#,
                n = idx
            ));
        }
        out.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            self.sheets.len() + 1
        ));
        out.push_str("</Relationships>");
        out
    }
}

/// `A1:$G10` → `A$1:$G$10`; the caller prefixes the leading `$`.
fn absolute_range(range: &str) -> String {
    let mut out = String::with_capacity(range.len() + 4);
    let mut prev_alpha = false;
    for ch in range.chars() {
        if ch.is_ascii_digit() && prev_alpha {
            out.push('$');
        }
        prev_alpha = ch.is_ascii_alphabetic();
        out.push(ch);
    }
    out
}

fn root_rels() -> String {
    format!(
        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        XML_DECL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_drops_control_characters() {
        let mut out = String::new();
        let dropped = escape_text_into(&mut out, "a<b>&\"c\u{1}\td\n\u{1f}");
        assert_eq!(out, "a&lt;b&gt;&amp;&quot;c\td\n");
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_absolute_range() {
        assert_eq!(absolute_range("A1:$G10"), "A$1:$G$10");
    }

    #[test]
    fn test_sheet_xml_has_layout_parts() {
        let mut sheet = Worksheet::new("Sheet1").with_layout(SheetLayout::language_table());
        sheet.push_text_row(&["Table", "KEY", "Source", "Target", "Status", "NOTE", "Date"]);
        sheet.push_text_row(&["T", "K1", "", "", "", "", ""]);
        let xml = String::from_utf8(sheet.to_xml(true)).unwrap();
        assert!(xml.contains(r#"state="frozen""#));
        assert!(xml.contains(r#"<autoFilter ref="A1:G2"/>"#));
        assert!(xml.contains(r#"<row r="2" ht="30" customHeight="1">"#));
        assert!(xml.contains(r#"<c r="C2" s="2"/>"#));
        assert!(xml.contains(r#"width="60""#));
    }
}
