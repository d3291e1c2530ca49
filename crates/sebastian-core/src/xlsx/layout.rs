/// Fixed style palette. The discriminant is the `cellXfs` index in `styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain = 0,
    /// Light blue fill, wrapped, vertically centered.
    Header = 1,
    /// Wrapped, vertically centered.
    Data = 2,
    /// Bold white on purple, centered.
    AccentHeader = 3,
    /// Light green fill.
    Restored = 4,
    /// Bold green on green, centered.
    Marked = 5,
    /// Grey on grey, centered.
    Unmarked = 6,
    Centered = 7,
    /// Bold on light blue, centered.
    BoldHeader = 8,
}

impl CellStyle {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Sheet-wide formatting applied at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub column_widths: Vec<f64>,
    pub header_style: CellStyle,
    pub data_style: CellStyle,
    pub data_row_height: Option<f64>,
    pub freeze_header: bool,
    pub auto_filter: bool,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            column_widths: Vec::new(),
            header_style: CellStyle::Plain,
            data_style: CellStyle::Plain,
            data_row_height: None,
            freeze_header: false,
            auto_filter: false,
        }
    }
}

impl SheetLayout {
    /// Standard layout of a per-language `Table | KEY | Source | Target | Status | NOTE | Date` file.
    pub fn language_table() -> Self {
        Self {
            column_widths: vec![25.0, 40.0, 60.0, 60.0, 12.0, 30.0, 20.0],
            header_style: CellStyle::Header,
            data_style: CellStyle::Data,
            data_row_height: Some(30.0),
            freeze_header: true,
            auto_filter: true,
        }
    }

    /// Report sheet with a purple header row.
    pub fn report(column_widths: Vec<f64>) -> Self {
        Self {
            column_widths,
            header_style: CellStyle::AccentHeader,
            data_style: CellStyle::Plain,
            data_row_height: None,
            freeze_header: true,
            auto_filter: false,
        }
    }

    /// Diff sheet: bold header, wrapped data, filterable.
    pub fn diff_table(column_widths: Vec<f64>) -> Self {
        Self {
            column_widths,
            header_style: CellStyle::BoldHeader,
            data_style: CellStyle::Data,
            data_row_height: None,
            freeze_header: true,
            auto_filter: true,
        }
    }
}

pub(crate) const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="5"><font><sz val="11"/><color rgb="FF000000"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><color rgb="FF000000"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><color rgb="FFFFFFFF"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><color rgb="FF006100"/><name val="Calibri"/><family val="2"/></font><font><sz val="11"/><color rgb="FF3C3C3C"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="7"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFDBEEF4"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FF5E35B1"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFD4EDDA"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFC6EFCE"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFE7E6E6"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="9"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="2" fillId="3" borderId="0" xfId="0" applyFont="1" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1" applyAlignment="1"><alignment vertical="center"/></xf><xf numFmtId="0" fontId="3" fillId="5" borderId="0" xfId="0" applyFont="1" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="4" fillId="6" borderId="0" xfId="0" applyFont="1" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;
