use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Error;

const BOM: char = '\u{feff}';

/// One field of a raw CSV line: the unescaped value, whether it was opened with a
/// quote, and the exact source text between separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub value: String,
    pub quoted: bool,
    pub raw: String,
}

impl RawField {
    fn new(value: String, quoted: bool, raw: &str) -> Self {
        Self {
            value,
            quoted,
            raw: raw.to_string(),
        }
    }

    /// A bare quote inside an unquoted field, or text after a closing quote.
    pub fn violates_rfc4180(&self) -> bool {
        if self.quoted {
            !self.raw.ends_with('"') || self.raw.len() < 2
        } else {
            self.raw.contains('"')
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    FieldStart,
    InQuoted,
    InUnquoted,
    AfterQuote,
}

/// Split one logical line into fields. `None` when a quoted field is still open
/// at the end of the input.
pub(crate) fn split_raw_fields(line: &str) -> Option<Vec<RawField>> {
    let mut fields = Vec::new();
    let mut value = String::new();
    let mut quoted = false;
    let mut field_start = 0;
    let mut state = ParseState::FieldStart;
    let mut chars = line.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match state {
            ParseState::FieldStart => match ch {
                '"' => {
                    quoted = true;
                    state = ParseState::InQuoted;
                }
                ',' => {
                    fields.push(RawField::new(String::new(), false, ""));
                    field_start = pos + 1;
                }
                _ => {
                    value.push(ch);
                    state = ParseState::InUnquoted;
                }
            },
            ParseState::InQuoted => {
                if ch == '"' {
                    if matches!(chars.peek(), Some((_, '"'))) {
                        value.push('"');
                        chars.next();
                    } else {
                        state = ParseState::AfterQuote;
                    }
                } else {
                    value.push(ch);
                }
            }
            ParseState::InUnquoted | ParseState::AfterQuote => {
                if ch == ',' {
                    fields.push(RawField::new(
                        std::mem::take(&mut value),
                        quoted,
                        &line[field_start..pos],
                    ));
                    quoted = false;
                    field_start = pos + 1;
                    state = ParseState::FieldStart;
                } else {
                    if ch == '"' && state == ParseState::InUnquoted {
                        warn!("RFC 4180 violation: quote inside unquoted field (offset {})", pos);
                    } else if state == ParseState::AfterQuote && !ch.is_whitespace() && !value.ends_with(' ') {
                        warn!("RFC 4180 violation: text after closing quote (offset {})", pos);
                    }
                    value.push(ch);
                }
            }
        }
    }

    match state {
        ParseState::InQuoted => None,
        // a trailing separator leaves one empty field
        ParseState::FieldStart => {
            if line.ends_with(',') {
                fields.push(RawField::new(String::new(), false, ""));
            }
            Some(fields)
        }
        ParseState::InUnquoted | ParseState::AfterQuote => {
            fields.push(RawField::new(value, quoted, &line[field_start..]));
            Some(fields)
        }
    }
}

/// Parse one CSV line, keeping each field's original quoting.
///
/// The line must not contain its terminator. A quoted field left open is
/// `Error::CsvUnterminatedQuote` (line 1).
pub fn parse_csv_line_raw(line: &str) -> Result<Vec<RawField>, Error> {
    split_raw_fields(line).ok_or(Error::CsvUnterminatedQuote { line: 1 })
}

/// Raw shape of a whole CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePattern {
    pub has_bom: bool,
    /// `"\r\n"` or `"\n"`, whichever the file uses first.
    pub line_ending: String,
    pub ends_with_newline: bool,
    /// Header line exactly as written.
    pub header_raw: String,
    pub headers: Vec<String>,
    pub records: Vec<Vec<RawField>>,
}

impl QuotePattern {
    pub fn field(&self, record: usize, column: usize) -> Option<&RawField> {
        self.records.get(record).and_then(|r| r.get(column))
    }

    /// Value of the first column of a record.
    pub fn key_of(&self, record: usize) -> Option<&str> {
        self.field(record, 0).map(|f| f.value.as_str())
    }

    pub fn field_count(&self) -> usize {
        self.records.iter().map(|r| r.len()).sum()
    }
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Analyze a CSV file at the raw-text level.
///
/// Blank lines are skipped. A record whose quoted field spans several physical
/// lines is joined, terminators included, until the quote closes.
pub fn analyze_csv_pattern(path: &Path) -> Result<QuotePattern, Error> {
    if !path.is_file() {
        return Err(Error::CsvFileMissing {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    let (has_bom, content) = match content.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, content.as_str()),
    };
    if content.trim().is_empty() {
        return Err(Error::CsvEmptyFile {
            path: path.to_path_buf(),
        });
    }

    let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let ends_with_newline = content.ends_with('\n');
    let mut lines = content.split_inclusive('\n').enumerate();

    let (header_raw, headers) = match lines.next() {
        Some((_, first)) => {
            let (body, _) = split_terminator(first);
            let fields = split_raw_fields(body).ok_or(Error::CsvUnterminatedQuote { line: 1 })?;
            (body.to_string(), fields.into_iter().map(|f| f.value).collect::<Vec<_>>())
        }
        None => {
            return Err(Error::CsvEmptyFile {
                path: path.to_path_buf(),
            })
        }
    };
    debug!("CSV header of {}: {:?}", path.display(), headers);

    let mut records = Vec::new();
    let mut pending = String::new();
    let mut pending_start = 0;

    for (idx, line) in lines {
        let (body, terminator) = split_terminator(line);
        if pending.is_empty() {
            if body.trim().is_empty() {
                continue;
            }
            pending_start = idx + 1;
            pending.push_str(body);
        } else {
            pending.push_str(body);
        }

        match split_raw_fields(&pending) {
            Some(fields) => {
                if fields.len() != headers.len() {
                    warn!(
                        "Line {} of {} has {} fields, header has {}",
                        pending_start,
                        path.display(),
                        fields.len(),
                        headers.len()
                    );
                }
                records.push(fields);
                pending.clear();
            }
            None => pending.push_str(terminator),
        }
    }
    if !pending.is_empty() {
        return Err(Error::CsvUnterminatedQuote {
            line: pending_start,
        });
    }

    debug!("Parsed {} raw record(s) from {}", records.len(), path.display());
    Ok(QuotePattern {
        has_bom,
        line_ending: line_ending.to_string(),
        ends_with_newline,
        header_raw,
        headers,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(fields: &[RawField]) -> Vec<&str> {
        fields.iter().map(|f| f.value.as_str()).collect()
    }

    #[test]
    fn test_quoted_and_unquoted() {
        let fields = parse_csv_line_raw(r#""field1",field2,"field3""#).unwrap();
        assert_eq!(values(&fields), vec!["field1", "field2", "field3"]);
        assert_eq!(
            fields.iter().map(|f| f.quoted).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(fields[0].raw, r#""field1""#);
        assert_eq!(fields[1].raw, "field2");
    }

    #[test]
    fn test_doubled_quotes_unescape() {
        let line = r#"text,"<span class=""green"">Test</span>""#;
        let fields = parse_csv_line_raw(line).unwrap();
        assert_eq!(fields[1].value, r#"<span class="green">Test</span>"#);
        assert_eq!(fields[1].raw, r#""<span class=""green"">Test</span>""#);
        assert!(!fields[1].violates_rfc4180());
    }

    #[test]
    fn test_empty_fields_and_trailing_separator() {
        let fields = parse_csv_line_raw("a,,\"\",b,").unwrap();
        assert_eq!(values(&fields), vec!["a", "", "", "b", ""]);
        assert_eq!(fields[1].raw, "");
        assert!(!fields[1].quoted);
        assert_eq!(fields[2].raw, "\"\"");
        assert!(fields[2].quoted);
        assert_eq!(fields[4].raw, "");
    }

    #[test]
    fn test_tolerated_violations() {
        let fields = parse_csv_line_raw(r#"say "hi",x"#).unwrap();
        assert_eq!(fields[0].value, r#"say "hi""#);
        assert!(fields[0].violates_rfc4180());

        let fields = parse_csv_line_raw(r#""abc"def,x"#).unwrap();
        assert_eq!(fields[0].value, "abcdef");
        assert_eq!(fields[0].raw, r#""abc"def"#);
        assert!(fields[0].violates_rfc4180());
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(matches!(
            parse_csv_line_raw(r#"a,"open"#),
            Err(Error::CsvUnterminatedQuote { line: 1 })
        ));
    }

    #[test]
    fn test_multibyte_offsets() {
        let fields = parse_csv_line_raw("키,\"값, 쉼표\",끝").unwrap();
        assert_eq!(values(&fields), vec!["키", "값, 쉼표", "끝"]);
        assert_eq!(fields[1].raw, "\"값, 쉼표\"");
    }

    #[test]
    fn test_analyze_multiline_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("original.csv");
        fs::write(
            &path,
            "\u{feff}key-name,ko\r\nk1,\"line one\r\nline two\"\r\n\r\nk2,plain\r\n",
        )
        .unwrap();

        let pattern = analyze_csv_pattern(&path).unwrap();
        assert!(pattern.has_bom);
        assert_eq!(pattern.line_ending, "\r\n");
        assert!(pattern.ends_with_newline);
        assert_eq!(pattern.header_raw, "key-name,ko");
        assert_eq!(pattern.headers, vec!["key-name", "ko"]);
        assert_eq!(pattern.records.len(), 2);
        assert_eq!(pattern.records[0][1].value, "line one\r\nline two");
        assert_eq!(pattern.key_of(1), Some("k2"));
    }

    #[test]
    fn test_analyze_rejects_empty_and_open_quote() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "\u{feff}\n").unwrap();
        assert!(matches!(
            analyze_csv_pattern(&empty),
            Err(Error::CsvEmptyFile { .. })
        ));

        let open = dir.path().join("open.csv");
        fs::write(&open, "k,v\nk1,ok\nk2,\"never closed\n").unwrap();
        assert!(matches!(
            analyze_csv_pattern(&open),
            Err(Error::CsvUnterminatedQuote { line: 3 })
        ));

        assert!(matches!(
            analyze_csv_pattern(&dir.path().join("missing.csv")),
            Err(Error::CsvFileMissing { .. })
        ));
    }
}
