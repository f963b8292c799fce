//! Single-sheet Office Open XML workbook with inline strings.

use super::Table;
use crate::error::AppError;
use crate::store::text_of;
use serde_json::Value;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Excel sheet names: at most 31 chars, no `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA).
pub(crate) fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn cell(col: usize, row: usize, value: &Value) -> String {
    let reference = format!("{}{}", column_letter(col), row);
    match value {
        Value::Null => String::new(),
        Value::Number(n) => format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n),
        Value::Bool(b) => format!(r#"<c r="{}" t="b"><v>{}</v></c>"#, reference, u8::from(*b)),
        other => format!(
            r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            reference,
            xml_escape(&text_of(other))
        ),
    }
}

fn worksheet(table: &Table) -> String {
    let mut rows = String::new();
    let header: String = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| cell(i, 1, &Value::String(c.clone())))
        .collect();
    if !header.is_empty() {
        rows.push_str(&format!(r#"<row r="1">{}</row>"#, header));
    }
    for (r, values) in table.rows.iter().enumerate() {
        let n = r + 2;
        let cells: String = values.iter().enumerate().map(|(i, v)| cell(i, n, v)).collect();
        rows.push_str(&format!(r#"<row r="{}">{}</row>"#, n, cells));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        rows
    )
}

fn workbook(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        xml_escape(&sheet_name(name))
    )
}

pub(crate) fn render(name: &str, table: &Table) -> Result<Vec<u8>, AppError> {
    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook(name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", worksheet(table)),
    ];
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, contents) in parts {
        zip.start_file(path, options)
            .map_err(|e| AppError::Export(format!("xlsx {}: {}", path, e)))?;
        zip.write_all(contents.as_bytes())
            .map_err(|e| AppError::Export(format!("xlsx {}: {}", path, e)))?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| AppError::Export(format!("xlsx: {}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
    }

    #[test]
    fn workbook_is_a_readable_zip() {
        let table = Table {
            columns: vec!["title".into(), "year".into()],
            rows: vec![vec![json!("A & B"), json!(1999)]],
        };
        let bytes = render("Song", &table).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("[Content_Types].xml").is_ok());

        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains(r#"<c r="A2" t="inlineStr"><is><t xml:space="preserve">A &amp; B</t></is></c>"#));
        assert!(sheet.contains(r#"<c r="B2"><v>1999</v></c>"#));

        let mut book = String::new();
        archive.by_name("xl/workbook.xml").unwrap().read_to_string(&mut book).unwrap();
        assert!(book.contains(r#"<sheet name="Song""#));
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("a/b"), "ab");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }
}
