//! Minimal PDF 1.4 writer: titled table on A4 pages, Helvetica only.

use super::Table;
use std::fmt::Write as _;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const TITLE_SIZE: f32 = 16.0;
const CELL_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 16.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_RATIO: f32 = 0.5;

pub const EMPTY_PLACEHOLDER: &str = "Empty Database";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' | '\r' | '\t' => out.push(' '),
            c if (' '..='~').contains(&c) => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn fit(text: &str, width: f32, size: f32) -> String {
    let max = ((width - 4.0) / (size * GLYPH_RATIO)).max(1.0) as usize;
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn text_op(out: &mut String, font: &str, size: f32, x: f32, y: f32, text: &str) {
    let _ = writeln!(out, "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET", font, size, x, y, escape(text));
}

fn row_op(out: &mut String, font: &str, cells: &[String], col_width: f32, y: f32) {
    for (i, cell) in cells.iter().enumerate() {
        let x = MARGIN + i as f32 * col_width + 2.0;
        text_op(out, font, CELL_SIZE, x, y, &fit(cell, col_width, CELL_SIZE));
    }
}

/// Content streams, one per page. The header row repeats on every page.
fn layout(title: &str, columns: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let col_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns.len().max(1) as f32;
    let first_row_y = PAGE_HEIGHT - MARGIN - TITLE_SIZE - 2.0 * ROW_HEIGHT;
    let per_page = (((first_row_y - MARGIN) / ROW_HEIGHT) as usize).saturating_sub(1).max(1);

    let chunks: Vec<&[Vec<String>]> = if rows.is_empty() {
        vec![&rows[..0]]
    } else {
        rows.chunks(per_page).collect()
    };

    chunks
        .into_iter()
        .enumerate()
        .map(|(page, chunk)| {
            let mut out = String::new();
            let mut y = first_row_y;
            if page == 0 {
                let title_width = title.chars().count() as f32 * TITLE_SIZE * GLYPH_RATIO;
                let x = ((PAGE_WIDTH - title_width) / 2.0).max(MARGIN);
                text_op(&mut out, "F2", TITLE_SIZE, x, PAGE_HEIGHT - MARGIN - TITLE_SIZE, title);
            } else {
                y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
            }
            row_op(&mut out, "F2", columns, col_width, y);
            let rule_y = y - 4.0;
            let _ = writeln!(out, "0.5 w {:.2} {:.2} m {:.2} {:.2} l S", MARGIN, rule_y, PAGE_WIDTH - MARGIN, rule_y);
            for row in chunk {
                y -= ROW_HEIGHT;
                row_op(&mut out, "F1", row, col_width, y);
            }
            out
        })
        .collect()
}

/// Renders the table; an empty table becomes a one-column placeholder.
pub(crate) fn render(title: &str, table: &Table) -> Vec<u8> {
    let (columns, rows) = if table.rows.is_empty() {
        (vec![EMPTY_PLACEHOLDER.to_string()], Vec::new())
    } else {
        (table.columns.clone(), table.text_rows())
    };
    let pages = layout(title, &columns, &rows);

    // 1 catalog, 2 pages, 3-4 fonts, then a (page, content) pair per page.
    let page_id = |i: usize| 5 + 2 * i;
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", page_id(i))).collect();
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    for (i, content) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id(i) + 1
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
    }

    let mut buf: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = buf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", off);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );
    buf.extend_from_slice(xref.as_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn empty_table_renders_placeholder() {
        let table = Table { columns: vec![], rows: vec![] };
        let out = text(&render("Song", &table));
        assert!(out.starts_with("%PDF-1.4\n"));
        assert!(out.contains("(Empty Database) Tj"));
        assert!(out.contains("(Song) Tj"));
        assert!(out.contains("/Count 1"));
        assert!(out.ends_with("%%EOF\n"));
    }

    #[test]
    fn long_tables_span_pages() {
        let rows = (0..120).map(|i| vec![json!(i)]).collect();
        let table = Table { columns: vec!["n".into()], rows };
        let out = text(&render("Song", &table));
        assert!(out.contains("/Count 3"));
        assert!(out.contains("(119) Tj"));
    }

    #[test]
    fn xref_points_at_objects() {
        let table = Table { columns: vec!["a".into()], rows: vec![vec![json!("x")]] };
        let bytes = render("T", &table);
        let out = text(&bytes);
        let first = out.find("1 0 obj").unwrap();
        assert!(out.contains(&format!("{:010} 00000 n ", first)));
    }

    #[test]
    fn parentheses_are_escaped() {
        assert_eq!(escape("a(b)\\"), "a\\(b\\)\\\\");
        assert_eq!(escape("é"), "?");
    }
}
