//! Minimal PDF 1.4 writer for the summary document.
//!
//! Text only: one built-in Helvetica font in WinAnsi encoding, A4 pages,
//! lines laid out top to bottom with a new page whenever the current one is
//! full. Characters outside Latin-1 are replaced with `?`.

use std::fmt::Write as _;

use super::DocumentLine;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 30.0;
const LEADING: f32 = 1.4;
/// Rough Helvetica advance width, as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.5;

const TITLE_SIZE: f32 = 18.0;
const ENTRY_SIZE: f32 = 10.0;
const DETAIL_SIZE: f32 = 9.0;

/// Render document lines into a complete PDF file.
pub fn render(lines: &[DocumentLine]) -> Vec<u8> {
    let pages = layout(lines);
    write_document(&pages)
}

/// Split lines into per-page content streams.
fn layout(lines: &[DocumentLine]) -> Vec<Vec<u8>> {
    let mut pages = Vec::new();
    let mut content = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for (i, line) in lines.iter().enumerate() {
        let (text, size, gap_before, centered) = match line {
            DocumentLine::Title(t) => (t, TITLE_SIZE, 0.0, true),
            // A little air between records, like the gap after a paragraph.
            DocumentLine::Entry(t) if i > 1 => (t, ENTRY_SIZE, ENTRY_SIZE * 0.2, false),
            DocumentLine::Entry(t) => (t, ENTRY_SIZE, ENTRY_SIZE * LEADING, false),
            DocumentLine::Detail(t) => (t, DETAIL_SIZE, 0.0, false),
        };

        let advance = gap_before + size * LEADING;
        if y - advance < MARGIN && !content.is_empty() {
            pages.push(std::mem::take(&mut content));
            y = PAGE_HEIGHT - MARGIN;
        }
        y -= advance;

        let x = if centered {
            let width = text.chars().count() as f32 * size * AVG_CHAR_WIDTH;
            ((PAGE_WIDTH - width) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };

        content.extend_from_slice(format!("BT /F1 {size:.1} Tf {x:.2} {y:.2} Td (").as_bytes());
        content.extend_from_slice(&encode_text(text));
        content.extend_from_slice(b") Tj ET\n");
    }

    pages.push(content);
    pages
}

/// Encode text as the body of a PDF literal string in WinAnsi encoding.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            // WinAnsi matches Latin-1 in this range.
            '\u{a0}'..='\u{ff}' => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn write_document(pages: &[Vec<u8>]) -> Vec<u8> {
    // 1: catalog, 2: page tree, 3: font, then a (page, content) pair per page.
    let object_count = 3 + 2 * pages.len();
    let mut out: Vec<u8> = Vec::new();
    let mut offsets = Vec::with_capacity(object_count);

    out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", page_object(i)))
        .collect::<Vec<_>>()
        .join(" ");

    push_object(&mut out, &mut offsets, 1, b"<< /Type /Catalog /Pages 2 0 R >>");
    push_object(
        &mut out,
        &mut offsets,
        2,
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).as_bytes(),
    );
    push_object(
        &mut out,
        &mut offsets,
        3,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );

    for (i, content) in pages.iter().enumerate() {
        let page = page_object(i);
        let contents = page + 1;
        push_object(
            &mut out,
            &mut offsets,
            page,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {contents} 0 R >>"
            )
            .as_bytes(),
        );

        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        push_object(&mut out, &mut offsets, contents, &stream);
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", object_count + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        object_count + 1
    );
    out.extend_from_slice(xref.as_bytes());

    out
}

fn page_object(index: usize) -> usize {
    4 + 2 * index
}

fn push_object(out: &mut Vec<u8>, offsets: &mut Vec<usize>, number: usize, body: &[u8]) {
    debug_assert_eq!(offsets.len() + 1, number, "objects must be written in order");
    offsets.push(out.len());
    out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
}
