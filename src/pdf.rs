//! Minimal single-page PDF writer backing the /pdf command. Document
//! generation is always local; the only degradation is character
//! replacement when the text cannot be represented in Latin-1.

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const FONT_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 16.0;
const MAX_CHARS_PER_LINE: usize = 88;

/// Renders the given text as a one-page A4 PDF document.
pub fn render_document(title: &str, body: &str) -> Vec<u8> {
    let mut content = String::new();
    content.push_str("BT\n/F1 16 Tf\n");
    content.push_str(&format!(
        "{} {} Td\n({}) Tj\n",
        MARGIN,
        PAGE_HEIGHT - MARGIN,
        escape_pdf_string(title)
    ));
    content.push_str(&format!("/F1 {FONT_SIZE} Tf\n0 -30 Td\n"));

    let mut used_lines = 0usize;
    let max_lines = ((PAGE_HEIGHT - 2.0 * MARGIN - 30.0) / LINE_HEIGHT) as usize;
    for line in wrap_lines(body) {
        if used_lines >= max_lines {
            break;
        }
        content.push_str(&format!(
            "({}) Tj\n0 -{LINE_HEIGHT} Td\n",
            escape_pdf_string(&line)
        ));
        used_lines += 1;
    }
    content.push_str("ET\n");
    let stream = to_latin1(&content);

    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>\nendobj\n"
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(
        b"4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
          /Encoding /WinAnsiEncoding >>\nendobj\n",
    );

    offsets.push(out.len());
    out.extend_from_slice(format!("5 0 obj\n<< /Length {} >>\nstream\n", stream.len()).as_bytes());
    out.extend_from_slice(&stream);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );

    out
}

fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > MAX_CHARS_PER_LINE
            {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Latin-1 with replacement: anything outside U+0000..U+00FF becomes '?'.
fn to_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_produces_valid_envelope() {
        let bytes = render_document("Document", "Bonjour tout le monde");
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Bonjour tout le monde"));
        assert!(text.contains("/Helvetica"));
    }

    #[test]
    fn test_non_latin1_replaced() {
        let bytes = render_document("Doc", "emoji 🚀 et chinois 中文");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("emoji ? et chinois ??"));
    }

    #[test]
    fn test_accented_text_preserved() {
        assert_eq!(to_latin1("été à l'hôtel"), "été à l'hôtel".chars().map(|c| c as u8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_wrap_lines_respects_limit() {
        let long = "mot ".repeat(100);
        for line in wrap_lines(&long) {
            assert!(line.chars().count() <= MAX_CHARS_PER_LINE);
        }
    }

    #[test]
    fn test_escape_parentheses() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
    }
}
