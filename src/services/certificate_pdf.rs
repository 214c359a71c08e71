//! Single-page certificate rendered as a bare PDF 1.4 document using the
//! built-in Helvetica fonts, so no font files or layout engine are needed.

use crate::core::config::CertificateSettings;
use crate::core::time::format_primitive;
use crate::repositories::certificates::CertificateView;

const PAGE_WIDTH: i32 = 842;
const PAGE_HEIGHT: i32 = 595;

struct TextLine {
    font: &'static str,
    size: i32,
    y: i32,
    text: String,
}

pub(crate) fn render(view: &CertificateView, settings: &CertificateSettings) -> Vec<u8> {
    let issued = format_primitive(view.issued_at);
    let issued_date = issued.split('T').next().unwrap_or(&issued).to_string();
    let lines = vec![
        TextLine { font: "F2", size: 34, y: 470, text: "Certificate of Completion".to_string() },
        TextLine { font: "F1", size: 16, y: 410, text: "This certifies that".to_string() },
        TextLine { font: "F2", size: 28, y: 365, text: view.learner_name.clone() },
        TextLine { font: "F1", size: 16, y: 320, text: "has successfully completed".to_string() },
        TextLine { font: "F2", size: 22, y: 280, text: view.course_title.clone() },
        TextLine { font: "F1", size: 13, y: 215, text: format!("Issued on {issued_date}") },
        TextLine { font: "F1", size: 13, y: 195, text: settings.issuer_name.clone() },
        TextLine { font: "F1", size: 10, y: 120, text: format!("Certificate ID: {}", view.id) },
        TextLine { font: "F1", size: 8, y: 104, text: format!("Fingerprint: {}", view.fingerprint) },
        TextLine {
            font: "F1",
            size: 10,
            y: 88,
            text: format!("Verify at {}/{}", settings.verify_base_url.trim_end_matches('/'), view.id),
        },
    ];

    let content = content_stream(&lines);
    let objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
    ];

    assemble(&objects)
}

fn content_stream(lines: &[TextLine]) -> String {
    let mut out = String::new();
    // Frame around the page.
    out.push_str("0.2 0.3 0.5 RG 3 w 30 30 782 535 re S\n");
    for line in lines {
        let text = escape_text(&line.text);
        let x = centered_x(&line.text, line.size);
        out.push_str(&format!(
            "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
            line.font, line.size, x, line.y, text
        ));
    }
    out.trim_end().to_string()
}

/// Rough centering using an average Helvetica glyph width of half an em.
fn centered_x(text: &str, size: i32) -> i32 {
    let width = text.chars().count() as i32 * size / 2;
    ((PAGE_WIDTH - width) / 2).max(40)
}

/// PDF literal strings in WinAnsiEncoding. Latin-1 letters are written as
/// octal escapes; characters outside Latin-1 have no glyph and become `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", ch as u32)),
            _ => out.push('?'),
        }
    }
    out
}

fn assemble(objects: &[String]) -> Vec<u8> {
    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());

    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", index + 1));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));

    out.into_bytes()
}
