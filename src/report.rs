//! PDF practice reports.
//!
//! Each practice starts on a new page. Text is set in Courier so wrapping by
//! character count matches the rendered width; pages overflow onto
//! continuation pages when the free-text fields are long.

use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{validation, ServiceError};
use crate::models::Practice;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const BODY_SIZE: i64 = 11;
const HEADING_SIZE: i64 = 16;
const BODY_LEADING: i64 = 14;
const HEADING_LEADING: i64 = 24;
// Courier advances 0.6 em per glyph: (595 - 2 * 50) / (11 * 0.6).
const CHARS_PER_LINE: usize = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Heading,
    Label,
    Body,
}

impl Style {
    fn font(self) -> &'static str {
        match self {
            Style::Body => "F1",
            Style::Heading | Style::Label => "F2",
        }
    }

    fn size(self) -> i64 {
        match self {
            Style::Heading => HEADING_SIZE,
            _ => BODY_SIZE,
        }
    }

    fn leading(self) -> i64 {
        match self {
            Style::Heading => HEADING_LEADING,
            _ => BODY_LEADING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    style: Style,
    text: String,
}

impl Line {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(Style::Body, "")
    }
}

fn format_date(at: DateTime<chrono::Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn layout_practice(practice: &Practice) -> Vec<Line> {
    let mut lines = vec![Line::new(Style::Heading, "Practice Report"), Line::blank()];
    let details = [
        format!("Practice ID: {}", practice.id),
        format!("Teacher: {}", practice.teacher_name),
        format!("Subject: {}", practice.subject),
        format!("Title: {}", practice.title),
        format!("Date: {}", format_date(practice.upload_date)),
        format!("Number of Pages: {}", practice.num_pages),
    ];
    for detail in details {
        lines.extend(wrap_text(&detail, CHARS_PER_LINE).into_iter().map(|t| Line::new(Style::Label, t)));
    }
    for (label, value) in practice.fields.labelled() {
        lines.push(Line::blank());
        lines.push(Line::new(Style::Label, format!("{label}:")));
        lines.extend(wrap_text(value, CHARS_PER_LINE).into_iter().map(|t| Line::new(Style::Body, t)));
    }
    lines
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                out.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let word_len = word.chars().count();
            if word_len == 0 {
                continue;
            }
            if current_len > 0 && current_len + 1 + word_len > width {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&word);
            current_len += word_len;
        }
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Splits a practice's lines into pages by vertical space.
fn paginate(lines: Vec<Line>) -> Vec<Vec<Line>> {
    let mut pages = Vec::new();
    let mut page = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        let leading = line.style.leading();
        if y - leading < MARGIN && !page.is_empty() {
            pages.push(std::mem::take(&mut page));
            y = PAGE_HEIGHT - MARGIN;
        }
        y -= leading;
        page.push(line);
    }
    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

/// Characters WinAnsiEncoding places in 0x80..=0x9F, where Latin-1 has C1
/// controls.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

/// Encodes text for the standard Type1 fonts, which use WinAnsiEncoding.
/// Unmappable characters become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x00..=0x1F => b' ',
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .find(|(ch, _)| *ch == c)
                .map(|(_, byte)| *byte)
                .unwrap_or(b'?'),
        })
        .collect()
}

fn page_operations(lines: &[Line]) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        y -= line.style.leading();
        if line.text.is_empty() {
            continue;
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![line.style.font().into(), line.style.size().into()],
        ));
        ops.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(&line.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

fn render_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Io(format!("failed to render report: {}", e))
}

/// Renders one page (plus overflow pages) per practice.
pub fn render_practice_report(practices: &[Practice]) -> Result<Vec<u8>, ServiceError> {
    if practices.is_empty() {
        return Err(validation("no practices selected for the report"));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for practice in practices {
        for page in paginate(layout_practice(practice)) {
            let content = Content {
                operations: page_operations(&page),
            };
            let stream = Stream::new(dictionary! {}, content.encode().map_err(render_error)?);
            let content_id = doc.add_object(stream);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(render_error)?;
    Ok(out)
}

/// `practice_report_<timestamp>.pdf`, or `practice_report_<timestamp>_<n>.pdf`
/// for the n-th report generated within the same second.
pub fn report_file_name(at: DateTime<Local>, attempt: u32) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    if attempt <= 1 {
        format!("practice_report_{stamp}.pdf")
    } else {
        format!("practice_report_{stamp}_{attempt}.pdf")
    }
}

const MAX_REPORT_NAME_ATTEMPTS: u32 = 100;

/// Writes the report into `out_dir` under a timestamped name.
pub fn export_practice_report(practices: &[Practice], out_dir: &Path) -> Result<PathBuf, ServiceError> {
    export_practice_report_at(practices, out_dir, Local::now())
}

/// Like `export_practice_report` with a fixed timestamp. Existing reports
/// are never overwritten; a numeric suffix is added instead.
pub fn export_practice_report_at(
    practices: &[Practice],
    out_dir: &Path,
    at: DateTime<Local>,
) -> Result<PathBuf, ServiceError> {
    let bytes = render_practice_report(practices)?;
    for attempt in 1..=MAX_REPORT_NAME_ATTEMPTS {
        let path = out_dir.join(report_file_name(at, attempt));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(write_error(&path, e)),
        };
        if let Err(e) = file.write_all(&bytes).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(write_error(&path, e));
        }
        info!(
            "wrote report for {} practices to {:?}",
            practices.len(),
            path
        );
        return Ok(path);
    }
    Err(ServiceError::Io(format!(
        "no free report name in {} for {}",
        out_dir.to_string_lossy(),
        report_file_name(at, 1)
    )))
}

fn write_error(path: &Path, e: std::io::Error) -> ServiceError {
    ServiceError::Io(format!(
        "failed to write report {}: {}",
        path.to_string_lossy(),
        e
    ))
}
