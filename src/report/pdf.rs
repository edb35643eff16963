// PDF export of the course table: landscape A4, a title block on the first
// page and a striped grid with fixed column widths that continues over as
// many pages as needed, repeating the header row on each. Cell text that is
// wider than its column wraps onto extra lines and the row grows to match.

use chrono::{DateTime, Local};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};
use std::fs::File;
use std::io::BufWriter;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::courses::CourseRecord;
use crate::error::ExportError;

use super::{course_row, COLUMNS};

const MM_PER_INCH: f32 = 25.4;
const MM_PER_PT: f32 = 0.3528;

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN_X: f32 = 0.5 * MM_PER_INCH;
const MARGIN_Y: f32 = 0.75 * MM_PER_INCH;

/// Column widths in inches, `COLUMNS` order.
const COLUMN_INCHES: [f32; 9] = [1.0, 0.7, 1.4, 0.8, 0.7, 0.8, 1.4, 1.2, 0.9];
/// Capacity, Taken and Available are centred.
const CENTERED: Range<usize> = 3..6;

const HEADER_HEIGHT: f32 = 10.0;
const ROW_HEIGHT: f32 = 7.0;
/// Extra height per additional wrapped line in a body row.
const LINE_HEIGHT: f32 = 3.6;
const CELL_PADDING: f32 = 2.0;
const HEADER_FONT_SIZE: f32 = 9.0;
const BODY_FONT_SIZE: f32 = 8.0;
/// Space the title block takes on the first page.
const TITLE_BLOCK_HEIGHT: f32 = 36.0;

pub const REPORT_TITLE: &str = "EWU Course Schedule";

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn column_widths() -> [f32; 9] {
    COLUMN_INCHES.map(|w| w * MM_PER_INCH)
}

fn table_left() -> f32 {
    let total: f32 = column_widths().iter().sum();
    (PAGE_WIDTH - total) / 2.0
}

/// Helvetica advance widths for printable ASCII (32..=126), in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

fn glyph_width(c: char) -> f32 {
    let units = match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - 32],
        _ => 556,
    };
    units as f32 / 1000.0
}

/// Advance width of `text` in mm, from the Helvetica metrics. The bold
/// header is measured with the same table.
fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * font_size * MM_PER_PT
}

/// Break `text` into lines that fit a cell `width` mm wide. Lines break at
/// spaces; a single word wider than the cell is split between characters.
/// No text is dropped.
fn wrap_text(text: &str, width: f32, font_size: f32) -> Vec<String> {
    let room = width - 2.0 * CELL_PADDING;
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if current.is_empty() || text_width(&candidate, font_size) <= room {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);

    lines
        .into_iter()
        .flat_map(|line| split_wide_word(line, room, font_size))
        .collect()
}

fn split_wide_word(line: String, room: f32, font_size: f32) -> Vec<String> {
    if text_width(&line, font_size) <= room {
        return vec![line];
    }
    let mut parts = Vec::new();
    let mut part = String::new();
    let mut used = 0.0;
    for c in line.chars() {
        let w = glyph_width(c) * font_size * MM_PER_PT;
        if !part.is_empty() && used + w > room {
            parts.push(std::mem::take(&mut part));
            used = 0.0;
        }
        part.push(c);
        used += w;
    }
    parts.push(part);
    parts
}

/// A body row broken into per-cell lines, with the height it needs.
struct RowLayout {
    cells: [Vec<String>; 9],
    height: f32,
}

fn layout_row(row: &[String; 9]) -> RowLayout {
    let widths = column_widths();
    let cells: [Vec<String>; 9] =
        std::array::from_fn(|i| wrap_text(&row[i], widths[i], BODY_FONT_SIZE));
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    RowLayout {
        height: ROW_HEIGHT + (lines - 1) as f32 * LINE_HEIGHT,
        cells,
    }
}

/// Split body rows of the given heights into per-page ranges. The first
/// page has less room because of the title block. Every page takes at
/// least one row.
pub fn paginate(heights: &[f32]) -> Vec<Range<usize>> {
    let usable = PAGE_HEIGHT - 2.0 * MARGIN_Y - HEADER_HEIGHT;
    let mut room = usable - TITLE_BLOCK_HEIGHT;

    let mut pages = Vec::new();
    let mut start = 0;
    let mut filled = 0.0;
    for (i, height) in heights.iter().enumerate() {
        if i > start && filled + height > room {
            pages.push(start..i);
            start = i;
            filled = 0.0;
            room = usable;
        }
        filled += height;
    }
    pages.push(start..heights.len());
    pages
}

/// Default output name, e.g. `EWU_Courses_2025-01-31_14-05-09.pdf`.
pub fn default_filename(at: &DateTime<Local>) -> String {
    format!("EWU_Courses_{}.pdf", at.format("%Y-%m-%d_%H-%M-%S"))
}

fn with_pdf_extension(name: &str) -> String {
    if name.ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes course tables into a fixed output directory.
pub struct PdfExporter {
    output_dir: PathBuf,
}

impl PdfExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        PdfExporter {
            output_dir: output_dir.into(),
        }
    }

    /// Write the report and return its absolute path. Without `filename` a
    /// timestamped name is used.
    pub fn export(
        &self,
        records: &[CourseRecord],
        student_id: &str,
        filename: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let now = Local::now();
        let name = match filename {
            Some(name) => with_pdf_extension(name),
            None => default_filename(&now),
        };
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);

        self.write(&path, records, student_id, &now)?;
        log::info!("wrote {} course rows to {}", records.len(), path.display());
        Ok(std::fs::canonicalize(&path)?)
    }

    fn write(
        &self,
        path: &Path,
        records: &[CourseRecord],
        student_id: &str,
        generated: &DateTime<Local>,
    ) -> Result<(), ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| ExportError::Pdf(e.to_string()))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| ExportError::Pdf(e.to_string()))?,
        };

        let rows: Vec<RowLayout> = records.iter().map(|r| layout_row(&course_row(r))).collect();
        let heights: Vec<f32> = rows.iter().map(|r| r.height).collect();
        let pages = paginate(&heights);

        let first = doc.get_page(page).get_layer(layer);
        let top = PAGE_HEIGHT - MARGIN_Y;
        draw_title_block(&first, &fonts, student_id, generated, top);
        draw_table(&first, &fonts, &rows[pages[0].clone()], top - TITLE_BLOCK_HEIGHT);

        for range in pages.iter().skip(1) {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            let current = doc.get_page(page).get_layer(layer);
            draw_table(&current, &fonts, &rows[range.clone()], top);
        }

        let mut out = BufWriter::new(File::create(path)?);
        doc.save(&mut out)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok(())
    }
}

fn draw_title_block(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    student_id: &str,
    generated: &DateTime<Local>,
    top: f32,
) {
    let title_size = 24.0;
    let title_x = (PAGE_WIDTH - text_width(REPORT_TITLE, title_size)) / 2.0;
    layer.set_fill_color(rgb(0x3B, 0x82, 0xF6));
    layer.use_text(REPORT_TITLE, title_size, Mm(title_x), Mm(top - 9.0), &fonts.bold);

    layer.set_fill_color(rgb(0x6B, 0x72, 0x80));
    let left = table_left();
    layer.use_text(
        format!("Student ID: {student_id}"),
        11.0,
        Mm(left),
        Mm(top - 22.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Generated: {}", generated.format("%b %d, %Y %I:%M %p")),
        11.0,
        Mm(left),
        Mm(top - 28.0),
        &fonts.regular,
    );
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32, color: Color) {
    layer.set_fill_color(color);
    layer.add_rect(Rect::new(Mm(x), Mm(y), Mm(x + w), Mm(y + h)).with_mode(PaintMode::Fill));
}

fn stroke(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}

/// Draw one row of cells, one `Vec` of lines per column. The first line
/// of every cell sits on `baseline`.
fn draw_cells(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    font_size: f32,
    cells: &[Vec<String>],
    baseline: f32,
    center_all: bool,
) {
    let mut x = table_left();
    for (i, (lines, width)) in cells.iter().zip(column_widths()).enumerate() {
        for (n, line) in lines.iter().enumerate() {
            let text_x = if center_all || CENTERED.contains(&i) {
                x + (width - text_width(line, font_size)) / 2.0
            } else {
                x + CELL_PADDING
            };
            let y = baseline - n as f32 * LINE_HEIGHT;
            layer.use_text(line.as_str(), font_size, Mm(text_x), Mm(y), font);
        }
        x += width;
    }
}

/// Draw the header row and `rows` below it, starting at `top`.
fn draw_table(layer: &PdfLayerReference, fonts: &Fonts, rows: &[RowLayout], top: f32) {
    let widths = column_widths();
    let left = table_left();
    let total_width: f32 = widths.iter().sum();

    let header_bottom = top - HEADER_HEIGHT;
    fill_rect(layer, left, header_bottom, total_width, HEADER_HEIGHT, rgb(0x3B, 0x82, 0xF6));
    layer.set_fill_color(rgb(0xF5, 0xF5, 0xF5));
    let header: Vec<Vec<String>> = COLUMNS.iter().map(|c| vec![c.to_string()]).collect();
    draw_cells(
        layer,
        &fonts.bold,
        HEADER_FONT_SIZE,
        &header,
        header_bottom + 3.5,
        true,
    );

    let mut rules = vec![header_bottom];
    let mut row_top = header_bottom;
    for (i, row) in rows.iter().enumerate() {
        let row_bottom = row_top - row.height;
        let stripe = if i % 2 == 0 {
            rgb(0xFF, 0xFF, 0xFF)
        } else {
            rgb(0xF5, 0xF7, 0xFA)
        };
        fill_rect(layer, left, row_bottom, total_width, row.height, stripe);
        layer.set_fill_color(rgb(0, 0, 0));
        let baseline = row_top - (ROW_HEIGHT - 2.4);
        draw_cells(layer, &fonts.regular, BODY_FONT_SIZE, &row.cells, baseline, false);
        rules.push(row_bottom);
        row_top = row_bottom;
    }

    let bottom = row_top;
    layer.set_outline_color(rgb(0x80, 0x80, 0x80));
    layer.set_outline_thickness(0.5);
    stroke(layer, (left, top), (left + total_width, top));
    for y in rules {
        stroke(layer, (left, y), (left + total_width, y));
    }
    let mut x = left;
    stroke(layer, (x, top), (x, bottom));
    for width in widths {
        x += width;
        stroke(layer, (x, top), (x, bottom));
    }

    // heavier rule under the header
    layer.set_outline_color(rgb(0x3B, 0x82, 0xF6));
    layer.set_outline_thickness(2.0);
    stroke(layer, (left, header_bottom), (left + total_width, header_bottom));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn records(n: usize) -> Vec<CourseRecord> {
        (0..n)
            .map(|i| CourseRecord {
                course_code: format!("CSE{:03}", 100 + i),
                section_name: "1".into(),
                short_name: "ABC".into(),
                seat_capacity: 40,
                seat_taken: 41,
                time_slot_name: "MW 10:00-11:30".into(),
                room_name: "AB3-301".into(),
            })
            .collect()
    }

    #[test]
    fn test_paginate_covers_every_row_once() {
        for n in [0, 1, 17, 18, 40, 123] {
            let pages = paginate(&vec![ROW_HEIGHT; n]);
            assert!(!pages.is_empty());
            assert_eq!(pages[0].start, 0);
            for pair in pages.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
                assert!(!pair[0].is_empty());
            }
            assert_eq!(pages.last().unwrap().end, n);
        }
    }

    #[test]
    fn test_first_page_holds_fewer_rows() {
        let pages = paginate(&vec![ROW_HEIGHT; 500]);
        assert!(pages[0].len() < pages[1].len());
    }

    #[test]
    fn test_taller_rows_fit_fewer_per_page() {
        let short = paginate(&vec![ROW_HEIGHT; 100]);
        let tall = paginate(&vec![ROW_HEIGHT + LINE_HEIGHT; 100]);
        assert!(tall[1].len() < short[1].len());
    }

    #[test]
    fn test_day_column_keeps_full_text() {
        let mut rec = records(1).remove(0);
        rec.time_slot_name = "STR 08:00-09:30".into();
        let row = course_row(&rec);
        assert_eq!(row[6], "SUNDAY, TUESDAY, THURSDAY");

        let layout = layout_row(&row);
        assert_eq!(layout.cells[6].join(" "), row[6]);
        assert!(layout.cells[6].len() > 1);
        assert!(layout.height > ROW_HEIGHT);

        let room = column_widths()[6] - 2.0 * CELL_PADDING;
        for line in &layout.cells[6] {
            assert!(text_width(line, BODY_FONT_SIZE) <= room);
        }
    }

    #[test]
    fn test_wrap_splits_a_word_wider_than_the_cell() {
        let width = column_widths()[1];
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let lines = wrap_text(text, width, BODY_FONT_SIZE);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), text);
        for line in &lines {
            assert!(text_width(line, BODY_FONT_SIZE) <= width - 2.0 * CELL_PADDING);
        }
        assert_eq!(wrap_text("1", width, BODY_FONT_SIZE), vec!["1"]);
        assert_eq!(wrap_text("", width, BODY_FONT_SIZE), vec![""]);
    }

    #[test]
    fn test_uppercase_measures_wider_than_lowercase() {
        assert!(text_width("MONDAY", 10.0) > text_width("monday", 10.0));
        // wider than a flat 0.6 em per character
        assert!(text_width("MONDAY", 10.0) > 6.0 * 10.0 * 0.6 * MM_PER_PT);
        assert!(text_width("iii", 10.0) < text_width("WWW", 10.0));
    }

    #[test]
    fn test_default_filename() {
        let at = Local.with_ymd_and_hms(2025, 1, 31, 14, 5, 9).unwrap();
        assert_eq!(default_filename(&at), "EWU_Courses_2025-01-31_14-05-09.pdf");
    }

    #[test]
    fn test_extension_added_once() {
        assert_eq!(with_pdf_extension("routine"), "routine.pdf");
        assert_eq!(with_pdf_extension("routine.pdf"), "routine.pdf");
    }

    #[test]
    fn test_export_writes_pdf_with_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("output");
        let exporter = PdfExporter::new(&out_dir);

        let path = exporter
            .export(&records(60), "2021-1-60-001", Some("routine"))
            .unwrap();

        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), "routine.pdf");
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = PdfExporter::new(dir.path())
            .export(&records(1), "2021-1-60-001", None)
            .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("EWU_Courses_"));
        assert!(name.ends_with(".pdf"));
    }
}
