// Plain-text box table for the terminal.

use crate::courses::CourseRecord;

use super::{course_row, ReportSummary, COLUMNS};

/// Box drawing characters used by the table.
enum TabChar {
    /// Vertical bar
    Bv,
    /// Horizontal bar
    Bh,
    Jl,
    Jr,
    Jbl,
    Jbr,
    Jtl,
    Jtr,
    Jtt,
    Jtb,
    Jm,
}

impl TabChar {
    fn val(&self) -> char {
        match *self {
            Self::Bv => '│',
            Self::Bh => '─',
            Self::Jl => '├',
            Self::Jr => '┤',
            Self::Jbl => '└',
            Self::Jbr => '┘',
            Self::Jtl => '┌',
            Self::Jtr => '┐',
            Self::Jtt => '┴',
            Self::Jtb => '┬',
            Self::Jm => '┼',
        }
    }
}

enum Position {
    Top,
    Middle,
    Bottom,
}

fn rule(widths: &[usize], pos: Position) -> String {
    let (left, joint, right) = match pos {
        Position::Top => (TabChar::Jtl, TabChar::Jtb, TabChar::Jtr),
        Position::Middle => (TabChar::Jl, TabChar::Jm, TabChar::Jr),
        Position::Bottom => (TabChar::Jbl, TabChar::Jtt, TabChar::Jbr),
    };
    let segments: Vec<String> = widths
        .iter()
        .map(|w| TabChar::Bh.val().to_string().repeat(w + 2))
        .collect();
    format!(
        "{}{}{}",
        left.val(),
        segments.join(&joint.val().to_string()),
        right.val()
    )
}

fn line<S: AsRef<str>>(widths: &[usize], cells: &[S]) -> String {
    let bar = TabChar::Bv.val();
    let mut out = String::new();
    out.push(bar);
    for (cell, width) in cells.iter().zip(widths) {
        let cell = cell.as_ref();
        let pad = width.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(pad + 1));
        out.push(bar);
    }
    out
}

/// Render all records under the column headers, one row per record, in
/// the order given.
pub fn render_course_table(records: &[CourseRecord]) -> String {
    let rows: Vec<[String; 9]> = records.iter().map(course_row).collect();
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(rule(&widths, Position::Top));
    out.push(line(&widths, &COLUMNS));
    out.push(rule(&widths, Position::Middle));
    for row in &rows {
        out.push(line(&widths, row));
    }
    out.push(rule(&widths, Position::Bottom));
    out.join("\n")
}

/// Two-column label/value block for the summary.
pub fn render_summary(summary: &ReportSummary) -> String {
    let rows = summary.rows();
    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(label, value)| format!("  {label:<label_width$}  {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
