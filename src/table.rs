//! Plain-text tables for the command-line explorer.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders `rows` under `headers` with a dashed rule. Columns are padded to
/// their widest cell; `aligns` defaults to left for any column it omits.
pub fn render_table(headers: &[&str], aligns: &[Align], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| clean(cell).chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_line(&mut output, &header_cells, &widths, &[]);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut output, &rule, &widths, &[]);
    for row in rows {
        push_line(&mut output, row, &widths, aligns);
    }
    output
}

pub fn print_table(headers: &[&str], aligns: &[Align], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, aligns, rows));
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize], aligns: &[Align]) {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(|c| clean(c)).unwrap_or_default();
        match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => {
                let _ = write!(line, "{cell:<width$}");
            }
            Align::Right => {
                let _ = write!(line, "{cell:>width$}");
            }
        }
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

/// Control characters would break the layout, so they become spaces.
fn clean(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}
