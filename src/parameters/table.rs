//! Plain-text table rendering for parameter summaries

fn cell(row: &[String], j: usize) -> &str {
    row.get(j).map(String::as_str).unwrap_or("")
}

fn format_line(cells: &[&str], widths: &[usize], numeric: &[bool]) -> String {
    let parts: Vec<String> = cells
        .iter()
        .zip(widths.iter().zip(numeric))
        .map(|(text, (&width, &right))| {
            if right {
                format!("{:>width$}", text, width = width)
            } else {
                format!("{:<width$}", text, width = width)
            }
        })
        .collect();
    parts.join("  ").trim_end().to_string()
}

/// Render `rows` under `headers` as a simple aligned text table
///
/// Columns are separated by two spaces and underlined with dashes. A column
/// whose cells all parse as numbers is right-aligned, any other column is
/// left-aligned. Rows shorter than the header are padded with empty cells.
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let ncols = headers.len();

    let widths: Vec<usize> = (0..ncols)
        .map(|j| {
            rows.iter()
                .map(|row| cell(row, j).chars().count())
                .fold(headers[j].chars().count(), usize::max)
        })
        .collect();

    let numeric: Vec<bool> = (0..ncols)
        .map(|j| !rows.is_empty() && rows.iter().all(|row| cell(row, j).parse::<f64>().is_ok()))
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(headers, &widths, &numeric));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        let cells: Vec<&str> = (0..ncols).map(|j| cell(row, j)).collect();
        lines.push(format_line(&cells, &widths, &numeric));
    }
    lines.join("\n")
}
