use super::rules::TableCapture;
use super::token::{Align, Token};

fn strip_edge_pipe(row: &str) -> &str {
    let row = row.trim_end_matches(' ');
    row.strip_suffix('|').unwrap_or(row).trim_end_matches(' ')
}

fn split_cells(row: &str) -> Vec<String> {
    row.split('|')
        .map(|cell| cell.trim_matches(' ').to_string())
        .collect()
}

/// Builds a table token from a captured table.
///
/// `leading_pipe` tables also carry a pipe at the start of every body row,
/// which is stripped before splitting.
pub(super) fn build(capture: &TableCapture<'_>, leading_pipe: bool) -> Token {
    let header = split_cells(strip_edge_pipe(capture.header.trim_start_matches(' ')));

    let align = split_cells(strip_edge_pipe(capture.divider.trim_start_matches(' ')))
        .iter()
        .map(|cell| Align::from_divider(cell))
        .collect();

    let body = capture.body.strip_suffix('\n').unwrap_or(capture.body);
    let cells = body
        .split('\n')
        .filter(|row| !row.trim().is_empty())
        .map(|row| {
            let row = row.trim_start_matches(' ');
            let row = if leading_pipe {
                row.strip_prefix('|').unwrap_or(row)
            } else {
                row
            };
            split_cells(strip_edge_pipe(row))
        })
        .collect();

    Token::Table {
        header,
        align,
        cells,
    }
}
