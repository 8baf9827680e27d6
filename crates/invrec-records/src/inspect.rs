//! Format inspection: a cheap look at the first lines of an uploaded file,
//! used to diagnose files that fail validation.

use serde::Serialize;

use crate::{STOCK_COLUMN_NAMES, STOCK_FIELD_COUNT};

pub const DEFAULT_INSPECT_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInspection {
    /// Non-blank lines looked at.
    pub total_lines: usize,
    /// Indexes (0-based, among inspected lines) of each record type.
    pub e_lines: Vec<usize>,
    pub l_lines: Vec<usize>,
    pub s_lines: Vec<usize>,
    pub columns_per_line: Vec<usize>,
    pub expected_stock_columns: usize,
    pub stock_column_names: Vec<&'static str>,
}

impl FormatInspection {
    /// True when every inspected `S` line has at least the required columns.
    pub fn stock_lines_well_formed(&self) -> bool {
        self.s_lines
            .iter()
            .all(|&i| self.columns_per_line.get(i).copied().unwrap_or(0) >= STOCK_FIELD_COUNT)
    }
}

/// Inspect the first `max_lines` non-blank lines of `src`.
pub fn inspect_str(src: &str, delimiter: char, max_lines: usize) -> FormatInspection {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let lines: Vec<&str> = src
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(max_lines)
        .collect();

    let prefixed = |t: &str| -> Vec<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.split(delimiter).next().map(str::trim) == Some(t))
            .map(|(i, _)| i)
            .collect()
    };

    FormatInspection {
        total_lines: lines.len(),
        e_lines: prefixed("E"),
        l_lines: prefixed("L"),
        s_lines: prefixed("S"),
        columns_per_line: lines.iter().map(|l| l.split(delimiter).count()).collect(),
        expected_stock_columns: STOCK_FIELD_COUNT,
        stock_column_names: STOCK_COLUMN_NAMES.to_vec(),
    }
}
