//! Matrix Market coordinate codec
//!
//! ```text
//! %%MatrixMarket matrix coordinate integer general
//! <rows> <cols> <nnz>
//! <row> <col> <count>      (1-indexed, row-major)
//! ```

use super::CooMatrix;
use crate::errors::{FeatureError, Result};
use std::io::{BufRead, Write};

pub const HEADER: &str = "%%MatrixMarket matrix coordinate integer general";

pub fn write_matrix_market<W: Write>(out: &mut W, matrix: &CooMatrix) -> std::io::Result<()> {
    writeln!(out, "{}", HEADER)?;
    writeln!(out, "{} {} {}", matrix.rows, matrix.cols, matrix.nnz())?;
    for &(r, c, count) in &matrix.entries {
        writeln!(out, "{} {} {}", r + 1, c + 1, count)?;
    }
    Ok(())
}

pub fn read_matrix_market<R: BufRead>(input: R) -> Result<CooMatrix> {
    let mut lines = input.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| FeatureError::parse("empty Matrix Market file"))?;
    if !header.trim().eq_ignore_ascii_case(HEADER) {
        return Err(FeatureError::parse(format!("unsupported header '{}'", header)));
    }

    let mut size_line = None;
    for line in lines.by_ref() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        size_line = Some(line);
        break;
    }
    let size_line = size_line.ok_or_else(|| FeatureError::parse("missing size line"))?;
    let [rows, cols, nnz] = parse_triple(&size_line)?;
    let rows = usize::try_from(rows).map_err(|_| FeatureError::parse(format!("row count {} too large", rows)))?;
    let cols = usize::try_from(cols).map_err(|_| FeatureError::parse(format!("column count {} too large", cols)))?;
    if let Some(cells) = (rows as u64).checked_mul(cols as u64) {
        if nnz > cells {
            return Err(FeatureError::parse(format!(
                "size line declares {} entries for a {}x{} matrix",
                nnz, rows, cols
            )));
        }
    }

    // grows with the entries actually present, never with the declared count
    let mut entries = Vec::new();
    for line in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let [r, c, count] = parse_triple(trimmed)?;
        if r == 0 || c == 0 || r as usize > rows || c as usize > cols {
            return Err(FeatureError::parse(format!(
                "entry ({}, {}) outside {}x{}",
                r, c, rows, cols
            )));
        }
        entries.push((r as usize - 1, c as usize - 1, count));
    }

    if entries.len() as u64 != nnz {
        return Err(FeatureError::parse(format!(
            "size line declares {} entries, found {}",
            nnz,
            entries.len()
        )));
    }
    entries.sort_unstable();

    Ok(CooMatrix { rows, cols, entries })
}

fn parse_triple(line: &str) -> Result<[u64; 3]> {
    let fields: Vec<u64> = line
        .split_whitespace()
        .map(|f| {
            f.parse::<u64>()
                .map_err(|e| FeatureError::parse(format!("bad field '{}': {}", f, e)))
        })
        .collect::<Result<_>>()?;
    match fields.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(FeatureError::parse(format!("expected 3 fields in '{}'", line))),
    }
}
