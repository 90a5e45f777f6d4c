//! Catalog reading and writing.
//!
//! Catalogs are whitespace-delimited text, one record per line. The first two
//! columns are RA and Dec in degrees; any further columns are auxiliary values
//! that ride along untouched and are re-emitted in their original row order.
//!
//! Blank lines and `#` comment lines are skipped. Some upstream tools prepend
//! a fixed number of free-form header lines (the master-catalog writers emit
//! three); [`Catalog::from_file`] can skip those.
//!
//! Output files are written column-aligned in scientific notation. Writes are
//! not atomic: a file left behind by a failed run is not a valid result.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{RemasterError, Result};
use crate::remaster::MatchDeltas;

/// A coordinate catalog held as parallel column arrays.
///
/// `ra`/`dec` are degrees. `aux[i]` holds record `i`'s pass-through columns;
/// every record has the same number of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
    pub aux: Vec<Vec<f64>>,
}

impl Catalog {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// Parse a catalog from an in-memory string.
    ///
    /// `path` is used only for error reporting; `skip_header` raw leading
    /// lines are ignored before parsing begins. Line numbers in errors are
    /// 1-based and count skipped lines.
    pub fn parse(data: &str, path: &str, skip_header: usize) -> Result<Self> {
        let mut catalog = Catalog::default();
        let mut expected_cols: Option<usize> = None;

        for (idx, line) in data.lines().enumerate() {
            let lineno = idx + 1;
            if lineno <= skip_header {
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let malformed = |reason: String| RemasterError::MalformedCatalog {
                path: path.to_string(),
                line: lineno,
                reason,
            };

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(malformed(format!(
                    "expected at least 2 columns, found {}",
                    tokens.len()
                )));
            }
            match expected_cols {
                Some(n) if n != tokens.len() => {
                    return Err(malformed(format!(
                        "expected {n} columns, found {}",
                        tokens.len()
                    )));
                }
                Some(_) => {}
                None => expected_cols = Some(tokens.len()),
            }

            let mut values = Vec::with_capacity(tokens.len());
            for token in &tokens {
                let v: f64 = token
                    .parse()
                    .map_err(|_| malformed(format!("invalid numeric value {token:?}")))?;
                values.push(v);
            }

            catalog.ra.push(values[0]);
            catalog.dec.push(values[1]);
            catalog.aux.push(values[2..].to_vec());
        }

        Ok(catalog)
    }

    /// Read a catalog from a file, skipping `skip_header` leading lines.
    pub fn from_file<P: AsRef<Path>>(path: P, skip_header: usize) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        Self::parse(&data, &path.display().to_string(), skip_header)
    }
}

/// Write the corrected catalog: `ra dec aux...` for every original record.
pub fn write_corrected<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for i in 0..catalog.len() {
        write!(out, "{:>24.15e} {:>24.15e}", catalog.ra[i], catalog.dec[i])?;
        for v in &catalog.aux[i] {
            write!(out, " {:>24.15e}", v)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the per-match delta diagnostics, one row per final-round kept point.
///
/// Columns: `delta_ra delta_dec distance delta_ra delta_dec ra dec`. Columns
/// four and five repeat the first two; the redundancy is kept so the
/// historical seven-column layout stays readable by existing consumers.
pub fn write_deltas<P: AsRef<Path>>(path: P, deltas: &MatchDeltas) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for i in 0..deltas.len() {
        writeln!(
            out,
            "{:>24.15e} {:>24.15e} {:>24.15e} {:>24.15e} {:>24.15e} {:>24.15e} {:>24.15e}",
            deltas.delta_ra[i],
            deltas.delta_dec[i],
            deltas.distance[i],
            deltas.delta_ra[i],
            deltas.delta_dec[i],
            deltas.ra[i],
            deltas.dec[i],
        )?;
    }
    out.flush()?;
    Ok(())
}
