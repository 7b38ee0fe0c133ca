//! XFLR5 polar text parser.
//!
//! Turns a loosely structured polar export into a [`ParsedPolar`]. Content
//! problems never produce an error: a file without a readable table parses to
//! an empty polar and the caller decides to skip it.
//!
//! The table is located by its column header (the first line mentioning both
//! `alpha` and `CL`). Data starts [`Constants::data_offset`] lines below it and
//! runs to the first blank line. Files without such a header go through a
//! generic whitespace-delimited reader instead.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::constants::Constants;
use crate::errors::{CalcError, CalcResult};
use crate::polar::{ParsedPolar, PolarRow};

const NAME_MARKER: &str = "Calculated polar for:";

/// Number of positional columns a row is built from (alpha, CL, CD, CDp, Cm).
pub const ROW_COLUMNS: usize = 5;

/// Read a polar file from disk and parse it.
///
/// Only I/O failures are errors. Invalid UTF-8 sequences are dropped.
pub fn parse_polar_file(path: &Path, constants: &Constants) -> CalcResult<ParsedPolar> {
    let bytes = std::fs::read(path).map_err(|e| CalcError::file_error("read", path, e))?;
    let text = decode_lossy(&bytes);
    Ok(parse_polar_text(&text, path, constants))
}

/// Read and parse a polar file, degrading an unreadable file to an empty polar.
///
/// Used wherever one bad file must not abort work on a whole directory.
pub fn parse_polar_file_or_empty(path: &Path, constants: &Constants) -> ParsedPolar {
    parse_polar_file(path, constants).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "unreadable polar file");
        ParsedPolar::new(path, file_stem(path), None, Vec::new())
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse polar text. `path` supplies the fallback name and Reynolds tag.
pub fn parse_polar_text(text: &str, path: &Path, constants: &Constants) -> ParsedPolar {
    let stem = file_stem(path);

    let name = profile_name(text).unwrap_or_else(|| stem.clone());
    let reynolds = reynolds_number(text, &stem, constants);

    let lines: Vec<&str> = text.lines().collect();
    let mut rows = match find_header_line(&lines) {
        Some(idx) => read_data_block(&lines, idx, constants),
        None => Vec::new(),
    };
    let reader = if rows.is_empty() {
        rows = read_fallback_table(text);
        "fallback"
    } else {
        "header"
    };

    debug!(
        path = %path.display(),
        name = %name,
        rows = rows.len(),
        reader,
        "parsed polar"
    );
    ParsedPolar::new(path, name, reynolds, rows)
}

/// Decode bytes as UTF-8, dropping invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Best-effort numeric coercion of one token.
#[inline]
pub fn coerce_token(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}

/// Profile name from a `Calculated polar for: <name>` header line.
pub fn profile_name(text: &str) -> Option<String> {
    let start = text.find(NAME_MARKER)? + NAME_MARKER.len();
    let rest = &text[start..];
    let line = rest.split(['\n', '\r']).next().unwrap_or("");
    let name = line.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Where a Reynolds number can be recovered from, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReynoldsSource {
    /// `Re = 0.688 e 6` in the header
    HeaderEquation,
    /// `Re0.688` anywhere in the text
    CompactTagInText,
    /// `Re0.688` in the file name
    CompactTagInFileName,
}

/// Attempt order for [`reynolds_number`].
pub const REYNOLDS_CHAIN: [ReynoldsSource; 3] = [
    ReynoldsSource::HeaderEquation,
    ReynoldsSource::CompactTagInText,
    ReynoldsSource::CompactTagInFileName,
];

impl ReynoldsSource {
    /// Run this attempt. Never panics; a partial match is a miss.
    pub fn attempt(&self, text: &str, stem: &str, constants: &Constants) -> Option<f64> {
        match self {
            ReynoldsSource::HeaderEquation => header_equation(text),
            ReynoldsSource::CompactTagInText => {
                compact_tag(text).map(|v| constants.expand_compact_re(v))
            }
            ReynoldsSource::CompactTagInFileName => {
                compact_tag(stem).map(|v| constants.expand_compact_re(v))
            }
        }
    }
}

/// First Reynolds number produced by [`REYNOLDS_CHAIN`].
pub fn reynolds_number(text: &str, stem: &str, constants: &Constants) -> Option<f64> {
    REYNOLDS_CHAIN
        .iter()
        .find_map(|source| source.attempt(text, stem, constants))
}

fn is_mantissa_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E')
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// `Re = <mantissa> e <exponent>`, value `mantissa * 10^exponent`.
///
/// The mantissa is the longest run of `[0-9.+-eE]` that still leaves a
/// ` e <digits>` tail, so `1.5e6` reads as mantissa `1.5`, exponent `6`.
fn header_equation(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    text.match_indices("Re").find_map(|(pos, _)| {
        let mut i = skip_spaces(bytes, pos + 2);
        if bytes.get(i) != Some(&b'=') {
            return None;
        }
        i = skip_spaces(bytes, i + 1);
        let start = i;
        let mut run_end = start;
        while run_end < bytes.len() && is_mantissa_byte(bytes[run_end]) {
            run_end += 1;
        }
        (start + 1..=run_end).rev().find_map(|end| {
            let exponent = exponent_tail(bytes, end)?;
            let mantissa: f64 = text[start..end].parse().ok()?;
            Some(mantissa * 10f64.powi(exponent))
        })
    })
}

/// Parses `\s*e\s*[0-9]+` starting at `i`.
fn exponent_tail(bytes: &[u8], i: usize) -> Option<i32> {
    let mut i = skip_spaces(bytes, i);
    if bytes.get(i) != Some(&b'e') {
        return None;
    }
    i = skip_spaces(bytes, i + 1);
    let start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..i]).ok()?.parse().ok()
}

/// `Re<digits.digits>`, the raw number without scaling.
fn compact_tag(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    text.match_indices("Re").find_map(|(pos, _)| {
        let start = pos + 2;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
            end += 1;
        }
        if end == start {
            return None;
        }
        text[start..end].parse::<f64>().ok()
    })
}

/// Index of the column header line: the first line mentioning `alpha` and `cl`.
pub fn find_header_line(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| {
        let low = line.to_lowercase();
        low.contains("alpha") && low.contains("cl")
    })
}

/// Read data lines below the header until the first blank line.
fn read_data_block(lines: &[&str], header_idx: usize, constants: &Constants) -> Vec<PolarRow> {
    lines
        .iter()
        .skip(header_idx + constants.data_offset)
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| assemble_row(line, constants.min_numeric_tokens))
        .collect()
}

/// Build a row from the numeric tokens of one line.
///
/// Non-numeric tokens are discarded; the row is emitted only when at least
/// `min_tokens` numbers remain.
pub fn assemble_row(line: &str, min_tokens: usize) -> Option<PolarRow> {
    let numbers: Vec<f64> = line.split_whitespace().filter_map(coerce_token).collect();
    if numbers.len() < min_tokens.max(3) {
        return None;
    }
    let at = |i: usize| numbers.get(i).copied().unwrap_or(f64::NAN);
    Some(PolarRow::new(numbers[0], numbers[1], numbers[2], at(3), at(4)))
}

/// Generic whitespace table reader used when no column header was found.
///
/// `%` starts a comment. Each record needs its first five cells to be numbers.
pub fn read_fallback_table(text: &str) -> Vec<PolarRow> {
    match fallback_frame(text) {
        Ok(Some(df)) => rows_from_frame(&df).unwrap_or_else(|e| {
            debug!(error = %e, "fallback conversion failed");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "fallback reader failed");
            Vec::new()
        }
    }
}

/// Placeholder for a missing cell; casts to null.
const MISSING_CELL: &str = "-";

/// One record cut or padded to exactly [`ROW_COLUMNS`] cells.
fn normalise_record(line: &str) -> Option<String> {
    let line = line.split('%').next().unwrap_or("");
    let mut cells: Vec<&str> = line.split_whitespace().take(ROW_COLUMNS).collect();
    if cells.is_empty() {
        return None;
    }
    cells.resize(ROW_COLUMNS, MISSING_CELL);
    Some(cells.join(" "))
}

fn fallback_frame(text: &str) -> PolarsResult<Option<DataFrame>> {
    let normalised: Vec<String> = text.lines().filter_map(normalise_record).collect();
    if normalised.is_empty() {
        return Ok(None);
    }

    // every cell is read as text; numeric conversion happens per cell
    let df = CsvReader::new(Cursor::new(normalised.join("\n").into_bytes()))
        .has_header(false)
        .with_delimiter(b' ')
        .with_quote_char(None)
        .infer_schema(Some(0))
        .finish()?;
    Ok(Some(df))
}

fn rows_from_frame(df: &DataFrame) -> PolarsResult<Vec<PolarRow>> {
    if df.width() < ROW_COLUMNS {
        return Ok(Vec::new());
    }
    let mut cells: Vec<Vec<Option<f64>>> = Vec::with_capacity(ROW_COLUMNS);
    for series in df.get_columns().iter().take(ROW_COLUMNS) {
        let cast = series.cast(&DataType::Float64)?;
        cells.push(cast.f64()?.into_iter().collect());
    }

    let rows = (0..df.height())
        .filter_map(|i| {
            let alpha = cells[0][i]?;
            let cl = cells[1][i]?;
            let cd = cells[2][i]?;
            let cdp = cells[3][i]?;
            let cm = cells[4][i]?;
            Some(PolarRow::new(alpha, cl, cd, cdp, cm))
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    const XFLR5_POLAR: &str = "\
xflr5 v6.47

 Calculated polar for: NACA 2412

 1 1 Reynolds number fixed          Mach number fixed

 xtrf =   1.000 (top)        1.000 (bottom)
 Mach =   0.000     Re =     0.688 e 6     Ncrit =   9.000

  alpha     CL        CD       CDp       Cm    Top Xtr Bot Xtr   Cpmin    Chinge    XCp
 ------- -------- --------- --------- -------- ------- ------- -------- --------- ---------
   2.000   0.4613   0.00640   0.00190  -0.0531  0.6023  1.0000  -0.7322   0.0000   0.3653
  -2.000   0.0132   0.00612   0.00150  -0.0526  0.8012  0.4230  -0.4532   0.0000   1.2356
   0.000   0.2381   0.00595   0.00161  -0.0529  0.7020  0.9010  -0.5011   0.0000   0.4612
   1.000   0.3500   0.00605   abc       -0.0530  0.6500  0.9500  -0.6000   0.0000   0.4000

  trailing text after blank line 9.0 9.0 9.0 9.0 9.0
";

    fn path() -> PathBuf {
        PathBuf::from("NACA 2412_T1_Re0.688_M0.00_N9.0.txt")
    }

    #[test]
    fn test_parse_xflr5_header_and_rows() {
        let polar = parse_polar_text(XFLR5_POLAR, &path(), &Constants::new());
        assert_eq!(polar.name, "NACA 2412");
        assert_relative_eq!(polar.reynolds.unwrap(), 688_000.0, epsilon = 1e-6);
        let alphas: Vec<f64> = polar.alphas().collect();
        // the `abc` token is dropped, leaving nine numbers on that line
        assert_eq!(alphas, vec![-2.0, 0.0, 1.0, 2.0]);
        assert_relative_eq!(polar.rows[2].cdp, -0.0530);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_polar_text(XFLR5_POLAR, &path(), &Constants::new());
        let b = parse_polar_text(XFLR5_POLAR, &path(), &Constants::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_rows_need_five_numbers() {
        assert!(assemble_row("1.0 0.2 0.01 0.002", 5).is_none());
        assert!(assemble_row("1.0 0.2 x 0.01 0.002", 5).is_none());
        let row = assemble_row("1.0 0.2 0.01 0.002 -0.05", 5).unwrap();
        assert_eq!(row, PolarRow::new(1.0, 0.2, 0.01, 0.002, -0.05));
    }

    #[test]
    fn test_relaxed_token_gate_fills_nan() {
        let row = assemble_row("1.0 0.2 0.01 0.002", 4).unwrap();
        assert!(row.cm.is_nan());
        assert_relative_eq!(row.cdp, 0.002);
    }

    #[test]
    fn test_coerce_token() {
        assert_eq!(coerce_token("-0.0531"), Some(-0.0531));
        assert_eq!(coerce_token("1e-3"), Some(0.001));
        assert_eq!(coerce_token("-------"), None);
        assert_eq!(coerce_token("Top"), None);
    }

    #[test]
    fn test_name_falls_back_to_stem() {
        let polar = parse_polar_text("no header here\n", Path::new("dir/E387_T1_Re0.100.txt"), &Constants::new());
        assert_eq!(polar.name, "E387_T1_Re0.100");
    }

    #[test]
    fn test_blank_name_falls_back_to_stem() {
        assert_eq!(profile_name("Calculated polar for:   \nfoo"), None);
        assert_eq!(
            profile_name("x\r\n Calculated polar for: SD7037 \r\nnext"),
            Some("SD7037".to_string())
        );
    }

    #[test]
    fn test_header_equation_variants() {
        assert_relative_eq!(header_equation(" Re =     0.688 e 6 ").unwrap(), 688_000.0, epsilon = 1e-6);
        assert_relative_eq!(header_equation("Re=1.5e6").unwrap(), 1_500_000.0, epsilon = 1e-6);
        assert_relative_eq!(header_equation("Re = 2.0 e 5").unwrap(), 200_000.0, epsilon = 1e-9);
        assert_eq!(header_equation("Re = 0.688"), None);
        assert_eq!(header_equation("Reynolds = 3"), None);
    }

    #[test]
    fn test_header_equation_skips_unparsable_mantissa() {
        let text = "Re = --- e 6\nRe = 0.5 e 6";
        assert_relative_eq!(header_equation(text).unwrap(), 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reynolds_chain_order() {
        let c = Constants::new();
        // header wins over compact tags
        assert_relative_eq!(
            reynolds_number("Re = 0.2 e 6", "x_Re0.688", &c).unwrap(),
            200_000.0,
            epsilon = 1e-6
        );
        // compact tag in text, scaled below the threshold
        assert_relative_eq!(reynolds_number("tag Re0.100 here", "", &c).unwrap(), 100_000.0, epsilon = 1e-6);
        // large compact tags are taken as-is
        assert_relative_eq!(reynolds_number("Re250000", "", &c).unwrap(), 250_000.0);
        // file name is the last resort
        assert_relative_eq!(reynolds_number("nothing", "E387_T1_Re0.300", &c).unwrap(), 300_000.0, epsilon = 1e-6);
        assert_eq!(reynolds_number("nothing", "plain", &c), None);
    }

    #[test]
    fn test_compact_tag_skips_bare_dots() {
        assert_eq!(compact_tag("Re. and Re.."), None);
        assert_relative_eq!(compact_tag("Re. then Re0.5").unwrap(), 0.5);
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Gone_T1_Re0.300.txt");
        assert_eq!(
            parse_polar_file(&path, &Constants::new()).unwrap_err().error_code(),
            "FILE_ERROR"
        );
        let polar = parse_polar_file_or_empty(&path, &Constants::new());
        assert!(polar.is_empty());
        assert_eq!(polar.name, "Gone_T1_Re0.300");
        assert_eq!(polar.reynolds, None);
    }

    #[test]
    fn test_decode_drops_invalid_bytes() {
        let bytes = b"Calculated polar for: Cl\xffark Y\n";
        let text = decode_lossy(bytes);
        assert_eq!(profile_name(&text), Some("Clark Y".to_string()));
    }

    #[test]
    fn test_header_without_data_uses_fallback() {
        let text = "alpha CL CD CDp Cm\n";
        let polar = parse_polar_text(text, Path::new("empty.txt"), &Constants::new());
        assert!(polar.is_empty());
    }

    #[test]
    fn test_fallback_reads_headerless_table() {
        let text = "% exported table\n  3.0  0.55 0.0071 0.0030 -0.04\n\n -1.0 0.10 0.0065 0.0020 -0.05\n";
        let polar = parse_polar_text(text, Path::new("raw.txt"), &Constants::new());
        let alphas: Vec<f64> = polar.alphas().collect();
        assert_eq!(alphas, vec![-1.0, 3.0]);
        assert_relative_eq!(polar.rows[1].cm, -0.04);
    }

    #[test]
    fn test_fallback_skips_non_numeric_records() {
        let text = "a b c d e\n1.0 0.2 0.01 0.002 -0.05\n";
        let rows = read_fallback_table(text);
        assert_eq!(rows, vec![PolarRow::new(1.0, 0.2, 0.01, 0.002, -0.05)]);
    }

    #[test]
    fn test_fallback_late_bad_record_only_drops_itself() {
        let mut text: String = (0..150)
            .map(|i| format!("{}.0 0.2 0.01 0.002 -0.05\n", i))
            .collect();
        text.push_str("x 0.2 0.01 0.002 -0.05\n");
        assert_eq!(read_fallback_table(&text).len(), 150);
    }

    #[test]
    fn test_fallback_late_float_after_integer_records() {
        let mut text: String = (0..150).map(|i| format!("{i} 1 1 1 1\n")).collect();
        text.push_str("150.5 1.5 1 1 1\n");
        let polar = parse_polar_text(&text, Path::new("ints.txt"), &Constants::new());
        assert_eq!(polar.len(), 151);
        assert_relative_eq!(polar.rows[150].alpha, 150.5);
        assert_relative_eq!(polar.rows[150].cl, 1.5);
    }

    #[test]
    fn test_fallback_ragged_records() {
        let text = "1.0 0.1 0.01\n2.0 0.2 0.02 0.003 -0.05 0.6 0.9\n";
        let rows = read_fallback_table(text);
        assert_eq!(rows, vec![PolarRow::new(2.0, 0.2, 0.02, 0.003, -0.05)]);
    }

    #[test]
    fn test_unrecognisable_text_is_empty() {
        let polar = parse_polar_text("hello world\nnothing to see\n", Path::new("junk.txt"), &Constants::new());
        assert!(polar.is_empty());
        assert!(read_fallback_table("").is_empty());
    }
}
