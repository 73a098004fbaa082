//! Ledger CSV loader with encoding and delimiter auto-detection.
//!
//! Produces [`RawRecord`]s only. No coercion happens here; that is the
//! cleaner's job.

use csv::ReaderBuilder;
use std::path::Path;

use crate::error::{InputResult, MalformedInputError};
use crate::models::{RawRecord, REQUIRED_COLUMNS};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed ledger rows
    pub records: Vec<RawRecord>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Column headers as they appear in the file
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> InputResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                log::warn!("Input is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(bytes).into_owned()
            }
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(MalformedInputError::Encoding {
                        encoding: encoding.to_string(),
                    });
                }
                text.into_owned()
            }
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the header line.
/// Ties go to the comma.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a ledger file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> InputResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| MalformedInputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes_auto(&bytes)
}

/// Parse ledger bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> InputResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    let mut result = parse_str(&content, delimiter)?;
    result.encoding = encoding;
    Ok(result)
}

/// Parse already-decoded CSV text with an explicit delimiter.
///
/// Header names are matched case-insensitively and may appear in any order.
/// Extra columns are ignored; short rows are padded with empty cells.
pub fn parse_str(content: &str, delimiter: char) -> InputResult<ParseResult> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(MalformedInputError::EmptyFile);
    }

    let index = column_index(&headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |i: usize| row.get(index[i]).unwrap_or("").to_string();
        records.push(RawRecord {
            account_id: cell(0),
            txn_time: cell(1),
            amount: cell(2),
            txn_type: cell(3),
            description: cell(4),
            city: cell(5),
        });
    }

    if records.is_empty() {
        return Err(MalformedInputError::EmptyFile);
    }

    Ok(ParseResult {
        records,
        encoding: "utf-8".to_string(),
        delimiter,
        headers,
    })
}

/// Position of each required column, in `REQUIRED_COLUMNS` order.
fn column_index(headers: &[String]) -> InputResult<[usize; 6]> {
    let mut index = [0usize; 6];
    let mut missing = Vec::new();

    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h.eq_ignore_ascii_case(name)) {
            Some(pos) => index[slot] = pos,
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(index)
    } else {
        Err(MalformedInputError::MissingColumns(missing))
    }
}
