//! CSV exchange for tables.
//!
//! Export is fixed-form: every field quoted, embedded quotes doubled, one
//! terminator per row. Import is lenient: the dialect is sniffed from the
//! input and each field is typed by trial decode, in priority order
//! integer, float, date, datetime, duration, boolean, then text. Empty
//! fields, quoted or not, read as empty cells.

use memchr::{memchr, memchr3, memmem};

use crate::datatype::{Boolean, Date, DateTime, Duration};
use crate::table::{CellValue, Table};

/// How many leading bytes the sniffer examines.
const SNIFF_WINDOW: usize = 4096;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// CSV framing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    pub terminator: &'static str,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            delimiter: b',',
            quote: b'"',
            terminator: "\n",
        }
    }
}

impl Dialect {
    /// Guess delimiter and terminator from a sample.
    ///
    /// Counts candidate delimiters outside quoted stretches and keeps the
    /// most frequent; ties keep the earlier candidate, so a comma wins.
    /// `\r\n` anywhere in the window selects the CRLF terminator.
    pub fn sniff(sample: &str) -> Dialect {
        let window = sample
            .get(..SNIFF_WINDOW.min(sample.len()))
            .unwrap_or(sample);
        let bytes = window.as_bytes();
        let terminator = if memmem::find(bytes, b"\r\n").is_some() {
            "\r\n"
        } else {
            "\n"
        };

        let mut counts = [0usize; 4];
        let mut in_quotes = false;
        for &b in bytes {
            if b == b'"' {
                in_quotes = !in_quotes;
            } else if !in_quotes {
                if let Some(slot) = DELIMITER_CANDIDATES.iter().position(|&c| c == b) {
                    counts[slot] += 1;
                }
            }
        }
        let mut delimiter = b',';
        let mut best = 0;
        for (slot, &count) in counts.iter().enumerate() {
            if count > best {
                best = count;
                delimiter = DELIMITER_CANDIDATES[slot];
            }
        }

        Dialect {
            delimiter,
            quote: b'"',
            terminator,
        }
    }
}

/// Render the whole table, every field quoted.
pub(crate) fn export(table: &Table<'_>, dialect: &Dialect) -> String {
    let mut out = String::new();
    for row in table.iter_values() {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(dialect.delimiter as char);
            }
            write_field(&mut out, &value.display_text(), dialect.quote as char);
        }
        out.push_str(dialect.terminator);
    }
    out
}

fn write_field(out: &mut String, text: &str, quote: char) {
    out.push(quote);
    for c in text.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
}

/// Parse CSV text into typed rows.
///
/// Quoted fields may contain delimiters, terminators and doubled quotes.
/// A quote inside an unquoted field is literal. Malformed input never
/// fails; it degrades to text fields.
pub(crate) fn parse(data: &str, dialect: &Dialect) -> Vec<Vec<CellValue>> {
    let bytes = data.as_bytes();
    let quote = dialect.quote;
    let delimiter = dialect.delimiter;
    let terminator = dialect.terminator.as_bytes();

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut record: Vec<CellValue> = Vec::new();
    let mut field = String::new();
    let mut was_quoted = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == quote {
            if field.is_empty() && !was_quoted {
                was_quoted = true;
                i += 1;
                let mut segment = i;
                loop {
                    match memchr(quote, &bytes[i..]) {
                        // Unterminated quote: take the rest verbatim
                        None => {
                            field.push_str(&data[segment..]);
                            i = bytes.len();
                            break;
                        },
                        Some(offset) => {
                            let at = i + offset;
                            field.push_str(&data[segment..at]);
                            if bytes.get(at + 1) == Some(&quote) {
                                field.push(quote as char);
                                i = at + 2;
                                segment = i;
                            } else {
                                i = at + 1;
                                break;
                            }
                        },
                    }
                }
            } else {
                field.push(quote as char);
                i += 1;
            }
            continue;
        }
        if b == delimiter {
            record.push(decode_field(&field));
            field.clear();
            was_quoted = false;
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(terminator) {
            record.push(decode_field(&field));
            field.clear();
            was_quoted = false;
            rows.push(std::mem::take(&mut record));
            i += terminator.len();
            continue;
        }
        if b == terminator[0] {
            // Lone first terminator byte (a stray carriage return)
            field.push(b as char);
            i += 1;
            continue;
        }
        let next = match memchr3(quote, delimiter, terminator[0], &bytes[i..]) {
            Some(offset) => i + offset,
            None => bytes.len(),
        };
        field.push_str(&data[i..next]);
        i = next;
    }

    if !field.is_empty() || was_quoted || !record.is_empty() {
        record.push(decode_field(&field));
        rows.push(record);
    }
    rows
}

/// Best-effort typed reading of one field.
fn decode_field(text: &str) -> CellValue {
    if text.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = atoi_simd::parse::<i64>(text.as_bytes()) {
        return CellValue::Int(n);
    }
    if let Ok(f) = fast_float2::parse::<f64, _>(text) {
        return CellValue::Float(f);
    }
    if let Ok(d) = Date::decode(text) {
        return CellValue::Date(d);
    }
    if let Ok(dt) = DateTime::decode(text) {
        return CellValue::DateTime(dt);
    }
    if let Ok(t) = Duration::decode(text) {
        return CellValue::Time(t);
    }
    if let Ok(b) = Boolean::decode(text) {
        return CellValue::Boolean(b);
    }
    CellValue::Text(text.to_string())
}
