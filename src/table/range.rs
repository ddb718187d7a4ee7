//! Named ranges: labels over rectangular table areas.
//!
//! Ranges live in one `table:named-expressions` container directly under
//! the spreadsheet body, not inside any table element, so cloning or
//! deleting a table never silently duplicates or drops them. Addresses
//! use the ODF absolute form: `$Sheet.$A$1`, or `$Sheet.$A$1:.$C$9` with
//! the sheet omitted after the colon. Sheet names that are not plain
//! alphanumerics are single-quoted, embedded quotes doubled.

use crate::coordinates::{Area, Coord, alpha_to_digit, digit_to_alpha};
use crate::element::{Document, Element, ElementKind, Position};
use crate::{Error, Result};

const CONTAINER_TAG: &str = "table:named-expressions";
const RANGE_TAG: &str = "table:named-range";

/// One named range: a label, the table it points at, and the area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    pub name: String,
    pub table_name: String,
    /// Concrete corners; from-the-end coordinates are resolved before a
    /// range is stored.
    pub area: Area,
}

impl NamedRange {
    /// The full `table:cell-range-address` form.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::coordinates::Area;
    /// use longan::table::NamedRange;
    ///
    /// let range = NamedRange {
    ///     name: "totals".to_string(),
    ///     table_name: "My Sheet".to_string(),
    ///     area: "A1:C9".parse().unwrap(),
    /// };
    /// assert_eq!(range.address(), "$'My Sheet'.$A$1:.$C$9");
    /// ```
    pub fn address(&self) -> String {
        let start = format!(
            "${}.{}",
            quote_table_name(&self.table_name),
            cell_part(self.area.start)
        );
        if self.area.start == self.area.end {
            start
        } else {
            format!("{}:.{}", start, cell_part(self.area.end))
        }
    }

    /// The `table:base-cell-address` form: the start cell alone.
    pub fn base_address(&self) -> String {
        format!(
            "${}.{}",
            quote_table_name(&self.table_name),
            cell_part(self.area.start)
        )
    }

    /// Read a range back from a `table:named-range` element; `None` when
    /// the element is missing its name or carries an unparseable address.
    pub(crate) fn from_element(doc: &Document, el: Element) -> Option<NamedRange> {
        let name = doc.attribute(el, "table:name")?.to_string();
        let address = doc.attribute(el, "table:cell-range-address")?;
        let (table_name, area) = parse_address(address).ok()?;
        Some(NamedRange {
            name,
            table_name,
            area,
        })
    }

    fn write_attributes(&self, doc: &mut Document, el: Element) -> Result<()> {
        doc.set_attribute(el, "table:name", &self.name)?;
        doc.set_attribute(el, "table:base-cell-address", &self.base_address())?;
        doc.set_attribute(el, "table:cell-range-address", &self.address())
    }
}

fn quote_table_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn cell_part(coord: Coord) -> String {
    // Stored corners are concrete, so the cast cannot lose a sign
    format!("${}${}", digit_to_alpha(coord.x.max(0) as usize), coord.y.max(0) + 1)
}

/// Parse `$Sheet.$A$1[:[.$C$9]]` into the table name and area.
fn parse_address(address: &str) -> Result<(String, Area)> {
    let mut parser = AddressParser {
        src: address,
        bytes: address.as_bytes(),
        pos: 0,
    };
    let (table, start) = parser.parse_ref()?;
    let table = table.ok_or_else(|| {
        Error::Decode(format!("range address '{}' has no table name", address))
    })?;
    let end = if parser.eat(b':') {
        let (_, end) = parser.parse_ref()?;
        end
    } else {
        start
    };
    if parser.pos != parser.bytes.len() {
        return Err(Error::Decode(format!(
            "trailing characters in range address '{}'",
            address
        )));
    }
    Ok((table, Area::new(start, end)))
}

struct AddressParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl AddressParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn fail(&self, message: &str) -> Error {
        Error::Decode(format!(
            "{} at offset {} in range address '{}'",
            message, self.pos, self.src
        ))
    }

    /// One cell reference with an optional table prefix:
    /// `$Sheet.$A$1`, `$'A Sheet'.$A$1`, or a bare `.$A$1`.
    fn parse_ref(&mut self) -> Result<(Option<String>, Coord)> {
        self.eat(b'$');
        let table = if self.peek() == Some(b'\'') {
            Some(self.parse_quoted()?)
        } else {
            let start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'.' {
                    break;
                }
                self.pos += 1;
            }
            if self.pos == start {
                None
            } else {
                Some(self.src[start..self.pos].to_string())
            }
        };
        if !self.eat(b'.') {
            return Err(self.fail("expected '.' before the cell reference"));
        }

        self.eat(b'$');
        let col_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == col_start {
            return Err(self.fail("expected a column letter"));
        }
        let column = alpha_to_digit(&self.src[col_start..self.pos])?;

        self.eat(b'$');
        let row_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == row_start {
            return Err(self.fail("expected a row number"));
        }
        let row = atoi_simd::parse::<usize>(&self.bytes[row_start..self.pos])
            .map_err(|_| self.fail("bad row number"))?;
        if row == 0 {
            return Err(self.fail("row numbers start at 1"));
        }

        let x = isize::try_from(column).map_err(|_| self.fail("column out of range"))?;
        let y = isize::try_from(row - 1).map_err(|_| self.fail("row out of range"))?;
        Ok((table, Coord::new(x, y)))
    }

    /// Single-quoted table name; `''` stands for a literal quote. Slices
    /// only at quote bytes, which are always char boundaries.
    fn parse_quoted(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        let mut segment = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.fail("unterminated quoted table name")),
                Some(b'\'') => {
                    out.push_str(&self.src[segment..self.pos]);
                    if self.bytes.get(self.pos + 1) == Some(&b'\'') {
                        out.push('\'');
                        self.pos += 2;
                        segment = self.pos;
                    } else {
                        self.pos += 1;
                        return Ok(out);
                    }
                },
                Some(_) => self.pos += 1,
            }
        }
    }
}

// ----------------------------------------------------------------------
// Container plumbing under the spreadsheet body
// ----------------------------------------------------------------------

fn container(doc: &Document, body: Element) -> Option<Element> {
    doc.children(body)
        .iter()
        .copied()
        .find(|&c| doc.kind(c) == ElementKind::NamedRangeContainer)
}

/// All well-formed ranges in document order; malformed entries are skipped.
pub(crate) fn named_ranges(doc: &Document, body: Element) -> Vec<NamedRange> {
    let Some(container) = container(doc, body) else {
        return Vec::new();
    };
    doc.children(container)
        .iter()
        .filter(|&&c| doc.kind(c) == ElementKind::NamedRange)
        .filter_map(|&c| NamedRange::from_element(doc, c))
        .collect()
}

/// Create or replace the range named `range.name`.
pub(crate) fn set_named_range(doc: &mut Document, body: Element, range: &NamedRange) -> Result<()> {
    let container = match container(doc, body) {
        Some(el) => el,
        None => {
            let el = doc.new_element(CONTAINER_TAG)?;
            doc.insert(body, el, Position::LastChild)?;
            el
        },
    };
    let existing = doc
        .children(container)
        .iter()
        .copied()
        .find(|&c| doc.attribute(c, "table:name") == Some(range.name.as_str()));
    let el = match existing {
        Some(el) => el,
        None => {
            let el = doc.new_element(RANGE_TAG)?;
            doc.insert(container, el, Position::LastChild)?;
            el
        },
    };
    range.write_attributes(doc, el)
}

/// Delete the range named `name`; dropping the last one removes the
/// container as well. `false` when no such range exists.
pub(crate) fn delete_named_range(doc: &mut Document, body: Element, name: &str) -> Result<bool> {
    let Some(container) = container(doc, body) else {
        return Ok(false);
    };
    let Some(el) = doc
        .children(container)
        .iter()
        .copied()
        .find(|&c| doc.attribute(c, "table:name") == Some(name))
    else {
        return Ok(false);
    };
    doc.delete_keep_tail(el, false)?;
    if doc.children(container).is_empty() {
        doc.delete_keep_tail(container, false)?;
    }
    Ok(true)
}

/// Point every range at table `old` to table `new`, rewriting addresses.
pub(crate) fn rename_table(doc: &mut Document, body: Element, old: &str, new: &str) -> Result<()> {
    let Some(container) = container(doc, body) else {
        return Ok(());
    };
    let elements: Vec<Element> = doc.children(container).to_vec();
    for el in elements {
        let Some(mut range) = NamedRange::from_element(doc, el) else {
            continue;
        };
        if range.table_name == old {
            range.table_name = new.to_string();
            range.write_attributes(doc, el)?;
        }
    }
    Ok(())
}
