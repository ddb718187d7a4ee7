//! Cell data structures for spreadsheet tables.

use crate::datatype::{Boolean, Date, DateTime, Duration};
use crate::element::{Document, Element, ElementKind, Position};
use crate::Result;
use chrono::{NaiveDate, NaiveDateTime};

/// Declared ODF value types, as written in `office:value-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Float,
    String,
    Date,
    Time,
    Currency,
    Percentage,
}

impl ValueType {
    /// The `office:value-type` attribute text.
    pub fn as_odf(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Time => "time",
            ValueType::Currency => "currency",
            ValueType::Percentage => "percentage",
        }
    }

    pub fn from_odf(text: &str) -> Option<Self> {
        Some(match text {
            "boolean" => ValueType::Boolean,
            "float" => ValueType::Float,
            "string" => ValueType::String,
            "date" => ValueType::Date,
            "time" => ValueType::Time,
            "currency" => ValueType::Currency,
            "percentage" => ValueType::Percentage,
            _ => return None,
        })
    }
}

/// Cell content filter for bulk value reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellFilter {
    /// Every cell, empty ones included
    #[default]
    Any,
    /// Any cell with typed content, regardless of declared type
    NonEmpty,
    /// Only cells of one declared type
    Type(ValueType),
}

/// Typed value stored in a spreadsheet cell.
///
/// ODF has a single `float` value type for numbers; values whose text is
/// integral are kept as `Int` so they survive round trips without turning
/// into floats, and both variants serialize as `office:value-type="float"`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// Text string
    Text(String),
    /// Integer-valued number
    Int(i64),
    /// Numeric value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date with a time of day
    DateTime(NaiveDateTime),
    /// Time duration
    Time(chrono::Duration),
    /// Currency value with currency code
    Currency(f64, String),
    /// Percentage value
    Percentage(f64),
}

impl CellValue {
    /// Currency amount with its code ("EUR", "USD", ...).
    pub fn currency(amount: f64, code: &str) -> Self {
        CellValue::Currency(amount, code.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The declared ODF type this value serializes under; `None` when empty.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            CellValue::Empty => return None,
            CellValue::Text(_) => ValueType::String,
            CellValue::Int(_) | CellValue::Float(_) => ValueType::Float,
            CellValue::Boolean(_) => ValueType::Boolean,
            CellValue::Date(_) => ValueType::Date,
            CellValue::DateTime(_) => ValueType::Date,
            CellValue::Time(_) => ValueType::Time,
            CellValue::Currency(..) => ValueType::Currency,
            CellValue::Percentage(_) => ValueType::Percentage,
        })
    }

    /// Numeric reading of the value, for Int, Float, Currency and
    /// Percentage cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(n) => Some(*n as f64),
            CellValue::Float(n) => Some(*n),
            CellValue::Currency(n, _) => Some(*n),
            CellValue::Percentage(n) => Some(*n),
            _ => None,
        }
    }

    pub fn matches(&self, filter: CellFilter) -> bool {
        match filter {
            CellFilter::Any => true,
            CellFilter::NonEmpty => !self.is_empty(),
            CellFilter::Type(value_type) => self.value_type() == Some(value_type),
        }
    }

    /// Fallback display text for cells without explicit display content.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Int(n) => itoa::Buffer::new().format(*n).to_string(),
            CellValue::Float(n) => ryu::Buffer::new().format(*n).to_string(),
            CellValue::Boolean(b) => Boolean::encode(*b).to_string(),
            CellValue::Date(d) => Date::encode(d),
            CellValue::DateTime(dt) => DateTime::encode(dt),
            CellValue::Time(t) => Duration::encode(t),
            CellValue::Currency(n, code) => {
                format!("{} {}", ryu::Buffer::new().format(*n), code)
            },
            CellValue::Percentage(n) => ryu::Buffer::new().format(*n).to_string(),
        }
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<chrono::Duration> for CellValue {
    fn from(t: chrono::Duration) -> Self {
        CellValue::Time(t)
    }
}

/// A cell in a spreadsheet table.
///
/// Cells are plain values detached from the tree: reads decode the raw
/// XML into a `Cell`, writes encode one back. Display text is carried
/// separately from the typed value, because a formatted number renders
/// differently from its `office:value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The typed cell value
    pub value: CellValue,
    /// Explicit display text, when it differs from the value's own rendering
    pub text: Option<String>,
    /// The formula in the cell (if any), in ODF format
    pub formula: Option<String>,
    /// Cell style name
    pub style: Option<String>,
    /// Repeat count in the raw row (1 for a plain cell)
    pub repeated: usize,
    /// Merge span as (columns, rows), on the anchor cell of a merge
    pub span: Option<(usize, usize)>,
    /// Covered by another cell's span
    pub covered: bool,
    /// Logical column, filled in by traversal
    pub x: Option<usize>,
    /// Logical row, filled in by traversal
    pub y: Option<usize>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            value: CellValue::Empty,
            text: None,
            formula: None,
            style: None,
            repeated: 1,
            span: None,
            covered: false,
            x: None,
            y: None,
        }
    }
}

impl Cell {
    /// Cell holding a typed value.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::table::{Cell, CellValue};
    ///
    /// assert_eq!(Cell::new(42).value, CellValue::Int(42));
    /// assert_eq!(Cell::new(3.14).value, CellValue::Float(3.14));
    /// assert_eq!(Cell::new("x").value, CellValue::Text("x".to_string()));
    /// ```
    pub fn new(value: impl Into<CellValue>) -> Self {
        Cell {
            value: value.into(),
            ..Cell::default()
        }
    }

    pub fn empty() -> Self {
        Cell::default()
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn with_repeat(mut self, repeated: usize) -> Self {
        self.repeated = repeated.max(1);
        self
    }

    pub fn with_formula(mut self, formula: &str) -> Self {
        self.formula = Some(formula.to_string());
        self
    }

    /// No value, no formula, no display text. Style does not count;
    /// styled-but-valueless cells matter for trailing-cell trims only in
    /// aggressive mode.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.formula.is_none() && self.text.is_none()
    }

    /// The displayed text: explicit display content when present, else the
    /// value's own rendering.
    pub fn display_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.value.display_text(),
        }
    }

    /// Logical coordinates assigned by the last traversal, (x, y).
    pub fn coordinates(&self) -> (Option<usize>, Option<usize>) {
        (self.x, self.y)
    }

    // ------------------------------------------------------------------
    // XML codec
    // ------------------------------------------------------------------

    /// Decode a `table:table-cell` / `table:covered-table-cell` element.
    ///
    /// Malformed typed attributes decode as empty rather than failing:
    /// absent or unreadable content is a normal state in sparse sheets.
    pub(crate) fn decode(doc: &Document, el: Element) -> Cell {
        let covered = doc.kind(el) == ElementKind::CoveredCell;
        let repeated = doc
            .attribute_uint(el, "table:number-columns-repeated")
            .map_or(1, |n| (n as usize).max(1));
        let style = doc.attribute(el, "table:style-name").map(str::to_string);
        let formula = doc.attribute(el, "table:formula").map(str::to_string);

        let cols_spanned = doc.attribute_uint(el, "table:number-columns-spanned");
        let rows_spanned = doc.attribute_uint(el, "table:number-rows-spanned");
        let span = match (cols_spanned, rows_spanned) {
            (None, None) => None,
            (cols, rows) => Some((
                cols.map_or(1, |n| (n as usize).max(1)),
                rows.map_or(1, |n| (n as usize).max(1)),
            )),
        };

        let paragraphs: Vec<String> = doc
            .children(el)
            .iter()
            .filter(|&&child| doc.kind(child) == ElementKind::Paragraph)
            .map(|&child| doc.text_content(child))
            .collect();
        let text = if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join("\n"))
        };

        let value = Self::decode_value(doc, el, text.as_deref());
        Cell {
            value,
            text,
            formula,
            style,
            repeated,
            span,
            covered,
            x: None,
            y: None,
        }
    }

    fn decode_value(doc: &Document, el: Element, text: Option<&str>) -> CellValue {
        let Some(value_type) = doc.attribute(el, "office:value-type") else {
            return CellValue::Empty;
        };
        match value_type {
            "boolean" => doc
                .attribute(el, "office:boolean-value")
                .and_then(|s| Boolean::decode(s).ok())
                .map_or(CellValue::Empty, CellValue::Boolean),
            "float" => Self::decode_number(doc, el).unwrap_or(CellValue::Empty),
            "percentage" => doc
                .attribute_float(el, "office:value")
                .map_or(CellValue::Empty, CellValue::Percentage),
            "currency" => match doc.attribute_float(el, "office:value") {
                Some(amount) => CellValue::Currency(
                    amount,
                    doc.attribute(el, "office:currency")
                        .unwrap_or_default()
                        .to_string(),
                ),
                None => CellValue::Empty,
            },
            "date" => match doc.attribute(el, "office:date-value") {
                Some(raw) if raw.contains('T') => DateTime::decode(raw)
                    .map_or(CellValue::Empty, CellValue::DateTime),
                Some(raw) => Date::decode(raw).map_or(CellValue::Empty, CellValue::Date),
                None => CellValue::Empty,
            },
            "time" => doc
                .attribute(el, "office:time-value")
                .and_then(|s| Duration::decode(s).ok())
                .map_or(CellValue::Empty, CellValue::Time),
            // "string" and anything unrecognized read as text
            _ => {
                let content = doc
                    .attribute(el, "office:string-value")
                    .map(str::to_string)
                    .or_else(|| text.map(str::to_string));
                content.map_or(CellValue::Empty, CellValue::Text)
            },
        }
    }

    /// Integral `office:value` text stays an Int; everything else is Float.
    fn decode_number(doc: &Document, el: Element) -> Option<CellValue> {
        let raw = doc.attribute(el, "office:value")?;
        if let Ok(n) = atoi_simd::parse::<i64>(raw.as_bytes()) {
            return Some(CellValue::Int(n));
        }
        fast_float2::parse::<f64, _>(raw).ok().map(CellValue::Float)
    }

    /// Encode into a detached cell element.
    pub(crate) fn encode(&self, doc: &mut Document) -> Result<Element> {
        let tag = if self.covered {
            "table:covered-table-cell"
        } else {
            "table:table-cell"
        };
        let el = doc.new_element(tag)?;

        if self.repeated > 1 {
            doc.set_attribute(
                el,
                "table:number-columns-repeated",
                itoa::Buffer::new().format(self.repeated),
            )?;
        }
        if let Some(style) = &self.style {
            doc.set_attribute(el, "table:style-name", style)?;
        }
        if let Some(formula) = &self.formula {
            doc.set_attribute(el, "table:formula", formula)?;
        }
        if let Some((cols, rows)) = self.span {
            doc.set_attribute(
                el,
                "table:number-columns-spanned",
                itoa::Buffer::new().format(cols.max(1)),
            )?;
            doc.set_attribute(
                el,
                "table:number-rows-spanned",
                itoa::Buffer::new().format(rows.max(1)),
            )?;
        }

        self.encode_value(doc, el)?;

        let display = match &self.text {
            Some(text) => Some(text.clone()),
            None if self.value.is_empty() => None,
            None => Some(self.value.display_text()),
        };
        if let Some(display) = display {
            // One text:p per line, matching how display text is read back
            for line in display.split('\n') {
                let p = doc.new_element("text:p")?;
                doc.set_text(p, Some(line));
                doc.insert(el, p, Position::LastChild)?;
            }
        }
        Ok(el)
    }

    fn encode_value(&self, doc: &mut Document, el: Element) -> Result<()> {
        let Some(value_type) = self.value.value_type() else {
            return Ok(());
        };
        doc.set_attribute(el, "office:value-type", value_type.as_odf())?;
        match &self.value {
            CellValue::Text(text) => {
                doc.set_attribute(el, "office:string-value", text)?;
            },
            CellValue::Int(n) => {
                doc.set_attribute(el, "office:value", itoa::Buffer::new().format(*n))?;
            },
            CellValue::Float(n) | CellValue::Percentage(n) => {
                doc.set_attribute(el, "office:value", ryu::Buffer::new().format(*n))?;
            },
            CellValue::Boolean(b) => {
                doc.set_attribute(el, "office:boolean-value", Boolean::encode(*b))?;
            },
            CellValue::Date(d) => {
                doc.set_attribute(el, "office:date-value", &Date::encode(d))?;
            },
            CellValue::DateTime(dt) => {
                doc.set_attribute(el, "office:date-value", &DateTime::encode(dt))?;
            },
            CellValue::Time(t) => {
                doc.set_attribute(el, "office:time-value", &Duration::encode(t))?;
            },
            CellValue::Currency(amount, code) => {
                doc.set_attribute(el, "office:value", ryu::Buffer::new().format(*amount))?;
                doc.set_attribute(el, "office:currency", code)?;
            },
            CellValue::Empty => {},
        }
        Ok(())
    }
}
