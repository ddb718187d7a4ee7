//! Table columns: style metadata addressed purely by position.
//!
//! Columns carry no cell payload. Their run-length map lives on the owning
//! table, and a `Column` is just the style information of one run.

use crate::Result;
use crate::element::{Document, Element};

/// Style metadata for one column run.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column style name (width and layout)
    pub style: Option<String>,
    /// Default style applied to cells without one of their own
    pub default_cell_style: Option<String>,
    /// Repeat count in the table
    pub repeated: usize,
}

impl Default for Column {
    fn default() -> Self {
        Column {
            style: None,
            default_cell_style: None,
            repeated: 1,
        }
    }
}

impl Column {
    pub fn new() -> Self {
        Column::default()
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn with_default_cell_style(mut self, style: &str) -> Self {
        self.default_cell_style = Some(style.to_string());
        self
    }

    pub fn with_repeat(mut self, repeated: usize) -> Self {
        self.repeated = repeated.max(1);
        self
    }

    /// Decode a `table:table-column` element.
    pub(crate) fn decode(doc: &Document, el: Element) -> Column {
        Column {
            style: doc.attribute(el, "table:style-name").map(str::to_string),
            default_cell_style: doc
                .attribute(el, "table:default-cell-style-name")
                .map(str::to_string),
            repeated: doc
                .attribute_uint(el, "table:number-columns-repeated")
                .map_or(1, |n| (n as usize).max(1)),
        }
    }

    /// Encode into a detached `table:table-column` element.
    pub(crate) fn encode(&self, doc: &mut Document) -> Result<Element> {
        let el = doc.new_element("table:table-column")?;
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
        if let Some(style) = &self.default_cell_style {
            doc.set_attribute(el, "table:default-cell-style-name", style)?;
        }
        Ok(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_round_trip() {
        let mut doc = Document::new_spreadsheet();
        let column = Column::new()
            .with_style("co1")
            .with_default_cell_style("Default")
            .with_repeat(16);
        let el = column.encode(&mut doc).unwrap();
        assert_eq!(
            doc.serialize(el, false),
            "<table:table-column table:number-columns-repeated=\"16\" table:style-name=\"co1\" table:default-cell-style-name=\"Default\"/>"
        );
        assert_eq!(Column::decode(&doc, el), column);
    }

    #[test]
    fn test_plain_column_is_bare() {
        let mut doc = Document::new_spreadsheet();
        let el = Column::new().encode(&mut doc).unwrap();
        assert_eq!(doc.serialize(el, false), "<table:table-column/>");
    }
}
