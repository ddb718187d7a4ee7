//! Longan - A Rust library for the OpenDocument (ODF) document model
//!
//! This library provides an editable, namespace-aware model of ODF content
//! trees, with spreadsheet tables as first-class views: the run-length
//! encoding ODF uses for repeated rows, columns and cells is reconciled
//! with the dense logical grid a caller actually wants to address.
//!
//! # Features
//!
//! - **Element tree**: arena-backed XML tree with qualified tags checked
//!   against the fixed ODF namespace registry
//! - **Querying**: compiled path expressions (`//table:table-row`,
//!   predicates, unions) memoized process-wide
//! - **Tables**: a logical grid over `table:number-rows-repeated` and
//!   friends, split-on-write, with O(log n) position lookup
//! - **Typed cells**: floats, booleans, dates, durations, currencies and
//!   percentages round-trip through their ODF attribute forms
//! - **CSV exchange**: dialect-sniffing import with typed fields,
//!   quote-everything export
//!
//! # Example - Building a spreadsheet
//!
//! ```
//! use longan::Document;
//! use longan::table::{CellValue, Table};
//!
//! let mut doc = Document::new_spreadsheet();
//! let mut table = Table::create(&mut doc, "Sheet1", 3, 3).unwrap();
//! table.set_value("B2", 42).unwrap();
//! assert_eq!(table.value((1, 1)).unwrap(), CellValue::Int(42));
//!
//! let xml = doc.to_xml();
//! assert!(xml.contains("table:name=\"Sheet1\""));
//! ```
//!
//! # Example - Reading a table back from XML
//!
//! ```
//! use longan::Document;
//! use longan::table::{CellValue, Table};
//!
//! let mut doc = Document::from_str(
//!     "<office:document-content><office:body><office:spreadsheet>\
//!      <table:table table:name=\"Data\">\
//!        <table:table-column table:number-columns-repeated=\"2\"/>\
//!        <table:table-row table:number-rows-repeated=\"3\">\
//!          <table:table-cell office:value-type=\"float\" office:value=\"1\" \
//!            table:number-columns-repeated=\"2\"/>\
//!        </table:table-row>\
//!      </table:table>\
//!      </office:spreadsheet></office:body></office:document-content>",
//! )
//! .unwrap();
//!
//! let table = Table::by_name(&mut doc, "Data").unwrap().unwrap();
//! assert_eq!(table.size(), (2, 3));
//! assert_eq!(table.value("B3").unwrap(), CellValue::Int(1));
//! ```
//!
//! # Example - Querying the element tree
//!
//! ```
//! use longan::Document;
//!
//! let doc = Document::from_str(
//!     "<office:document-content><office:body><office:text>\
//!      <text:p>first</text:p><text:p>second</text:p>\
//!      </office:text></office:body></office:document-content>",
//! )
//! .unwrap();
//!
//! let hits = doc.query_elements(doc.root(), "//text:p").unwrap();
//! assert_eq!(hits.len(), 2);
//! assert_eq!(doc.text(hits[1]), Some("second"));
//! ```

/// Cell and area coordinates
///
/// Converts between A1-style notation (`"B3"`, `"A1:C9"`) and zero-based
/// numeric pairs; negative components count from the right/bottom edge.
pub mod coordinates;

/// ODF attribute data types
///
/// Codecs between ODF attribute text and Rust values: booleans, dates,
/// datetimes, durations.
pub mod datatype;

/// The namespace-aware element tree
///
/// Arena-backed documents, structural editing with ElementTree-style
/// text/tail handling, path queries and tag stripping.
pub mod element;

/// The fixed ODF namespace registry
///
/// Prefix and URI tables for the vocabularies ODF content uses, and
/// qualified-name helpers built on them.
pub mod namespace;

/// Spreadsheet tables
///
/// Logical grids over repeated rows, columns and cells, typed cell
/// values, named ranges and CSV exchange.
pub mod table;

mod error;

// Re-export the core types for convenience
pub use element::{
    Content, Document, Element, ElementKind, Position, QueryItem, Stripped, StyleFamily,
};
pub use error::{Error, Result};
