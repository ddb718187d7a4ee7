//! XML element tree: arena document, node handles, queries, and stripping.
//!
//! The tree lives in a [`Document`] arena; [`Element`] is a cheap `Copy`
//! handle into it. All reads and mutations go through `Document` methods, so
//! the borrow checker rules out aliased mutation of one tree while detached
//! subtrees stay readable through retained handles.

mod document;
mod escape;
pub mod query;
pub mod registry;
mod strip;

pub use document::{Content, Document, Element, Position};
pub use escape::escape_xml;
pub use query::QueryItem;
pub use registry::{ElementKind, StyleFamily};
pub use strip::Stripped;
