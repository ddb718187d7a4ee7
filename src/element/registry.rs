//! Static mapping from qualified tags to element kinds.
//!
//! Every node carries an [`ElementKind`] resolved when the node is created
//! or re-tagged, so table code can dispatch on what a node *is* without
//! re-comparing tag strings. `style:style` nodes are discriminated further
//! by their `style:family` attribute; the kind is refreshed whenever that
//! attribute changes.

use phf::{Map, phf_map};

/// What a node represents in the ODF vocabulary.
///
/// Tags outside the mapped set are [`ElementKind::Generic`]; they behave as
/// plain elements everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `table:table`
    Table,
    /// `table:table-row`
    Row,
    /// `table:table-cell`
    Cell,
    /// `table:covered-table-cell`
    CoveredCell,
    /// `table:table-column`
    Column,
    /// `table:table-header-rows`
    HeaderRows,
    /// `table:named-expressions`
    NamedRangeContainer,
    /// `table:named-range`
    NamedRange,
    /// `text:p`
    Paragraph,
    /// `text:span`
    Span,
    /// `text:h`
    Heading,
    /// `text:list`
    List,
    /// `text:list-item`
    ListItem,
    /// `style:style`, discriminated by `style:family`
    Style(StyleFamily),
    /// Any other element
    Generic,
}

impl ElementKind {
    /// Whether this kind holds cell data inside a row (regular or covered).
    #[inline]
    pub fn is_cell(self) -> bool {
        matches!(self, ElementKind::Cell | ElementKind::CoveredCell)
    }

    /// Whether this kind is a row child of a table.
    #[inline]
    pub fn is_row(self) -> bool {
        matches!(self, ElementKind::Row)
    }

    /// Whether this kind is a column child of a table.
    #[inline]
    pub fn is_column(self) -> bool {
        matches!(self, ElementKind::Column)
    }
}

/// The `style:family` discriminator of a `style:style` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFamily {
    /// `paragraph`
    Paragraph,
    /// `text`
    Text,
    /// `table`
    Table,
    /// `table-row`
    TableRow,
    /// `table-cell`
    TableCell,
    /// `table-column`
    TableColumn,
    /// Any other or absent family
    Other,
}

impl StyleFamily {
    /// Parse a `style:family` attribute value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "paragraph" => StyleFamily::Paragraph,
            "text" => StyleFamily::Text,
            "table" => StyleFamily::Table,
            "table-row" => StyleFamily::TableRow,
            "table-cell" => StyleFamily::TableCell,
            "table-column" => StyleFamily::TableColumn,
            _ => StyleFamily::Other,
        }
    }
}

/// Qualified tag to kind (compile-time perfect hash map for zero-cost lookups)
static KIND_BY_TAG: Map<&'static str, ElementKind> = phf_map! {
    "table:table" => ElementKind::Table,
    "table:table-row" => ElementKind::Row,
    "table:table-cell" => ElementKind::Cell,
    "table:covered-table-cell" => ElementKind::CoveredCell,
    "table:table-column" => ElementKind::Column,
    "table:table-header-rows" => ElementKind::HeaderRows,
    "table:named-expressions" => ElementKind::NamedRangeContainer,
    "table:named-range" => ElementKind::NamedRange,
    "text:p" => ElementKind::Paragraph,
    "text:span" => ElementKind::Span,
    "text:h" => ElementKind::Heading,
    "text:list" => ElementKind::List,
    "text:list-item" => ElementKind::ListItem,
};

/// Resolve the kind of a node from its tag and, for styles, its family.
pub(crate) fn resolve_kind(tag: &str, family: Option<&str>) -> ElementKind {
    if tag == "style:style" {
        return ElementKind::Style(StyleFamily::from_name(family.unwrap_or("")));
    }
    KIND_BY_TAG.get(tag).copied().unwrap_or(ElementKind::Generic)
}
