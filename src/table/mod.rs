//! Spreadsheet tables over the document tree.
//!
//! A [`Table`] is a view borrowing `&mut Document`: it holds the
//! `table:table` element plus run-length maps for its rows and columns,
//! built when the view binds. Because the view is the only writer while it
//! lives, every mutation patches the maps and the tree in the same call;
//! a stale map cannot be observed.
//!
//! Reads decode raw XML into owned [`Row`] / [`Cell`] values; writes encode
//! them back, splitting repeated runs as needed. Writing into the middle of
//! a row repeated five times leaves three raw rows behind (head run, the
//! written row, tail run) while the other four logical rows keep their
//! original content.

mod cell;
mod column;
mod csv;
mod range;
mod repeat;
mod row;

pub use cell::{Cell, CellFilter, CellValue, ValueType};
pub use column::Column;
pub use csv::Dialect;
pub use range::NamedRange;
pub use row::Row;

use crate::coordinates::{Coord, IntoArea, IntoCoord, resolve_index};
use crate::element::{Document, Element, ElementKind, Position};
use crate::table::repeat::{RepeatMap, RunStore};
use crate::{Error, Result};

const ROWS_REPEATED: &str = "table:number-rows-repeated";
const COLUMNS_REPEATED: &str = "table:number-columns-repeated";

/// Raw row/column elements as a run store. Splits clone the element in
/// place; repeat counts live in the repeat attribute, where 1 means the
/// attribute is absent.
struct ElementRuns<'a> {
    doc: &'a mut Document,
    raws: &'a mut Vec<Element>,
    repeat_attr: &'static str,
}

impl RunStore for ElementRuns<'_> {
    fn split_run(&mut self, raw: usize, keep: usize, rest: usize) -> Result<()> {
        let src = self.raws[raw];
        let copy = self.doc.clone_node(src);
        self.doc.insert(src, copy, Position::NextSibling)?;
        self.raws.insert(raw + 1, copy);
        self.set_repeat(raw, keep)?;
        self.set_repeat(raw + 1, rest)?;
        Ok(())
    }

    fn set_repeat(&mut self, raw: usize, repeat: usize) -> Result<()> {
        let el = self.raws[raw];
        if repeat > 1 {
            self.doc
                .set_attribute(el, self.repeat_attr, itoa::Buffer::new().format(repeat))
        } else {
            self.doc.remove_attribute(el, self.repeat_attr);
            Ok(())
        }
    }

    fn remove(&mut self, raw: usize) -> Result<()> {
        let el = self.raws.remove(raw);
        self.doc.delete_keep_tail(el, false)
    }
}

/// Mutable view over one `table:table` element.
pub struct Table<'d> {
    doc: &'d mut Document,
    element: Element,
    row_map: RepeatMap,
    column_map: RepeatMap,
    raw_rows: Vec<Element>,
    raw_columns: Vec<Element>,
}

impl<'d> Table<'d> {
    // ------------------------------------------------------------------
    // Binding and creation
    // ------------------------------------------------------------------

    /// Bind a view to an existing table element, indexing its direct
    /// row and column children.
    pub fn from_element(doc: &'d mut Document, element: Element) -> Result<Table<'d>> {
        if doc.kind(element) != ElementKind::Table {
            return Err(Error::Structure(format!(
                "expected a table:table element, got {}",
                doc.tag(element)
            )));
        }
        let mut raw_rows = Vec::new();
        let mut raw_columns = Vec::new();
        let mut row_repeats = Vec::new();
        let mut column_repeats = Vec::new();
        for &child in doc.children(element) {
            match doc.kind(child) {
                ElementKind::Row => {
                    row_repeats.push(
                        doc.attribute_uint(child, ROWS_REPEATED)
                            .map_or(1, |n| (n as usize).max(1)),
                    );
                    raw_rows.push(child);
                },
                ElementKind::Column => {
                    column_repeats.push(
                        doc.attribute_uint(child, COLUMNS_REPEATED)
                            .map_or(1, |n| (n as usize).max(1)),
                    );
                    raw_columns.push(child);
                },
                _ => {},
            }
        }
        Ok(Table {
            doc,
            element,
            row_map: RepeatMap::from_repeats(row_repeats),
            column_map: RepeatMap::from_repeats(column_repeats),
            raw_rows,
            raw_columns,
        })
    }

    /// Bind to the table carrying `table:name = name`.
    pub fn by_name(doc: &'d mut Document, name: &str) -> Result<Option<Table<'d>>> {
        match doc.table_by_name(name) {
            Some(element) => Ok(Some(Table::from_element(doc, element)?)),
            None => Ok(None),
        }
    }

    /// Create an empty `width` x `height` table under the document body:
    /// one column run and one row run of empty cells.
    pub fn create(
        doc: &'d mut Document,
        name: &str,
        width: usize,
        height: usize,
    ) -> Result<Table<'d>> {
        let body = doc.body().ok_or_else(|| {
            Error::Structure("document has no content body to hold tables".to_string())
        })?;
        let element = doc.new_element("table:table")?;
        doc.set_attribute(element, "table:name", name)?;
        if width > 0 {
            let column = Column::new().with_repeat(width).encode(doc)?;
            doc.insert(element, column, Position::LastChild)?;
        }
        if height > 0 {
            let mut row = Row::new();
            row.repeated = height;
            if width > 0 {
                row.append_cell(Cell::empty().with_repeat(width));
            }
            let row_el = row.encode(doc)?;
            doc.insert(element, row_el, Position::LastChild)?;
        }
        doc.insert(body, element, Position::LastChild)?;
        Table::from_element(doc, element)
    }

    /// The underlying `table:table` element.
    #[inline]
    pub fn element(&self) -> Element {
        self.element
    }

    pub fn name(&self) -> &str {
        self.doc
            .attribute(self.element, "table:name")
            .unwrap_or_default()
    }

    /// Rename the table, updating named ranges that point at it.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let old = self.name().to_string();
        self.doc.set_attribute(self.element, "table:name", name)?;
        if let Some(body) = self.doc.parent(self.element) {
            range::rename_table(self.doc, body, &old, name)?;
        }
        Ok(())
    }

    pub fn style(&self) -> Option<&str> {
        self.doc.attribute(self.element, "table:style-name")
    }

    pub fn set_style(&mut self, style: Option<&str>) -> Result<()> {
        self.doc
            .set_attribute_opt(self.element, "table:style-name", style)
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Logical column count, from the column map. Not the maximum row
    /// width in general: rows widened behind the map's back are caught up
    /// by the width synchronization every row mutation performs.
    #[inline]
    pub fn width(&self) -> usize {
        self.column_map.total_span()
    }

    /// Logical row count, from the row map.
    #[inline]
    pub fn height(&self) -> usize {
        self.row_map.total_span()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.raw_rows
            .iter()
            .all(|&el| Row::decode(self.doc, el).is_empty(false))
    }

    /// Grow the column side to the widest row. Mutating operations call
    /// this themselves; it is public for trees whose raw XML was edited
    /// through element primitives directly.
    pub fn sync_width(&mut self) -> Result<()> {
        let widest = self
            .raw_rows
            .iter()
            .map(|&el| Row::decode(self.doc, el).width())
            .max()
            .unwrap_or(0);
        self.sync_width_to(widest)
    }

    fn sync_width_to(&mut self, width: usize) -> Result<()> {
        let current = self.width();
        if width <= current {
            return Ok(());
        }
        // One fresh run for the gap: never widen an existing styled run
        let column = Column::new().with_repeat(width - current);
        let element = column.encode(self.doc)?;
        self.attach_column_element(self.raw_columns.len(), element)?;
        self.column_map.push_entry(column.repeated);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    /// Row at `y` (negative counts from the bottom). Past-end reads yield
    /// an empty row.
    pub fn row(&self, y: isize) -> Result<Row> {
        let y = resolve_index(y, self.height())?;
        Ok(self.logical_row(y))
    }

    /// Write a row at `y`, overwriting the `repeated` logical rows it
    /// spans. Writing past the current height pads the gap with empty rows.
    pub fn set_row(&mut self, y: isize, row: Row) -> Result<()> {
        let y = resolve_index(y, self.height())?;
        let width = row.width();
        self.write_row_at(y, &row)?;
        self.sync_width_to(width)
    }

    /// Splice a row in at `y`, shifting later rows down.
    pub fn insert_row(&mut self, y: isize, row: Row) -> Result<()> {
        let y = resolve_index(y, self.height())?;
        if y >= self.height() {
            let width = row.width();
            self.write_row_at(y, &row)?;
            return self.sync_width_to(width);
        }
        let repeat = row.repeated.max(1);
        let element = row.encode(self.doc)?;
        let raw = {
            let mut store = ElementRuns {
                doc: &mut *self.doc,
                raws: &mut self.raw_rows,
                repeat_attr: ROWS_REPEATED,
            };
            self.row_map.insert_at(&mut store, y, repeat)?
        };
        self.attach_row_element(raw, element)?;
        self.sync_width_to(row.width())
    }

    /// Append at the bottom. O(1) on the map: the append path never splits.
    pub fn append_row(&mut self, row: Row) -> Result<()> {
        let element = row.encode(self.doc)?;
        self.attach_row_element(self.raw_rows.len(), element)?;
        self.row_map.push_entry(row.repeated.max(1));
        self.sync_width_to(row.width())
    }

    /// Remove one logical row; `false` past the end.
    pub fn delete_row(&mut self, y: isize) -> Result<bool> {
        let y = resolve_index(y, self.height())?;
        let mut store = ElementRuns {
            doc: &mut *self.doc,
            raws: &mut self.raw_rows,
            repeat_attr: ROWS_REPEATED,
        };
        self.row_map.delete_at(&mut store, y)
    }

    /// Values of one row, padded to the table width.
    pub fn row_values(&self, y: isize) -> Result<Vec<CellValue>> {
        let y = resolve_index(y, self.height())?;
        let row = self.logical_row(y);
        let mut values: Vec<CellValue> = row
            .traverse()
            .map(|cell| {
                if cell.covered {
                    CellValue::Empty
                } else {
                    cell.value
                }
            })
            .collect();
        values.resize(self.width(), CellValue::Empty);
        Ok(values)
    }

    /// Replace row `y` with one single-width cell per value.
    pub fn set_row_values<I, V>(&mut self, y: isize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.set_row(y, Row::from_values(values))
    }

    /// Logical rows in order, repeats expanded. Each item is an owned
    /// decoded copy; every call starts a fresh traversal.
    pub fn iter_rows(&self) -> impl Iterator<Item = Row> + '_ {
        let doc: &Document = self.doc;
        self.raw_rows.iter().enumerate().flat_map(move |(raw, &el)| {
            let mut row = Row::decode(doc, el);
            row.repeated = 1;
            let count = self.row_map.repeat_of(raw);
            (0..count).map(move |_| row.clone())
        })
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    /// Cell at a coordinate (`"B3"`, `(1, 2)`, or a [`Coord`]; negative
    /// components count from the right/bottom edge). Past-edge reads yield
    /// a fresh empty cell carrying the requested position.
    pub fn cell(&self, coord: impl IntoCoord) -> Result<Cell> {
        let (x, y) = self.resolve_coord(coord)?;
        let mut cell = match self.row_map.find_raw(y) {
            Some(raw) => Row::decode(self.doc, self.raw_rows[raw]).cell(x),
            None => Cell::empty(),
        };
        cell.x = Some(x);
        cell.y = Some(y);
        Ok(cell)
    }

    /// Typed value at a coordinate. Covered positions read as empty; the
    /// underlying content stays reachable through [`Table::cell`].
    pub fn value(&self, coord: impl IntoCoord) -> Result<CellValue> {
        let cell = self.cell(coord)?;
        Ok(if cell.covered {
            CellValue::Empty
        } else {
            cell.value
        })
    }

    /// Write a cell, splitting whatever repeated row and cell runs cover
    /// the position. The table grows as needed.
    pub fn set_cell(&mut self, coord: impl IntoCoord, cell: Cell) -> Result<()> {
        let (x, y) = self.resolve_coord(coord)?;
        let mut row = self.logical_row(y);
        row.set_cell(x, cell)?;
        let width = row.width();
        self.write_row_at(y, &row)?;
        self.sync_width_to(width)
    }

    /// Write a typed value, replacing the cell at the coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::Document;
    /// use longan::table::{CellValue, Table};
    ///
    /// let mut doc = Document::new_spreadsheet();
    /// let mut table = Table::create(&mut doc, "Sheet1", 3, 3).unwrap();
    /// table.set_value("B2", 42).unwrap();
    /// assert_eq!(table.value((1, 1)).unwrap(), CellValue::Int(42));
    /// ```
    pub fn set_value(&mut self, coord: impl IntoCoord, value: impl Into<CellValue>) -> Result<()> {
        self.set_cell(coord, Cell::new(value))
    }

    /// Splice a cell into its row at the coordinate, shifting the rest of
    /// the row right.
    pub fn insert_cell(&mut self, coord: impl IntoCoord, cell: Cell) -> Result<()> {
        let (x, y) = self.resolve_coord(coord)?;
        let mut row = self.logical_row(y);
        row.insert_cell(x, cell)?;
        let width = row.width();
        self.write_row_at(y, &row)?;
        self.sync_width_to(width)
    }

    /// Remove one cell from its row, shifting the rest left; `false` past
    /// the row's end.
    pub fn delete_cell(&mut self, coord: impl IntoCoord) -> Result<bool> {
        let (x, y) = self.resolve_coord(coord)?;
        if y >= self.height() {
            return Ok(false);
        }
        let mut row = self.logical_row(y);
        if !row.delete_cell(x)? {
            return Ok(false);
        }
        self.write_row_at(y, &row)?;
        Ok(true)
    }

    /// Append a cell at the right edge of row `y`.
    pub fn append_cell(&mut self, y: isize, cell: Cell) -> Result<()> {
        let y = resolve_index(y, self.height())?;
        let mut row = self.logical_row(y);
        row.append_cell(cell);
        let width = row.width();
        self.write_row_at(y, &row)?;
        self.sync_width_to(width)
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Column metadata at `x`; past-end positions read as a fresh default.
    pub fn column(&self, x: isize) -> Result<Column> {
        let x = resolve_index(x, self.width())?;
        Ok(match self.column_map.find_raw(x) {
            Some(raw) => {
                let mut column = Column::decode(self.doc, self.raw_columns[raw]);
                column.repeated = 1;
                column
            },
            None => Column::new(),
        })
    }

    /// Write column metadata at `x`, overwriting the `repeated` positions
    /// it spans.
    pub fn set_column(&mut self, x: isize, column: Column) -> Result<()> {
        let x = resolve_index(x, self.width())?;
        let mut column = column;
        column.repeated = column.repeated.max(1);
        let width = self.width();
        if x >= width {
            if x > width {
                let filler = Column::new().with_repeat(x - width);
                let element = filler.encode(self.doc)?;
                self.attach_column_element(self.raw_columns.len(), element)?;
                self.column_map.push_entry(filler.repeated);
            }
            let element = column.encode(self.doc)?;
            self.attach_column_element(self.raw_columns.len(), element)?;
            self.column_map.push_entry(column.repeated);
            return Ok(());
        }
        let element = column.encode(self.doc)?;
        let raw = {
            let mut store = ElementRuns {
                doc: &mut *self.doc,
                raws: &mut self.raw_columns,
                repeat_attr: COLUMNS_REPEATED,
            };
            self.column_map.replace_span(&mut store, x, column.repeated)?
        };
        self.attach_column_element(raw, element)
    }

    /// Splice a column in at `x`, opening a matching cell gap in every raw
    /// row that reaches the position.
    pub fn insert_column(&mut self, x: isize, column: Column) -> Result<()> {
        let x = resolve_index(x, self.width())?;
        if x >= self.width() {
            return self.set_column(x as isize, column);
        }
        let mut column = column;
        column.repeated = column.repeated.max(1);
        let element = column.encode(self.doc)?;
        let raw = {
            let mut store = ElementRuns {
                doc: &mut *self.doc,
                raws: &mut self.raw_columns,
                repeat_attr: COLUMNS_REPEATED,
            };
            self.column_map.insert_at(&mut store, x, column.repeated)?
        };
        self.attach_column_element(raw, element)?;

        for raw_row in 0..self.raw_rows.len() {
            let mut row = Row::decode(self.doc, self.raw_rows[raw_row]);
            if x < row.width() {
                row.insert_cell(x, Cell::empty().with_repeat(column.repeated))?;
                self.rewrite_raw_row(raw_row, &row)?;
            }
        }
        Ok(())
    }

    /// Append a column run at the right edge. Rows are untouched; reads
    /// past their width already yield empty cells.
    pub fn append_column(&mut self, column: Column) -> Result<()> {
        let mut column = column;
        column.repeated = column.repeated.max(1);
        let element = column.encode(self.doc)?;
        self.attach_column_element(self.raw_columns.len(), element)?;
        self.column_map.push_entry(column.repeated);
        Ok(())
    }

    /// Remove one column position, deleting one cell from every raw row
    /// that reaches it; `false` past the table width.
    pub fn delete_column(&mut self, x: isize) -> Result<bool> {
        let x = resolve_index(x, self.width())?;
        if x >= self.width() {
            return Ok(false);
        }
        {
            let mut store = ElementRuns {
                doc: &mut *self.doc,
                raws: &mut self.raw_columns,
                repeat_attr: COLUMNS_REPEATED,
            };
            self.column_map.delete_at(&mut store, x)?;
        }
        for raw_row in 0..self.raw_rows.len() {
            let mut row = Row::decode(self.doc, self.raw_rows[raw_row]);
            if x < row.width() {
                row.delete_cell(x)?;
                self.rewrite_raw_row(raw_row, &row)?;
            }
        }
        Ok(true)
    }

    /// Values of one column, top to bottom, padded to the table height.
    pub fn column_values(&self, x: isize) -> Result<Vec<CellValue>> {
        let x = resolve_index(x, self.width())?;
        let mut values = Vec::with_capacity(self.height());
        for y in 0..self.height() {
            let cell = self.logical_row(y).cell(x);
            values.push(if cell.covered {
                CellValue::Empty
            } else {
                cell.value
            });
        }
        Ok(values)
    }

    /// Write a column of values, top to bottom.
    pub fn set_column_values<I, V>(&mut self, x: isize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let x = resolve_index(x, self.width())?;
        for (y, value) in values.into_iter().enumerate() {
            self.set_cell((x, y), Cell::new(value))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bulk values
    // ------------------------------------------------------------------

    /// The whole table as a complete matrix: every row padded to the table
    /// width, covered cells read as empty.
    pub fn values(&self) -> Vec<Vec<CellValue>> {
        self.iter_values().collect()
    }

    /// Row-by-row value enumeration over the full table.
    pub fn iter_values(&self) -> impl Iterator<Item = Vec<CellValue>> + '_ {
        let width = self.width();
        self.iter_rows().map(move |row| {
            let mut values: Vec<CellValue> = row
                .traverse()
                .map(|cell| {
                    if cell.covered {
                        CellValue::Empty
                    } else {
                        cell.value
                    }
                })
                .collect();
            values.resize(width, CellValue::Empty);
            values
        })
    }

    /// Values of a rectangular area.
    ///
    /// `complete` pads each result row to the area width so the matrix is
    /// uniform even over sparse rows; without it rows stop at their actual
    /// width. Cells not matching `filter` read as empty placeholders.
    pub fn area_values(
        &self,
        area: impl IntoArea,
        filter: CellFilter,
        complete: bool,
    ) -> Result<Vec<Vec<CellValue>>> {
        let ((x0, y0), (x1, y1)) = self.resolve_area(area)?;
        let mut out = Vec::with_capacity(y1 - y0 + 1);
        for y in y0..=y1 {
            let row = self.logical_row(y);
            let mut values = Vec::with_capacity(x1 - x0 + 1);
            for x in x0..=x1 {
                if !complete && x >= row.width() {
                    break;
                }
                let cell = row.cell(x);
                let value = if cell.covered {
                    CellValue::Empty
                } else {
                    cell.value
                };
                values.push(if value.matches(filter) {
                    value
                } else {
                    CellValue::Empty
                });
            }
            out.push(values);
        }
        Ok(out)
    }

    /// Flattened [`Table::area_values`], row-major.
    pub fn values_flat(&self, area: impl IntoArea, filter: CellFilter) -> Result<Vec<CellValue>> {
        Ok(self.area_values(area, filter, true)?.concat())
    }

    /// Write a matrix of values with its top-left corner at `start`,
    /// growing the table as needed.
    pub fn set_values(&mut self, start: impl IntoCoord, values: &[Vec<CellValue>]) -> Result<()> {
        let (x0, y0) = self.resolve_coord(start)?;
        let mut widest = 0;
        for (dy, row_values) in values.iter().enumerate() {
            let y = y0 + dy;
            let mut row = self.logical_row(y);
            for (dx, value) in row_values.iter().enumerate() {
                row.set_cell(x0 + dx, Cell::new(value.clone()))?;
            }
            self.write_row_at(y, &row)?;
            widest = widest.max(row.width());
        }
        self.sync_width_to(widest)
    }

    // ------------------------------------------------------------------
    // Whole-table transforms
    // ------------------------------------------------------------------

    /// Swap rows and columns in place. Content is rebuilt from values, so
    /// row, column and cell styles do not survive a whole-table transpose.
    pub fn transpose(&mut self) -> Result<()> {
        let values = self.values();
        let height = values.len();
        let width = values.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut flipped = vec![vec![CellValue::Empty; height]; width];
        for (y, row) in values.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                flipped[x][y] = value.clone();
            }
        }
        self.clear_content()?;
        if flipped.is_empty() {
            return Ok(());
        }
        self.set_values((0usize, 0usize), &flipped)
    }

    /// Transpose a rectangular sub-area about its top-left corner.
    ///
    /// When the area is not square the target rectangle (swapped
    /// dimensions) is cleared first, so stale source cells never
    /// interleave with transposed ones. Source cells outside the target
    /// keep their old content.
    pub fn transpose_area(&mut self, area: impl IntoArea) -> Result<()> {
        let ((x0, y0), (x1, y1)) = self.resolve_area(area)?;
        let w = x1 - x0 + 1;
        let h = y1 - y0 + 1;
        let block = self.area_values((x0, y0, x1, y1), CellFilter::Any, true)?;
        let mut flipped = vec![vec![CellValue::Empty; h]; w];
        for (dy, row) in block.iter().enumerate() {
            for (dx, value) in row.iter().enumerate() {
                flipped[dx][dy] = value.clone();
            }
        }
        if w != h {
            let blank = vec![vec![CellValue::Empty; h]; w];
            self.set_values((x0, y0), &blank)?;
        }
        self.set_values((x0, y0), &flipped)
    }

    /// Trim trailing emptiness: wholly-empty bottom rows first, then
    /// trailing empty cells in each remaining row, then the column side
    /// down to the new widest row. The order matters; each pass feeds the
    /// next.
    pub fn rstrip(&mut self, aggressive: bool) -> Result<()> {
        loop {
            let Some(&last) = self.raw_rows.last() else {
                break;
            };
            let row = Row::decode(self.doc, last);
            let removable = row.is_empty(aggressive) && (aggressive || row.style.is_none());
            if !removable {
                break;
            }
            self.raw_rows.pop();
            self.row_map.erase_entry(self.row_map.len() - 1);
            self.doc.delete_keep_tail(last, false)?;
        }

        let mut widest = 0;
        for raw in 0..self.raw_rows.len() {
            let mut row = Row::decode(self.doc, self.raw_rows[raw]);
            let before = row.width();
            row.rstrip(aggressive);
            if row.width() != before {
                self.rewrite_raw_row(raw, &row)?;
            }
            widest = widest.max(row.width());
        }

        self.shrink_width_to(widest)
    }

    // ------------------------------------------------------------------
    // Merged cells
    // ------------------------------------------------------------------

    /// Merge an area: the top-left cell becomes the span anchor, every
    /// other covered. Covered cells keep their values but read as empty
    /// through value enumeration. Overlapping an existing merge is an
    /// error; a single-cell area is a no-op.
    pub fn set_span(&mut self, area: impl IntoArea) -> Result<bool> {
        let ((x0, y0), (x1, y1)) = self.resolve_area(area)?;
        if x0 == x1 && y0 == y1 {
            return Ok(false);
        }
        for y in y0..=y1 {
            let row = self.logical_row(y);
            for x in x0..=x1 {
                let cell = row.cell(x);
                if cell.span.is_some() || cell.covered {
                    return Err(Error::Structure(format!(
                        "cell {} is already part of a span",
                        Coord::new(x as isize, y as isize)
                    )));
                }
            }
        }
        for y in y0..=y1 {
            let mut row = self.logical_row(y);
            for x in x0..=x1 {
                let mut cell = row.cell(x);
                if x == x0 && y == y0 {
                    cell.span = Some((x1 - x0 + 1, y1 - y0 + 1));
                } else {
                    cell.covered = true;
                }
                row.set_cell(x, cell)?;
            }
            self.write_row_at(y, &row)?;
        }
        self.sync_width_to(x1 + 1)?;
        Ok(true)
    }

    /// Unmerge the span anchored at `anchor`; `false` when there is none.
    pub fn del_span(&mut self, anchor: impl IntoCoord) -> Result<bool> {
        let (x0, y0) = self.resolve_coord(anchor)?;
        let Some((w, h)) = self.logical_row(y0).cell(x0).span else {
            return Ok(false);
        };
        for y in y0..y0 + h {
            let mut row = self.logical_row(y);
            for x in x0..x0 + w {
                let mut cell = row.cell(x);
                cell.span = None;
                cell.covered = false;
                row.set_cell(x, cell)?;
            }
            self.write_row_at(y, &row)?;
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Named ranges
    // ------------------------------------------------------------------

    /// Named ranges pointing at this table.
    pub fn named_ranges(&self) -> Vec<NamedRange> {
        let Some(body) = self.doc.parent(self.element) else {
            return Vec::new();
        };
        range::named_ranges(self.doc, body)
            .into_iter()
            .filter(|r| r.table_name == self.name())
            .collect()
    }

    /// Range by name, searched document-wide; `None` for unknown names.
    pub fn named_range(&self, name: &str) -> Option<NamedRange> {
        let body = self.doc.parent(self.element)?;
        range::named_ranges(self.doc, body)
            .into_iter()
            .find(|r| r.name == name)
    }

    /// Create or replace a named range over an area of this table. The
    /// range lives at the body level, outside the table element, so it
    /// survives table cloning.
    pub fn set_named_range(&mut self, name: &str, area: impl IntoArea) -> Result<()> {
        let ((x0, y0), (x1, y1)) = self.resolve_area(area)?;
        let body = self.doc.parent(self.element).ok_or_else(|| {
            Error::Structure("table is not attached to a spreadsheet body".to_string())
        })?;
        let named = NamedRange {
            name: name.to_string(),
            table_name: self.name().to_string(),
            area: (x0, y0, x1, y1).into_area()?,
        };
        range::set_named_range(self.doc, body, &named)
    }

    /// Delete a named range by name. Removing the last one also removes
    /// the now-empty container element.
    pub fn delete_named_range(&mut self, name: &str) -> Result<bool> {
        let Some(body) = self.doc.parent(self.element) else {
            return Ok(false);
        };
        range::delete_named_range(self.doc, body, name)
    }

    // ------------------------------------------------------------------
    // CSV
    // ------------------------------------------------------------------

    /// Export as CSV in the fixed output dialect: comma-delimited, every
    /// field double-quoted, embedded quotes doubled, `\n` terminated.
    pub fn to_csv(&self) -> String {
        csv::export(self, &Dialect::default())
    }

    pub fn to_csv_with(&self, dialect: &Dialect) -> String {
        csv::export(self, dialect)
    }

    /// Build a table from CSV text, sniffing the dialect from the input.
    pub fn from_csv(doc: &'d mut Document, name: &str, data: &str) -> Result<Table<'d>> {
        let dialect = Dialect::sniff(data);
        Table::from_csv_with(doc, name, data, &dialect)
    }

    pub fn from_csv_with(
        doc: &'d mut Document,
        name: &str,
        data: &str,
        dialect: &Dialect,
    ) -> Result<Table<'d>> {
        let rows = csv::parse(data, dialect);
        let mut table = Table::create(doc, name, 0, 0)?;
        table.set_values((0usize, 0usize), &rows)?;
        Ok(table)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn resolve_coord(&self, coord: impl IntoCoord) -> Result<(usize, usize)> {
        coord.into_coord()?.resolve(self.width(), self.height())
    }

    fn resolve_area(&self, area: impl IntoArea) -> Result<((usize, usize), (usize, usize))> {
        area.into_area()?.resolve(self.width(), self.height())
    }

    /// Decoded copy of the row covering logical `y`, normalized to a
    /// single-row repeat; an empty row past the end.
    fn logical_row(&self, y: usize) -> Row {
        match self.row_map.find_raw(y) {
            Some(raw) => {
                let mut row = Row::decode(self.doc, self.raw_rows[raw]);
                row.repeated = 1;
                row
            },
            None => Row::new(),
        }
    }

    /// Encode and place a row so it covers `[y, y + row.repeated)`,
    /// splitting and consuming covering runs; pads with an empty run when
    /// `y` is past the bottom.
    fn write_row_at(&mut self, y: usize, row: &Row) -> Result<()> {
        let height = self.height();
        if y > height {
            let mut filler = Row::new();
            filler.repeated = y - height;
            let element = filler.encode(self.doc)?;
            self.attach_row_element(self.raw_rows.len(), element)?;
            self.row_map.push_entry(filler.repeated);
        }
        let repeat = row.repeated.max(1);
        let element = row.encode(self.doc)?;
        let raw = {
            let mut store = ElementRuns {
                doc: &mut *self.doc,
                raws: &mut self.raw_rows,
                repeat_attr: ROWS_REPEATED,
            };
            self.row_map.replace_span(&mut store, y, repeat)?
        };
        self.attach_row_element(raw, element)
    }

    /// Put a detached row element into the tree and the raw index at `raw`.
    fn attach_row_element(&mut self, raw: usize, element: Element) -> Result<()> {
        if raw < self.raw_rows.len() {
            self.doc
                .insert(self.raw_rows[raw], element, Position::PrevSibling)?;
        } else if let Some(&last) = self.raw_rows.last() {
            self.doc.insert(last, element, Position::NextSibling)?;
        } else {
            self.doc.insert(self.element, element, Position::LastChild)?;
        }
        self.raw_rows.insert(raw, element);
        Ok(())
    }

    /// Put a detached column element into the tree and the raw index at
    /// `raw`. Columns always precede rows among the table's children.
    fn attach_column_element(&mut self, raw: usize, element: Element) -> Result<()> {
        if raw < self.raw_columns.len() {
            self.doc
                .insert(self.raw_columns[raw], element, Position::PrevSibling)?;
        } else if let Some(&last) = self.raw_columns.last() {
            self.doc.insert(last, element, Position::NextSibling)?;
        } else if let Some(&first_row) = self.raw_rows.first() {
            self.doc.insert(first_row, element, Position::PrevSibling)?;
        } else {
            self.doc.insert(self.element, element, Position::LastChild)?;
        }
        self.raw_columns.insert(raw, element);
        Ok(())
    }

    /// Swap the raw row at `raw` for a re-encoded replacement, in place.
    fn rewrite_raw_row(&mut self, raw: usize, row: &Row) -> Result<()> {
        let old = self.raw_rows[raw];
        let element = row.encode(self.doc)?;
        self.doc.insert(old, element, Position::PrevSibling)?;
        self.doc.delete_keep_tail(old, false)?;
        self.raw_rows[raw] = element;
        Ok(())
    }

    /// Drop all rows and columns, resetting both maps.
    fn clear_content(&mut self) -> Result<()> {
        for element in std::mem::take(&mut self.raw_rows) {
            self.doc.delete_keep_tail(element, false)?;
        }
        for element in std::mem::take(&mut self.raw_columns) {
            self.doc.delete_keep_tail(element, false)?;
        }
        self.row_map = RepeatMap::new();
        self.column_map = RepeatMap::new();
        Ok(())
    }

    /// Shrink the column side to `width` positions, trimming or dropping
    /// trailing runs.
    fn shrink_width_to(&mut self, width: usize) -> Result<()> {
        while self.column_map.total_span() > width {
            let raw = self.column_map.len() - 1;
            let start = self.column_map.start_of(raw);
            if start >= width {
                let element = self.raw_columns[raw];
                self.raw_columns.pop();
                self.column_map.erase_entry(raw);
                self.doc.delete_keep_tail(element, false)?;
            } else {
                let keep = width - start;
                self.column_map.set_repeat_entry(raw, keep);
                let element = self.raw_columns[raw];
                if keep > 1 {
                    self.doc.set_attribute(
                        element,
                        COLUMNS_REPEATED,
                        itoa::Buffer::new().format(keep),
                    )?;
                } else {
                    self.doc.remove_attribute(element, COLUMNS_REPEATED);
                }
            }
        }
        Ok(())
    }
}

impl Document {
    /// All `table:table` elements, in document order.
    pub fn table_elements(&self) -> Vec<Element> {
        self.query_elements(self.root(), "//table:table")
            .unwrap_or_default()
    }

    /// The table element named `name`, if any.
    pub fn table_by_name(&self, name: &str) -> Option<Element> {
        self.table_elements()
            .into_iter()
            .find(|&el| self.attribute(el, "table:name") == Some(name))
    }
}
