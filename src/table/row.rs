//! Table rows: run-length cell sequences and their XML codec.

use crate::Result;
use crate::element::{Document, Element, Position};
use crate::table::cell::{Cell, CellValue};
use crate::table::repeat::{RepeatMap, RunStore};

impl RunStore for Vec<Cell> {
    fn split_run(&mut self, raw: usize, keep: usize, rest: usize) -> Result<()> {
        let mut copy = self[raw].clone();
        self[raw].repeated = keep;
        copy.repeated = rest;
        self.insert(raw + 1, copy);
        Ok(())
    }

    fn set_repeat(&mut self, raw: usize, repeat: usize) -> Result<()> {
        self[raw].repeated = repeat;
        Ok(())
    }

    fn remove(&mut self, raw: usize) -> Result<()> {
        Vec::remove(self, raw);
        Ok(())
    }
}

/// A table row: raw cell runs plus the map that expands them.
///
/// A `Row` is an owned value decoded out of the tree; mutations touch the
/// copy, and writing it back through the table re-encodes it. `repeated`
/// is the row's own `table:number-rows-repeated` count.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
    map: RepeatMap,
    /// Row repeat count in the table
    pub repeated: usize,
    /// Row style name
    pub style: Option<String>,
}

impl Default for Row {
    fn default() -> Self {
        Row {
            cells: Vec::new(),
            map: RepeatMap::new(),
            repeated: 1,
            style: None,
        }
    }
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    /// Row with one single-width cell per value.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut row = Row::new();
        row.set_values(values);
        row
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let map = RepeatMap::from_repeats(cells.iter().map(|c| c.repeated.max(1)));
        Row {
            cells,
            map,
            ..Row::default()
        }
    }

    /// Logical width: repeat counts summed over all raw cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.map.total_span()
    }

    /// No cell carries content. Styled empty cells only count as content
    /// outside aggressive mode.
    pub fn is_empty(&self, aggressive: bool) -> bool {
        self.cells
            .iter()
            .all(|c| c.is_empty() && (aggressive || c.style.is_none()))
    }

    // ------------------------------------------------------------------
    // Cell access
    // ------------------------------------------------------------------

    /// Cell at logical position `x`.
    ///
    /// Reading past the row's width yields a fresh empty cell rather than
    /// an error; sparse rows are a normal state.
    pub fn cell(&self, x: usize) -> Cell {
        let mut cell = match self.map.find_raw(x) {
            Some(raw) => {
                let mut cell = self.cells[raw].clone();
                cell.repeated = 1;
                cell
            },
            None => Cell::empty(),
        };
        cell.x = Some(x);
        cell
    }

    /// Expanded cells in order, each clone carrying its logical `x`.
    /// Restartable: every call builds a fresh iterator.
    pub fn traverse(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().enumerate().flat_map(move |(raw, cell)| {
            let start = self.map.start_of(raw);
            (0..cell.repeated).map(move |offset| {
                let mut cell = cell.clone();
                cell.repeated = 1;
                cell.x = Some(start + offset);
                cell
            })
        })
    }

    /// Like [`Row::traverse`], clamped to logical positions `[start, end)`.
    pub fn traverse_range(&self, start: usize, end: usize) -> impl Iterator<Item = Cell> + '_ {
        self.traverse().filter(move |cell| {
            let x = cell.x.unwrap_or(0);
            x >= start && x < end
        })
    }

    /// Expanded values in order.
    pub fn values(&self) -> Vec<CellValue> {
        self.traverse().map(|cell| cell.value).collect()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replace the whole cell content with one single-width cell per value.
    pub fn set_values<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.cells = values.into_iter().map(Cell::new).collect();
        self.map = RepeatMap::from_repeats(self.cells.iter().map(|c| c.repeated));
    }

    /// Write a cell at logical position `x`, overwriting the `repeated`
    /// positions it spans. Past-end writes pad the gap with an empty run.
    pub fn set_cell(&mut self, x: usize, cell: Cell) -> Result<()> {
        let mut cell = cell;
        cell.repeated = cell.repeated.max(1);
        let width = self.width();
        if x >= width {
            if x > width {
                let filler = Cell::empty().with_repeat(x - width);
                self.map.push_entry(filler.repeated);
                self.cells.push(filler);
            }
            self.map.push_entry(cell.repeated);
            self.cells.push(cell);
            return Ok(());
        }
        let raw = self.map.replace_span(&mut self.cells, x, cell.repeated)?;
        self.cells.insert(raw, cell);
        Ok(())
    }

    /// Splice a cell in at `x`, shifting later cells right.
    pub fn insert_cell(&mut self, x: usize, cell: Cell) -> Result<()> {
        if x >= self.width() {
            return self.set_cell(x, cell);
        }
        let mut cell = cell;
        cell.repeated = cell.repeated.max(1);
        let raw = self.map.insert_at(&mut self.cells, x, cell.repeated)?;
        self.cells.insert(raw, cell);
        Ok(())
    }

    /// Remove one logical position; `false` past the end.
    pub fn delete_cell(&mut self, x: usize) -> Result<bool> {
        self.map.delete_at(&mut self.cells, x)
    }

    /// Append at the right edge. O(1): the append path never splits.
    pub fn append_cell(&mut self, cell: Cell) {
        let mut cell = cell;
        cell.repeated = cell.repeated.max(1);
        self.map.push_entry(cell.repeated);
        self.cells.push(cell);
    }

    /// Trim trailing empty cells, then rebuild the map. Styled cells stop
    /// the trim unless `aggressive`; merge geometry always stops it.
    pub fn rstrip(&mut self, aggressive: bool) {
        while let Some(last) = self.cells.last() {
            let bare = last.is_empty() && !last.covered && last.span.is_none();
            if bare && (aggressive || last.style.is_none()) {
                self.cells.pop();
            } else {
                break;
            }
        }
        self.map = RepeatMap::from_repeats(self.cells.iter().map(|c| c.repeated));
    }

    // ------------------------------------------------------------------
    // XML codec
    // ------------------------------------------------------------------

    /// Decode a `table:table-row` element and its cells.
    pub(crate) fn decode(doc: &Document, el: Element) -> Row {
        let repeated = doc
            .attribute_uint(el, "table:number-rows-repeated")
            .map_or(1, |n| (n as usize).max(1));
        let style = doc.attribute(el, "table:style-name").map(str::to_string);
        let cells: Vec<Cell> = doc
            .children(el)
            .iter()
            .filter(|&&child| doc.kind(child).is_cell())
            .map(|&child| Cell::decode(doc, child))
            .collect();
        let map = RepeatMap::from_repeats(cells.iter().map(|c| c.repeated));
        Row {
            cells,
            map,
            repeated,
            style,
        }
    }

    /// Encode into a detached `table:table-row` element.
    pub(crate) fn encode(&self, doc: &mut Document) -> Result<Element> {
        let el = doc.new_element("table:table-row")?;
        if self.repeated > 1 {
            doc.set_attribute(
                el,
                "table:number-rows-repeated",
                itoa::Buffer::new().format(self.repeated),
            )?;
        }
        if let Some(style) = &self.style {
            doc.set_attribute(el, "table:style-name", style)?;
        }
        for cell in &self.cells {
            let cell_el = cell.encode(doc)?;
            doc.insert(el, cell_el, Position::LastChild)?;
        }
        Ok(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeats(row: &Row) -> Vec<usize> {
        row.cells.iter().map(|c| c.repeated).collect()
    }

    #[test]
    fn test_cell_past_width_is_empty() {
        let row = Row::from_values(["a"]);
        assert_eq!(row.width(), 1);
        let cell = row.cell(5);
        assert!(cell.is_empty());
        assert_eq!(cell.x, Some(5));
    }

    #[test]
    fn test_set_cell_splits_a_repeated_run() {
        let mut row = Row::from_cells(vec![Cell::new("x").with_repeat(5)]);
        row.set_cell(2, Cell::new("y")).unwrap();

        assert_eq!(repeats(&row), vec![2, 1, 2]);
        let values: Vec<CellValue> = row.values();
        assert_eq!(
            values,
            vec![
                CellValue::Text("x".to_string()),
                CellValue::Text("x".to_string()),
                CellValue::Text("y".to_string()),
                CellValue::Text("x".to_string()),
                CellValue::Text("x".to_string()),
            ]
        );
        assert_eq!(row.width(), 5);
    }

    #[test]
    fn test_set_cell_past_width_pads_with_empty() {
        let mut row = Row::from_values([1i64]);
        row.set_cell(3, Cell::new(2i64)).unwrap();
        assert_eq!(row.width(), 4);
        assert_eq!(repeats(&row), vec![1, 2, 1]);
        assert!(row.cell(1).is_empty());
        assert!(row.cell(2).is_empty());
        assert_eq!(row.cell(3).value, CellValue::Int(2));
    }

    #[test]
    fn test_wide_set_cell_consumes_positions() {
        let mut row = Row::from_values(["a", "b", "c", "d"]);
        row.set_cell(1, Cell::new("w").with_repeat(2)).unwrap();
        assert_eq!(row.width(), 4);
        assert_eq!(
            row.values(),
            vec![
                CellValue::Text("a".to_string()),
                CellValue::Text("w".to_string()),
                CellValue::Text("w".to_string()),
                CellValue::Text("d".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_cell_shifts_right() {
        let mut row = Row::from_values(["a", "b"]);
        row.insert_cell(1, Cell::new("x")).unwrap();
        assert_eq!(row.width(), 3);
        assert_eq!(
            row.values(),
            vec![
                CellValue::Text("a".to_string()),
                CellValue::Text("x".to_string()),
                CellValue::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_delete_cell_decrements_runs() {
        let mut row = Row::from_cells(vec![Cell::new("x").with_repeat(3), Cell::new("y")]);
        assert!(row.delete_cell(0).unwrap());
        assert_eq!(repeats(&row), vec![2, 1]);
        assert!(row.delete_cell(2).unwrap());
        assert_eq!(repeats(&row), vec![2]);
        assert!(!row.delete_cell(10).unwrap());
    }

    #[test]
    fn test_append_cell_extends_the_map() {
        let mut row = Row::new();
        row.append_cell(Cell::new("a").with_repeat(2));
        row.append_cell(Cell::new("b"));
        assert_eq!(row.width(), 3);
        assert_eq!(repeats(&row), vec![2, 1]);
    }

    #[test]
    fn test_traverse_assigns_positions_and_restarts() {
        let row = Row::from_cells(vec![Cell::new("x").with_repeat(2), Cell::new("y")]);
        let first: Vec<(Option<usize>, CellValue)> =
            row.traverse().map(|c| (c.x, c.value)).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].0, Some(0));
        assert_eq!(first[1].0, Some(1));
        assert_eq!(first[2], (Some(2), CellValue::Text("y".to_string())));
        for cell in row.traverse() {
            assert_eq!(cell.repeated, 1);
        }

        // A second traversal starts over
        assert_eq!(row.traverse().count(), 3);
        let ranged: Vec<usize> = row
            .traverse_range(1, 3)
            .map(|c| c.x.unwrap_or(0))
            .collect();
        assert_eq!(ranged, vec![1, 2]);
    }

    #[test]
    fn test_rstrip_respects_styles() {
        let mut row = Row::from_cells(vec![
            Cell::new("a"),
            Cell::empty().with_style("ce1"),
            Cell::empty().with_repeat(3),
        ]);
        row.rstrip(false);
        assert_eq!(row.width(), 2);

        row.rstrip(true);
        assert_eq!(row.width(), 1);
        assert_eq!(row.cell(0).value, CellValue::Text("a".to_string()));
    }

    #[test]
    fn test_codec_round_trip() {
        let mut doc = Document::new_spreadsheet();
        let mut int_cell = Cell::new(1i64);
        int_cell.text = Some("1".to_string());
        let mut row = Row::from_cells(vec![int_cell, Cell::empty().with_repeat(3)]);
        row.repeated = 4;
        row.style = Some("ro1".to_string());

        let el = row.encode(&mut doc).unwrap();
        assert_eq!(doc.attribute(el, "table:number-rows-repeated"), Some("4"));
        let back = Row::decode(&doc, el);
        assert_eq!(back, row);
    }
}
