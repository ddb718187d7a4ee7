//! Path queries over the document tree.
//!
//! Supports the XPath subset that structured ODF lookups need:
//!
//! ```text
//! expr      := path ('|' path)*
//! path      := ('/' | '//')? step (('/' | '//') step)*
//! step      := qname | '*' | 'text()' | '.' | '..'   followed by predicates
//! predicate := '[' '@' qname ']'
//!            | '[' '@' qname '=' quoted ']'
//!            | '[' integer ']'                        1-based
//! ```
//!
//! `/` selects children, `//` selects descendants; a leading separator
//! anchors the path at the topmost ancestor of the context element.
//! Positional predicates count the matches produced within one context
//! node's step evaluation. `text()` selects the text runs owned by the
//! matched element (leading text plus each child's tail) and must be the
//! final step.
//!
//! Compiling an expression costs far more than running it on typical
//! documents, so compiled queries are memoized in a process-wide cache
//! keyed by the literal expression string. Compilation failures are not
//! cached.

use crate::element::{Document, Element};
use crate::{Error, Result, namespace};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

static QUERY_CACHE: Lazy<RwLock<HashMap<String, Arc<CompiledQuery>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// One result of a query: an element handle or an owned text run.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem {
    /// A matched element
    Element(Element),
    /// A matched text run, detached from its slot
    Text(String),
}

impl QueryItem {
    /// The element behind this item, if it is one.
    #[inline]
    pub fn as_element(&self) -> Option<Element> {
        match self {
            QueryItem::Element(el) => Some(*el),
            QueryItem::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Wildcard,
    Text,
    Current,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEq(String, String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathExpr {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledQuery {
    paths: Vec<PathExpr>,
}

/// Fetch a compiled query from the cache, compiling on first use.
fn compiled(expr: &str) -> Result<Arc<CompiledQuery>> {
    if let Some(query) = QUERY_CACHE.read().get(expr) {
        return Ok(Arc::clone(query));
    }
    let query = Arc::new(Parser::new(expr).parse()?);
    QUERY_CACHE
        .write()
        .insert(expr.to_string(), Arc::clone(&query));
    Ok(query)
}

// ======================================================================
// Expression parser
// ======================================================================

struct Parser<'a> {
    expr: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Parser {
            expr,
            bytes: expr.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<CompiledQuery> {
        let mut paths = Vec::new();
        loop {
            paths.push(self.parse_path()?);
            self.skip_ws();
            if self.eat(b'|') {
                continue;
            }
            break;
        }
        if self.pos != self.bytes.len() {
            return Err(self.fail("trailing input"));
        }
        Ok(CompiledQuery { paths })
    }

    fn parse_path(&mut self) -> Result<PathExpr> {
        self.skip_ws();
        let absolute = self.peek() == Some(b'/');
        let mut axis = if absolute {
            self.parse_separator()
        } else {
            Axis::Child
        };

        let mut steps = Vec::new();
        loop {
            steps.push(self.parse_step(axis)?);
            match self.peek() {
                Some(b'/') => axis = self.parse_separator(),
                _ => break,
            }
        }
        for step in &steps[..steps.len() - 1] {
            if step.test == NodeTest::Text {
                return Err(self.fail("text() must be the final step"));
            }
        }
        Ok(PathExpr { absolute, steps })
    }

    fn parse_separator(&mut self) -> Axis {
        self.pos += 1;
        if self.peek() == Some(b'/') {
            self.pos += 1;
            Axis::Descendant
        } else {
            Axis::Child
        }
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step> {
        let test = match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                NodeTest::Wildcard
            },
            Some(b'.') => {
                self.pos += 1;
                if self.peek() == Some(b'.') {
                    self.pos += 1;
                    NodeTest::Parent
                } else {
                    NodeTest::Current
                }
            },
            _ => {
                let name = self.parse_name()?;
                if name == "text" && self.eat(b'(') {
                    if !self.eat(b')') {
                        return Err(self.fail("expected ')' after 'text('"));
                    }
                    NodeTest::Text
                } else {
                    namespace::resolve(&name)?;
                    NodeTest::Name(name)
                }
            },
        };

        let mut predicates = Vec::new();
        while self.eat(b'[') {
            predicates.push(self.parse_predicate()?);
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        let predicate = if self.eat(b'@') {
            let name = self.parse_name()?;
            namespace::resolve(&name)?;
            self.skip_ws();
            if self.eat(b'=') {
                self.skip_ws();
                let value = self.parse_quoted()?;
                Predicate::AttrEq(name, value)
            } else {
                Predicate::HasAttr(name)
            }
        } else {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            if start == self.pos {
                return Err(self.fail("expected '@name' or a position"));
            }
            let index = atoi_simd::parse::<u64>(&self.bytes[start..self.pos])
                .map_err(|_| self.fail("invalid position"))? as usize;
            if index == 0 {
                return Err(self.fail("positions are 1-based"));
            }
            Predicate::Index(index)
        };
        self.skip_ws();
        if !self.eat(b']') {
            return Err(self.fail("expected ']'"));
        }
        Ok(predicate)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_alphanumeric() || c == b':' || c == b'-' || c == b'_'
        ) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.fail("expected a name"));
        }
        Ok(self.expr[start..self.pos].to_string())
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(c @ (b'"' | b'\'')) => c,
            _ => return Err(self.fail("expected a quoted value")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.expr[start..self.pos].to_string();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.fail("unterminated quoted value"))
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn fail(&self, message: &str) -> Error {
        Error::Query(format!(
            "{} at offset {} in {:?}",
            message, self.pos, self.expr
        ))
    }
}

// ======================================================================
// Evaluation
// ======================================================================

impl Document {
    /// Evaluate a path expression against a context element.
    ///
    /// Results follow traversal order, which is document order for child
    /// and descendant steps; unions of element paths are merged back into
    /// document order.
    pub fn query(&self, context: Element, expr: &str) -> Result<Vec<QueryItem>> {
        let query = compiled(expr)?;
        let mut elements: Vec<Element> = Vec::new();
        let mut texts: Vec<String> = Vec::new();
        let mut seen: HashSet<Element> = HashSet::new();

        for path in &query.paths {
            let start = if path.absolute {
                self.topmost(context)
            } else {
                context
            };
            let (path_elements, path_texts) = self.eval_path(start, path);
            for el in path_elements {
                if seen.insert(el) {
                    elements.push(el);
                }
            }
            texts.extend(path_texts);
        }

        if query.paths.len() > 1 && elements.len() > 1 {
            let order = self.preorder_index(self.topmost(context));
            elements.sort_by_key(|el| order.get(el).copied().unwrap_or(usize::MAX));
        }

        let mut items: Vec<QueryItem> =
            elements.into_iter().map(QueryItem::Element).collect();
        items.extend(texts.into_iter().map(QueryItem::Text));
        Ok(items)
    }

    /// First element matched by the expression.
    pub fn query_first(&self, context: Element, expr: &str) -> Result<Option<Element>> {
        self.query_nth(context, expr, 0)
    }

    /// Element at `idx` (0-based) among the expression's element matches.
    pub fn query_nth(&self, context: Element, expr: &str, idx: usize) -> Result<Option<Element>> {
        Ok(self
            .query(context, expr)?
            .into_iter()
            .filter_map(|item| item.as_element())
            .nth(idx))
    }

    /// All element matches, discarding text items.
    pub fn query_elements(&self, context: Element, expr: &str) -> Result<Vec<Element>> {
        Ok(self
            .query(context, expr)?
            .into_iter()
            .filter_map(|item| item.as_element())
            .collect())
    }

    fn eval_path(&self, start: Element, path: &PathExpr) -> (Vec<Element>, Vec<String>) {
        let mut contexts = vec![start];
        let mut texts = Vec::new();

        for step in &path.steps {
            let mut next: Vec<Element> = Vec::new();
            let mut seen: HashSet<Element> = HashSet::new();

            for &context in &contexts {
                match &step.test {
                    NodeTest::Text => {
                        let mut runs = Vec::new();
                        match step.axis {
                            Axis::Child => self.own_text_runs(context, &mut runs),
                            Axis::Descendant => self.subtree_text_runs(context, &mut runs),
                        }
                        apply_index_only(&step.predicates, &mut runs);
                        texts.extend(runs);
                    },
                    test => {
                        let mut group = Vec::new();
                        self.collect_elements(context, step.axis, test, &mut group);
                        self.apply_predicates(&step.predicates, &mut group);
                        for el in group {
                            if seen.insert(el) {
                                next.push(el);
                            }
                        }
                    },
                }
            }
            contexts = next;
        }
        (contexts, texts)
    }

    fn collect_elements(
        &self,
        context: Element,
        axis: Axis,
        test: &NodeTest,
        out: &mut Vec<Element>,
    ) {
        match test {
            NodeTest::Current => out.push(context),
            NodeTest::Parent => {
                if let Some(parent) = self.parent(context) {
                    out.push(parent);
                }
            },
            _ => match axis {
                Axis::Child => {
                    for &child in self.children(context) {
                        if self.test_matches(child, test) {
                            out.push(child);
                        }
                    }
                },
                Axis::Descendant => self.collect_descendants(context, test, out),
            },
        }
    }

    fn collect_descendants(&self, el: Element, test: &NodeTest, out: &mut Vec<Element>) {
        for &child in self.children(el) {
            if self.test_matches(child, test) {
                out.push(child);
            }
            self.collect_descendants(child, test, out);
        }
    }

    #[inline]
    fn test_matches(&self, el: Element, test: &NodeTest) -> bool {
        match test {
            NodeTest::Name(name) => self.tag(el) == name,
            NodeTest::Wildcard => true,
            _ => false,
        }
    }

    fn apply_predicates(&self, predicates: &[Predicate], group: &mut Vec<Element>) {
        for predicate in predicates {
            match predicate {
                Predicate::HasAttr(name) => {
                    group.retain(|&el| self.attribute(el, name).is_some());
                },
                Predicate::AttrEq(name, value) => {
                    group.retain(|&el| self.attribute(el, name) == Some(value.as_str()));
                },
                Predicate::Index(index) => {
                    if *index <= group.len() {
                        let el = group[*index - 1];
                        group.clear();
                        group.push(el);
                    } else {
                        group.clear();
                    }
                },
            }
        }
    }

    /// Text runs owned by one element: leading text, then each child's tail.
    fn own_text_runs(&self, el: Element, out: &mut Vec<String>) {
        if let Some(text) = self.text(el) {
            out.push(text.to_string());
        }
        for &child in self.children(el) {
            if let Some(tail) = self.tail(child) {
                out.push(tail.to_string());
            }
        }
    }

    fn subtree_text_runs(&self, el: Element, out: &mut Vec<String>) {
        if let Some(text) = self.text(el) {
            out.push(text.to_string());
        }
        for &child in self.children(el) {
            self.subtree_text_runs(child, out);
            if let Some(tail) = self.tail(child) {
                out.push(tail.to_string());
            }
        }
    }

    fn topmost(&self, el: Element) -> Element {
        let mut current = el;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    fn preorder_index(&self, top: Element) -> HashMap<Element, usize> {
        let mut order = HashMap::new();
        let mut stack = vec![top];
        while let Some(el) = stack.pop() {
            order.insert(el, order.len());
            for &child in self.children(el).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

fn apply_index_only(predicates: &[Predicate], runs: &mut Vec<String>) {
    for predicate in predicates {
        match predicate {
            Predicate::Index(index) => {
                if *index <= runs.len() {
                    let run = runs.swap_remove(*index - 1);
                    runs.clear();
                    runs.push(run);
                } else {
                    runs.clear();
                }
            },
            // Attribute predicates never hold on text
            _ => runs.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Document {
        Document::from_str(
            r#"<office:document-content><office:body><office:spreadsheet><table:table table:name="S1"><table:table-row><table:table-cell office:value="1"/><table:covered-table-cell/><table:table-cell office:value="2"/></table:table-row><table:table-row table:style-name="ro2"><table:table-cell><text:p>hi</text:p></table:table-cell></table:table-row></table:table></office:spreadsheet></office:body></office:document-content>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_child_step() {
        let doc = sheet();
        let body = doc.children(doc.root())[0];
        let found = doc.query_elements(body, "office:spreadsheet/table:table").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(doc.tag(found[0]), "table:table");
    }

    #[test]
    fn test_descendant_and_wildcard() {
        let doc = sheet();
        let rows = doc.query_elements(doc.root(), "//table:table-row").unwrap();
        assert_eq!(rows.len(), 2);

        let spreadsheet = doc
            .query_first(doc.root(), "//office:spreadsheet")
            .unwrap()
            .unwrap();
        let any = doc.query_elements(spreadsheet, "*").unwrap();
        assert_eq!(any.len(), 1);
    }

    #[test]
    fn test_absolute_path_from_nested_context() {
        let doc = sheet();
        let row = doc.query_first(doc.root(), "//table:table-row").unwrap().unwrap();
        // Anchored at the topmost ancestor regardless of context
        let tables = doc.query_elements(row, "//table:table").unwrap();
        assert_eq!(tables.len(), 1);
        let root_children = doc.query_elements(row, "/office:body").unwrap();
        assert_eq!(root_children.len(), 1);
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = sheet();
        let styled = doc
            .query_elements(doc.root(), "//table:table-row[@table:style-name]")
            .unwrap();
        assert_eq!(styled.len(), 1);

        let named = doc
            .query_elements(doc.root(), r#"//table:table[@table:name="S1"]"#)
            .unwrap();
        assert_eq!(named.len(), 1);
        let missed = doc
            .query_elements(doc.root(), r#"//table:table[@table:name="S2"]"#)
            .unwrap();
        assert!(missed.is_empty());
    }

    #[test]
    fn test_positional_predicate() {
        let doc = sheet();
        let row = doc.query_first(doc.root(), "//table:table-row").unwrap().unwrap();
        let second = doc
            .query_elements(row, "table:table-cell[2]")
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(doc.attribute(second[0], "office:value"), Some("2"));

        let out_of_range = doc.query_elements(row, "table:table-cell[9]").unwrap();
        assert!(out_of_range.is_empty());
    }

    #[test]
    fn test_union_preserves_document_order() {
        let doc = sheet();
        let row = doc.query_first(doc.root(), "//table:table-row").unwrap().unwrap();
        let cells = doc
            .query_elements(row, "table:table-cell | table:covered-table-cell")
            .unwrap();
        let tags: Vec<&str> = cells.iter().map(|&c| doc.tag(c)).collect();
        assert_eq!(
            tags,
            &["table:table-cell", "table:covered-table-cell", "table:table-cell"]
        );
    }

    #[test]
    fn test_text_step() {
        let doc = Document::from_str("<text:p>a<text:span>b</text:span>c</text:p>").unwrap();
        let items = doc.query(doc.root(), "text()").unwrap();
        assert_eq!(
            items,
            vec![
                QueryItem::Text("a".to_string()),
                QueryItem::Text("c".to_string())
            ]
        );

        let all = doc.query(doc.root(), "//text()").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_parent_and_current_steps() {
        let doc = sheet();
        let row = doc.query_first(doc.root(), "//table:table-row").unwrap().unwrap();
        let table = doc.query_first(row, "..").unwrap().unwrap();
        assert_eq!(doc.tag(table), "table:table");
        let same = doc.query_first(row, ".").unwrap().unwrap();
        assert_eq!(same, row);
    }

    #[test]
    fn test_query_nth() {
        let doc = sheet();
        let second = doc.query_nth(doc.root(), "//table:table-row", 1).unwrap().unwrap();
        assert_eq!(doc.attribute(second, "table:style-name"), Some("ro2"));
        assert!(doc.query_nth(doc.root(), "//table:table-row", 5).unwrap().is_none());
    }

    #[test]
    fn test_malformed_queries() {
        let doc = sheet();
        let root = doc.root();
        assert!(matches!(doc.query(root, ""), Err(Error::Query(_))));
        assert!(matches!(doc.query(root, "a/"), Err(Error::Query(_))));
        assert!(matches!(doc.query(root, "text:p["), Err(Error::Query(_))));
        assert!(matches!(doc.query(root, "text:p[0]"), Err(Error::Query(_))));
        assert!(matches!(
            doc.query(root, "text()/text:span"),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            doc.query(root, "bogus:thing"),
            Err(Error::UnknownPrefix(_))
        ));
        // Failures are not cached; the same expression fails consistently
        assert!(matches!(
            doc.query(root, "bogus:thing"),
            Err(Error::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_repeated_queries_hit_the_cache() {
        let doc = sheet();
        let expr = "//table:table-cell[@office:value]";
        let first = doc.query_elements(doc.root(), expr).unwrap();
        let second = doc.query_elements(doc.root(), expr).unwrap();
        assert_eq!(first, second);
        assert!(QUERY_CACHE.read().contains_key(expr));
    }
}
