//! Tag stripping: remove wrapper elements while keeping their content.
//!
//! Stripping `text:span` from `<text:p>a<text:span>b</text:span>c</text:p>`
//! yields `<text:p>abc</text:p>`: the wrapper disappears, its text and
//! children splice into the parent at the same position, and its tail
//! reattaches after them. Work proceeds bottom-up and in place, so
//! subtrees without stripped tags are never rebuilt.

use crate::Result;
use crate::element::{Content, Document, Element, Position};

/// Outcome of [`Document::strip_tags`] for the outermost element.
#[derive(Debug, Clone, PartialEq)]
pub enum Stripped {
    /// The element survived, possibly re-tagged
    Element(Element),
    /// The element itself was stripped with no wrapper to hold the pieces:
    /// its former content as a detached mixed list
    Fragments(Vec<Content>),
}

impl Document {
    /// Recursively remove the listed wrapper tags from a subtree, keeping
    /// their text and children in place.
    ///
    /// Elements with a tag in `protect` are left alone entirely, including
    /// their descendants. When the outermost element itself has a stripped
    /// tag, `default` chooses a replacement tag for it (attributes are
    /// discarded with the old wrapper); with no `default`, the element is
    /// detached and dismantled into a [`Stripped::Fragments`] list.
    pub fn strip_tags(
        &mut self,
        el: Element,
        strip: &[&str],
        protect: &[&str],
        default: Option<&str>,
    ) -> Result<Stripped> {
        self.strip_below(el, strip, protect)?;

        if !strip.iter().any(|t| *t == self.tag(el)) {
            return Ok(Stripped::Element(el));
        }
        if let Some(tag) = default {
            self.set_tag(el, tag)?;
            self.clear_attributes(el);
            return Ok(Stripped::Element(el));
        }

        if self.parent(el).is_some() {
            self.delete(el)?;
        }
        let mut fragments = Vec::new();
        if let Some(text) = self.text(el) {
            fragments.push(Content::Text(text.to_string()));
        }
        self.set_text(el, None);
        for child in self.children(el).to_vec() {
            self.delete_keep_tail(child, false)?;
            fragments.push(Content::Element(child));
            if let Some(tail) = self.tail(child) {
                fragments.push(Content::Text(tail.to_string()));
                self.set_tail(child, None);
            }
        }
        Ok(Stripped::Fragments(fragments))
    }

    fn strip_below(&mut self, el: Element, strip: &[&str], protect: &[&str]) -> Result<()> {
        for child in self.children(el).to_vec() {
            if protect.iter().any(|t| *t == self.tag(child)) {
                continue;
            }
            self.strip_below(child, strip, protect)?;
            if strip.iter().any(|t| *t == self.tag(child)) {
                self.splice_out(el, child)?;
            }
        }
        Ok(())
    }

    /// Replace `child` with its own content at the same position under
    /// `parent`. Text order is preserved: the slot before the position
    /// receives the child's leading text, the grandchildren move in
    /// between, and the child's tail lands after the last of them.
    fn splice_out(&mut self, parent: Element, child: Element) -> Result<()> {
        let idx = self
            .index_in_parent(child)
            .ok_or_else(|| crate::Error::Structure("spliced element has no parent".to_string()))?;
        let grandchildren = self.children(child).to_vec();
        let text = self.text(child).map(|t| t.to_string());
        let tail = self.tail(child).map(|t| t.to_string());

        self.delete_keep_tail(child, false)?;
        self.set_text(child, None);
        self.set_tail(child, None);

        if let Some(text) = text {
            self.append_at_slot(parent, idx, &text);
        }
        for (offset, &grandchild) in grandchildren.iter().enumerate() {
            self.delete_keep_tail(grandchild, false)?;
            self.insert(parent, grandchild, Position::Index(idx + offset))?;
        }
        if let Some(tail) = tail {
            match grandchildren.last() {
                Some(&last) => self.append_to_tail(last, &tail),
                None => self.append_at_slot(parent, idx, &tail),
            }
        }
        Ok(())
    }

    /// Append text to whatever run precedes child position `idx`: the
    /// previous sibling's tail, or the parent's leading text at the front.
    fn append_at_slot(&mut self, parent: Element, idx: usize, extra: &str) {
        if idx == 0 {
            let merged = match self.text(parent) {
                Some(text) => format!("{text}{extra}"),
                None => extra.to_string(),
            };
            self.set_text(parent, Some(&merged));
        } else {
            let prev = self.children(parent)[idx - 1];
            self.append_to_tail(prev, extra);
        }
    }

    fn append_to_tail(&mut self, el: Element, extra: &str) {
        let merged = match self.tail(el) {
            Some(tail) => format!("{tail}{extra}"),
            None => extra.to_string(),
        };
        self.set_tail(el, Some(&merged));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_nested_spans_merges_text() {
        let mut doc = Document::from_str(
            "<text:p>a<text:span>b<text:span>c</text:span>d</text:span>e</text:p>",
        )
        .unwrap();
        let p = doc.root();
        let result = doc.strip_tags(p, &["text:span"], &[], None).unwrap();
        assert_eq!(result, Stripped::Element(p));
        assert_eq!(doc.children(p).len(), 0);
        assert_eq!(doc.text(p), Some("abcde"));
        assert_eq!(doc.text_content(p), "abcde");
        assert_eq!(doc.serialize(p, false), "<text:p>abcde</text:p>");
    }

    #[test]
    fn test_strip_keeps_grandchildren_in_position() {
        let mut doc = Document::from_str(
            "<text:p><text:span>a<text:s/>b</text:span><text:line-break/></text:p>",
        )
        .unwrap();
        let p = doc.root();
        doc.strip_tags(p, &["text:span"], &[], None).unwrap();
        assert_eq!(
            doc.serialize(p, false),
            "<text:p>a<text:s/>b<text:line-break/></text:p>"
        );
    }

    #[test]
    fn test_protect_blocks_recursion() {
        let mut doc = Document::from_str(
            "<text:p><text:a><text:span>keep</text:span></text:a><text:span>strip</text:span></text:p>",
        )
        .unwrap();
        let p = doc.root();
        doc.strip_tags(p, &["text:span"], &["text:a"], None).unwrap();
        // The span under the protected link survives; the sibling span is gone
        assert_eq!(
            doc.serialize(p, false),
            "<text:p><text:a><text:span>keep</text:span></text:a>strip</text:p>"
        );
    }

    #[test]
    fn test_strip_outermost_with_default_wrapper() {
        let mut doc = Document::from_str(
            r#"<text:span text:style-name="T1">a<text:s/>b</text:span>"#,
        )
        .unwrap();
        let span = doc.root();
        let result = doc
            .strip_tags(span, &["text:span"], &[], Some("text:p"))
            .unwrap();
        assert_eq!(result, Stripped::Element(span));
        // Re-tagged in place; the old wrapper's attributes go with it
        assert_eq!(doc.serialize(span, false), "<text:p>a<text:s/>b</text:p>");
    }

    #[test]
    fn test_strip_outermost_without_default_yields_fragments() {
        let mut doc =
            Document::from_str("<text:span>a<text:s/>b</text:span>").unwrap();
        let span = doc.root();
        let result = doc.strip_tags(span, &["text:span"], &[], None).unwrap();
        let Stripped::Fragments(fragments) = result else {
            panic!("expected fragments");
        };
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], Content::Text("a".to_string()));
        let Content::Element(s) = &fragments[1] else {
            panic!("expected an element fragment");
        };
        assert_eq!(doc.tag(*s), "text:s");
        assert_eq!(doc.tail(*s), None);
        assert_eq!(fragments[2], Content::Text("b".to_string()));
    }

    #[test]
    fn test_strip_untouched_tree_is_unchanged() {
        let mut doc = Document::from_str(
            "<text:p>a<text:span>b</text:span>c</text:p>",
        )
        .unwrap();
        let p = doc.root();
        let before = doc.serialize(p, false);
        doc.strip_tags(p, &["text:a"], &[], None).unwrap();
        assert_eq!(doc.serialize(p, false), before);
    }
}
