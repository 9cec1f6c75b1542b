//! Focus and iteration scopes
//!
//! Path segments, function arguments and iteration criteria are each
//! evaluated against a focus. The stack records which focus is current and
//! which iteration, if any, binds `$this`, `$index` and `$total`.

use super::fragment::Fragment;

/// Column names projected by an iteration's derived table
pub(crate) const INDEX_COLUMN: &str = "idx";
pub(crate) const TOTAL_COLUMN: &str = "total";

/// Bindings of one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationFrame {
    /// Alias of the element rows
    pub alias: String,
    /// SQL of `$index`, when projected
    pub index: Option<String>,
    /// SQL of `$total`, when projected
    pub total: Option<String>,
}

impl IterationFrame {
    /// SQL of `$this`
    pub fn this_sql(&self) -> String {
        format!("{}.value", self.alias)
    }

    /// SQL of the element ordering column
    pub fn ordinal_sql(&self) -> String {
        format!("{}.ordinal", self.alias)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FrameKind {
    /// The resource row
    Root,
    /// One element of an iterated collection
    Iteration(IterationFrame),
    /// Result of the preceding path segment
    Segment,
}

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    focus: Fragment,
    kind: FrameKind,
}

/// Stack of evaluation foci; the bottom frame is always the resource row
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    /// Stack holding only the resource row
    pub fn new(root: Fragment) -> Self {
        Self {
            frames: vec![Frame {
                focus: root,
                kind: FrameKind::Root,
            }],
        }
    }

    /// The value the next identifier or function applies to
    pub fn focus(&self) -> &Fragment {
        // the root frame is never popped
        &self.frames[self.frames.len() - 1].focus
    }

    /// Focus of the innermost root or iteration scope, ignoring path segments
    ///
    /// Arguments of ordinary functions are evaluated against this focus.
    pub fn scope_focus(&self) -> &Fragment {
        self.frames
            .iter()
            .rev()
            .find(|f| !matches!(f.kind, FrameKind::Segment))
            .map(|f| &f.focus)
            .unwrap_or_else(|| self.focus())
    }

    /// Innermost enclosing iteration
    pub fn iteration(&self) -> Option<&IterationFrame> {
        self.frames.iter().rev().find_map(|f| match &f.kind {
            FrameKind::Iteration(frame) => Some(frame),
            _ => None,
        })
    }

    /// Make `focus` current for the next path segment
    pub fn push_segment(&mut self, focus: Fragment) {
        self.frames.push(Frame {
            focus,
            kind: FrameKind::Segment,
        });
    }

    /// Re-establish the enclosing scope focus, for function arguments
    pub fn push_argument_scope(&mut self) {
        let focus = self.scope_focus().clone();
        self.push_segment(focus);
    }

    /// Enter an iteration over elements bound by `frame`
    pub fn push_iteration(&mut self, frame: IterationFrame) {
        let focus = Fragment::element(frame.this_sql());
        self.frames.push(Frame {
            focus,
            kind: FrameKind::Iteration(frame),
        });
    }

    /// Leave the innermost frame; the root frame stays
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames, root included
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Never true; the root frame is permanent
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::fragment::{Shape, ValueKind};

    fn frame(alias: &str) -> IterationFrame {
        IterationFrame {
            alias: alias.to_string(),
            index: None,
            total: None,
        }
    }

    #[test]
    fn test_segments_do_not_change_scope_focus() {
        let mut scopes = ScopeStack::new(Fragment::resource_root("r.resource"));
        scopes.push_segment(Fragment::new("(r.resource -> 'name')", Shape::Collection, ValueKind::Json));
        assert_eq!(scopes.focus().sql, "(r.resource -> 'name')");
        assert_eq!(scopes.scope_focus().sql, "r.resource");
        assert!(scopes.iteration().is_none());
    }

    #[test]
    fn test_iteration_binds_element() {
        let mut scopes = ScopeStack::new(Fragment::resource_root("r.resource"));
        scopes.push_iteration(frame("it_1"));
        scopes.push_segment(Fragment::new("x", Shape::Scalar, ValueKind::Json));
        assert_eq!(scopes.scope_focus().sql, "it_1.value");
        assert_eq!(scopes.iteration().unwrap().alias, "it_1");
        scopes.pop();
        scopes.pop();
        scopes.pop();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes.focus().sql, "r.resource");
    }
}
