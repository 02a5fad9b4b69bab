//! Immutable shader source buffers and byte-offset ranges.
//!
//! A `Source` is shared (`Rc`) between tokens, tree nodes and diagnostics so
//! a range can always be turned back into `file:line:column` without keeping
//! a separate source registry around.

use std::cell::OnceCell;
use std::rc::Rc;

pub type SourceRef = Rc<Source>;

pub struct Source {
    pub name: String,
    pub contents: String,
    line_starts: OnceCell<Vec<usize>>,
}

impl Source {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> SourceRef {
        Rc::new(Self {
            name: name.into(),
            contents: contents.into(),
            line_starts: OnceCell::new(),
        })
    }

    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0usize];
            for (i, b) in self.contents.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(i + 1);
                }
            }
            starts
        })
    }

    /// Convert a byte offset into a 1-based (line, column) pair.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.contents.len());
        let starts = self.line_starts();
        let line_idx = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = self.contents[starts[line_idx]..offset].chars().count();
        (line_idx + 1, col + 1)
    }
}

/// Half-open byte interval into one source.
#[derive(Clone)]
pub struct Range {
    pub source: SourceRef,
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(source: &SourceRef, start: usize, end: usize) -> Self {
        Self {
            source: Rc::clone(source),
            start,
            end,
        }
    }

    pub fn span_to(&self, other: &Range) -> Range {
        Range::new(&self.source, self.start, other.end)
    }

    pub fn text(&self) -> &str {
        &self.source.contents[self.start..self.end]
    }

    /// `name:line:column` of the range start.
    pub fn location(&self) -> String {
        let (line, col) = self.source.line_col(self.start);
        format!("{}:{}:{}", self.source.name, line, col)
    }
}

impl std::fmt::Debug for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..{}]", self.source.name, self.start, self.end)
    }
}
