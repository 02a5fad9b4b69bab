//! Append-only diagnostic log shared by every compilation pass.
//!
//! Passes never abort on a bad program; they record a `Diagnostic` and keep
//! going. Whether a compile succeeded is decided afterwards by
//! [`Log::has_errors`].

use crate::compiler::source::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Option<Range>,
    pub message: String,
    /// Secondary location, eg "previous definition is here".
    pub note: Option<(Range, String)>,
}

impl Diagnostic {
    /// Human-readable one-or-two-line rendering with `file:line:col` locations.
    pub fn render(&self) -> String {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut out = match &self.range {
            Some(r) => format!("{}: {}: {}", r.location(), kind, self.message),
            None => format!("{}: {}", kind, self.message),
        };
        if let Some((range, text)) = &self.note {
            out.push_str(&format!("\n{}: note: {}", range.location(), text));
        }
        out
    }
}

#[derive(Default)]
pub struct Log {
    pub diagnostics: Vec<Diagnostic>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, range: Range, message: impl Into<String>) {
        self.push(Severity::Error, Some(range), message);
    }

    pub fn warning(&mut self, range: Range, message: impl Into<String>) {
        self.push(Severity::Warning, Some(range), message);
    }

    /// Attach a note to the most recent diagnostic.
    pub fn note(&mut self, range: Range, message: impl Into<String>) {
        if let Some(last) = self.diagnostics.last_mut() {
            last.note = Some((range, message.into()));
        }
    }

    fn push(&mut self, severity: Severity, range: Option<Range>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            range,
            message: message.into(),
            note: None,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::source::Source;

    #[test]
    fn test_has_errors_is_derived() {
        let src = Source::new("t.glsl", "x");
        let mut log = Log::new();
        assert!(!log.has_errors());

        log.warning(Range::new(&src, 0, 1), "unused");
        assert!(!log.has_errors());

        log.error(Range::new(&src, 0, 1), "bad");
        assert!(log.has_errors());
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_render_includes_location_and_note() {
        let src = Source::new("t.glsl", "int x;\nint x;\n");
        let mut log = Log::new();
        log.error(Range::new(&src, 11, 12), "duplicate name 'x'");
        log.note(Range::new(&src, 4, 5), "previous definition is here");

        let text = log.diagnostics[0].render();
        assert!(text.starts_with("t.glsl:2:5: error: duplicate name 'x'"));
        assert!(text.contains("t.glsl:1:5: note: previous definition is here"));
    }
}
