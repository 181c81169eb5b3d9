//! Logging seam (§10): pipelines accept `&mut dyn Reporter` instead of
//! calling a global logger, so a run can be exercised with a recording
//! double in tests and wired to stderr by the CLI in production.

/// A thread-safe handle wrapping a `Reporter` trait object for the
/// duration of one pipeline run.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Discards everything. Useful when a caller has no reporter of its own
/// (tests, one-off CLI invocations with `--quiet`).
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&mut self, _msg: &str) {}
    fn warn(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Records every line it receives, tagged with its level. Used by this
/// crate's own tests to assert on phase-by-phase narration.
#[derive(Debug, Default)]
pub struct VecReporter {
    pub lines: Vec<(&'static str, String)>,
}

impl Reporter for VecReporter {
    fn info(&mut self, msg: &str) {
        self.lines.push(("info", msg.to_string()));
    }

    fn warn(&mut self, msg: &str) {
        self.lines.push(("warn", msg.to_string()));
    }

    fn error(&mut self, msg: &str) {
        self.lines.push(("error", msg.to_string()));
    }
}
