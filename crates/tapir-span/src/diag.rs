use derive_more::Display;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
};

use crate::{Loc, Located, SourceCache};

/// A report containing the issues and diagnostics of one compiler run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub issues: Vec<Issue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.diagnostics.is_empty()
    }

    /// The number of error-severity entries. Drivers gate phases on this.
    pub fn error_count(&self) -> usize {
        let issues = self.issues.iter().filter(|i| i.is_error()).count();
        let diags = self.diagnostics.iter().filter(|d| d.is_error()).count();
        issues + diags
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    /// Prints the report to the standard error output.
    pub fn eprint(&self, cache: &SourceCache) -> io::Result<()> {
        for issue in &self.issues {
            issue.clone().eprint()?;
        }
        for diagnostic in &self.diagnostics {
            diagnostic.clone().eprint(cache)?;
        }
        Ok(())
    }
}

/// The severity of a diagnostic message.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl From<Severity> for ariadne::ReportKind<'_> {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Info => ariadne::ReportKind::Advice,
            Severity::Warning => ariadne::ReportKind::Warning,
            Severity::Error => ariadne::ReportKind::Error,
        }
    }
}

/// Converts a type into an issue.
pub trait IntoIssue: fmt::Display + Sized {
    fn into_issue(self) -> Issue {
        Issue::error(self.to_string())
    }
}

impl IntoIssue for io::Error {}

/// A diagnostic without a source location, e.g. an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    pub message: String,
    pub help: Option<String>,
    pub severity: Severity,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity: Severity::Error,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity: Severity::Warning,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn write(self, mut w: impl Write) -> io::Result<()> {
        let Issue {
            message,
            help,
            severity,
        } = self;

        let style = match severity {
            Severity::Info => Style::new().green(),
            Severity::Warning => Style::new().yellow(),
            Severity::Error => Style::new().red(),
        };

        writeln!(w, "{}: {message}", severity.style(style))?;

        if let Some(help) = help {
            writeln!(w, "{} {help}", "Help:".cyan())?;
        }

        Ok(())
    }

    pub fn eprint(self) -> io::Result<()> {
        self.write(io::stderr())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

/// Converts a type into a source diagnostic.
pub trait IntoDiagnostic: fmt::Display + Sized {
    fn into_diagnostic(self, loc: Option<Loc>) -> Diagnostic {
        Diagnostic::error(loc, self.to_string())
    }
}

/// A diagnostic message with optional source location information.
///
/// Nodes synthesized by passes have no location, so `loc` is optional; a
/// diagnostic without one renders like an [`Issue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// The main diagnostic message.
    pub message: String,
    /// Optional help text that provides additional guidance.
    pub help: Option<String>,
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// The source code location this diagnostic refers to.
    pub loc: Option<Loc>,
    /// Additional context information with their respective locations.
    pub trace: Vec<Located<String>>,
    /// Additional notes related to the diagnostic.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(loc: Option<Loc>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity: Severity::Error,
            loc,
            trace: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn warn(loc: Option<Loc>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity: Severity::Warning,
            loc,
            trace: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn info(loc: Option<Loc>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity: Severity::Info,
            loc,
            trace: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_trace(mut self, trace: impl IntoIterator<Item = Located<String>>) -> Self {
        self.trace = trace.into_iter().collect();
        self
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes = notes.into_iter().collect();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Prints the diagnostic to the standard error output.
    ///
    /// Falls back to a plain rendering when the location's source text is not
    /// in the cache.
    pub fn eprint(self, cache: &SourceCache) -> io::Result<()> {
        match self.loc {
            Some(loc) if cache.contains(loc.source()) => {
                let report = self.into_report(loc);
                report.eprint(cache)
            }
            _ => {
                let mut issue = Issue {
                    message: self.message,
                    help: self.help,
                    severity: self.severity,
                };
                for note in self.notes {
                    issue.message.push_str("\n  note: ");
                    issue.message.push_str(&note);
                }
                issue.eprint()
            }
        }
    }

    fn into_report(self, loc: Loc) -> ariadne::Report<'static, Loc> {
        let Diagnostic {
            message,
            help,
            severity,
            trace,
            notes,
            ..
        } = self;

        let mut builder = ariadne::Report::build(severity.into(), loc)
            .with_message(message)
            .with_labels(
                trace
                    .into_iter()
                    .map(|(label, loc)| ariadne::Label::new(loc).with_message(label)),
            );

        builder.with_helps(help);
        builder.with_notes(notes);

        builder.finish()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl std::error::Error for Diagnostic {}
