//! Error types and the shared source-position type.

/// A position in the source stream, 1-based for line and column.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Position {
    /// The byte index into the decoded character stream.
    pub index: u64,
    /// The line number.
    pub line: u64,
    /// The column number.
    pub column: u64,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// Alias used in error variants where "mark" reads more naturally than
/// "position"; identical to [`Position`].
pub type Mark = Position;

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("{problem}")]
    Problem {
        problem: &'static str,
        offset: usize,
        value: i32,
    },
    #[error("input stream produced an invalid byte order marker")]
    InvalidBom,
    #[error("invalid UTF-8 byte at offset: {value:x}")]
    InvalidUtf8 { value: u8 },
    #[error("invalid UTF-16 unpaired surrogate: {value:x}")]
    InvalidUtf16 { value: u16 },
    #[error("invalid UTF-32 code unit: {value:x}")]
    InvalidUtf32 { value: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{}:{}: {} {} ({}:{})", problem_mark.line, problem_mark.column, problem, context, context_mark.line, context_mark.column)]
    Problem {
        context: &'static str,
        context_mark: Position,
        problem: &'static str,
        problem_mark: Position,
    },
    #[error("{}:{}: {}", problem_mark.line, problem_mark.column, problem)]
    Simple {
        problem: &'static str,
        problem_mark: Position,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no more tokens")]
    UnexpectedEof,
    #[error("{}:{}: {}", mark.line, mark.column, problem)]
    Problem { problem: &'static str, mark: Position },
    #[error("{}:{}: {} {} ({}:{})", mark.line, mark.column, problem, context, context_mark.line, context_mark.column)]
    ProblemWithContext {
        context: &'static str,
        context_mark: Position,
        problem: &'static str,
        mark: Position,
    },
    #[error("{}:{}: found undefined tag handle", mark.line, mark.column)]
    UndefinedTagHandle { mark: Position },
    #[error("{}:{}: alias refers to an anchor that was never defined", mark.line, mark.column)]
    UndefinedAlias { mark: Position },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
    #[error("collaborator-backed event source failed")]
    Collaborator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    #[error("{0}")]
    Problem(&'static str),
    #[error("value cannot be represented in JSON mode: {0}")]
    Json(&'static str),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A non-fatal dialectal situation surfaced through a side channel rather
/// than a dedicated event kind: an unsupported `%YAML` minor version
/// (treated as 1.2) or an unrecognized directive name (consumed and
/// otherwise ignored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A `%YAML` directive named a version other than 1.1 or 1.2. The
    /// document is still parsed as if the directive said `1.2`.
    UnsupportedYamlVersion {
        major: i32,
        minor: i32,
        position: Position,
    },
    /// A directive whose name is neither `YAML` nor `TAG`.
    UnknownDirective { name: String, position: Position },
}

/// The error kind used by the lazy [`crate::event_stream::EventStream`]
/// abstraction: it wraps whichever underlying cause produced the failure.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Presenter(#[from] PresenterError),
    #[error("collaborator-backed event source failed")]
    Collaborator(#[source] Box<dyn std::error::Error + Send + Sync>),
}
