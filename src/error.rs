use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Every failure the crate can report. Lexing and parsing failures keep their
/// own diagnostic types so they can be rendered against the source text.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    #[diagnostic(
        code(setting::type_mismatch),
        help("A setting's type is fixed when it is created; request the type it actually holds.")
    )]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("setting not found: `{path}`")]
    #[diagnostic(code(setting::not_found))]
    NotFound { path: String },

    #[error("setting already exists: `{path}`")]
    #[diagnostic(
        code(setting::already_exists),
        help("Names must be unique within a group. Remove the existing setting first.")
    )]
    AlreadyExists { path: String },

    #[error("invalid setting name: `{name}`")]
    #[diagnostic(
        code(setting::invalid_name),
        help("Names start with a letter or '_', continue with letters, digits or '_', and cannot be `true` or `false`.")
    )]
    InvalidName { name: String },

    #[error("cannot write `{path}`: {reason}")]
    #[diagnostic(code(writer::unrepresentable))]
    Unrepresentable { path: String, reason: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(config::io))]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ConfigError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        ConfigError::NotFound { path: path.into() }
    }

    /// The 1-based source line, for failures that come from reading text.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::Lex(e) => Some(e.line),
            ConfigError::Parse(e) => Some(e.line()),
            _ => None,
        }
    }
}

/// A malformed token.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("line {line}: {message}")]
#[diagnostic(
    code(lexer::invalid_token),
    help("The lexer could not turn this text into a token.")
)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("{message}")]
    pub span: SourceSpan,
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("line {line}: unexpected {found}, expected {expected}")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: unexpected end of input, expected {expected}")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The input ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Input ended here")]
        span: SourceSpan,
        expected: String,
        line: usize,
    },

    #[error("line {line}: array element is {found}, but the array holds {expected}")]
    #[diagnostic(
        code(parser::array_type_mismatch),
        help("Every element of an array must have the type of its first element. Use a list `( ... )` for mixed values.")
    )]
    ArrayTypeMismatch {
        #[source_code]
        src: NamedSource<String>,
        #[label("this element is {found}")]
        span: SourceSpan,
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: arrays may only contain scalar values, found {found}")]
    #[diagnostic(
        code(parser::non_scalar_in_array),
        help("Use a list `( ... )` to hold groups, arrays or lists.")
    )]
    NonScalarInArray {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a scalar")]
        span: SourceSpan,
        found: String,
        line: usize,
    },

    #[error("line {line}: duplicate setting name `{name}`")]
    #[diagnostic(
        code(parser::duplicate_setting),
        help("Names must be unique within a group.")
    )]
    DuplicateSetting {
        #[source_code]
        src: NamedSource<String>,
        #[label("`{name}` is already defined in this group")]
        span: SourceSpan,
        name: String,
        line: usize,
    },

    #[error("line {line}: nesting deeper than {limit} levels")]
    #[diagnostic(code(parser::nesting_too_deep))]
    NestingTooDeep {
        #[source_code]
        src: NamedSource<String>,
        #[label("nesting limit reached here")]
        span: SourceSpan,
        limit: usize,
        line: usize,
    },

    #[error("line {line}: cannot include `{path}`: {reason}")]
    #[diagnostic(code(parser::include))]
    Include {
        #[source_code]
        src: NamedSource<String>,
        #[label("included here")]
        span: SourceSpan,
        path: String,
        reason: String,
        line: usize,
    },
}

impl ParseError {
    /// The 1-based line the offending token started on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. }
            | ParseError::UnexpectedEof { line, .. }
            | ParseError::ArrayTypeMismatch { line, .. }
            | ParseError::NonScalarInArray { line, .. }
            | ParseError::DuplicateSetting { line, .. }
            | ParseError::NestingTooDeep { line, .. }
            | ParseError::Include { line, .. } => *line,
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}
