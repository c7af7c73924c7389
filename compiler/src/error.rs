use std::fmt;

use thiserror::Error;

use crate::{types::FileDesc, utils::quote};

#[derive(Debug, Error)]
pub enum KprotoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(Box<ParseFailure>),

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("Unknown language {} (available: {available})", quote(.lang))]
    UnknownBackend {
        lang:      String,
        available: String,
    },

    #[error("Codegen error for {lang}: {msg}")]
    Codegen {
        lang: String,
        msg:  String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ParseFailure> for KprotoError {
    fn from(failure: ParseFailure) -> Self {
        KprotoError::Parse(Box::new(failure))
    }
}

/// Failures that depend on the relationships between messages rather than
/// on a single line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("field {} of message {} refers to its own message", quote(.field), quote(.message))]
    SelfReference {
        message: String,
        field:   String,
    },

    #[error("the type {} is not defined for field {} of message {}", quote(.ty), quote(.field), quote(.message))]
    UnresolvedType {
        message: String,
        field:   String,
        ty:      String,
    },

    #[error("recursive nesting is not allowed: {}", .path.join(" -> "))]
    TypeCycle { path: Vec<String> },

    #[error("maximum size of message {} overflows", quote(.message))]
    SizeOverflow { message: String },

    #[error("no message named {}", quote(.name))]
    UnknownMessage { name: String },
}

/// What went wrong on a single schema line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("unrecognized line {}", quote(.0))]
    UnknownLine(String),

    #[error("package must be declared before any message or rpc")]
    PackageOutOfOrder,

    #[error("malformed package declaration {}", quote(.0))]
    MalformedPackage(String),

    #[error("package declaration is missing a language before ':'")]
    MissingPackageLang,

    #[error("package for language {} is declared twice", quote(.0))]
    DuplicatePackage(String),

    #[error("a package must be declared before the first message")]
    MissingPackage,

    #[error("malformed message declaration {}", quote(.0))]
    MalformedMessage(String),

    #[error("message {} has an invalid id {}; expected 1..=65535", quote(.name), quote(.id))]
    InvalidMessageId { name: String, id: String },

    #[error("message {} reuses id {id} of message {}", quote(.name), quote(.other))]
    DuplicateMessageId { name: String, id: u16, other: String },

    #[error("message id counter overflows at message {}", quote(.0))]
    IdCounterOverflow(String),

    #[error("the message {} is defined twice", quote(.0))]
    DuplicateMessage(String),

    #[error("field declared outside of a message")]
    FieldOutsideMessage,

    #[error("field {} must be indented", quote(.0))]
    FieldNotIndented(String),

    #[error("malformed field declaration {}", quote(.0))]
    MalformedField(String),

    #[error("field name {} must start with an uppercase letter", quote(.0))]
    InvalidFieldName(String),

    #[error("field {} has a length that is not separated from its type by ':'", quote(.0))]
    LengthWithoutColon(String),

    #[error("field {} has ':' but no length", quote(.0))]
    MissingLength(String),

    #[error("field {} has an invalid length {}; expected 1..=65535", quote(.field), quote(.value))]
    InvalidLength { field: String, value: String },

    #[error("field {} has too many length markers", quote(.0))]
    TooManyLengths(String),

    #[error("field {} of type {} cannot have a second length marker", quote(.field), quote(.ty))]
    UnexpectedCount { field: String, ty: String },

    #[error("string field {} must define a max length", quote(.0))]
    StringWithoutLength(String),

    #[error("the field {} is defined twice in message {}", quote(.field), quote(.message))]
    DuplicateField { message: String, field: String },

    #[error("malformed rpc declaration {}", quote(.0))]
    MalformedRpc(String),

    #[error("the rpc {} is defined twice", quote(.0))]
    DuplicateRpc(String),

    #[error("method declared outside of an rpc")]
    MethodOutsideRpc,

    #[error("malformed method declaration {}", quote(.0))]
    MalformedMethod(String),

    #[error("the method {} is defined twice in rpc {}", quote(.method), quote(.rpc))]
    DuplicateMethod { rpc: String, method: String },

    #[error("the type {} is not a message for method {} of rpc {}", quote(.ty), quote(.method), quote(.rpc))]
    UnresolvedMethodType { rpc: String, method: String, ty: String },

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.kind)
    }
}

/// Diagnostics collected over one parse, in the order they were found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A parse that recorded at least one diagnostic. `file` holds whatever was
/// built before parsing stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub diagnostics: Diagnostics,
    pub file:        FileDesc,
    /// Set when parsing stopped early instead of reading to the end.
    pub fatal:       bool,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostics)
    }
}

impl std::error::Error for ParseFailure {}
