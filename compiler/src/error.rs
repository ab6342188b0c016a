use thiserror::Error;

/// Reasons a declared type token cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeTokenError {
    #[error("unknown scalar type \"{0}\"")]
    UnknownScalar(String),

    #[error("invalid array length \"{0}\", expected a positive integer")]
    InvalidArrayLength(String),

    #[error("missing element type after array prefix")]
    MissingElementType,

    #[error("nested arrays are not supported")]
    NestedContainer,
}

#[derive(Debug, Error)]
pub enum BufObjectsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    Parse {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("{at}: Invalid type \"{token}\" for field \"{field}\" of \"{record}\": {source}")]
    InvalidTypeToken {
        at:     String,
        record: String,
        field:  String,
        token:  String,
        #[source]
        source: TypeTokenError,
    },

    #[error("{at}: Invalid id \"{value}\" for \"{record}\": {reason}")]
    InvalidIdentifier {
        at:     String,
        record: String,
        value:  String,
        reason: String,
    },

    #[error("{at}: The id {id} of \"{record}\" is used twice")]
    DuplicateIdentifier {
        at:     String,
        id:     u16,
        record: String,
    },

    #[error("{at}: No identifier left to assign to \"{record}\"")]
    IdentifierSpaceExhausted {
        at:     String,
        record: String,
    },

    #[error("{at}: The record \"{name}\" is defined twice")]
    DuplicateRecord {
        at:   String,
        name: String,
    },

    #[error("The type \"{target}\" is not defined for field \"{field}\" of \"{record}\"")]
    UnresolvedReference {
        record: String,
        field:  String,
        target: String,
    },

    #[error("Recursive nesting is not allowed: {}", cycle.join(" -> "))]
    CyclicReference {
        cycle: Vec<String>,
    },

    #[error("Template \"{key}\" not found")]
    MissingTemplate {
        key: String,
    },

    #[error("Syntax error in template \"{template}\": {msg}")]
    TemplateSyntax {
        template: String,
        msg:      String,
    },

    #[error("Failed to render template \"{template}\": {msg}")]
    TemplateRender {
        template: String,
        msg:      String,
    },

    #[error("Invalid schema pattern \"{pattern}\": {msg}")]
    Glob {
        pattern: String,
        msg:     String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = BufObjectsError> = std::result::Result<T, E>;
