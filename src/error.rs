use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsilError {
    #[error("[line {line}] scanner error at {lexeme:?}: {reason}")]
    ScannerError {
        line: usize,
        lexeme: String,
        reason: String,
    },
    #[error("[line {line}] parser error at {lexeme:?}: {reason}")]
    ParserError {
        line: usize,
        lexeme: String,
        reason: String,
    },
    #[error("[line {line}] runtime error at {operator:?}: {reason}")]
    RuntimeError {
        line: usize,
        operator: String,
        reason: String,
    },
    #[error("invalid clause `{sentence}`: {reason}")]
    InvalidClause { sentence: String, reason: String },
    #[error("invalid query `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },
    #[error("could not write result: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

