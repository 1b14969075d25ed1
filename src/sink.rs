use core::fmt;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::debug;

use crate::ast::{Term, Variable};
use crate::error::TsilError;
use crate::unify::Substitution;

/// Written in place of bindings when a query cannot be proved.
pub const FAILURE_MARKER: &str = "False";

/// The user-visible outcome of one `ASK`.
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
    /// Variable name to the text of its bound term. Empty when the query holds with nothing to bind.
    Bindings(BTreeMap<String, String>),
    Failure,
}

impl Answer {
    /// Keeps only the user-named variables of `theta`, each resolved as far as the substitution
    /// allows. Fresh variables left in a binding print as `_`.
    pub fn from_substitution(theta: Option<&Substitution>) -> Self {
        let Some(theta) = theta else {
            return Answer::Failure;
        };
        let bindings = theta
            .iter()
            .filter(|(var, _)| !var.is_fresh())
            .map(|(var, _)| {
                let resolved = theta.resolve(&Term::Variable(var.clone()));
                (var.name.clone(), anonymize(&resolved).to_string())
            })
            .collect();
        Answer::Bindings(bindings)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Answer::Bindings(_))
    }
}

fn anonymize(term: &Term) -> Term {
    let mut renaming = Substitution::new();
    for var in term.variables() {
        if var.is_fresh() {
            renaming.insert(var.clone(), Term::Variable(Variable::named("_")));
        }
    }
    renaming.resolve(term)
}

/// JSON with `", "` and `": "` between items.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn write_bindings<W: io::Write>(
    writer: W,
    bindings: &BTreeMap<String, String>,
) -> serde_json::Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, SpacedFormatter);
    bindings.serialize(&mut ser)
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Answer::Bindings(bindings) => {
                let mut buf = Vec::new();
                write_bindings(&mut buf, bindings).map_err(|_| fmt::Error)?;
                f.write_str(&String::from_utf8_lossy(&buf))
            }
            Answer::Failure => write!(f, "{FAILURE_MARKER}"),
        }
    }
}

/// Where `ASK` results go. Each answer replaces the previous one.
pub trait ResultSink {
    fn record(&mut self, answer: &Answer) -> Result<(), TsilError>;
}

/// Overwrites a file with the latest answer: a JSON object of bindings, or the failure marker.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileSink {
    fn record(&mut self, answer: &Answer) -> Result<(), TsilError> {
        let mut file = File::create(&self.path)?;
        match answer {
            Answer::Bindings(bindings) => write_bindings(&mut file, bindings)?,
            Answer::Failure => file.write_all(FAILURE_MARKER.as_bytes())?,
        }
        debug!(path = %self.path.display(), "wrote result");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    answers: Vec<Answer>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Answer> {
        self.answers.last()
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, answer: &Answer) -> Result<(), TsilError> {
        self.answers.push(answer.clone());
        Ok(())
    }
}
