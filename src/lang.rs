use tracing::debug;

use crate::ast::Statement;
use crate::config::Config;
use crate::error::TsilError;
use crate::interpreter::{Interpreter, StatementRecord};
use crate::parser::Parser;
use crate::scanner::{Scanner, Token};
use crate::sink::{FileSink, ResultSink};

/// Everything one call to [`Tsil::run`] produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Lexical and syntax errors, in source order.
    pub static_errors: Vec<TsilError>,
    pub records: Vec<StatementRecord>,
    /// The error that stopped interpretation, if any.
    pub runtime_error: Option<TsilError>,
}

impl RunReport {
    pub fn had_static_error(&self) -> bool {
        !self.static_errors.is_empty()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.runtime_error.is_some()
    }

    /// Lines echoed to the console: printed values and query answers.
    pub fn console_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.records.iter().filter_map(|record| match record {
            StatementRecord::Told(_) => None,
            other => Some(other.to_string()),
        })
    }
}

/// An interpreter session. The knowledge base persists across calls to [`Tsil::run`].
pub struct Tsil<S: ResultSink = FileSink> {
    interpreter: Interpreter<S>,
}

impl Tsil<FileSink> {
    pub fn new(config: &Config) -> Self {
        Tsil {
            interpreter: Interpreter::new(config),
        }
    }
}

impl<S: ResultSink> Tsil<S> {
    pub fn with_interpreter(interpreter: Interpreter<S>) -> Self {
        Tsil { interpreter }
    }

    pub fn interpreter(&self) -> &Interpreter<S> {
        &self.interpreter
    }

    pub fn run(&mut self, source: &str) -> RunReport {
        let mut report = RunReport::default();

        let toks: Vec<Token> = Scanner::new(source.chars().collect())
            .tokens()
            .into_iter()
            .filter_map(|tok| tok.map_err(|e| report.static_errors.push(e)).ok())
            .collect();

        let statements: Vec<Statement> = Parser::new(toks)
            .parse()
            .into_iter()
            .filter_map(|stmt| stmt.map_err(|e| report.static_errors.push(e)).ok())
            .collect();

        debug!(
            statements = statements.len(),
            errors = report.static_errors.len(),
            "parsed"
        );

        for record in self.interpreter.interpret(&statements) {
            match record {
                Ok(record) => report.records.push(record),
                Err(e) => report.runtime_error = Some(e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::knowledge_base::KnowledgeBase;
    use crate::sink::{Answer, MemorySink};

    fn session() -> Tsil<MemorySink> {
        Tsil::with_interpreter(Interpreter::with_sink(
            KnowledgeBase::new(),
            MemorySink::new(),
        ))
    }

    fn answer(pairs: &[(&str, &str)]) -> Answer {
        Answer::Bindings(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn last_answer(tsil: &Tsil<MemorySink>) -> Answer {
        tsil.interpreter().sink().last().cloned().unwrap()
    }

    #[test]
    fn fact_round_trip() {
        let mut tsil = session();
        let report = tsil.run("Parent(tom, bob); ASK Parent(tom, bob);");
        assert!(!report.had_static_error());
        assert_eq!(last_answer(&tsil), answer(&[]));
    }

    #[test]
    fn variable_binding() {
        let mut tsil = session();
        tsil.run("Parent(tom, bob); ASK Parent(X, bob);");
        assert_eq!(last_answer(&tsil), answer(&[("X", "tom")]));
    }

    #[test]
    fn negative_result() {
        let mut tsil = session();
        let report = tsil.run("Parent(tom, bob); ASK Parent(alice, bob);");
        assert!(!report.had_runtime_error());
        assert_eq!(last_answer(&tsil), Answer::Failure);
        assert_eq!(report.console_lines().collect::<Vec<_>>(), vec!["False"]);
    }

    #[test]
    fn conjunctive_query() {
        let mut tsil = session();
        tsil.run(
            "Parent(tom, bob);
             Parent(bob, ann);
             ASK Parent(X, bob) AND Parent(bob, Y);",
        );
        assert_eq!(last_answer(&tsil), answer(&[("X", "tom"), ("Y", "ann")]));
    }

    #[test]
    fn rule_answers_expose_only_query_variables() {
        let mut tsil = session();
        tsil.run(
            "Parent(tom, bob);
             Parent(bob, ann);
             Parent(X, Y) AND Parent(Y, Z) IMPLIES Grandparent(X, Z);
             ASK Grandparent(G, ann);",
        );
        let Answer::Bindings(bindings) = last_answer(&tsil) else {
            panic!("expected bindings");
        };
        assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["G"]);
        assert_eq!(bindings["G"], "tom");
    }

    #[test]
    fn duplicate_facts_do_not_change_answers() {
        let mut tsil = session();
        tsil.run("Parent(tom, bob); Parent(tom, bob); ASK Parent(tom, bob);");
        assert_eq!(last_answer(&tsil), answer(&[]));
    }

    #[test]
    fn recovers_from_one_malformed_statement() {
        let mut tsil = session();
        let report = tsil.run("Parent(tom,, bob); Parent(tom, bob); ASK Parent(X, bob);");
        assert_eq!(report.static_errors.len(), 1);
        assert!(matches!(
            report.static_errors[0],
            TsilError::ParserError { .. }
        ));
        assert_eq!(report.records.len(), 2);
        assert_eq!(last_answer(&tsil), answer(&[("X", "tom")]));
    }

    #[test]
    fn lexical_error_does_not_stop_scanning() {
        let mut tsil = session();
        let report = tsil.run("Parent(tom, bob); # PRINT(1);");
        assert_eq!(report.static_errors.len(), 1);
        assert!(matches!(
            report.static_errors[0],
            TsilError::ScannerError { .. }
        ));
        assert_eq!(report.console_lines().collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn runtime_error_aborts_remaining_statements() {
        let mut tsil = session();
        let report = tsil.run("PRINT(1); PRINT(1 + \"x\"); PRINT(2);");
        assert_eq!(report.console_lines().collect::<Vec<_>>(), vec!["1"]);
        assert!(matches!(
            report.runtime_error,
            Some(TsilError::RuntimeError { ref operator, .. }) if operator == "+"
        ));
    }

    #[test]
    fn knowledge_persists_between_runs() {
        let mut tsil = session();
        tsil.run("Parent(tom, bob);");
        let report = tsil.run("PRINT(1 - \"x\");");
        assert!(report.had_runtime_error());
        tsil.run("ASK Parent(X, bob);");
        assert_eq!(last_answer(&tsil), answer(&[("X", "tom")]));
    }

    #[test]
    fn console_echo() {
        let mut tsil = session();
        let report = tsil.run(
            "Parent(tom, bob); PRINT(\"hello \" + \"world\"); ASK Parent(X, bob);",
        );
        assert_eq!(
            report.console_lines().collect::<Vec<_>>(),
            vec!["hello world", r#"{"X": "tom"}"#]
        );
    }

    #[test]
    fn result_file_holds_latest_answer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let mut tsil = Tsil::new(&Config::default().with_result_path(&path));

        tsil.run("Parent(tom, bob); ASK Parent(X, bob);");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"X": "tom"}"#);

        tsil.run("ASK Parent(bob, X);");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "False");
    }

    #[test]
    fn runaway_rule_reports_failure() {
        let mut tsil = Tsil::with_interpreter(Interpreter::with_sink(
            KnowledgeBase::with_max_depth(16),
            MemorySink::new(),
        ));
        let report = tsil.run("Loop(X) IMPLIES Loop(X); ASK Loop(a);");
        assert!(!report.had_runtime_error());
        assert_eq!(last_answer(&tsil), Answer::Failure);
    }
}
