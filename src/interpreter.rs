use core::fmt;

use tracing::debug;

use crate::ast::{BinaryOp, Literal, LogicalOp, Statement, Term, UnaryOp, format_number};
use crate::config::Config;
use crate::error::TsilError;
use crate::knowledge_base::KnowledgeBase;
use crate::sink::{Answer, FileSink, ResultSink};

/// What an expression evaluates to. Sentences are data: they evaluate to themselves.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Sentence(Term),
}

impl Value {
    /// `nil` and `false` are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl From<&Literal> for Value {
    fn from(value: &Literal) -> Self {
        match value {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Sentence(term) => write!(f, "{term}"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum StatementRecord {
    Told(Term),
    Printed(String),
    Answered(Answer),
}

impl fmt::Display for StatementRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatementRecord::Told(sentence) => write!(f, "told {sentence}"),
            StatementRecord::Printed(text) => write!(f, "{text}"),
            StatementRecord::Answered(answer) => write!(f, "{answer}"),
        }
    }
}

pub struct Interpreter<S: ResultSink = FileSink> {
    knowledge_base: KnowledgeBase,
    sink: S,
}

impl Interpreter<FileSink> {
    pub fn new(config: &Config) -> Self {
        Interpreter::with_sink(
            KnowledgeBase::with_max_depth(config.max_depth),
            FileSink::new(&config.result_path),
        )
    }
}

impl<S: ResultSink> Interpreter<S> {
    pub fn with_sink(knowledge_base: KnowledgeBase, sink: S) -> Self {
        Interpreter {
            knowledge_base,
            sink,
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Executes statements in order. The first error ends the batch: it is the last element
    /// of the returned records and nothing after it runs.
    pub fn interpret(&mut self, statements: &[Statement]) -> Vec<Result<StatementRecord, TsilError>> {
        let mut records = Vec::new();
        for statement in statements {
            let record = self.execute(statement);
            let failed = record.is_err();
            records.push(record);
            if failed {
                break;
            }
        }
        records
    }

    fn execute(&mut self, statement: &Statement) -> Result<StatementRecord, TsilError> {
        match statement {
            Statement::Expression(expr) => self.execute_tell(expr),
            Statement::Print(expr) => Ok(StatementRecord::Printed(self.evaluate(expr)?.to_string())),
            Statement::Ask(expr) => self.execute_ask(expr),
        }
    }

    fn execute_tell(&mut self, expr: &Term) -> Result<StatementRecord, TsilError> {
        match self.evaluate(expr)? {
            Value::Sentence(sentence) => {
                self.knowledge_base.tell(sentence.clone())?;
                Ok(StatementRecord::Told(sentence))
            }
            other => Err(TsilError::InvalidClause {
                sentence: other.to_string(),
                reason: "only predicates and implications can be told".into(),
            }),
        }
    }

    fn execute_ask(&mut self, expr: &Term) -> Result<StatementRecord, TsilError> {
        let query = match self.evaluate(expr)? {
            Value::Sentence(query) => query,
            other => {
                return Err(TsilError::InvalidQuery {
                    query: other.to_string(),
                    reason: "only sentences can be asked".into(),
                });
            }
        };
        let theta = self.knowledge_base.ask(&query)?;
        let answer = Answer::from_substitution(theta.as_ref());
        debug!(%query, %answer, "answered");
        self.sink.record(&answer)?;
        Ok(StatementRecord::Answered(answer))
    }

    pub fn evaluate(&self, expr: &Term) -> Result<Value, TsilError> {
        match expr {
            Term::Literal(lit) => Ok(Value::from(lit)),
            Term::Constant(_)
            | Term::Variable(_)
            | Term::Predicate { .. }
            | Term::Implication { .. } => Ok(Value::Sentence(expr.clone())),
            Term::Unary { op, line, operand } => {
                let operand = self.evaluate(operand)?;
                self.evaluate_unary(*op, *line, operand)
            }
            Term::Binary {
                op,
                line,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(*op, *line, left, right)
            }
            Term::Logical {
                op,
                line,
                left,
                right,
            } => {
                // both sides are always evaluated
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_logical(*op, *line, left, right)
            }
        }
    }

    fn evaluate_unary(&self, op: UnaryOp, line: usize, operand: Value) -> Result<Value, TsilError> {
        match op {
            UnaryOp::Negate => match operand {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(runtime_error(op, line, "Operand must be a number.")),
            },
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        }
    }

    fn evaluate_binary(
        &self,
        op: BinaryOp,
        line: usize,
        left: Value,
        right: Value,
    ) -> Result<Value, TsilError> {
        match op {
            BinaryOp::Add => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(runtime_error(
                    op,
                    line,
                    "Operands must be two numbers or two strings.",
                )),
            },
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOp::Subtract => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            BinaryOp::Multiply => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            BinaryOp::Divide => {
                // division by zero follows f64 semantics
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Number(a / b))
            }
            BinaryOp::Greater => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            BinaryOp::GreaterEqual => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
            BinaryOp::Less => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            BinaryOp::LessEqual => {
                let (a, b) = numeric_operands(op, line, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
        }
    }

    /// Two sentences combine into a compound sentence; two plain values combine by truthiness.
    fn evaluate_logical(
        &self,
        op: LogicalOp,
        line: usize,
        left: Value,
        right: Value,
    ) -> Result<Value, TsilError> {
        match (left, right) {
            (Value::Sentence(left), Value::Sentence(right)) => Ok(Value::Sentence(Term::Logical {
                op,
                line,
                left: Box::new(left),
                right: Box::new(right),
            })),
            (Value::Sentence(_), _) | (_, Value::Sentence(_)) => Err(runtime_error(
                op,
                line,
                "Operands must be two sentences or two values.",
            )),
            (left, right) => Ok(Value::Bool(match op {
                LogicalOp::And => left.is_truthy() && right.is_truthy(),
                LogicalOp::Or => left.is_truthy() || right.is_truthy(),
            })),
        }
    }
}

fn numeric_operands(
    op: BinaryOp,
    line: usize,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), TsilError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(runtime_error(op, line, "Operands must be numbers.")),
    }
}

fn runtime_error(operator: impl fmt::Display, line: usize, reason: &str) -> TsilError {
    TsilError::RuntimeError {
        line,
        operator: operator.to_string(),
        reason: reason.into(),
    }
}
