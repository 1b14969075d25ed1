use core::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Nil => write!(f, "nil"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Number(n) => write!(f, "{}", format_number(*n)),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Integral numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableMarker {
    /// Written by the user in source text.
    UserNamed,
    /// Introduced while standardizing a clause apart.
    Fresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub marker: VariableMarker,
}

impl Variable {
    pub fn named(name: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            marker: VariableMarker::UserNamed,
        }
    }

    pub fn fresh(id: usize) -> Self {
        Variable {
            name: format!("v{id}"),
            marker: VariableMarker::Fresh,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.marker == VariableMarker::Fresh
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.marker {
            VariableMarker::UserNamed => write!(f, "{}", self.name),
            VariableMarker::Fresh => write!(f, "_{}", self.name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        };
        write!(f, "{symbol}")
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// Expression tree. Operator nodes remember the line of their operator token for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Literal(Literal),
    Constant(String),
    Variable(Variable),
    Predicate {
        name: String,
        args: Vec<Term>,
    },
    Unary {
        op: UnaryOp,
        line: usize,
        operand: Box<Term>,
    },
    Binary {
        op: BinaryOp,
        line: usize,
        left: Box<Term>,
        right: Box<Term>,
    },
    Logical {
        op: LogicalOp,
        line: usize,
        left: Box<Term>,
        right: Box<Term>,
    },
    Implication {
        antecedent: Box<Term>,
        consequent: Box<Term>,
    },
}

impl Term {
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(Variable::named(name))
    }

    pub fn predicate(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Predicate {
            name: name.into(),
            args,
        }
    }

    /// Sentences are the terms that evaluate to themselves and can be told to or asked of a
    /// knowledge base.
    pub fn is_sentence(&self) -> bool {
        match self {
            Term::Predicate { .. } | Term::Implication { .. } => true,
            Term::Logical { left, right, .. } => left.is_sentence() && right.is_sentence(),
            _ => false,
        }
    }

    /// Variables in order of first appearance, without duplicates.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables<'a>(&'a self, vars: &mut Vec<&'a Variable>) {
        match self {
            Term::Literal(_) | Term::Constant(_) => {}
            Term::Variable(v) => {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
            Term::Predicate { args, .. } => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
            Term::Unary { operand, .. } => operand.collect_variables(vars),
            Term::Binary { left, right, .. } | Term::Logical { left, right, .. } => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Term::Implication {
                antecedent,
                consequent,
            } => {
                antecedent.collect_variables(vars);
                consequent.collect_variables(vars);
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Literal(lit) => write!(f, "{lit}"),
            Term::Constant(name) => write!(f, "{name}"),
            Term::Variable(var) => write!(f, "{var}"),
            Term::Predicate { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Term::Unary { op, operand, .. } => write!(f, "{op}{operand}"),
            Term::Binary {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Term::Logical {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Term::Implication {
                antecedent,
                consequent,
            } => write!(f, "({antecedent} IMPLIES {consequent})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// A bare sentence followed by `;`, told to the knowledge base.
    Expression(Term),
    Print(Term),
    Ask(Term),
}
