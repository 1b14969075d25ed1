use tracing::debug;

use crate::ast::{BinaryOp, Literal, LogicalOp, Statement, Term, UnaryOp, Variable};
use crate::error::TsilError;
use crate::scanner::{Token, TokenKind};

/// Identifiers starting with an uppercase letter or '_' are logic variables.
pub fn is_variable_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
}

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    position: usize, // Index of the token to be recognized
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::eof(line));
        }
        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parses every statement. A malformed statement becomes an `Err` in place and parsing
    /// resumes after the next ';'.
    pub fn parse(&mut self) -> Vec<Result<Statement, TsilError>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            let statement = self.statement();
            if let Err(ref error) = statement {
                debug!(%error, "discarding statement");
                self.synchronize();
            }
            statements.push(statement);
        }
        statements
    }

    fn statement(&mut self) -> Result<Statement, TsilError> {
        match self.peek().kind {
            TokenKind::Print => self.print_statement(),
            TokenKind::Ask => self.ask_statement(),
            _ => self.expression_statement(),
        }
    }

    fn print_statement(&mut self) -> Result<Statement, TsilError> {
        self.consume(TokenKind::Print, "expected PRINT")?;
        self.consume(TokenKind::LeftParen, "expected '(' after PRINT")?;
        let expr = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after expression")?;
        self.consume(TokenKind::Semicolon, "expected ';' after statement")?;
        Ok(Statement::Print(expr))
    }

    fn ask_statement(&mut self) -> Result<Statement, TsilError> {
        self.consume(TokenKind::Ask, "expected ASK")?;
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after query")?;
        Ok(Statement::Ask(expr))
    }

    fn expression_statement(&mut self) -> Result<Statement, TsilError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(Statement::Expression(expr))
    }

    fn expression(&mut self) -> Result<Term, TsilError> {
        self.implication()
    }

    // IMPLIES is right-associative and binds loosest.
    fn implication(&mut self) -> Result<Term, TsilError> {
        let antecedent = self.or()?;
        if self.match_kind(TokenKind::Implies) {
            let consequent = self.implication()?;
            return Ok(Term::Implication {
                antecedent: Box::new(antecedent),
                consequent: Box::new(consequent),
            });
        }
        Ok(antecedent)
    }

    fn or(&mut self) -> Result<Term, TsilError> {
        let mut expr = self.and()?;
        while self.peek().kind == TokenKind::Or {
            let line = self.advance().line;
            let right = self.and()?;
            expr = Term::Logical {
                op: LogicalOp::Or,
                line,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Term, TsilError> {
        let mut expr = self.equality()?;
        while self.peek().kind == TokenKind::And {
            let line = self.advance().line;
            let right = self.equality()?;
            expr = Term::Logical {
                op: LogicalOp::And,
                line,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Term, TsilError> {
        self.binary_level(Self::comparison, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOp::Equal),
            TokenKind::BangEqual => Some(BinaryOp::NotEqual),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Term, TsilError> {
        self.binary_level(Self::term, |kind| match kind {
            TokenKind::Greater => Some(BinaryOp::Greater),
            TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
            TokenKind::Less => Some(BinaryOp::Less),
            TokenKind::LessEqual => Some(BinaryOp::LessEqual),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Term, TsilError> {
        self.binary_level(Self::factor, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Subtract),
            _ => None,
        })
    }

    fn factor(&mut self) -> Result<Term, TsilError> {
        self.binary_level(Self::unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Multiply),
            TokenKind::Slash => Some(BinaryOp::Divide),
            _ => None,
        })
    }

    /// One left-associative precedence level: `operand (op operand)*`.
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Term, TsilError>,
        operator: fn(TokenKind) -> Option<BinaryOp>,
    ) -> Result<Term, TsilError> {
        let mut expr = operand(self)?;
        while let Some(op) = operator(self.peek().kind) {
            let line = self.advance().line;
            let right = operand(self)?;
            expr = Term::Binary {
                op,
                line,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Term, TsilError> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => return self.primary(),
        };
        let line = self.advance().line;
        let operand = self.unary()?;
        Ok(Term::Unary {
            op,
            line,
            operand: Box::new(operand),
        })
    }

    fn primary(&mut self) -> Result<Term, TsilError> {
        match self.peek().kind {
            TokenKind::Number
            | TokenKind::Str
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => {
                let tok = self.advance();
                Ok(Term::Literal(tok.literal.clone().unwrap_or(Literal::Nil)))
            }
            TokenKind::PredicateName => self.predicate(),
            TokenKind::Identifier => {
                let name = self.advance().lexeme.clone();
                if is_variable_name(&name) {
                    Ok(Term::Variable(Variable::named(name)))
                } else {
                    Ok(Term::Constant(name))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn predicate(&mut self) -> Result<Term, TsilError> {
        let name = self.advance().lexeme.clone();
        self.consume(TokenKind::LeftParen, "expected '(' after predicate name")?;
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                args.push(self.expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
        Ok(Term::Predicate { name, args })
    }

    /// Panic-mode recovery: skip past the next ';' (or to the end of input).
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.advance().kind == TokenKind::Semicolon {
                return;
            }
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        &self.tokens[self.position - 1]
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, reason: &str) -> Result<&Token, TsilError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(reason))
        }
    }

    fn error(&self, reason: &str) -> TsilError {
        let tok = self.peek();
        let lexeme = if tok.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            tok.lexeme.clone()
        };
        TsilError::ParserError {
            line: tok.line,
            lexeme,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Vec<Result<Statement, TsilError>> {
        let toks = Scanner::new(source.chars().collect())
            .tokens()
            .into_iter()
            .map(|t| t.unwrap())
            .collect();
        Parser::new(toks).parse()
    }

    fn parse_ok(source: &str) -> Vec<Statement> {
        parse(source).into_iter().map(|s| s.unwrap()).collect()
    }

    #[test]
    fn parse_fact() {
        assert_eq!(
            parse_ok("Parent(tom, bob);"),
            vec![Statement::Expression(Term::predicate(
                "Parent",
                vec![Term::constant("tom"), Term::constant("bob")]
            ))]
        );
    }

    #[test]
    fn parse_variables_and_constants() {
        assert_eq!(
            parse_ok("ASK Likes(X, _y, mary, 3, \"s\");"),
            vec![Statement::Ask(Term::predicate(
                "Likes",
                vec![
                    Term::variable("X"),
                    Term::variable("_y"),
                    Term::constant("mary"),
                    Term::Literal(Literal::Number(3.0)),
                    Term::Literal(Literal::Str("s".into())),
                ]
            ))]
        );
    }

    #[test]
    fn parse_rule() {
        let parsed = parse_ok("Parent(X, Y) AND Parent(Y, Z) IMPLIES Grandparent(X, Z);");
        assert_eq!(
            parsed,
            vec![Statement::Expression(Term::Implication {
                antecedent: Box::new(Term::Logical {
                    op: LogicalOp::And,
                    line: 1,
                    left: Box::new(Term::predicate(
                        "Parent",
                        vec![Term::variable("X"), Term::variable("Y")]
                    )),
                    right: Box::new(Term::predicate(
                        "Parent",
                        vec![Term::variable("Y"), Term::variable("Z")]
                    )),
                }),
                consequent: Box::new(Term::predicate(
                    "Grandparent",
                    vec![Term::variable("X"), Term::variable("Z")]
                )),
            })]
        );
    }

    #[test]
    fn implication_is_right_associative() {
        let parsed = parse_ok("A() IMPLIES B() IMPLIES C();");
        let Statement::Expression(Term::Implication { consequent, .. }) = &parsed[0] else {
            panic!("expected implication, got {parsed:?}");
        };
        assert!(matches!(**consequent, Term::Implication { .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse_ok("ASK A() OR B() AND C();");
        let Statement::Ask(Term::Logical { op, right, .. }) = &parsed[0] else {
            panic!("expected logical, got {parsed:?}");
        };
        assert_eq!(*op, LogicalOp::Or);
        assert!(matches!(
            **right,
            Term::Logical {
                op: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn arithmetic_precedence() {
        let parsed = parse_ok("PRINT(1 + 2 * -3);");
        assert_eq!(
            parsed,
            vec![Statement::Print(Term::Binary {
                op: BinaryOp::Add,
                line: 1,
                left: Box::new(Term::Literal(Literal::Number(1.0))),
                right: Box::new(Term::Binary {
                    op: BinaryOp::Multiply,
                    line: 1,
                    left: Box::new(Term::Literal(Literal::Number(2.0))),
                    right: Box::new(Term::Unary {
                        op: UnaryOp::Negate,
                        line: 1,
                        operand: Box::new(Term::Literal(Literal::Number(3.0))),
                    }),
                }),
            })]
        );
    }

    #[test]
    fn comparison_below_equality() {
        let parsed = parse_ok("PRINT(1 < 2 == true);");
        let Statement::Print(Term::Binary { op, left, .. }) = &parsed[0] else {
            panic!("expected binary, got {parsed:?}");
        };
        assert_eq!(*op, BinaryOp::Equal);
        assert!(matches!(
            **left,
            Term::Binary {
                op: BinaryOp::Less,
                ..
            }
        ));
    }

    #[test]
    fn empty_argument_list() {
        assert_eq!(
            parse_ok("Raining();"),
            vec![Statement::Expression(Term::predicate("Raining", vec![]))]
        );
    }

    #[test]
    fn recovers_after_bad_statement() {
        let parsed = parse("PRINT(1 2); Parent(tom, bob); ASK Parent(tom, bob);");
        assert_eq!(parsed.len(), 3);
        assert!(matches!(
            parsed[0],
            Err(TsilError::ParserError { ref lexeme, .. }) if lexeme == "2"
        ));
        assert!(parsed[1].is_ok());
        assert!(parsed[2].is_ok());
    }

    #[test]
    fn missing_semicolon_at_end() {
        let parsed = parse("P(a)");
        assert_eq!(parsed.len(), 1);
        assert!(matches!(
            parsed[0],
            Err(TsilError::ParserError { ref lexeme, .. }) if lexeme == "end of input"
        ));
    }

    #[test]
    fn parser_error_line() {
        let parsed = parse("P(a);\n\nASK ;");
        match &parsed[1] {
            Err(TsilError::ParserError { line, reason, .. }) => {
                assert_eq!(*line, 3);
                assert_eq!(reason, "expected expression");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn variable_names() {
        assert!(is_variable_name("X"));
        assert!(is_variable_name("_tmp"));
        assert!(!is_variable_name("tom"));
        assert!(!is_variable_name(""));
    }
}
