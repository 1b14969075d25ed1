use core::fmt;
use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::ast::{LogicalOp, Term, Variable};
use crate::error::TsilError;
use crate::unify::{Substitution, unify};

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// A sentence admitted into the knowledge base.
#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    /// A bare predicate.
    Fact(Term),
    /// `antecedent IMPLIES consequent`, where the consequent is a predicate and the antecedent
    /// is a goal (predicates joined by AND / OR).
    Rule { antecedent: Term, consequent: Term },
}

impl Clause {
    fn head(&self) -> &Term {
        match self {
            Clause::Fact(fact) => fact,
            Clause::Rule { consequent, .. } => consequent,
        }
    }

    /// The `(name, arity)` bucket this clause is stored under.
    pub fn key(&self) -> (String, usize) {
        match self.head() {
            Term::Predicate { name, args } => (name.clone(), args.len()),
            // TryFrom<Term> only admits predicate heads
            other => (other.to_string(), 0),
        }
    }

    fn variables(&self) -> Vec<&Variable> {
        match self {
            Clause::Fact(fact) => fact.variables(),
            Clause::Rule {
                antecedent,
                consequent,
            } => {
                let mut vars = consequent.variables();
                for var in antecedent.variables() {
                    if !vars.contains(&var) {
                        vars.push(var);
                    }
                }
                vars
            }
        }
    }
}

impl TryFrom<Term> for Clause {
    type Error = TsilError;

    fn try_from(value: Term) -> Result<Self, Self::Error> {
        match value {
            Term::Predicate { .. } => Ok(Clause::Fact(value)),
            Term::Implication {
                antecedent,
                consequent,
            } => {
                if !matches!(*consequent, Term::Predicate { .. }) {
                    return Err(TsilError::InvalidClause {
                        sentence: format!("{antecedent} IMPLIES {consequent}"),
                        reason: "the consequent of a rule must be a predicate".into(),
                    });
                }
                if !is_goal(&antecedent) {
                    return Err(TsilError::InvalidClause {
                        sentence: format!("{antecedent} IMPLIES {consequent}"),
                        reason: "the antecedent of a rule must be predicates joined by AND or OR"
                            .into(),
                    });
                }
                Ok(Clause::Rule {
                    antecedent: *antecedent,
                    consequent: *consequent,
                })
            }
            other => Err(TsilError::InvalidClause {
                sentence: other.to_string(),
                reason: "only predicates and implications can be told".into(),
            }),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Clause::Fact(fact) => write!(f, "{fact}"),
            Clause::Rule {
                antecedent,
                consequent,
            } => write!(f, "{antecedent} IMPLIES {consequent}"),
        }
    }
}

/// Goals are what resolution knows how to prove.
fn is_goal(term: &Term) -> bool {
    match term {
        Term::Predicate { .. } => true,
        Term::Logical { left, right, .. } => is_goal(left) && is_goal(right),
        _ => false,
    }
}

#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    // Buckets keep insertion order; that order decides which clause is tried first.
    clauses: BTreeMap<(String, usize), Vec<Clause>>,
    max_depth: usize,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        KnowledgeBase {
            clauses: BTreeMap::new(),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.values().flatten()
    }

    /// Adds a fact or a rule. Duplicates are stored as given.
    pub fn tell(&mut self, sentence: Term) -> Result<(), TsilError> {
        let clause = Clause::try_from(sentence)?;
        debug!(%clause, "tell");
        self.clauses.entry(clause.key()).or_default().push(clause);
        Ok(())
    }

    /// Proves `query` by depth-first backward chaining. `Ok(None)` means the query could not be
    /// proved, which is an ordinary answer and not an error.
    pub fn ask(&self, query: &Term) -> Result<Option<Substitution>, TsilError> {
        if !is_goal(query) {
            return Err(TsilError::InvalidQuery {
                query: query.to_string(),
                reason: "only predicates joined by AND or OR can be asked".into(),
            });
        }
        debug!(%query, "ask");
        let mut resolver = Resolver::new(self);
        let answer = resolver.solve(query, Substitution::new(), 0, &mut |_, theta| Some(theta));
        if answer.is_none() && resolver.depth_exceeded {
            warn!(
                %query,
                max_depth = self.max_depth,
                "resolution depth limit reached, reporting failure"
            );
        }
        Ok(answer)
    }
}

type Continuation<'c, 'kb> = dyn FnMut(&mut Resolver<'kb>, Substitution) -> Option<Substitution> + 'c;

/// State of a single `ask`: the fresh-variable counter and whether the depth limit cut the search.
struct Resolver<'kb> {
    kb: &'kb KnowledgeBase,
    next_fresh: usize,
    depth_exceeded: bool,
}

impl<'kb> Resolver<'kb> {
    fn new(kb: &'kb KnowledgeBase) -> Self {
        Resolver {
            kb,
            next_fresh: 0,
            depth_exceeded: false,
        }
    }

    /// Searches for proofs of `goal` extending `theta`, handing each one to `k`. Stops at the
    /// first proof `k` accepts; returning `None` from `k` backtracks into the next alternative.
    fn solve(
        &mut self,
        goal: &Term,
        theta: Substitution,
        depth: usize,
        k: &mut Continuation<'_, 'kb>,
    ) -> Option<Substitution> {
        match goal {
            Term::Logical {
                op: LogicalOp::And,
                left,
                right,
                ..
            } => self.solve(left, theta, depth, &mut |resolver, theta| {
                resolver.solve(right, theta, depth, k)
            }),
            Term::Logical {
                op: LogicalOp::Or,
                left,
                right,
                ..
            } => {
                if let Some(answer) = self.solve(left, theta.clone(), depth, k) {
                    return Some(answer);
                }
                self.solve(right, theta, depth, k)
            }
            Term::Predicate { name, args } => self.solve_atom(goal, name, args.len(), theta, depth, k),
            _ => None,
        }
    }

    fn solve_atom(
        &mut self,
        goal: &Term,
        name: &str,
        arity: usize,
        theta: Substitution,
        depth: usize,
        k: &mut Continuation<'_, 'kb>,
    ) -> Option<Substitution> {
        let kb = self.kb;
        let bucket = kb.clauses.get(&(name.to_string(), arity))?;
        for clause in bucket {
            match self.standardize_apart(clause) {
                Clause::Fact(fact) => {
                    if let Some(extended) = unify(goal, &fact, &theta) {
                        trace!(%goal, %fact, "matched fact");
                        if let Some(answer) = k(self, extended) {
                            return Some(answer);
                        }
                    }
                }
                Clause::Rule {
                    antecedent,
                    consequent,
                } => {
                    let Some(extended) = unify(goal, &consequent, &theta) else {
                        continue;
                    };
                    if depth >= kb.max_depth {
                        self.depth_exceeded = true;
                        continue;
                    }
                    trace!(%goal, %antecedent, depth, "expanding rule");
                    if let Some(answer) = self.solve(&antecedent, extended, depth + 1, k) {
                        return Some(answer);
                    }
                }
            }
        }
        None
    }

    /// Renames every variable of `clause` to a fresh one so each use is independent of the
    /// caller's variables and of other uses of the same clause.
    fn standardize_apart(&mut self, clause: &Clause) -> Clause {
        let vars = clause.variables();
        if vars.is_empty() {
            return clause.clone();
        }
        let mut renaming = Substitution::new();
        for var in vars {
            renaming.insert(var.clone(), Term::Variable(Variable::fresh(self.next_fresh)));
            self.next_fresh += 1;
        }
        match clause {
            Clause::Fact(fact) => Clause::Fact(renaming.resolve(fact)),
            Clause::Rule {
                antecedent,
                consequent,
            } => Clause::Rule {
                antecedent: renaming.resolve(antecedent),
                consequent: renaming.resolve(consequent),
            },
        }
    }
}
