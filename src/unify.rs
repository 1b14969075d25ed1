//! First-order unification over [`Term`]s.
//!
//! Substitutions are threaded through as values: every successful unification returns a new
//! substitution extending the one it was given, so a failed branch of the search never leaves
//! bindings behind.

use std::collections::HashMap;

use crate::ast::{Term, Variable};

/// A substitution maps variables to terms. No variable is bound to itself and, because
/// [`unify`] performs the occurs check, no chain of bindings ever leads back to its start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: HashMap<Variable, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.bindings.get(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter()
    }

    pub(crate) fn insert(&mut self, var: Variable, term: Term) {
        self.bindings.insert(var, term);
    }

    fn bind(&self, var: &Variable, term: &Term) -> Substitution {
        let mut extended = self.clone();
        extended.insert(var.clone(), term.clone());
        extended
    }

    /// Applies the substitution until no bound variable is left in `term`.
    pub fn resolve(&self, term: &Term) -> Term {
        match term {
            Term::Variable(var) => match self.get(var) {
                Some(bound) => self.resolve(bound),
                None => term.clone(),
            },
            Term::Literal(_) | Term::Constant(_) => term.clone(),
            Term::Predicate { name, args } => Term::Predicate {
                name: name.clone(),
                args: args.iter().map(|arg| self.resolve(arg)).collect(),
            },
            Term::Unary { op, line, operand } => Term::Unary {
                op: *op,
                line: *line,
                operand: Box::new(self.resolve(operand)),
            },
            Term::Binary {
                op,
                line,
                left,
                right,
            } => Term::Binary {
                op: *op,
                line: *line,
                left: Box::new(self.resolve(left)),
                right: Box::new(self.resolve(right)),
            },
            Term::Logical {
                op,
                line,
                left,
                right,
            } => Term::Logical {
                op: *op,
                line: *line,
                left: Box::new(self.resolve(left)),
                right: Box::new(self.resolve(right)),
            },
            Term::Implication {
                antecedent,
                consequent,
            } => Term::Implication {
                antecedent: Box::new(self.resolve(antecedent)),
                consequent: Box::new(self.resolve(consequent)),
            },
        }
    }
}

/// Unifies `x` and `y` under `theta`, returning the extended substitution on success.
///
/// Variables unify with anything (following existing bindings first); constants and literals
/// unify when equal; predicates unify when name and arity match and their arguments unify
/// pairwise, left to right. Every other pairing fails.
pub fn unify(x: &Term, y: &Term, theta: &Substitution) -> Option<Substitution> {
    match (x, y) {
        (Term::Variable(v), _) => unify_variable(v, y, theta),
        (_, Term::Variable(v)) => unify_variable(v, x, theta),
        (Term::Constant(a), Term::Constant(b)) => (a == b).then(|| theta.clone()),
        (Term::Literal(a), Term::Literal(b)) => (a == b).then(|| theta.clone()),
        (
            Term::Predicate {
                name: x_name,
                args: x_args,
            },
            Term::Predicate {
                name: y_name,
                args: y_args,
            },
        ) => {
            if x_name != y_name || x_args.len() != y_args.len() {
                return None;
            }
            x_args
                .iter()
                .zip(y_args)
                .try_fold(theta.clone(), |acc, (a, b)| unify(a, b, &acc))
        }
        _ => None,
    }
}

fn unify_variable(var: &Variable, x: &Term, theta: &Substitution) -> Option<Substitution> {
    if let Some(bound) = theta.get(var) {
        return unify(bound, x, theta);
    }
    if let Term::Variable(other) = x {
        if other == var {
            return Some(theta.clone());
        }
        if let Some(bound) = theta.get(other) {
            return unify(&Term::Variable(var.clone()), bound, theta);
        }
    }
    if occurs(var, x, theta) {
        return None;
    }
    Some(theta.bind(var, x))
}

fn occurs(var: &Variable, x: &Term, theta: &Substitution) -> bool {
    match x {
        Term::Variable(other) => {
            other == var || theta.get(other).is_some_and(|bound| occurs(var, bound, theta))
        }
        Term::Literal(_) | Term::Constant(_) => false,
        Term::Predicate { args, .. } => args.iter().any(|arg| occurs(var, arg, theta)),
        Term::Unary { operand, .. } => occurs(var, operand, theta),
        Term::Binary { left, right, .. } | Term::Logical { left, right, .. } => {
            occurs(var, left, theta) || occurs(var, right, theta)
        }
        Term::Implication {
            antecedent,
            consequent,
        } => occurs(var, antecedent, theta) || occurs(var, consequent, theta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Literal};

    fn parent(a: Term, b: Term) -> Term {
        Term::predicate("Parent", vec![a, b])
    }

    fn c(name: &str) -> Term {
        Term::constant(name)
    }

    fn v(name: &str) -> Term {
        Term::variable(name)
    }

    #[test]
    fn binds_variable() {
        let theta = unify(&parent(v("X"), c("bob")), &parent(c("tom"), c("bob")), &Substitution::new())
            .unwrap();
        assert_eq!(theta.len(), 1);
        assert_eq!(theta.get(&Variable::named("X")), Some(&c("tom")));
    }

    #[test]
    fn ground_terms_unify_without_bindings() {
        let theta =
            unify(&parent(c("tom"), c("bob")), &parent(c("tom"), c("bob")), &Substitution::new())
                .unwrap();
        assert!(theta.is_empty());
    }

    #[test]
    fn mismatches_fail() {
        let empty = Substitution::new();
        assert!(unify(&c("tom"), &c("bob"), &empty).is_none());
        assert!(unify(&parent(c("a"), c("b")), &Term::predicate("Parent", vec![c("a")]), &empty).is_none());
        assert!(unify(&parent(c("a"), c("b")), &Term::predicate("Child", vec![c("a"), c("b")]), &empty).is_none());
        assert!(unify(&c("one"), &Term::Literal(Literal::Str("one".into())), &empty).is_none());
    }

    #[test]
    fn numeric_literals_compare_by_value() {
        let empty = Substitution::new();
        assert!(unify(
            &Term::Literal(Literal::Number(1.0)),
            &Term::Literal(Literal::Number(1.0)),
            &empty
        )
        .is_some());
    }

    #[test]
    fn operator_nodes_never_unify() {
        let sum = Term::Binary {
            op: BinaryOp::Add,
            line: 1,
            left: Box::new(Term::Literal(Literal::Number(1.0))),
            right: Box::new(Term::Literal(Literal::Number(2.0))),
        };
        assert!(unify(&sum, &sum.clone(), &Substitution::new()).is_none());
    }

    #[test]
    fn symmetric() {
        let pairs = vec![
            (parent(v("X"), c("bob")), parent(c("tom"), v("Y"))),
            (parent(v("X"), v("X")), parent(c("tom"), c("bob"))),
            (parent(v("X"), v("Y")), parent(v("Y"), c("ann"))),
            (c("tom"), c("tom")),
        ];
        for (a, b) in pairs {
            let ab = unify(&a, &b, &Substitution::new());
            let ba = unify(&b, &a, &Substitution::new());
            assert_eq!(ab.is_some(), ba.is_some(), "{a} vs {b}");
            if let (Some(ab), Some(ba)) = (ab, ba) {
                assert_eq!(ab.resolve(&a), ba.resolve(&a));
                assert_eq!(ab.resolve(&b), ba.resolve(&b));
            }
        }
    }

    #[test]
    fn aliasing_follows_bindings() {
        let theta = unify(&parent(v("X"), v("X")), &parent(v("Y"), c("ann")), &Substitution::new())
            .unwrap();
        assert_eq!(theta.resolve(&v("X")), c("ann"));
        assert_eq!(theta.resolve(&v("Y")), c("ann"));
    }

    #[test]
    fn never_binds_variable_to_itself() {
        let theta = unify(&v("X"), &v("X"), &Substitution::new()).unwrap();
        assert!(theta.is_empty());

        let theta = unify(&parent(v("X"), v("Y")), &parent(v("Y"), v("X")), &Substitution::new())
            .unwrap();
        assert_eq!(theta.len(), 1);
    }

    #[test]
    fn occurs_check() {
        let nested = Term::predicate("F", vec![v("X")]);
        assert!(unify(&v("X"), &nested, &Substitution::new()).is_none());
    }

    #[test]
    fn resolve_through_chain() {
        let theta = unify(&v("A"), &v("B"), &Substitution::new()).unwrap();
        let theta = unify(&v("B"), &c("tom"), &theta).unwrap();
        assert_eq!(theta.resolve(&parent(v("A"), v("C"))), parent(c("tom"), v("C")));
    }
}
