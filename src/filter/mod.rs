//! Filters - Immutable boolean predicate trees.
//!
//! A [`FilterExpression`] is built from [`Predicate`] tokens with `and`,
//! `or` and `excluding`. Combinators never mutate; each returns a new tree
//! and calls associate to the left in the order they were made.
//!
//! ```ignore
//! use persisted_rust::{FilterExpression, Predicate};
//!
//! let adults = FilterExpression::all()
//!     .and(Predicate::field("age").ge(21))
//!     .excluding(Predicate::field("banned").eq(true));
//! assert_eq!(adults.to_string(), "(age >= 21 AND NOT banned == true)");
//! ```

mod predicate;

use std::fmt;

pub use predicate::{Comparison, FieldRef, Predicate};

/// A boolean tree over predicate tokens.
///
/// `All` is the empty tree and matches every entity.
#[derive(Debug, Clone)]
pub enum FilterExpression {
    All,
    Base(Predicate),
    And(Box<FilterExpression>, Box<FilterExpression>),
    Or(Box<FilterExpression>, Box<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl Default for FilterExpression {
    fn default() -> Self {
        FilterExpression::All
    }
}

impl FilterExpression {
    pub fn all() -> Self {
        FilterExpression::All
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FilterExpression::All)
    }

    /// Replace the whole tree with `predicate`.
    ///
    /// This discards whatever was built so far: calling it twice keeps only
    /// the second predicate. Use [`and`](Self::and) to combine.
    pub fn such_that(self, predicate: impl Into<FilterExpression>) -> Self {
        predicate.into()
    }

    /// `AND(self, predicate)`, or just `predicate` when nothing is set yet.
    pub fn and(self, predicate: impl Into<FilterExpression>) -> Self {
        match self {
            FilterExpression::All => predicate.into(),
            current => FilterExpression::And(Box::new(current), Box::new(predicate.into())),
        }
    }

    /// `OR(self, predicate)`, or just `predicate` when nothing is set yet.
    pub fn or(self, predicate: impl Into<FilterExpression>) -> Self {
        match self {
            FilterExpression::All => predicate.into(),
            current => FilterExpression::Or(Box::new(current), Box::new(predicate.into())),
        }
    }

    /// `AND(self, NOT(predicate))`, or just `NOT(predicate)` when nothing is set yet.
    pub fn excluding(self, predicate: impl Into<FilterExpression>) -> Self {
        let negated = FilterExpression::Not(Box::new(predicate.into()));
        match self {
            FilterExpression::All => negated,
            current => FilterExpression::And(Box::new(current), Box::new(negated)),
        }
    }

    /// Evaluate the tree with short-circuiting, delegating each base
    /// predicate to `test`.
    pub fn evaluate<F, E>(&self, test: &mut F) -> Result<bool, E>
    where
        F: FnMut(&Predicate) -> Result<bool, E>,
    {
        match self {
            FilterExpression::All => Ok(true),
            FilterExpression::Base(predicate) => test(predicate),
            FilterExpression::And(lhs, rhs) => {
                if lhs.evaluate(test)? {
                    rhs.evaluate(test)
                } else {
                    Ok(false)
                }
            }
            FilterExpression::Or(lhs, rhs) => {
                if lhs.evaluate(test)? {
                    Ok(true)
                } else {
                    rhs.evaluate(test)
                }
            }
            FilterExpression::Not(inner) => Ok(!inner.evaluate(test)?),
        }
    }

    /// Every base predicate in the tree, left to right.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            FilterExpression::All => {}
            FilterExpression::Base(predicate) => out.push(predicate),
            FilterExpression::And(lhs, rhs) | FilterExpression::Or(lhs, rhs) => {
                lhs.collect_predicates(out);
                rhs.collect_predicates(out);
            }
            FilterExpression::Not(inner) => inner.collect_predicates(out),
        }
    }
}

impl From<Predicate> for FilterExpression {
    fn from(predicate: Predicate) -> Self {
        FilterExpression::Base(predicate)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::All => write!(f, "TRUEPREDICATE"),
            FilterExpression::Base(predicate) => write!(f, "{}", predicate),
            FilterExpression::And(lhs, rhs) => write!(f, "({} AND {})", lhs, rhs),
            FilterExpression::Or(lhs, rhs) => write!(f, "({} OR {})", lhs, rhs),
            FilterExpression::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// Filters compare by their rendered description, not by meaning:
/// `a AND b` and `b AND a` are different filters.
impl PartialEq for FilterExpression {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for FilterExpression {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn age_over(n: i64) -> Predicate {
        Predicate::field("age").gt(n)
    }

    #[test]
    fn and_on_empty_establishes_root() {
        let filter = FilterExpression::all().and(age_over(1));
        assert_eq!(filter.to_string(), "age > 1");
    }

    #[test]
    fn combinators_associate_left() {
        let filter = FilterExpression::all()
            .and(age_over(1))
            .or(age_over(2))
            .and(age_over(3));
        assert_eq!(filter.to_string(), "((age > 1 OR age > 2) AND age > 3)");
    }

    #[test]
    fn excluding_negates() {
        let filter = FilterExpression::all().and(age_over(1)).excluding(age_over(9));
        assert_eq!(filter.to_string(), "(age > 1 AND NOT age > 9)");

        let only = FilterExpression::all().excluding(age_over(9));
        assert_eq!(only.to_string(), "NOT age > 9");
    }

    #[test]
    fn such_that_replaces_existing_tree() {
        let filter = FilterExpression::all()
            .such_that(age_over(1))
            .such_that(age_over(2));
        assert_eq!(filter, FilterExpression::from(age_over(2)));
    }

    #[test]
    fn equality_is_textual() {
        let a = FilterExpression::all().and(age_over(1)).and(age_over(2));
        let b = FilterExpression::all().and(age_over(2)).and(age_over(1));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn evaluation_short_circuits() {
        let filter = FilterExpression::all().or(age_over(1)).or(age_over(2));
        let mut seen = Vec::new();
        let matched = filter
            .evaluate(&mut |p: &Predicate| -> Result<bool, Infallible> {
                seen.push(p.to_string());
                Ok(true)
            })
            .unwrap();
        assert!(matched);
        assert_eq!(seen, vec!["age > 1".to_string()]);
    }

    #[test]
    fn evaluation_propagates_errors() {
        let filter = FilterExpression::from(age_over(1));
        let result = filter.evaluate(&mut |_| Err("broken"));
        assert_eq!(result, Err("broken"));
    }

    #[test]
    fn predicates_in_order() {
        let filter = FilterExpression::all()
            .and(age_over(1))
            .excluding(Predicate::field("name").eq("x"));
        let fields: Vec<_> = filter.predicates().iter().map(|p| p.field_name()).collect();
        assert_eq!(fields, vec!["age", "name"]);
    }
}
