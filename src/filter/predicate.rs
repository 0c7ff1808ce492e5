//! Predicate tokens - single boolean tests against one entity field.

use std::fmt;

use crate::value::Value;

/// The test a predicate applies to a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Equal(Value),
    NotEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    /// Substring test on text, membership test on arrays.
    Contains(Value),
    BeginsWith(String),
    In(Vec<Value>),
    IsNull,
    IsNotNull,
}

/// An engine-agnostic test of one field.
///
/// The storage collaborator decides how `field` resolves; the in-memory
/// store treats it as a (dotted) path into the serialized entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    comparison: Comparison,
}

impl Predicate {
    pub fn new(field: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            field: field.into(),
            comparison,
        }
    }

    /// Start building a predicate on `name`.
    pub fn field(name: impl Into<String>) -> FieldRef {
        FieldRef { name: name.into() }
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        match &self.comparison {
            Comparison::Equal(v) => write!(f, "{} == {}", field, v),
            Comparison::NotEqual(v) => write!(f, "{} != {}", field, v),
            Comparison::LessThan(v) => write!(f, "{} < {}", field, v),
            Comparison::LessThanOrEqual(v) => write!(f, "{} <= {}", field, v),
            Comparison::GreaterThan(v) => write!(f, "{} > {}", field, v),
            Comparison::GreaterThanOrEqual(v) => write!(f, "{} >= {}", field, v),
            Comparison::Contains(v) => write!(f, "{} CONTAINS {}", field, v),
            Comparison::BeginsWith(prefix) => write!(f, "{} BEGINSWITH {:?}", field, prefix),
            Comparison::In(values) => {
                write!(f, "{} IN {{", field)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            Comparison::IsNull => write!(f, "{} == nil", field),
            Comparison::IsNotNull => write!(f, "{} != nil", field),
        }
    }
}

/// Builder returned by [`Predicate::field`].
#[derive(Debug, Clone)]
pub struct FieldRef {
    name: String,
}

impl FieldRef {
    fn with(self, comparison: Comparison) -> Predicate {
        Predicate::new(self.name, comparison)
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::Equal(value.into()))
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::NotEqual(value.into()))
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::LessThan(value.into()))
    }

    pub fn le(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::LessThanOrEqual(value.into()))
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::GreaterThan(value.into()))
    }

    pub fn ge(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::GreaterThanOrEqual(value.into()))
    }

    pub fn contains(self, value: impl Into<Value>) -> Predicate {
        self.with(Comparison::Contains(value.into()))
    }

    pub fn begins_with(self, prefix: impl Into<String>) -> Predicate {
        self.with(Comparison::BeginsWith(prefix.into()))
    }

    pub fn one_of<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(Comparison::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn is_null(self) -> Predicate {
        self.with(Comparison::IsNull)
    }

    pub fn is_not_null(self) -> Predicate {
        self.with(Comparison::IsNotNull)
    }
}
