//! Derived per-event variables and their per-event cache.

use std::collections::HashMap;

use nx_core::{Error, Event, Result};
use serde::{Deserialize, Serialize};

use crate::expr::Expression;

/// Configuration entry for one derived variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Name the variable is published under.
    pub name: String,
    /// Expression over event scalars and earlier derived variables.
    pub expr: String,
}

impl VariableSpec {
    /// Create a spec.
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self { name: name.into(), expr: expr.into() }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Derived(usize),
    Scalar(String),
}

#[derive(Debug, Clone)]
struct Derived {
    name: String,
    expr: Expression,
    sources: Vec<Source>,
}

/// Ordered list of derived variables.
///
/// An expression may refer to variables defined before it; any other name is
/// read from the event, and a missing event scalar evaluates to NaN.
#[derive(Debug, Clone, Default)]
pub struct VariableSet {
    vars: Vec<Derived>,
    index: HashMap<String, usize>,
}

impl VariableSet {
    /// Compile `specs` in order.
    pub fn new(specs: &[VariableSpec]) -> Result<Self> {
        let mut set = Self::default();
        for spec in specs {
            if set.index.contains_key(&spec.name) {
                return Err(Error::Config(format!("derived variable '{}' defined twice", spec.name)));
            }
            let expr = Expression::parse(&spec.expr)
                .map_err(|e| Error::Config(format!("derived variable '{}': {e}", spec.name)))?;
            let sources = expr
                .inputs
                .iter()
                .map(|input| match set.index.get(input) {
                    Some(&i) => Source::Derived(i),
                    None => Source::Scalar(input.clone()),
                })
                .collect();
            set.index.insert(spec.name.clone(), set.vars.len());
            set.vars.push(Derived { name: spec.name.clone(), expr, sources });
        }
        Ok(set)
    }

    /// Number of derived variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when no variables are defined.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variable names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    /// Position of `name`, if it is a derived variable.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Recompute every variable for `event`, replacing the cache contents.
    pub fn compute(&self, event: &dyn Event, cache: &mut VariableCache) {
        cache.values.clear();
        let mut args = Vec::new();
        for var in &self.vars {
            args.clear();
            args.extend(var.sources.iter().map(|s| match s {
                Source::Derived(i) => cache.values[*i],
                Source::Scalar(name) => event.scalar(name).unwrap_or(f64::NAN),
            }));
            let value = var.expr.eval(&args);
            cache.values.push(value);
        }
    }
}

/// Derived values of the event currently being processed.
#[derive(Debug, Clone, Default)]
pub struct VariableCache {
    values: Vec<f64>,
}

impl VariableCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the current event.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Value of variable `i`, if computed.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    /// All computed values in evaluation order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// An event seen through its derived-variable cache.
///
/// Derived names shadow event scalars of the same name.
pub struct CachedEvent<'a> {
    event: &'a dyn Event,
    set: &'a VariableSet,
    cache: &'a VariableCache,
}

impl<'a> CachedEvent<'a> {
    /// Wrap `event`.
    pub fn new(event: &'a dyn Event, set: &'a VariableSet, cache: &'a VariableCache) -> Self {
        Self { event, set, cache }
    }
}

impl Event for CachedEvent<'_> {
    fn scalar(&self, name: &str) -> Option<f64> {
        match self.set.index_of(name) {
            Some(i) => self.cache.get(i).filter(|v| !v.is_nan()),
            None => self.event.scalar(name),
        }
    }

    fn weight(&self) -> f64 {
        self.event.weight()
    }
}
