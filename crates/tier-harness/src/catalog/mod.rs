//! The built-in scenario families and the catalog that holds them.

mod arity;
mod exceptions;
mod polymorphic;
mod vectorized;

use std::collections::HashMap;

use crate::error::{HarnessError, Result};
use crate::scenario::{Expectation, Family, ScenarioSpec};
use crate::schedule::Schedule;

/// Inputs that shape the generated families.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub schedule: Schedule,
    /// Number of arguments the target ABI passes in registers; the arity family sweeps around it.
    pub register_arg_limit: usize,
    /// Width in bytes of the runtime's vector chunk; the vectorized family tests lengths around
    /// one chunk.
    pub vector_chunk_bytes: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            register_arg_limit: 6,
            vector_chunk_bytes: 16,
        }
    }
}

/// Immutable-once-built, insertion-ordered set of scenarios with unique ids.
#[derive(Clone, Debug, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioSpec>,
    index: HashMap<String, usize>,
}

impl ScenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arity, polymorphic, exception and vectorized families, in that order.
    pub fn standard(config: &CatalogConfig) -> Result<Self> {
        let mut catalog = Self::new();
        for spec in arity::scenarios(config)?
            .into_iter()
            .chain(polymorphic::scenarios(config)?)
            .chain(exceptions::scenarios(config)?)
            .chain(vectorized::scenarios(config)?)
        {
            catalog.push(spec)?;
        }
        Ok(catalog)
    }

    pub fn push(&mut self, spec: ScenarioSpec) -> Result<()> {
        spec.validate()?;
        if self.index.contains_key(&spec.id) {
            return Err(HarnessError::DuplicateScenario(spec.id));
        }
        self.index.insert(spec.id.clone(), self.scenarios.len());
        self.scenarios.push(spec);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioSpec> {
        self.index.get(id).map(|&idx| &self.scenarios[idx])
    }

    pub fn all_scenarios(&self) -> &[ScenarioSpec] {
        &self.scenarios
    }

    pub fn by_family(&self, family: Family) -> impl Iterator<Item = &ScenarioSpec> {
        self.scenarios.iter().filter(move |s| s.family == family)
    }

    /// Scenarios matching any term of `expr`.
    ///
    /// Terms are separated by `,`, `;` or whitespace and match case-insensitively as substrings
    /// of the id or the family name. `id:<term>` and `family:<term>` restrict a term to one field.
    /// A filter that selects nothing is an error.
    pub fn filtered(&self, expr: &str) -> Result<Self> {
        let terms = parse_filter_terms(expr);
        if terms.is_empty() {
            return Ok(self.clone());
        }
        let mut out = Self::new();
        for spec in self.scenarios.iter().filter(|s| matches_filter(s, &terms)) {
            out.push(spec.clone())?;
        }
        if out.is_empty() {
            return Err(HarnessError::EmptySelection {
                filter: expr.to_string(),
            });
        }
        Ok(out)
    }

    /// Mark every scenario matching `expr` as advisory. Returns how many were marked.
    pub fn mark_advisory(&mut self, expr: &str) -> usize {
        let terms = parse_filter_terms(expr);
        if terms.is_empty() {
            return 0;
        }
        let mut marked = 0;
        for spec in self.scenarios.iter_mut().filter(|s| matches_filter(s, &terms)) {
            spec.expectation = Expectation::Advisory;
            marked += 1;
        }
        marked
    }

    pub fn into_scenarios(self) -> Vec<ScenarioSpec> {
        self.scenarios
    }
}

fn parse_filter_terms(filter: &str) -> Vec<String> {
    filter
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

fn matches_filter(spec: &ScenarioSpec, terms: &[String]) -> bool {
    let id = spec.id.to_ascii_lowercase();
    let family = spec.family.as_str();
    terms.iter().any(|term| {
        if let Some(rest) = term.strip_prefix("id:") {
            id.contains(rest)
        } else if let Some(rest) = term.strip_prefix("family:") {
            family.contains(rest)
        } else {
            id.contains(term.as_str()) || family.contains(term.as_str())
        }
    })
}

/// `p1, p2, ..., pn`.
pub(crate) fn param_list(n: usize) -> String {
    (1..=n).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ")
}
