use regex::Regex;

use crate::error::{CITreeError, Result};
use crate::models::{Build, Test};
use crate::query::QueryDepth;

/// A reusable test over a model.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Holds when every predicate holds. An empty list always holds.
pub fn all_of<T: 'static>(predicates: Vec<Predicate<T>>) -> Predicate<T> {
    Box::new(move |item| predicates.iter().all(|p| p(item)))
}

/// Holds when at least one predicate holds. An empty list never holds.
pub fn any_of<T: 'static>(predicates: Vec<Predicate<T>>) -> Predicate<T> {
    Box::new(move |item| predicates.iter().any(|p| p(item)))
}

pub fn negate<T: 'static>(predicate: Predicate<T>) -> Predicate<T> {
    Box::new(move |item| !predicate(item))
}

/// Keeps the items the predicate accepts, preserving order.
pub fn retain_matching<T>(items: Vec<T>, predicate: &Predicate<T>) -> Vec<T> {
    items.into_iter().filter(|item| predicate(item)).collect()
}

/// Regex patterns matched anywhere in a name. No patterns matches every name.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    filter: String,
    patterns: Vec<Regex>,
}

impl NameFilter {
    /// Compiles the given patterns, failing on the first invalid one.
    pub fn new<S: AsRef<str>>(filter: &str, patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile(filter, pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            filter: filter.to_string(),
            patterns,
        })
    }

    /// A filter that accepts everything.
    #[cfg(test)]
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.is_unrestricted() || self.patterns.iter().any(|p| p.is_match(name))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    /// Adds a pattern matching exactly `name`. Returns false if it was already there.
    pub fn extend_exact(&mut self, name: &str) -> bool {
        let pattern = format!("^{}$", regex::escape(name));
        if self.patterns().any(|existing| existing == pattern) {
            return false;
        }

        match Regex::new(&pattern) {
            Ok(regex) => {
                log::debug!("Filter '{}' extended with: {pattern}", self.filter);
                self.patterns.push(regex);
                true
            }
            Err(_) => false,
        }
    }

    /// Builds a predicate testing the name extracted by `key`: one test per
    /// pattern, any of which may hold.
    pub fn predicate<T: 'static>(&self, key: fn(&T) -> &str) -> Predicate<T> {
        if self.is_unrestricted() {
            return Box::new(|_| true);
        }

        any_of(
            self.patterns
                .iter()
                .cloned()
                .map(|regex| -> Predicate<T> { Box::new(move |item| regex.is_match(key(item))) })
                .collect(),
        )
    }
}

fn compile(filter: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| CITreeError::InvalidPattern {
        filter: filter.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Case-insensitive set of accepted values, e.g. build results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: Vec<String>,
}

impl ValueSet {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let mut set = Self::default();
        for value in values {
            let value = value.as_ref().to_ascii_uppercase();
            if !set.values.contains(&value) {
                set.values.push(value);
            }
        }
        set
    }

    pub fn is_unrestricted(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.is_unrestricted() || self.values.iter().any(|v| v.eq_ignore_ascii_case(value))
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl RangeOp {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Ne => (lhs - rhs).abs() >= f64::EPSILON,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

/// Numeric conditions such as `>=3` or `>60,<=300`, AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    conditions: Vec<(RangeOp, f64)>,
}

impl RangeFilter {
    pub fn parse(filter: &str, expression: &str) -> Result<Self> {
        let invalid = || CITreeError::InvalidRange {
            filter: filter.to_string(),
            value: expression.to_string(),
        };

        let conditions = expression
            .split(',')
            .map(str::trim)
            .map(|term| {
                let (op, number) = split_operator(term);
                number.trim().parse::<f64>().map(|n| (op, n)).map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>>>()?;

        if conditions.is_empty() {
            return Err(invalid());
        }

        Ok(Self { conditions })
    }

    pub fn matches(&self, value: f64) -> bool {
        self.conditions.iter().all(|(op, rhs)| op.holds(value, *rhs))
    }
}

fn split_operator(term: &str) -> (RangeOp, &str) {
    // Two-character operators first so `>=` is not read as `>`.
    const OPERATORS: [(&str, RangeOp); 7] = [
        (">=", RangeOp::Ge),
        ("<=", RangeOp::Le),
        ("==", RangeOp::Eq),
        ("!=", RangeOp::Ne),
        (">", RangeOp::Gt),
        ("<", RangeOp::Lt),
        ("=", RangeOp::Eq),
    ];

    OPERATORS
        .iter()
        .find_map(|(symbol, op)| term.strip_prefix(symbol).map(|rest| (*op, rest)))
        .unwrap_or((RangeOp::Eq, term))
}

/// Everything a query may be narrowed by, one typed field per filter.
///
/// `None` means the level was not asked for; `Some` with an unrestricted
/// filter means the level was asked for without narrowing it.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub tenants: Option<NameFilter>,
    pub projects: Option<NameFilter>,
    pub pipelines: Option<NameFilter>,
    pub jobs: Option<NameFilter>,
    pub variants: bool,
    pub variables: Option<NameFilter>,
    pub inherited_variables: bool,
    pub builds: Option<NameFilter>,
    pub build_status: Option<ValueSet>,
    pub build_duration: Option<RangeFilter>,
    pub last_build: bool,
    pub tests: Option<NameFilter>,
    pub test_result: Option<ValueSet>,
}

fn accepts(filter: Option<&NameFilter>, name: &str) -> bool {
    filter.map_or(true, |f| f.matches(name))
}

fn narrows(filter: Option<&NameFilter>) -> bool {
    filter.is_some_and(|f| !f.is_unrestricted())
}

impl FilterCriteria {
    pub fn accepts_tenant(&self, name: &str) -> bool {
        accepts(self.tenants.as_ref(), name)
    }

    pub fn accepts_project(&self, name: &str) -> bool {
        accepts(self.projects.as_ref(), name)
    }

    pub fn accepts_pipeline(&self, name: &str) -> bool {
        accepts(self.pipelines.as_ref(), name)
    }

    pub fn accepts_job(&self, name: &str) -> bool {
        accepts(self.jobs.as_ref(), name)
    }

    pub fn accepts_variable(&self, key: &str) -> bool {
        accepts(self.variables.as_ref(), key)
    }

    pub fn narrows_jobs(&self) -> bool {
        narrows(self.jobs.as_ref())
    }

    /// True when a filter applied by a query at `depth` can leave a project
    /// without pipelines. A job filter only counts once jobs are fetched.
    pub fn narrows_pipelines(&self, depth: QueryDepth) -> bool {
        narrows(self.pipelines.as_ref())
            || (depth.reaches(QueryDepth::Jobs) && self.narrows_jobs())
    }

    /// Statuses the remote host can filter on by itself.
    pub fn server_side_statuses(&self) -> &[String] {
        match &self.build_status {
            Some(statuses) => statuses.values(),
            None => &[],
        }
    }

    /// Client-side predicate for builds; `last_build` is applied separately
    /// since it depends on the whole build list.
    pub fn build_predicate(&self) -> Predicate<Build> {
        let mut predicates: Vec<Predicate<Build>> = Vec::new();

        if let Some(ids) = &self.builds {
            predicates.push(ids.predicate::<Build>(|build| build.id.as_str()));
        }

        if let Some(statuses) = self.build_status.clone() {
            predicates.push(Box::new(move |build: &Build| {
                statuses.is_unrestricted()
                    || build.status.as_deref().is_some_and(|s| statuses.contains(s))
            }));
        }

        if let Some(range) = self.build_duration.clone() {
            predicates.push(Box::new(move |build: &Build| {
                build.duration.is_some_and(|d| range.matches(d))
            }));
        }

        all_of(predicates)
    }

    pub fn test_predicate(&self) -> Predicate<Test> {
        let mut predicates: Vec<Predicate<Test>> = Vec::new();

        if let Some(names) = &self.tests {
            predicates.push(names.predicate::<Test>(|test| test.name.as_str()));
        }

        if let Some(results) = self.test_result.clone() {
            predicates.push(Box::new(move |test: &Test| results.contains(test.result.label())));
        }

        all_of(predicates)
    }
}
