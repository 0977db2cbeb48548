mod entities;
mod merge;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CITreeError;
use crate::query::QueryDepth;

pub use entities::{Build, BuildStatus, Job, Pipeline, Project, Tenant, Test, TestResult, Variant};
pub use merge::Merge;

/// A failure confined to one traversal branch of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchError {
    /// Path of the branch that failed, e.g. `tenant 'openstack' / project 'nova'`.
    pub scope: String,
    pub message: String,
}

/// The tree assembled by one query invocation.
///
/// Children are kept in the order they were first seen, which follows the
/// listing order of the remote host. Levels deeper than `depth` are never
/// populated, so an empty collection below that depth means "not fetched".
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub depth: QueryDepth,
    pub tenants: IndexMap<String, Tenant>,
    pub errors: Vec<BranchError>,
}

impl QueryOutput {
    pub fn new(depth: QueryDepth) -> Self {
        Self {
            depth,
            tenants: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    /// Merges a tenant subtree into the output.
    pub fn add_tenant(&mut self, tenant: Tenant) {
        match self.tenants.get_mut(&tenant.name) {
            Some(existing) => existing.merge(tenant),
            None => {
                self.tenants.insert(tenant.name.clone(), tenant);
            }
        }
    }

    pub fn record_error(&mut self, scope: impl Into<String>, error: &CITreeError) {
        let scope = scope.into();
        log::warn!("Query branch {scope} failed: {error}");
        self.errors.push(BranchError {
            scope,
            message: error.to_string(),
        });
    }

    /// Folds another output for the same query into this one.
    pub fn absorb(&mut self, other: QueryOutput) {
        for tenant in other.tenants.into_values() {
            self.add_tenant(tenant);
        }
        for error in other.errors {
            if !self.errors.contains(&error) {
                self.errors.push(error);
            }
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}
