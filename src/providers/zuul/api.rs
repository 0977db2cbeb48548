//! Capabilities of a remote Zuul deployment, one trait per hierarchy level.
//!
//! Handles returned by these traits identify a node and carry whatever the
//! listing call already returned for it; children are fetched by passing the
//! handle back to the matching trait. Two handles are equal when their owning
//! parent and their own name (or id) are equal.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{RawBuild, RawVariant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantRef {
    pub name: String,
}

impl TenantRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub tenant: TenantRef,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PipelineRef {
    pub project: ProjectRef,
    pub name: String,
    /// Names of the jobs this pipeline runs, in listing order, without repeats.
    pub job_names: Vec<String>,
}

impl PartialEq for PipelineRef {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project && self.name == other.name
    }
}

impl Eq for PipelineRef {}

impl PipelineRef {
    /// Jobs referenced by this pipeline. Jobs are tenant-scoped, so the
    /// handles point at the tenant rather than at the pipeline.
    pub fn jobs(&self) -> Vec<JobRef> {
        self.job_names
            .iter()
            .map(|name| JobRef {
                tenant: self.project.tenant.clone(),
                name: name.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobRef {
    pub tenant: TenantRef,
    pub name: String,
}

impl JobRef {
    pub fn new(tenant: &TenantRef, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.clone(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRef {
    pub job: JobRef,
    pub raw: RawVariant,
}

impl VariantRef {
    pub fn parent(&self) -> Option<&str> {
        self.raw.parent()
    }
}

#[derive(Debug, Clone)]
pub struct BuildRef {
    pub job: JobRef,
    pub raw: RawBuild,
}

impl PartialEq for BuildRef {
    fn eq(&self, other: &Self) -> bool {
        self.job == other.job && self.raw.uuid == other.raw.uuid
    }
}

/// Build filters the host can apply by itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildQuery {
    /// Accepted results; one `result` parameter is sent per entry.
    pub results: Vec<String>,
}

#[async_trait]
pub trait TenantSource: Send + Sync {
    async fn tenants(&self) -> Result<Vec<TenantRef>>;
}

#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn projects(&self, tenant: &TenantRef) -> Result<Vec<ProjectRef>>;

    /// Web page of the project on the host.
    fn project_url(&self, project: &ProjectRef) -> Option<String>;
}

#[async_trait]
pub trait PipelineSource: Send + Sync {
    async fn pipelines(&self, project: &ProjectRef) -> Result<Vec<PipelineRef>>;
}

#[async_trait]
pub trait JobSource: Send + Sync {
    /// Jobs a tenant exposes, independent of any project.
    async fn jobs(&self, tenant: &TenantRef) -> Result<Vec<JobRef>>;

    /// Web page of the job on the host.
    fn job_url(&self, job: &JobRef) -> Option<String>;
}

#[async_trait]
pub trait VariantSource: Send + Sync {
    async fn variants(&self, job: &JobRef) -> Result<Vec<VariantRef>>;
}

#[async_trait]
pub trait BuildSource: Send + Sync {
    async fn builds(&self, job: &JobRef, query: &BuildQuery) -> Result<Vec<BuildRef>>;
}

/// Everything the query engine needs from a Zuul deployment.
pub trait ZuulApi:
    TenantSource + ProjectSource + PipelineSource + JobSource + VariantSource + BuildSource
{
}

impl<T> ZuulApi for T where
    T: TenantSource + ProjectSource + PipelineSource + JobSource + VariantSource + BuildSource
{
}
