//! In-memory Zuul deployment used by the query engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CITreeError, RemoteErrorKind, Result};

use super::api::{
    BuildQuery, BuildRef, BuildSource, JobRef, JobSource, PipelineRef, PipelineSource,
    ProjectRef, ProjectSource, TenantRef, TenantSource, VariantRef, VariantSource,
};
use super::types::{RawBuild, RawVariant};

#[derive(Default)]
pub struct FakeZuul {
    tenants: Vec<String>,
    projects: HashMap<String, Vec<String>>,
    pipelines: HashMap<(String, String), Vec<(String, Vec<String>)>>,
    jobs: HashMap<String, Vec<String>>,
    variants: HashMap<(String, String), Vec<RawVariant>>,
    builds: HashMap<(String, String), Vec<RawBuild>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeZuul {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(mut self, name: &str) -> Self {
        self.tenants.push(name.to_string());
        self
    }

    pub fn project(mut self, tenant: &str, name: &str) -> Self {
        self.projects
            .entry(tenant.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    pub fn pipeline(mut self, tenant: &str, project: &str, name: &str, jobs: &[&str]) -> Self {
        self.pipelines
            .entry((tenant.to_string(), project.to_string()))
            .or_default()
            .push((name.to_string(), jobs.iter().map(|j| j.to_string()).collect()));
        self
    }

    pub fn job(mut self, tenant: &str, name: &str) -> Self {
        self.jobs
            .entry(tenant.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    /// Adds a variant declaring `parent` and the given variables.
    pub fn variant(
        mut self,
        tenant: &str,
        job: &str,
        parent: Option<&str>,
        variables: &[(&str, serde_json::Value)],
    ) -> Self {
        let raw = RawVariant {
            description: Some(format!("{job} variant")),
            parent: parent.map(str::to_string),
            branches: Vec::new(),
            variables: variables
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.variants
            .entry((tenant.to_string(), job.to_string()))
            .or_default()
            .push(raw);
        self
    }

    pub fn build(
        mut self,
        tenant: &str,
        job: &str,
        uuid: &str,
        result: &str,
        project: &str,
        pipeline: &str,
    ) -> Self {
        let raw = RawBuild {
            uuid: uuid.to_string(),
            job_name: Some(job.to_string()),
            result: Some(result.to_string()),
            duration: Some(60.0),
            project: Some(project.to_string()),
            pipeline: Some(pipeline.to_string()),
            start_time: None,
            log_url: None,
        };
        self.builds
            .entry((tenant.to_string(), job.to_string()))
            .or_default()
            .push(raw);
        self
    }

    /// Sets how long an already added build ran, in seconds.
    pub fn lasting(mut self, tenant: &str, job: &str, uuid: &str, seconds: f64) -> Self {
        let key = (tenant.to_string(), job.to_string());
        for build in self.builds.entry(key).or_default() {
            if build.uuid == uuid {
                build.duration = Some(seconds);
            }
        }
        self
    }

    /// Makes the call with the given label fail with a 403.
    pub fn failing(mut self, call: &str) -> Self {
        self.failing.insert(call.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.contains(&call) {
            return Err(CITreeError::RemoteApi {
                kind: RemoteErrorKind::Forbidden,
                url: format!("fake://{call}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TenantSource for FakeZuul {
    async fn tenants(&self) -> Result<Vec<TenantRef>> {
        self.record("tenants".to_string())?;
        Ok(self.tenants.iter().map(TenantRef::new).collect())
    }
}

#[async_trait]
impl ProjectSource for FakeZuul {
    async fn projects(&self, tenant: &TenantRef) -> Result<Vec<ProjectRef>> {
        self.record(format!("projects:{}", tenant.name))?;
        Ok(self
            .projects
            .get(&tenant.name)
            .into_iter()
            .flatten()
            .map(|name| ProjectRef {
                tenant: tenant.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn project_url(&self, project: &ProjectRef) -> Option<String> {
        Some(format!("fake://{}/{}", project.tenant.name, project.name))
    }
}

#[async_trait]
impl PipelineSource for FakeZuul {
    async fn pipelines(&self, project: &ProjectRef) -> Result<Vec<PipelineRef>> {
        self.record(format!("pipelines:{}/{}", project.tenant.name, project.name))?;
        let key = (project.tenant.name.clone(), project.name.clone());
        Ok(self
            .pipelines
            .get(&key)
            .into_iter()
            .flatten()
            .map(|(name, jobs)| PipelineRef {
                project: project.clone(),
                name: name.clone(),
                job_names: jobs.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl JobSource for FakeZuul {
    async fn jobs(&self, tenant: &TenantRef) -> Result<Vec<JobRef>> {
        self.record(format!("jobs:{}", tenant.name))?;
        Ok(self
            .jobs
            .get(&tenant.name)
            .into_iter()
            .flatten()
            .map(|name| JobRef::new(tenant, name.clone()))
            .collect())
    }

    fn job_url(&self, job: &JobRef) -> Option<String> {
        Some(format!("fake://{}/job/{}", job.tenant.name, job.name))
    }
}

#[async_trait]
impl VariantSource for FakeZuul {
    async fn variants(&self, job: &JobRef) -> Result<Vec<VariantRef>> {
        self.record(format!("variants:{}/{}", job.tenant.name, job.name))?;
        let key = (job.tenant.name.clone(), job.name.clone());
        match self.variants.get(&key) {
            Some(variants) => Ok(variants
                .iter()
                .map(|raw| VariantRef {
                    job: job.clone(),
                    raw: raw.clone(),
                })
                .collect()),
            None if self.jobs.get(&job.tenant.name).is_some_and(|j| j.contains(&job.name)) => {
                Ok(Vec::new())
            }
            None => Err(CITreeError::RemoteApi {
                kind: RemoteErrorKind::NotFound,
                url: format!("fake://{}/job/{}", job.tenant.name, job.name),
            }),
        }
    }
}

#[async_trait]
impl BuildSource for FakeZuul {
    async fn builds(&self, job: &JobRef, query: &BuildQuery) -> Result<Vec<BuildRef>> {
        self.record(format!("builds:{}/{}", job.tenant.name, job.name))?;
        let key = (job.tenant.name.clone(), job.name.clone());
        Ok(self
            .builds
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|raw| {
                query.results.is_empty()
                    || raw
                        .result
                        .as_deref()
                        .is_some_and(|r| query.results.iter().any(|q| q.eq_ignore_ascii_case(r)))
            })
            .map(|raw| BuildRef {
                job: job.clone(),
                raw: raw.clone(),
            })
            .collect())
    }
}
