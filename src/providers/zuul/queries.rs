use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, info};

use crate::error::Result;
use crate::filters::{retain_matching, FilterCriteria, Predicate};
use crate::models::{Build, Job, Pipeline, Project, QueryOutput, Tenant, Test, Variant};
use crate::query::QueryDepth;

use super::api::{BuildQuery, JobRef, PipelineRef, ProjectRef, TenantRef, VariantRef, ZuulApi};
use super::hierarchy::HierarchyCrawler;

pub(super) fn tenant_scope(tenant: &TenantRef) -> String {
    format!("tenant '{}'", tenant.name)
}

pub(super) fn project_scope(project: &ProjectRef) -> String {
    format!(
        "tenant '{}' / project '{}'",
        project.tenant.name, project.name
    )
}

pub(super) fn job_scope(job: &JobRef) -> String {
    format!("tenant '{}' / job '{}'", job.tenant.name, job.name)
}

/// A single pass over the remote tree.
///
/// Levels are fetched top-down and never beyond `depth`. Tenants are walked
/// concurrently; each tenant branch builds its own subtree and reports its own
/// failures, and the branches are folded into one output once all of them
/// are done. Only a failure to list tenants fails the pass as a whole.
pub struct Traversal<'a, A: ?Sized> {
    api: &'a A,
    criteria: &'a FilterCriteria,
    depth: QueryDepth,
    build_filter: Predicate<Build>,
    test_filter: Predicate<Test>,
}

impl<'a, A> Traversal<'a, A>
where
    A: ZuulApi + ?Sized,
{
    pub fn new(api: &'a A, criteria: &'a FilterCriteria, depth: QueryDepth) -> Self {
        Self {
            api,
            criteria,
            depth,
            build_filter: criteria.build_predicate(),
            test_filter: criteria.test_predicate(),
        }
    }

    pub async fn run(&self) -> Result<QueryOutput> {
        let mut output = QueryOutput::new(self.depth);

        if !self.depth.reaches(QueryDepth::Tenants) {
            debug!("Depth '{}' reaches no level, nothing to fetch", self.depth);
            return Ok(output);
        }

        if self.depth.reaches(QueryDepth::Tests) {
            info!("Zuul builds expose no tests, querying down to builds");
        }

        let tenants: Vec<TenantRef> = self
            .api
            .tenants()
            .await?
            .into_iter()
            .filter(|tenant| self.criteria.accepts_tenant(&tenant.name))
            .collect();

        info!(
            "Querying {} tenants down to '{}'",
            tenants.len(),
            self.depth
        );

        let branches = join_all(tenants.iter().map(|tenant| self.tenant(tenant))).await;

        for branch in branches {
            output.absorb(branch);
        }

        Ok(output)
    }

    async fn tenant(&self, tenant: &TenantRef) -> QueryOutput {
        let mut output = QueryOutput::new(self.depth);
        let mut model = Tenant::new(tenant.name.clone());

        if !self.depth.reaches(QueryDepth::Projects) {
            output.add_tenant(model);
            return output;
        }

        let projects: Vec<ProjectRef> = match self.api.projects(tenant).await {
            Ok(projects) => projects
                .into_iter()
                .filter(|project| self.criteria.accepts_project(&project.name))
                .collect(),
            Err(e) => {
                output.record_error(tenant_scope(tenant), &e);
                Vec::new()
            }
        };

        debug!(
            "Tenant '{}' has {} matching projects",
            tenant.name,
            projects.len()
        );

        let listings = join_all(projects.iter().map(|project| self.pipelines(project))).await;

        // Jobs are tenant-scoped: every distinct job is resolved once, whether
        // the tenant lists it or a pipeline refers to it.
        let mut jobs: IndexMap<String, JobRef> = IndexMap::new();
        let mut listed: Vec<String> = Vec::new();

        if self.depth.reaches(QueryDepth::Jobs) {
            match self.api.jobs(tenant).await {
                Ok(refs) => {
                    for job in refs {
                        if self.criteria.accepts_job(&job.name) {
                            listed.push(job.name.clone());
                            jobs.entry(job.name.clone()).or_insert(job);
                        }
                    }
                }
                Err(e) => output.record_error(tenant_scope(tenant), &e),
            }

            for pipeline in listings.iter().flatten().flatten() {
                for job in pipeline.jobs() {
                    if self.criteria.accepts_job(&job.name) {
                        jobs.entry(job.name.clone()).or_insert(job);
                    }
                }
            }
        }

        let details = join_all(jobs.values().map(|job| self.job(job))).await;

        let mut resolved: IndexMap<String, Job> = IndexMap::new();
        for (job, detail) in jobs.values().zip(details) {
            let detail = detail.unwrap_or_else(|e| {
                output.record_error(job_scope(job), &e);
                self.bare_job(job)
            });
            resolved.insert(job.name.clone(), detail);
        }

        for name in &listed {
            if let Some(job) = resolved.get(name) {
                model.jobs.insert(name.clone(), job.clone());
            }
        }

        for (project, listing) in projects.iter().zip(listings) {
            let mut node = Project {
                url: self.api.project_url(project),
                ..Project::new(project.name.clone())
            };

            match listing {
                Ok(pipelines) => {
                    for pipeline in &pipelines {
                        if let Some(view) = self.pipeline_view(pipeline, &resolved) {
                            node.pipelines.insert(view.name.clone(), view);
                        }
                    }

                    if self.depth.reaches(QueryDepth::Pipelines)
                        && node.pipelines.is_empty()
                        && self.criteria.narrows_pipelines(self.depth)
                    {
                        debug!("Pruning project '{}': no pipeline matched", project.name);
                        continue;
                    }
                }
                Err(e) => output.record_error(project_scope(project), &e),
            }

            model.projects.insert(node.name.clone(), node);
        }

        output.add_tenant(model);
        output
    }

    async fn pipelines(&self, project: &ProjectRef) -> Result<Vec<PipelineRef>> {
        if !self.depth.reaches(QueryDepth::Pipelines) {
            return Ok(Vec::new());
        }

        let pipelines = self.api.pipelines(project).await?;

        Ok(pipelines
            .into_iter()
            .filter(|pipeline| self.criteria.accepts_pipeline(&pipeline.name))
            .collect())
    }

    /// The pipeline as seen from its project, or `None` when a job filter
    /// left it without jobs.
    fn pipeline_view(&self, pipeline: &PipelineRef, jobs: &IndexMap<String, Job>) -> Option<Pipeline> {
        let mut view = Pipeline::new(pipeline.name.clone());

        if !self.depth.reaches(QueryDepth::Jobs) {
            return Some(view);
        }

        for name in &pipeline.job_names {
            if let Some(job) = jobs.get(name) {
                let job = attributed(job, &pipeline.project.name, &pipeline.name);
                view.jobs.insert(name.clone(), job);
            }
        }

        if view.jobs.is_empty() && self.criteria.narrows_jobs() {
            debug!("Pruning pipeline '{}': no job matched", pipeline.name);
            return None;
        }

        Some(view)
    }

    fn bare_job(&self, job: &JobRef) -> Job {
        Job {
            url: self.api.job_url(job),
            ..Job::new(job.name.clone())
        }
    }

    async fn job(&self, job: &JobRef) -> Result<Job> {
        let mut model = self.bare_job(job);

        if self.depth.reaches(QueryDepth::Variants) {
            for variant in self.api.variants(job).await? {
                model.variants.push(self.variant(&variant).await?);
            }
        }

        if self.depth.reaches(QueryDepth::Builds) {
            model.builds = self.builds(job).await?;
        }

        Ok(model)
    }

    async fn variant(&self, variant: &VariantRef) -> Result<Variant> {
        let inherited = if self.criteria.inherited_variables {
            let variables = HierarchyCrawler::new(self.api)
                .variables(variant, true)
                .await?;
            Some(self.visible(variables))
        } else {
            None
        };

        let mut model = Variant::from(variant.raw.clone());
        model.variables = self.visible(model.variables);
        model.inherited_variables = inherited;

        Ok(model)
    }

    fn visible(
        &self,
        variables: IndexMap<String, serde_json::Value>,
    ) -> IndexMap<String, serde_json::Value> {
        variables
            .into_iter()
            .filter(|(key, _)| self.criteria.accepts_variable(key))
            .collect()
    }

    async fn builds(&self, job: &JobRef) -> Result<IndexMap<String, Build>> {
        let query = BuildQuery {
            results: self.criteria.server_side_statuses().to_vec(),
        };

        let builds: Vec<Build> = self
            .api
            .builds(job, &query)
            .await?
            .into_iter()
            .map(|build| Build::from(build.raw))
            .collect();

        let mut builds = retain_matching(builds, &self.build_filter);

        if self.criteria.last_build {
            builds = latest(builds).into_iter().collect();
        }

        if self.depth.reaches(QueryDepth::Tests) {
            for build in &mut builds {
                build.tests.retain(|_, test| (self.test_filter)(&*test));
            }
        }

        debug!("Job '{}' kept {} builds", job.name, builds.len());

        Ok(builds
            .into_iter()
            .map(|build| (build.id.clone(), build))
            .collect())
    }
}

/// Copy of `job` holding only the builds triggered by `project` / `pipeline`.
fn attributed(job: &Job, project: &str, pipeline: &str) -> Job {
    let builds = job
        .builds_in(project, pipeline)
        .map(|build| (build.id.clone(), build.clone()))
        .collect();

    Job {
        name: job.name.clone(),
        url: job.url.clone(),
        variants: job.variants.clone(),
        builds,
    }
}

/// Most recent build. Zuul lists newest first, so ties keep the earlier entry.
fn latest(builds: Vec<Build>) -> Option<Build> {
    builds.into_iter().reduce(|best, candidate| {
        if candidate.start_time > best.start_time {
            candidate
        } else {
            best
        }
    })
}
