//! Query handlers for a Zuul source.
//!
//! [`QuickManager`] answers every level in a single pass. [`HierarchyManager`]
//! first widens the job filter with the ancestors of the matching jobs, so a
//! query for a job also brings in the jobs it inherits configuration from,
//! and then hands over to the quick pass.

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info};

use crate::error::{CITreeError, Result};
use crate::filters::{negate, FilterCriteria, NameFilter};
use crate::models::{QueryOutput, Tenant};
use crate::query::QueryDepth;

use super::api::{TenantRef, ZuulApi};
use super::hierarchy::HierarchyCrawler;
use super::queries::{job_scope, tenant_scope, Traversal};

#[async_trait]
pub trait SourceManager: Send + Sync {
    async fn handle_tenants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    async fn handle_projects_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    async fn handle_pipelines_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    async fn handle_jobs_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    async fn handle_variants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    async fn handle_builds_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    /// Zuul builds carry no test results; this answers like a builds query.
    async fn handle_tests_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput>;

    /// Runs the handler matching `depth`.
    ///
    /// # Errors
    ///
    /// Feature depths are served by deployment plugins, never by a Zuul
    /// source, and fail with [`CITreeError::NoMatchingSource`].
    async fn handle_query(
        &self,
        depth: QueryDepth,
        criteria: &FilterCriteria,
    ) -> Result<QueryOutput> {
        match depth {
            QueryDepth::None => Ok(QueryOutput::new(depth)),
            QueryDepth::Tenants => self.handle_tenants_query(criteria).await,
            QueryDepth::Projects => self.handle_projects_query(criteria).await,
            QueryDepth::Pipelines => self.handle_pipelines_query(criteria).await,
            QueryDepth::Jobs => self.handle_jobs_query(criteria).await,
            QueryDepth::Variants => self.handle_variants_query(criteria).await,
            QueryDepth::Builds => self.handle_builds_query(criteria).await,
            QueryDepth::Tests => self.handle_tests_query(criteria).await,
            QueryDepth::Features | QueryDepth::FeaturesJobs => {
                Err(CITreeError::NoMatchingSource {
                    system: "zuul".to_string(),
                    operation: depth.to_string(),
                })
            }
        }
    }
}

pub struct QuickManager<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> QuickManager<'a, A>
where
    A: ZuulApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn query(&self, depth: QueryDepth, criteria: &FilterCriteria) -> Result<QueryOutput> {
        Traversal::new(self.api, criteria, depth).run().await
    }
}

#[async_trait]
impl<'a, A> SourceManager for QuickManager<'a, A>
where
    A: ZuulApi + ?Sized,
{
    async fn handle_tenants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Tenants, criteria).await
    }

    async fn handle_projects_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Projects, criteria).await
    }

    async fn handle_pipelines_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Pipelines, criteria).await
    }

    async fn handle_jobs_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Jobs, criteria).await
    }

    async fn handle_variants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Variants, criteria).await
    }

    async fn handle_builds_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Builds, criteria).await
    }

    async fn handle_tests_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.query(QueryDepth::Tests, criteria).await
    }
}

pub struct HierarchyManager<'a, A: ?Sized> {
    api: &'a A,
    quick: QuickManager<'a, A>,
}

impl<'a, A> HierarchyManager<'a, A>
where
    A: ZuulApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            quick: QuickManager::new(api),
        }
    }

    /// Returns `criteria` with every ancestor of the jobs it selects added
    /// to its job filter. The output holds the inheritance found on each
    /// tenant and the failures met while looking it up.
    ///
    /// An absent or unrestricted job filter already selects every ancestor
    /// and is returned as is.
    pub async fn expand(
        &self,
        depth: QueryDepth,
        criteria: &FilterCriteria,
    ) -> Result<(FilterCriteria, QueryOutput)> {
        let mut expanded = criteria.clone();
        let mut found = QueryOutput::new(depth);

        let Some(jobs) = expanded.jobs.as_mut() else {
            return Ok((expanded, found));
        };

        if jobs.is_unrestricted() {
            return Ok((expanded, found));
        }

        let tenants: Vec<TenantRef> = self
            .api
            .tenants()
            .await?
            .into_iter()
            .filter(|tenant| criteria.accepts_tenant(&tenant.name))
            .collect();

        let selection = jobs.clone();
        let branches = join_all(
            tenants
                .iter()
                .map(|tenant| self.ancestors_in(tenant, &selection, depth)),
        )
        .await;

        let unselected = negate(selection.predicate::<String>(|name| name.as_str()));

        for (ancestors, branch) in branches {
            found.absorb(branch);
            for name in &ancestors {
                if unselected(name) {
                    jobs.extend_exact(name);
                }
            }
        }

        info!(
            "Job filter expanded to {} patterns",
            jobs.patterns().count()
        );

        Ok((expanded, found))
    }

    async fn ancestors_in(
        &self,
        tenant: &TenantRef,
        selection: &NameFilter,
        depth: QueryDepth,
    ) -> (Vec<String>, QueryOutput) {
        let mut ancestors = Vec::new();
        let mut output = QueryOutput::new(depth);
        let mut model = Tenant::new(tenant.name.clone());

        let jobs = match self.api.jobs(tenant).await {
            Ok(jobs) => jobs,
            Err(e) => {
                output.record_error(tenant_scope(tenant), &e);
                return (ancestors, output);
            }
        };

        let crawler = HierarchyCrawler::new(self.api);

        for job in jobs.iter().filter(|job| selection.matches(&job.name)) {
            let variants = match self.api.variants(job).await {
                Ok(variants) => variants,
                Err(e) => {
                    output.record_error(job_scope(job), &e);
                    continue;
                }
            };

            for variant in &variants {
                match crawler.ancestors(variant).await {
                    Ok(names) => {
                        debug!("Job '{}' inherits from {names:?}", job.name);
                        let mut child = job.name.as_str();
                        for parent in &names {
                            model.add_parent(child, parent);
                            child = parent.as_str();
                        }
                        ancestors.extend(names);
                    }
                    Err(e) => output.record_error(job_scope(job), &e),
                }
            }
        }

        output.add_tenant(model);
        (ancestors, output)
    }

    async fn expanded_query(
        &self,
        depth: QueryDepth,
        criteria: &FilterCriteria,
    ) -> Result<QueryOutput> {
        let (criteria, mut output) = self.expand(depth, criteria).await?;
        output.absorb(self.quick.query(depth, &criteria).await?);
        Ok(output)
    }
}

#[async_trait]
impl<'a, A> SourceManager for HierarchyManager<'a, A>
where
    A: ZuulApi + ?Sized,
{
    async fn handle_tenants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.quick.handle_tenants_query(criteria).await
    }

    async fn handle_projects_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.quick.handle_projects_query(criteria).await
    }

    async fn handle_pipelines_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.quick.handle_pipelines_query(criteria).await
    }

    async fn handle_jobs_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.expanded_query(QueryDepth::Jobs, criteria).await
    }

    async fn handle_variants_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.expanded_query(QueryDepth::Variants, criteria).await
    }

    async fn handle_builds_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.expanded_query(QueryDepth::Builds, criteria).await
    }

    async fn handle_tests_query(&self, criteria: &FilterCriteria) -> Result<QueryOutput> {
        self.expanded_query(QueryDepth::Tests, criteria).await
    }
}
