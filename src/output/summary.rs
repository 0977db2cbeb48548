use std::collections::HashSet;

use comfy_table::{Cell, Color as TableColor};

use crate::models::{BuildStatus, QueryOutput, Tenant};
use crate::query::QueryDepth;

use super::tables::{color_coded_success_cell, create_table};

/// Node counts of one tenant subtree.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TenantTotals {
    pub projects: usize,
    pub pipelines: usize,
    /// Distinct jobs, whether listed by the tenant or only referenced by a pipeline.
    pub jobs: usize,
    pub variants: usize,
    pub builds: usize,
    pub successful_builds: usize,
}

impl TenantTotals {
    pub fn of(tenant: &Tenant) -> Self {
        let mut totals = Self {
            projects: tenant.projects.len(),
            ..Self::default()
        };

        let mut jobs = HashSet::new();
        for job in tenant.jobs.values() {
            jobs.insert(job.name.as_str());
            totals.count_job(job);
        }

        for project in tenant.projects.values() {
            totals.pipelines += project.pipelines.len();
            for pipeline in project.pipelines.values() {
                for job in pipeline.jobs.values() {
                    if jobs.insert(job.name.as_str()) {
                        totals.count_job(job);
                    }
                }
            }
        }

        totals.jobs = jobs.len();
        totals
    }

    fn count_job(&mut self, job: &crate::models::Job) {
        self.variants += job.variants.len();
        self.builds += job.builds.len();
        self.successful_builds += job
            .builds
            .values()
            .filter(|build| build.status_kind() == BuildStatus::Success)
            .count();
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> Option<f64> {
        (self.builds > 0).then(|| self.successful_builds as f64 / self.builds as f64 * 100.0)
    }
}

fn count_cell(reached: bool, count: usize) -> Cell {
    if reached {
        Cell::new(count)
    } else {
        Cell::new("-").fg(TableColor::DarkGrey)
    }
}

/// Table of node counts per tenant. Columns for levels the query did not
/// reach show a dash.
pub fn render_summary(output: &QueryOutput) -> String {
    let depth = output.depth;
    let mut table = create_table();

    table.set_header(
        ["Tenant", "Projects", "Pipelines", "Jobs", "Variants", "Builds", "Success"]
            .iter()
            .map(|label| Cell::new(*label).fg(TableColor::Cyan)),
    );

    for tenant in output.tenants.values() {
        let totals = TenantTotals::of(tenant);
        let success = match totals.success_rate() {
            Some(rate) => color_coded_success_cell(rate),
            None => Cell::new("-").fg(TableColor::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(&tenant.name),
            count_cell(depth.reaches(QueryDepth::Projects), totals.projects),
            count_cell(depth.reaches(QueryDepth::Pipelines), totals.pipelines),
            count_cell(depth.reaches(QueryDepth::Jobs), totals.jobs),
            count_cell(depth.reaches(QueryDepth::Variants), totals.variants),
            count_cell(depth.reaches(QueryDepth::Builds), totals.builds),
            success,
        ]);
    }

    table.to_string()
}
