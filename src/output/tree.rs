use std::fmt::{self, Display};

use crate::models::{Build, Job, Pipeline, Project, QueryOutput, Tenant, Variant};
use crate::query::QueryDepth;

use super::hierarchy::HierarchyTree;
use super::styling::{blue, bright_red, status, test_result, underline};

/// Lines of text, each with its own indentation level.
#[derive(Default)]
struct IndentedText {
    lines: Vec<(usize, String)>,
}

impl IndentedText {
    fn add(&mut self, level: usize, text: impl Display) {
        self.lines.push((level, text.to_string()));
    }

    fn nest(&mut self, level: usize, other: IndentedText) {
        self.lines.extend(
            other
                .lines
                .into_iter()
                .map(|(inner, text)| (inner + level, text)),
        );
    }
}

impl Display for IndentedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (level, line)) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}{line}", "  ".repeat(*level))?;
        }
        Ok(())
    }
}

fn field(label: &str, value: impl Display) -> String {
    format!("{}{value}", blue(format!("{label}: ")))
}

fn total(what: &str, owner: &str, count: usize) -> String {
    format!(
        "{}{}{}{count}",
        blue(format!("Total {what} found in '")),
        underline(owner),
        blue("': ")
    )
}

fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Renders a query result as an indented tree, one level per indentation.
///
/// Levels the query did not reach are not printed at all, so an empty
/// listing always means the host returned nothing.
pub struct TreePrinter<'a> {
    system: &'a str,
    depth: QueryDepth,
    verbose: bool,
}

impl<'a> TreePrinter<'a> {
    pub fn new(system: &'a str, depth: QueryDepth, verbose: bool) -> Self {
        Self {
            system,
            depth,
            verbose,
        }
    }

    pub fn print(&self, output: &QueryOutput) -> String {
        let mut text = IndentedText::default();
        text.add(0, field("System", self.system));

        if self.depth.reaches(QueryDepth::Tenants) {
            for tenant in output.tenants.values() {
                text.nest(1, self.tenant(tenant));
            }
            text.add(1, field("Total tenants found in query", output.tenants.len()));
        } else {
            text.add(1, blue("No query performed"));
        }

        if output.is_partial() {
            text.add(1, bright_red("Errors:"));
            for error in &output.errors {
                text.add(2, format!("{}: {}", error.scope, error.message));
            }
        }

        text.to_string()
    }

    fn tenant(&self, tenant: &Tenant) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Tenant", &tenant.name));

        if self.depth.reaches(QueryDepth::Jobs) {
            if !tenant.jobs.is_empty() {
                text.add(1, blue("Jobs:"));
                for job in tenant.jobs.values() {
                    text.nest(2, self.job(job));
                }
            }
            text.add(1, total("jobs", &tenant.name, tenant.jobs.len()));
        }

        if !tenant.hierarchy.is_empty() {
            text.add(1, blue("Hierarchy:"));
            for line in HierarchyTree::new(&tenant.hierarchy).render() {
                text.add(2, line);
            }
        }

        if self.depth.reaches(QueryDepth::Projects) {
            if !tenant.projects.is_empty() {
                text.add(1, blue("Projects:"));
                for project in tenant.projects.values() {
                    text.nest(2, self.project(project));
                }
            }
            text.add(1, total("projects", &tenant.name, tenant.projects.len()));
        }

        text
    }

    fn project(&self, project: &Project) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Project", &project.name));

        if self.verbose {
            if let Some(url) = &project.url {
                text.add(1, field("URL", url));
            }
        }

        if self.depth.reaches(QueryDepth::Pipelines) {
            for pipeline in project.pipelines.values() {
                text.nest(1, self.pipeline(project, pipeline));
            }
            text.add(
                1,
                total("pipelines", &project.name, project.pipelines.len()),
            );
        }

        text
    }

    fn pipeline(&self, project: &Project, pipeline: &Pipeline) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Pipeline", &pipeline.name));

        if self.depth.reaches(QueryDepth::Jobs) {
            for job in pipeline.jobs.values() {
                text.nest(1, self.pipeline_job(project, pipeline, job));
            }
            text.add(1, total("jobs", &pipeline.name, pipeline.jobs.len()));
        }

        text
    }

    /// A job as referenced by a pipeline: only the builds that pipeline ran.
    fn pipeline_job(&self, project: &Project, pipeline: &Pipeline, job: &Job) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Job", &job.name));

        for build in job.builds_in(&project.name, &pipeline.name) {
            text.add(1, field("Build", &build.id));
            if let Some(label) = &build.status {
                text.add(2, field("Status", status(label)));
            }
        }

        text
    }

    fn job(&self, job: &Job) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Job", &job.name));

        if self.verbose {
            if let Some(url) = &job.url {
                text.add(1, field("URL", url));
            }
        }

        if !job.variants.is_empty() {
            text.add(1, blue("Variants:"));
            for variant in &job.variants {
                text.nest(2, self.variant(variant));
            }
        }

        if !job.builds.is_empty() {
            text.add(1, blue("Builds:"));
            for build in job.builds.values() {
                text.nest(2, self.build(build));
            }
        }

        text
    }

    fn variant(&self, variant: &Variant) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, blue("Variant:"));
        text.add(
            1,
            field("Description", variant.description.as_deref().unwrap_or("")),
        );
        text.add(1, field("Parent", variant.parent.as_deref().unwrap_or("")));

        text.add(1, blue("Branches:"));
        for branch in &variant.branches {
            text.add(2, format!("- {branch}"));
        }

        text.add(1, blue("Variables:"));
        for (key, value) in &variant.variables {
            text.add(2, field(key, plain(value)));
        }

        if let Some(inherited) = &variant.inherited_variables {
            text.add(1, blue("Inherited variables:"));
            for (key, value) in inherited {
                text.add(2, field(key, plain(value)));
            }
        }

        text
    }

    fn build(&self, build: &Build) -> IndentedText {
        let mut text = IndentedText::default();
        text.add(0, field("Build", &build.id));

        if let Some(project) = &build.project {
            text.add(1, field("Project", project));
        }
        if let Some(pipeline) = &build.pipeline {
            text.add(1, field("Pipeline", pipeline));
        }
        if let Some(label) = &build.status {
            text.add(1, field("Status", status(label)));
        }

        if self.verbose {
            if let Some(duration) = build.duration {
                text.add(1, field("Duration", format!("{:.1}min", duration / 60.0)));
            }
            if let Some(start) = build.start_time {
                text.add(1, field("Started", start));
            }
            if let Some(url) = &build.log_url {
                text.add(1, field("Logs", url));
            }
        }

        if !build.tests.is_empty() {
            text.add(1, blue("Tests:"));
            for test in build.tests.values() {
                text.add(2, field("Test", &test.name));
                text.add(3, field("Result", test_result(test.result)));
                if self.verbose {
                    if let Some(class_name) = &test.class_name {
                        text.add(3, field("Class name", class_name));
                    }
                }
            }
        }

        text
    }
}
