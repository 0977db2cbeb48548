use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A Zuul tenant. Owns projects and exposes jobs directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    pub projects: IndexMap<String, Project>,
    pub jobs: IndexMap<String, Job>,
    /// Parents of each job, as found by walking inheritance chains. Only
    /// hierarchy queries fill it.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub hierarchy: IndexMap<String, Vec<String>>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Records that `job` inherits from `parent`. Returns false if known.
    pub fn add_parent(&mut self, job: &str, parent: &str) -> bool {
        let parents = self.hierarchy.entry(job.to_string()).or_default();
        if parents.iter().any(|known| known == parent) {
            return false;
        }
        parents.push(parent.to_string());
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub url: Option<String>,
    pub pipelines: IndexMap<String, Pipeline>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A pipeline of a project.
///
/// Jobs listed here are views of tenant-scoped jobs; the pipeline does not
/// own them, and only builds attributed to this pipeline are kept on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub jobs: IndexMap<String, Job>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub url: Option<String>,
    pub variants: Vec<Variant>,
    pub builds: IndexMap<String, Build>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds of this job triggered by the given project and pipeline.
    pub fn builds_in<'a>(
        &'a self,
        project: &'a str,
        pipeline: &'a str,
    ) -> impl Iterator<Item = &'a Build> + 'a {
        self.builds
            .values()
            .filter(move |build| build.is_attributed_to(project, pipeline))
    }
}

/// One configuration of a job, e.g. the one applied to a given branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub description: Option<String>,
    pub parent: Option<String>,
    pub branches: Vec<String>,
    /// Variables declared by this variant alone.
    pub variables: IndexMap<String, serde_json::Value>,
    /// Variables after walking the parent chain, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_variables: Option<IndexMap<String, serde_json::Value>>,
}

impl Variant {
    /// Key under which two views of a variant are the same variant.
    pub fn identity(&self) -> (Option<&str>, Option<&str>) {
        (self.parent.as_deref(), self.description.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: String,
    pub status: Option<String>,
    pub duration: Option<f64>,
    pub project: Option<String>,
    pub pipeline: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub log_url: Option<String>,
    pub tests: IndexMap<String, Test>,
}

impl Build {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_attributed_to(&self, project: &str, pipeline: &str) -> bool {
        self.project.as_deref() == Some(project) && self.pipeline.as_deref() == Some(pipeline)
    }

    pub fn status_kind(&self) -> BuildStatus {
        self.status
            .as_deref()
            .map_or(BuildStatus::Other, BuildStatus::from_label)
    }
}

/// Build results with a known meaning; everything else is passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Failure,
    Unstable,
    Other,
}

impl BuildStatus {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "FAILURE" | "FAILED" => Self::Failure,
            "UNSTABLE" => Self::Unstable,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub name: String,
    pub result: TestResult,
    pub class_name: Option<String>,
    pub duration: Option<f64>,
}

/// Outcome of a test. Decoded leniently, so `passed` reads as `SUCCESS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum TestResult {
    Success,
    Failure,
    Skipped,
    Unstable,
    #[default]
    Unknown,
}

impl TestResult {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "SUCCESS" | "PASSED" => Self::Success,
            "FAILURE" | "FAILED" => Self::Failure,
            "SKIPPED" => Self::Skipped,
            "UNSTABLE" => Self::Unstable,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Skipped => "SKIPPED",
            Self::Unstable => "UNSTABLE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for TestResult {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}
