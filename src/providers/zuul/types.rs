//! Wire types returned by the Zuul REST API.
//!
//! Only the fields the query engine consumes are declared; everything else
//! in a response is ignored. Missing optional fields fall back to defaults so
//! older and newer Zuul releases decode alike.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{Build, Variant};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawTenant {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawProject {
    pub name: String,
}

/// Body of `tenant/{tenant}/project/{project}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawProjectDetail {
    #[serde(default)]
    pub configs: Vec<RawProjectConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawProjectConfig {
    #[serde(default)]
    pub pipelines: Vec<RawPipeline>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawPipeline {
    pub name: String,
    /// One entry per job, each listing the variants applied by this pipeline.
    #[serde(default)]
    pub jobs: Vec<Vec<RawJobReference>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawJobReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawJob {
    pub name: String,
}

/// One element of `tenant/{tenant}/job/{job}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawVariant {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub branches: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: IndexMap<String, serde_json::Value>,
}

impl RawVariant {
    /// Name of the job this variant inherits from, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }
}

impl From<RawVariant> for Variant {
    fn from(raw: RawVariant) -> Self {
        let parent = raw.parent().map(str::to_string);
        Self {
            description: raw.description,
            parent,
            branches: raw.branches,
            variables: raw.variables,
            inherited_variables: None,
        }
    }
}

/// One element of `tenant/{tenant}/builds`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawBuild {
    pub uuid: String,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub pipeline: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub log_url: Option<String>,
}

impl From<RawBuild> for Build {
    fn from(raw: RawBuild) -> Self {
        let start_time = raw
            .start_time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S").ok());

        Self {
            status: raw.result,
            duration: raw.duration,
            project: raw.project,
            pipeline: raw.pipeline,
            start_time,
            log_url: raw.log_url,
            ..Build::new(raw.uuid)
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
