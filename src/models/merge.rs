use indexmap::IndexMap;

use super::entities::{Build, Job, Pipeline, Project, Tenant, Test, TestResult, Variant};

/// Unifies two views of the same node.
///
/// Fields already set on `self` are kept; fields `self` lacks are taken from
/// `other`. Child collections are unioned by their identity key and matching
/// children are merged recursively. Merging a view twice is the same as
/// merging it once.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

fn fill<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if slot.is_none() {
        *slot = incoming;
    }
}

fn fill_vec<T>(slot: &mut Vec<T>, incoming: Vec<T>) {
    if slot.is_empty() {
        *slot = incoming;
    }
}

/// Unions `incoming` into `into`, merging entries that share a key.
fn merge_map<V: Merge>(into: &mut IndexMap<String, V>, incoming: IndexMap<String, V>) {
    for (key, value) in incoming {
        match into.get_mut(&key) {
            Some(existing) => existing.merge(value),
            None => {
                into.insert(key, value);
            }
        }
    }
}

fn union_values<V>(into: &mut IndexMap<String, V>, incoming: IndexMap<String, V>) {
    for (key, value) in incoming {
        into.entry(key).or_insert(value);
    }
}

impl Merge for Tenant {
    fn merge(&mut self, other: Self) {
        merge_map(&mut self.projects, other.projects);
        merge_map(&mut self.jobs, other.jobs);

        for (job, parents) in other.hierarchy {
            for parent in parents {
                self.add_parent(&job, &parent);
            }
        }
    }
}

impl Merge for Project {
    fn merge(&mut self, other: Self) {
        fill(&mut self.url, other.url);
        merge_map(&mut self.pipelines, other.pipelines);
    }
}

impl Merge for Pipeline {
    fn merge(&mut self, other: Self) {
        merge_map(&mut self.jobs, other.jobs);
    }
}

impl Merge for Job {
    fn merge(&mut self, other: Self) {
        fill(&mut self.url, other.url);

        for variant in other.variants {
            match self
                .variants
                .iter_mut()
                .find(|existing| existing.identity() == variant.identity())
            {
                Some(existing) => existing.merge(variant),
                None => self.variants.push(variant),
            }
        }

        merge_map(&mut self.builds, other.builds);
    }
}

impl Merge for Variant {
    fn merge(&mut self, other: Self) {
        fill_vec(&mut self.branches, other.branches);
        union_values(&mut self.variables, other.variables);

        match self.inherited_variables.as_mut() {
            Some(own) => {
                if let Some(incoming) = other.inherited_variables {
                    union_values(own, incoming);
                }
            }
            None => self.inherited_variables = other.inherited_variables,
        }
    }
}

impl Merge for Build {
    fn merge(&mut self, other: Self) {
        fill(&mut self.status, other.status);
        fill(&mut self.duration, other.duration);
        fill(&mut self.project, other.project);
        fill(&mut self.pipeline, other.pipeline);
        fill(&mut self.start_time, other.start_time);
        fill(&mut self.log_url, other.log_url);
        merge_map(&mut self.tests, other.tests);
    }
}

impl Merge for Test {
    fn merge(&mut self, other: Self) {
        if self.result == TestResult::Unknown {
            self.result = other.result;
        }
        fill(&mut self.class_name, other.class_name);
        fill(&mut self.duration, other.duration);
    }
}
