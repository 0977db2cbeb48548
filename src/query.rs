use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::filters::FilterCriteria;

/// How far down the CI hierarchy a query is allowed to go.
///
/// The main chain is totally ordered:
/// `None < Tenants < Projects < Pipelines < Jobs < Variants < Builds < Tests`.
/// `Features` and `FeaturesJobs` belong to plugin-driven queries; they are
/// greater than `None` and ordered among themselves, but not comparable with
/// any other level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QueryDepth {
    None,
    Tenants,
    Projects,
    Pipelines,
    Jobs,
    Variants,
    Builds,
    Tests,
    Features,
    FeaturesJobs,
}

impl QueryDepth {
    fn chain_rank(self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Tenants => Some(1),
            Self::Projects => Some(2),
            Self::Pipelines => Some(3),
            Self::Jobs => Some(4),
            Self::Variants => Some(5),
            Self::Builds => Some(6),
            Self::Tests => Some(7),
            Self::Features | Self::FeaturesJobs => None,
        }
    }

    fn feature_rank(self) -> Option<u8> {
        match self {
            Self::Features => Some(0),
            Self::FeaturesJobs => Some(1),
            _ => None,
        }
    }

    /// Infers the depth of a query from the deepest level its criteria touch.
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        if criteria.tests.is_some() || criteria.test_result.is_some() {
            Self::Tests
        } else if criteria.builds.is_some()
            || criteria.build_status.is_some()
            || criteria.build_duration.is_some()
            || criteria.last_build
        {
            Self::Builds
        } else if criteria.variants || criteria.variables.is_some() || criteria.inherited_variables
        {
            Self::Variants
        } else if criteria.jobs.is_some() {
            Self::Jobs
        } else if criteria.pipelines.is_some() {
            Self::Pipelines
        } else if criteria.projects.is_some() {
            Self::Projects
        } else if criteria.tenants.is_some() {
            Self::Tenants
        } else {
            Self::None
        }
    }

    pub fn is_feature_query(self) -> bool {
        self.feature_rank().is_some()
    }

    /// Whether a query at this depth descends into `level`.
    pub fn reaches(self, level: QueryDepth) -> bool {
        self >= level
    }
}

impl PartialOrd for QueryDepth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }

        match (self.chain_rank(), other.chain_rank()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) => Some(self.feature_rank().cmp(&other.feature_rank())),
            (Some(0), None) => Some(Ordering::Less),
            (None, Some(0)) => Some(Ordering::Greater),
            _ => None,
        }
    }
}

impl fmt::Display for QueryDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Tenants => "tenants",
            Self::Projects => "projects",
            Self::Pipelines => "pipelines",
            Self::Jobs => "jobs",
            Self::Variants => "variants",
            Self::Builds => "builds",
            Self::Tests => "tests",
            Self::Features => "features",
            Self::FeaturesJobs => "features_jobs",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::NameFilter;

    const CHAIN: [QueryDepth; 8] = [
        QueryDepth::None,
        QueryDepth::Tenants,
        QueryDepth::Projects,
        QueryDepth::Pipelines,
        QueryDepth::Jobs,
        QueryDepth::Variants,
        QueryDepth::Builds,
        QueryDepth::Tests,
    ];

    #[test]
    fn main_chain_is_totally_ordered() {
        for (i, a) in CHAIN.iter().enumerate() {
            for (j, b) in CHAIN.iter().enumerate() {
                assert_eq!(a.partial_cmp(b), Some(i.cmp(&j)), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn feature_levels_only_compare_with_none() {
        assert!(QueryDepth::Features > QueryDepth::None);
        assert!(QueryDepth::FeaturesJobs > QueryDepth::None);
        assert!(QueryDepth::FeaturesJobs > QueryDepth::Features);
        assert_eq!(QueryDepth::Features.partial_cmp(&QueryDepth::Jobs), None);
        assert!(!(QueryDepth::Features >= QueryDepth::Tenants));
        assert!(!(QueryDepth::Tenants >= QueryDepth::Features));
    }

    #[test]
    fn depth_follows_deepest_criterion() {
        let mut criteria = FilterCriteria::default();
        assert_eq!(QueryDepth::from_criteria(&criteria), QueryDepth::None);

        criteria.tenants = Some(NameFilter::any());
        assert_eq!(QueryDepth::from_criteria(&criteria), QueryDepth::Tenants);

        criteria.jobs = Some(NameFilter::any());
        assert_eq!(QueryDepth::from_criteria(&criteria), QueryDepth::Jobs);

        criteria.inherited_variables = true;
        assert_eq!(QueryDepth::from_criteria(&criteria), QueryDepth::Variants);

        criteria.last_build = true;
        assert_eq!(QueryDepth::from_criteria(&criteria), QueryDepth::Builds);
    }
}
