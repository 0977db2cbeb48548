use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{CITreeError, Result};

use super::api::{JobRef, VariantRef, VariantSource};

/// One job on a parent chain together with the variants it was fetched with.
#[derive(Debug, Clone)]
pub struct HierarchyLevel {
    pub job: JobRef,
    pub variants: Vec<VariantRef>,
}

/// Walks the `parent` references of job variants.
///
/// Parents are looked up by name within the tenant of the starting job. A
/// parent that does not exist, or exposes no variants, ends the chain. When a
/// parent job has several variants, the chain continues through the first one
/// that names a parent of its own.
pub struct HierarchyCrawler<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> HierarchyCrawler<'a, A>
where
    A: VariantSource + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Levels of the chain, nearest first. The first level is the job of
    /// `variant` itself, holding only `variant`.
    pub async fn crawl(&self, variant: &VariantRef) -> Result<Vec<HierarchyLevel>> {
        let tenant = &variant.job.tenant;

        let mut levels = vec![HierarchyLevel {
            job: variant.job.clone(),
            variants: vec![variant.clone()],
        }];

        let mut visited = HashSet::from([variant.job.name.clone()]);
        let mut chain = vec![variant.job.name.clone()];
        let mut child = variant.job.name.clone();
        let mut next = variant.parent().map(str::to_string);

        while let Some(parent) = next.take() {
            chain.push(parent.clone());

            if !visited.insert(parent.clone()) {
                return Err(CITreeError::HierarchyCycle { chain });
            }

            let job = JobRef::new(tenant, parent.clone());

            let variants = match self.api.variants(&job).await {
                Ok(variants) => variants,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            };

            if variants.is_empty() {
                let unresolved = CITreeError::UnresolvedParent { job: child, parent };
                warn!("{unresolved}, ending hierarchy there");
                break;
            }

            debug!("Job '{child}' inherits from '{parent}'");

            next = variants.iter().find_map(|v| v.parent()).map(str::to_string);
            child = parent;
            levels.push(HierarchyLevel { job, variants });
        }

        Ok(levels)
    }

    /// Names of the jobs `variant` inherits from, nearest first.
    pub async fn ancestors(&self, variant: &VariantRef) -> Result<Vec<String>> {
        Ok(self
            .crawl(variant)
            .await?
            .into_iter()
            .skip(1)
            .map(|level| level.job.name)
            .collect())
    }

    /// Variables of `variant`. When `recursive`, ancestors' variables are
    /// included and a definition closer to `variant` wins over a farther one.
    pub async fn variables(
        &self,
        variant: &VariantRef,
        recursive: bool,
    ) -> Result<IndexMap<String, serde_json::Value>> {
        if !recursive {
            return Ok(variant.raw.variables.clone());
        }

        let levels = self.crawl(variant).await?;

        let mut result = IndexMap::new();
        for level in levels.iter().rev() {
            for variant in &level.variants {
                for (key, value) in &variant.raw.variables {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::zuul::fake::FakeZuul;
    use serde_json::json;

    /// `a` inherits from `b`, which inherits from `c`.
    fn chain() -> FakeZuul {
        FakeZuul::new()
            .tenant("t")
            .variant("t", "a", Some("b"), &[("y", json!(4))])
            .variant("t", "b", Some("c"), &[("x", json!(2)), ("y", json!(3))])
            .variant("t", "c", None, &[("x", json!(1))])
    }

    async fn first_variant(api: &FakeZuul, job: &str) -> VariantRef {
        let job = JobRef::new(&crate::providers::zuul::api::TenantRef::new("t"), job);
        api.variants(&job).await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn nearest_definition_wins() {
        let api = chain();
        let variant = first_variant(&api, "a").await;
        let crawler = HierarchyCrawler::new(&api);

        let variables = crawler.variables(&variant, true).await.unwrap();

        assert_eq!(variables.len(), 2);
        assert_eq!(variables["x"], json!(2));
        assert_eq!(variables["y"], json!(4));
    }

    #[tokio::test]
    async fn non_recursive_returns_own_variables_only() {
        let api = chain();
        let variant = first_variant(&api, "a").await;
        let calls_before = api.calls().len();

        let variables = HierarchyCrawler::new(&api)
            .variables(&variant, false)
            .await
            .unwrap();

        assert_eq!(variables.len(), 1);
        assert_eq!(variables["y"], json!(4));
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn ancestors_are_nearest_first() {
        let api = chain();
        let variant = first_variant(&api, "a").await;

        let ancestors = HierarchyCrawler::new(&api).ancestors(&variant).await.unwrap();
        assert_eq!(ancestors, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn missing_parent_ends_the_chain() {
        let api = FakeZuul::new()
            .tenant("t")
            .variant("t", "a", Some("b"), &[])
            .variant("t", "b", Some("ghost"), &[]);
        let variant = first_variant(&api, "a").await;

        let ancestors = HierarchyCrawler::new(&api).ancestors(&variant).await.unwrap();
        assert_eq!(ancestors, vec!["b"]);
    }

    #[tokio::test]
    async fn cycle_fails_fast() {
        let api = FakeZuul::new()
            .tenant("t")
            .variant("t", "a", Some("b"), &[])
            .variant("t", "b", Some("a"), &[]);
        let variant = first_variant(&api, "a").await;

        let err = HierarchyCrawler::new(&api).crawl(&variant).await.unwrap_err();
        match err {
            CITreeError::HierarchyCycle { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let api = chain().failing("variants:t/b");
        let variant = first_variant(&api, "a").await;

        let err = HierarchyCrawler::new(&api).ancestors(&variant).await.unwrap_err();
        assert!(matches!(err, CITreeError::RemoteApi { .. }));
    }

    #[tokio::test]
    async fn all_variants_of_a_parent_contribute_variables() {
        let api = FakeZuul::new()
            .tenant("t")
            .variant("t", "a", Some("b"), &[])
            .variant("t", "b", None, &[("x", json!(1))])
            .variant("t", "b", None, &[("x", json!(5)), ("z", json!(true))]);
        let variant = first_variant(&api, "a").await;

        let variables = HierarchyCrawler::new(&api)
            .variables(&variant, true)
            .await
            .unwrap();
        assert_eq!(variables["x"], json!(5));
        assert_eq!(variables["z"], json!(true));
    }
}
