use std::time::Duration;

use log::debug;

use crate::auth::Token;
use crate::config::{Driver, SourceConfig, SystemConfig};
use crate::error::{CITreeError, Result};
use crate::providers::zuul::SessionSettings;
use crate::query::QueryDepth;

impl Driver {
    /// Feature levels come from deployment plugins; no driver serves them.
    pub fn supports(self, depth: QueryDepth) -> bool {
        match self {
            Driver::Zuul => !depth.is_feature_query(),
        }
    }
}

/// Picks the one source of `system` able to run a query at `depth`.
///
/// When `requested` names a source, it is the only candidate. Disabled
/// sources are never candidates.
pub fn select_source<'a>(
    system: &'a SystemConfig,
    depth: QueryDepth,
    requested: Option<&str>,
) -> Result<&'a SourceConfig> {
    let mut candidates: Vec<&SourceConfig> = system
        .sources
        .iter()
        .filter(|source| source.enabled)
        .filter(|source| requested.map_or(true, |name| source.name == name))
        .filter(|source| source.driver.supports(depth))
        .collect();

    debug!(
        "System '{}' has {} candidate sources for '{depth}'",
        system.name,
        candidates.len()
    );

    match candidates.len() {
        0 => Err(CITreeError::NoMatchingSource {
            system: system.name.clone(),
            operation: depth.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(CITreeError::AmbiguousSource {
            system: system.name.clone(),
            operation: depth.to_string(),
            candidates: candidates.iter().map(|s| s.name.clone()).collect(),
        }),
    }
}

impl From<&SourceConfig> for SessionSettings {
    fn from(source: &SourceConfig) -> Self {
        Self {
            token: source.token.as_deref().map(Token::from),
            cert: source.cert.clone(),
            timeout: Duration::from_secs(source.timeout_secs),
            max_concurrent_requests: source.max_concurrent_requests,
            ..SessionSettings::new(source.url.clone())
        }
    }
}
