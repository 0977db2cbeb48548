mod api;
mod client;
#[cfg(test)]
mod fake;
mod hierarchy;
mod managers;
mod queries;
mod rest;
mod types;

pub use client::{SessionSettings, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_TIMEOUT_SECONDS};
pub use managers::{HierarchyManager, QuickManager, SourceManager};
pub use rest::ZuulRestClient;
