use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::{Config, OutputFormat};
use crate::filters::{FilterCriteria, NameFilter, RangeFilter, ValueSet};
use crate::output::{self, QueryProgress};
use crate::providers::zuul::{
    HierarchyManager, QuickManager, SessionSettings, SourceManager, ZuulRestClient,
};
use crate::query::QueryDepth;
use crate::sources::select_source;

#[derive(Parser)]
#[command(name = "citree")]
#[command(author, version, about = "CI Hierarchy Query Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./citree.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// More logging: -v info, -vv debug, -vvv trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the tenant / project / pipeline / job / build tree of a CI system
    Query(QueryArgs),
}

/// A level flag given without values queries that level unfiltered.
#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// CI system from the configuration file
    #[arg(long)]
    system: Option<String>,

    /// Source of the system to use when it has several
    #[arg(long)]
    source: Option<String>,

    /// Query this Zuul host directly, ignoring the configuration file
    #[arg(short, long)]
    url: Option<String>,

    #[arg(short, long, env = "ZUUL_TOKEN")]
    token: Option<String>,

    /// PEM certificate trusted for the host
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Deepest level to fetch; inferred from the other flags when absent
    #[arg(short, long, value_enum)]
    depth: Option<QueryDepth>,

    /// Also fetch the jobs the selected jobs inherit from
    #[arg(long)]
    hierarchy: bool,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    tenants: Option<Vec<String>>,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    projects: Option<Vec<String>>,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    pipelines: Option<Vec<String>>,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    jobs: Option<Vec<String>>,

    #[arg(long)]
    variants: bool,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    variables: Option<Vec<String>>,

    /// Resolve variables through the parent chain of each variant
    #[arg(long)]
    inherited_variables: bool,

    #[arg(long, num_args = 0.., value_name = "ID")]
    builds: Option<Vec<String>>,

    #[arg(long, num_args = 0.., value_name = "STATUS")]
    build_status: Option<Vec<String>>,

    /// Build duration condition in seconds, e.g. '>=60' or '>60,<=300'
    #[arg(long, value_name = "EXPR", allow_hyphen_values = true)]
    build_duration: Option<String>,

    /// Keep only the most recent build of each job
    #[arg(long)]
    last_build: bool,

    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    tests: Option<Vec<String>>,

    #[arg(long, num_args = 0.., value_name = "RESULT")]
    test_result: Option<Vec<String>>,
}

fn names(filter: &str, patterns: Option<&[String]>) -> crate::error::Result<Option<NameFilter>> {
    patterns
        .map(|patterns| NameFilter::new(filter, patterns))
        .transpose()
}

impl QueryArgs {
    fn criteria(&self) -> crate::error::Result<FilterCriteria> {
        Ok(FilterCriteria {
            tenants: names("tenants", self.tenants.as_deref())?,
            projects: names("projects", self.projects.as_deref())?,
            pipelines: names("pipelines", self.pipelines.as_deref())?,
            jobs: names("jobs", self.jobs.as_deref())?,
            variants: self.variants,
            variables: names("variables", self.variables.as_deref())?,
            inherited_variables: self.inherited_variables,
            builds: names("builds", self.builds.as_deref())?,
            build_status: self.build_status.as_deref().map(ValueSet::new),
            build_duration: self
                .build_duration
                .as_deref()
                .map(|expression| RangeFilter::parse("build-duration", expression))
                .transpose()?,
            last_build: self.last_build,
            tests: names("tests", self.tests.as_deref())?,
            test_result: self.test_result.as_deref().map(ValueSet::new),
        })
    }

    /// Name of the system to query and how to reach it.
    fn session_settings(&self, config: &Config, depth: QueryDepth) -> Result<(String, SessionSettings)> {
        let (system, mut settings) = if let Some(url) = &self.url {
            let name = self.system.clone().unwrap_or_else(|| "zuul".to_string());
            (name, SessionSettings::new(url.clone()))
        } else {
            let name = match (&self.system, config.systems.as_slice()) {
                (Some(name), _) => name.clone(),
                (None, [only]) => only.name.clone(),
                (None, []) => bail!("No CI system configured; pass --url or add one to citree.toml"),
                (None, _) => bail!("Several CI systems configured; pick one with --system"),
            };

            let system = config
                .system(&name)
                .with_context(|| format!("Unknown CI system: '{name}'"))?;
            let source = select_source(system, depth, self.source.as_deref())?;

            info!("Using source '{}' of system '{}'", source.name, system.name);
            (system.name.clone(), SessionSettings::from(source))
        };

        if let Some(token) = &self.token {
            settings.token = Some(Token::from(token.clone()));
        }
        if let Some(cert) = &self.cert {
            settings.cert = Some(cert.clone());
        }

        Ok((system, settings))
    }
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    async fn execute_query(&self, args: &QueryArgs) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let criteria = args.criteria()?;
        let depth = args
            .depth
            .unwrap_or_else(|| QueryDepth::from_criteria(&criteria));

        let (system, settings) = args.session_settings(&config, depth)?;
        info!("Querying system '{system}' at {} down to {depth}", settings.host);

        let client = ZuulRestClient::from_settings(settings)?;
        let manager: Box<dyn SourceManager + '_> = if args.hierarchy {
            Box::new(HierarchyManager::new(&client))
        } else {
            Box::new(QuickManager::new(&client))
        };

        let progress = QueryProgress::start(&system, depth);
        let result = match manager.handle_query(depth, &criteria).await {
            Ok(result) => {
                progress.finish(&result);
                result
            }
            Err(e) => {
                progress.fail();
                return Err(e).with_context(|| format!("Query on system '{system}' failed"));
            }
        };

        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;
        let rendered = output::render(&result, &system, format, pretty, self.verbose > 0)?;

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, rendered)
                .with_context(|| format!("Failed to write results: {}", output_path.display()))?;
            info!("Results written to: {}", output_path.display());
        } else {
            println!("{rendered}");
        }

        if result.is_partial() {
            bail!(
                "{} query branches failed, results are partial",
                result.errors.len()
            );
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Query(args) => self.execute_query(args).await,
        }
    }
}
