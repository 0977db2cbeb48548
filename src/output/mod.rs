mod hierarchy;
mod progress;
mod styling;
mod summary;
mod tables;
mod tree;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::models::QueryOutput;

pub use progress::QueryProgress;
use styling::{dim, magenta_bold};
use tree::TreePrinter;

/// Prints the `citree` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🌳 citree"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Hierarchy Query Tool")
    );
}

/// Renders a query result in the requested format.
///
/// `Text` is the colorized tree with every escape sequence removed, so it is
/// safe to redirect regardless of the terminal.
pub fn render(
    output: &QueryOutput,
    system: &str,
    format: OutputFormat,
    pretty: bool,
    verbose: bool,
) -> Result<String> {
    if format == OutputFormat::Json {
        let json = if pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        return Ok(json);
    }

    let mut text = TreePrinter::new(system, output.depth, verbose).print(output);

    if !output.tenants.is_empty() {
        text.push_str("\n\n");
        text.push_str(&summary::render_summary(output));
    }

    if format == OutputFormat::Text {
        text = console::strip_ansi_codes(&text).into_owned();
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Tenant};
    use crate::query::QueryDepth;

    fn output() -> QueryOutput {
        let mut tenant = Tenant::new("openstack");
        tenant.projects.insert("nova".into(), Project::new("nova"));

        let mut output = QueryOutput::new(QueryDepth::Projects);
        output.add_tenant(tenant);
        output
    }

    #[test]
    fn json_keeps_the_tree_shape() {
        let json = render(&output(), "opendev", OutputFormat::Json, false, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["depth"], "projects");
        assert_eq!(
            value["tenants"]["openstack"]["projects"]["nova"]["name"],
            "nova"
        );
        assert!(value["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn pretty_json_spans_lines() {
        let json = render(&output(), "opendev", OutputFormat::Json, true, false).unwrap();
        assert!(json.lines().count() > 1);
    }

    #[test]
    fn text_has_no_escape_sequences() {
        let text = render(&output(), "opendev", OutputFormat::Text, false, false).unwrap();
        assert!(!text.contains('\u{1b}'));
        assert!(text.starts_with("System: opendev"));
        assert!(text.contains("Tenant"));
    }
}
