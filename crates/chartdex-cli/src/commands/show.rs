//! Show command - display a chart version from a cached repository index

use chartdex_repo::ChartVersion;
use console::style;

use super::Settings;
use crate::error::{CliError, Result};

/// How a resolved chart version is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Yaml,
    Json,
}

pub fn run(
    settings: &Settings,
    reference: &str,
    version: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let Some((repo_ref, chart)) = reference.rsplit_once('/') else {
        return Err(CliError::input_with_help(
            format!("'{}' is not a chart reference", reference),
            "Use <repository>/<chart>, e.g. stable/nginx",
        ));
    };

    let repos = settings.repositories()?;
    let name = repos.get_for_ref(reference);
    if name.is_empty() {
        return Err(CliError::not_found_with_help(
            format!("No repository matches '{}'", repo_ref),
            format!(
                "Add it to {} or use a repository URL",
                settings.repository_config.display()
            ),
        ));
    }

    let Some(index) = repos.get_index(&name)? else {
        return Err(CliError::not_found_with_help(
            format!("No cached index for repository '{}'", name),
            format!("Expected {}", repos.index_path(&name).display()),
        ));
    };

    let chart_version = index.get(chart, version.unwrap_or(""))?;

    match format {
        OutputFormat::Summary => print_version(chart_version),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(chart_version)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(chart_version)?),
    }
    Ok(())
}

fn print_version(cv: &ChartVersion) {
    let meta = &cv.metadata;

    println!("{}", style(&meta.name).cyan().bold());
    println!("{}", style("=".repeat(meta.name.len())).dim());
    println!();

    println!("{}: {}", style("Version").bold(), meta.version);

    if !meta.app_version.is_empty() {
        println!("{}: {}", style("App Version").bold(), meta.app_version);
    }

    if !meta.description.is_empty() {
        println!("{}: {}", style("Description").bold(), meta.description);
    }

    if !meta.home.is_empty() {
        println!("{}: {}", style("Home").bold(), meta.home);
    }

    if meta.deprecated {
        println!("{}", style("This chart is deprecated").yellow());
    }

    if let Some(created) = cv.created {
        println!("{}: {}", style("Created").bold(), created.to_rfc3339());
    }

    if !cv.digest.is_empty() {
        println!("{}: {}", style("Digest").bold(), cv.digest);
    }

    if !cv.urls.is_empty() {
        println!();
        println!("{}:", style("URLs").bold());
        for url in &cv.urls {
            println!("  - {}", url);
        }
    }

    let deps: Vec<_> = meta.dependencies().collect();
    if !deps.is_empty() {
        println!();
        println!("{}:", style("Dependencies").bold());
        for dep in deps {
            println!("  - {} {} ({})", dep.name, dep.version, dep.repository);
        }
    }
}
