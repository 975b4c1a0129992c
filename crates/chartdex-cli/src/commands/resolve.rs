//! Resolve command - map references to canonical repository names

use super::Settings;
use crate::error::Result;

/// Print `<reference>\t<repository>` per reference, `-` when unresolved
pub fn run(settings: &Settings, references: &[String], chart: bool) -> Result<()> {
    let repos = settings.repositories()?;

    for reference in references {
        let name = if chart {
            repos.get_for_ref(reference)
        } else {
            repos.canonicalize_repo_name(reference)
        };
        let shown = if name.is_empty() { "-" } else { name.as_str() };
        println!("{}\t{}", reference, shown);
    }

    Ok(())
}
