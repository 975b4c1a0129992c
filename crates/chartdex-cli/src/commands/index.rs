//! Index command - build a repository index from a directory of charts

use chartdex_core::DEFAULT_FILE_MODE;
use chartdex_repo::{IndexFile, index_directory};
use console::style;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(dir: &Path, url: &str, merge: Option<&Path>, json: bool) -> Result<()> {
    if !dir.is_dir() {
        return Err(CliError::input(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut index = index_directory(dir, url).map_err(|partial| {
        CliError::from(partial.error).with_help(format!(
            "Indexed {} chart version(s) before failing",
            partial.index.len()
        ))
    })?;

    if let Some(merge) = merge {
        if merge.exists() {
            let existing = IndexFile::load_file(merge)?;
            index.merge(&existing);
        } else {
            tracing::warn!("{} does not exist, nothing to merge", merge.display());
        }
    }

    index.sort_entries();

    let out = dir.join(if json { "index.json" } else { "index.yaml" });
    if json {
        index.write_json_file(&out, DEFAULT_FILE_MODE)?;
    } else {
        index.write_file(&out, DEFAULT_FILE_MODE)?;
    }

    println!(
        "{} Indexed {} chart version(s) across {} chart(s) into {}",
        style("✓").green().bold(),
        index.len(),
        index.entries.len(),
        out.display()
    );
    Ok(())
}
