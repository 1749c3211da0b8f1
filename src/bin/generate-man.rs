//! Render the pipeboard man page: `generate-man [output-dir]` (default `man`)

use anyhow::{Context, Result};
use clap::CommandFactory;
use pipeboard::cli::Cli;
use std::path::PathBuf;

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf).context("Failed to render man page")?;

    let path = dir.join("pipeboard.1");
    std::fs::write(&path, &buf)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Generated {} ({} bytes)", path.display(), buf.len());
    Ok(())
}
