use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

// Base output directory
pub const OUTPUT_DIR: &str = "outputs";

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// `outputs/{name}.json`, creating `outputs/` if needed.
pub fn output_path(name: &str) -> Result<PathBuf> {
    let dir = Path::new(OUTPUT_DIR);
    ensure_dir(dir)?;
    Ok(dir.join(format!("{}.json", name)))
}
