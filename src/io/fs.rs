//! Filesystem helpers shared by the exporters.

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Write `path` through a temporary file in the same directory, renamed into
/// place only once `write` has succeeded. Missing parent directories are created.
pub fn write_atomic(path: &Path, write: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    let dir = path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("[io::fs] Output directory {} is not usable", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("[io::fs] Failed to create a temporary file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()
            .with_context(|| format!("[io::fs] Failed to flush {}", path.display()))?;
    }
    tmp.persist(path)
        .with_context(|| format!("[io::fs] Failed to move output into {}", path.display()))?;
    Ok(())
}

/// Write a whole string atomically.
pub fn write_string(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, |w| Ok(w.write_all(text.as_bytes())?))
}
