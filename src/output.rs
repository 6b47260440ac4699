//! # Figure Output
//!
//! Writes the rendered figure to its destination. Local paths are rendered in
//! place; `s3://` destinations are rendered to a temporary file first and then
//! uploaded through [`crate::storage`].

use crate::error::{QcPlotError, QcPlotResult};
use crate::render::{ImageFormat, PlotBundle, render_to_file};
use crate::storage::{StorageBackend, StorageFactory};
use log::debug;
use std::path::Path;

/// Fails when `output_path` is an existing local file and `force` is unset.
pub fn check_overwrite(output_path: &str, force: bool) -> QcPlotResult<()> {
    if !force && StorageFactory::is_local_path(output_path) && Path::new(output_path).exists() {
        return Err(QcPlotError::Config(format!(
            "output '{}' already exists (use --force to overwrite)",
            output_path
        )));
    }
    Ok(())
}

/// Renders the figure to a local file, creating parent directories.
pub fn write_figure(bundle: &PlotBundle, output_path: &str, size: (u32, u32)) -> QcPlotResult<()> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    render_to_file(bundle, path, size)?;
    debug!("Wrote figure to {}", output_path);
    Ok(())
}

/// Renders the figure to a local path or uploads it to S3.
pub async fn write_figure_async(bundle: &PlotBundle, output_path: &str, size: (u32, u32)) -> QcPlotResult<()> {
    if StorageFactory::is_local_path(output_path) {
        return write_figure(bundle, output_path, size);
    }

    let format = ImageFormat::from_path(output_path);
    let temp_file = tempfile::Builder::new()
        .prefix("adcp-qcplot-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?;
    render_to_file(bundle, temp_file.path(), size)?;

    let storage = StorageFactory::from_path(output_path).await?;
    let data: Vec<u8> = tokio::fs::read(temp_file.path()).await?;
    storage.write(output_path, &data).await?;

    debug!("Uploaded {} byte figure to {}", data.len(), output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("figure.png");
        let path_str = path.to_str().unwrap();

        assert!(check_overwrite(path_str, false).is_ok());
        std::fs::write(&path, b"old").unwrap();
        assert!(matches!(check_overwrite(path_str, false), Err(QcPlotError::Config(_))));
        assert!(check_overwrite(path_str, true).is_ok());

        // Remote destinations are never checked.
        assert!(check_overwrite("s3://bucket/figure.png", false).is_ok());
    }
}
