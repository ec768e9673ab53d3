use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use moments_core::REPORT_TITLE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("当前暂无可下载报告")]
    NothingToExport,

    #[error("写入报告失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `朋友圈分析报告-2025-03-01-08-30-00.md`, timestamped in UTC.
pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.md",
        REPORT_TITLE,
        generated_at.format("%Y-%m-%d-%H-%M-%S")
    )
}

/// The user's download directory, or the working directory if there is none.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn write_report(
    dir: &Path,
    markdown: &str,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(report_file_name(generated_at));
    fs::write(&path, markdown).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    log::debug!("Report written to {}", path.display());
    Ok(path)
}
