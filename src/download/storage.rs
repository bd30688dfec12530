//! Committing verified documents to the output directory.
//!
//! Bytes are written to a hidden `.part` file next to the destination and
//! renamed into place, so a crash or write error never leaves a truncated
//! file under the final name.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument, warn};

use super::constants::PARTIAL_SUFFIX;
use super::error::DownloadError;
use super::integrity::{PDF_MAGIC, verify_pdf};

/// Writes `bytes` to `dir/filename` atomically and returns the final path.
///
/// An existing file with the same name is replaced.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the temporary file cannot be written or
/// renamed. The temporary file is removed on failure.
#[instrument(skip(bytes), fields(dir = %dir.display(), bytes = bytes.len()))]
pub async fn commit(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
    let final_path = dir.join(filename);
    let temp_path = dir.join(format!(".{filename}{PARTIAL_SUFFIX}"));

    if let Err(error) = write_temp(&temp_path, bytes).await {
        debug!(path = %temp_path.display(), "cleaning up partial file after error");
        let _ = fs::remove_file(&temp_path).await;
        return Err(error);
    }

    if let Err(source) = fs::rename(&temp_path, &final_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DownloadError::io(final_path, source));
    }

    Ok(final_path)
}

async fn write_temp(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let mut file = File::create(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.flush().await.map_err(|e| DownloadError::io(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    Ok(())
}

/// Whether `path` is an existing file that starts with the PDF magic header.
///
/// Unreadable or non-PDF files count as absent so they get fetched again.
pub async fn existing_pdf(path: &Path) -> bool {
    let Ok(mut file) = File::open(path).await else {
        return false;
    };
    let mut head = [0_u8; PDF_MAGIC.len()];
    match file.read_exact(&mut head).await {
        Ok(_) => verify_pdf(&head).is_ok(),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "existing file is not a readable PDF");
            false
        }
    }
}

/// Creates `dir` if needed and checks that files can be created in it.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] when the path is not a directory or is not writable.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| DownloadError::io(dir, e))?;

    let metadata = fs::metadata(dir)
        .await
        .map_err(|e| DownloadError::io(dir, e))?;
    if !metadata.is_dir() {
        return Err(DownloadError::io(
            dir,
            std::io::Error::other("output path is not a directory"),
        ));
    }

    let probe = dir.join(format!(".pdfharvest-write-probe{PARTIAL_SUFFIX}"));
    File::create(&probe)
        .await
        .map_err(|e| DownloadError::io(&probe, e))?;
    let _ = fs::remove_file(&probe).await;
    Ok(())
}
