// Export - Streaming a response body into a file
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::client::WireResponse;
use crate::error::{ClientError, Result};

/// Bytes persisted so far, and the announced size when the server sent one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
}

impl ExportProgress {
    pub fn percent(&self) -> Option<u8> {
        match self.total_bytes {
            Some(total) if total > 0 => Some(((self.bytes_written.min(total) * 100) / total) as u8),
            _ => None,
        }
    }
}

/// Replace anything that could escape the export directory or upset a file
/// system. A name that ends up blank becomes `export`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Stream `response` into `target`, going through a `.part` sibling that is
/// renamed only after the whole body arrived. Nothing is left behind on failure.
pub async fn write_export(
    response: WireResponse,
    target: &Path,
    on_progress: &mut (dyn FnMut(ExportProgress) + Send),
) -> Result<u64> {
    let partial = partial_path(target);
    match stream_into(response, &partial, on_progress).await {
        Ok(written) => {
            if let Err(e) = fs::rename(&partial, target).await {
                discard(&partial).await;
                return Err(aborted(format!("Failed to move export into place: {}", e)));
            }
            log::info!("Export saved to {} ({} bytes)", target.display(), written);
            Ok(written)
        }
        Err(e) => {
            discard(&partial).await;
            log::warn!("Export to {} aborted: {}", target.display(), e);
            Err(e)
        }
    }
}

async fn stream_into(
    response: WireResponse,
    partial: &Path,
    on_progress: &mut (dyn FnMut(ExportProgress) + Send),
) -> Result<u64> {
    if let Some(parent) = partial.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| aborted(format!("Failed to create export directory: {}", e)))?;
        }
    }

    let mut file = fs::File::create(partial)
        .await
        .map_err(|e| aborted(format!("Failed to create file: {}", e)))?;

    let total_bytes = response.content_length;
    let mut stream = response.body;
    let mut written = 0u64;
    on_progress(ExportProgress {
        bytes_written: 0,
        total_bytes,
    });

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            aborted(format!("Connection lost after {} bytes: {}", written, e))
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| aborted(format!("Failed to write chunk to file: {}", e)))?;
        written += chunk.len() as u64;
        perf_trace!("Export chunk of {} bytes, {} so far", chunk.len(), written);
        on_progress(ExportProgress {
            bytes_written: written,
            total_bytes,
        });
    }

    if let Some(expected) = total_bytes {
        if written != expected {
            return Err(aborted(format!(
                "Body ended after {} of {} bytes",
                written, expected
            )));
        }
    }

    file.flush()
        .await
        .map_err(|e| aborted(format!("Failed to flush file: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| aborted(format!("Failed to sync file: {}", e)))?;
    Ok(written)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

async fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not remove partial export {}: {}", partial.display(), e);
        }
    }
}

fn aborted(message: String) -> ClientError {
    ClientError::ExportAborted(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use bytes::Bytes;
    use std::io;
    use tempfile::tempdir;

    fn chunks(parts: &[&str]) -> Vec<io::Result<Bytes>> {
        parts.iter().map(|p| Ok(Bytes::from(p.to_string()))).collect()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("march report"), "march report");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("a\tb"), "a_b");
        assert_eq!(sanitize_file_name("   "), "export");
        assert_eq!(sanitize_file_name(".."), "export");
    }

    #[test]
    fn test_progress_percent() {
        let progress = ExportProgress {
            bytes_written: 50,
            total_bytes: Some(200),
        };
        assert_eq!(progress.percent(), Some(25));
        let unknown = ExportProgress {
            bytes_written: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[tokio::test]
    async fn test_write_export_renames_on_success() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.csv");
        let response = WireResponse::from_chunks(200, Some(10), chunks(&["a,b\n", "1,2\n", "x\n"]));

        let mut seen = Vec::new();
        let written = write_export(response, &target, &mut |p| seen.push(p.bytes_written))
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a,b\n1,2\nx\n");
        assert!(!dir.path().join("out.csv.part").exists());
        assert_eq!(seen, vec![0, 4, 8, 10]);
    }

    #[tokio::test]
    async fn test_short_body_leaves_no_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.csv");
        let response = WireResponse::from_chunks(200, Some(100), chunks(&["a,b\n"]));

        let err = write_export(response, &target, &mut |_| {}).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExportAborted);
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
