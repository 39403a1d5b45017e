use crate::api::error::{ApiError, ApiResult};
use futures_util::StreamExt;
use reqwest::Response;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Basket content body, not yet read off the wire.
///
/// The format depends on the basket's file type, so bytes are passed
/// through unmodified.
#[derive(Debug)]
pub struct OrderStream {
    response: Response,
}

impl OrderStream {
    pub(crate) fn new(response: Response) -> Self {
        Self { response }
    }

    /// Buffer the whole body in memory
    pub async fn into_bytes(self) -> ApiResult<Vec<u8>> {
        Ok(self.response.bytes().await?.to_vec())
    }

    /// Stream the body to `path`, replacing any existing file.
    ///
    /// Bytes land in a `.part` sibling first and are renamed over `path`
    /// only once the body is complete, so a dropped connection leaves the
    /// previous file untouched. Returns the number of bytes written.
    pub async fn write_to_file(self, path: impl AsRef<Path>) -> ApiResult<u64> {
        let path = path.as_ref();
        let partial = partial_path(path);
        let announced = self.response.content_length();

        let result = match copy_body(self.response, &partial).await {
            Ok(written) => fs::rename(&partial, path)
                .await
                .map(|()| written)
                .map_err(ApiError::from),
            Err(e) => Err(e),
        };

        let written = match result {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        warn!("Failed to remove {}: {}", partial.display(), cleanup);
                    }
                }
                return Err(e);
            }
        };

        info!(
            "Saved {} bytes to {} (announced: {:?})",
            written,
            path.display(),
            announced
        );

        Ok(written)
    }
}

async fn copy_body(response: Response, target: &Path) -> ApiResult<u64> {
    let mut file = File::create(target).await?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        debug!("Wrote {} bytes to {}", written, target.display());
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// `out.csv` -> `out.csv.part`, in the same directory so the rename stays
/// on one filesystem
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    path.with_file_name(name)
}
