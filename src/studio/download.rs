//! Fetching generated images and saving them to disk.

use crate::error::{Error, Result};
use crate::image::ImageFormat;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Retrieves the raw bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the bytes at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches images over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a fresh client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        check_status(response.status())?;
        let bytes = response.bytes().await?;
        check_body(&bytes)?;
        Ok(bytes.to_vec())
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(Error::Api {
        status: status.as_u16(),
        message: "Failed to download image from URL".into(),
    })
}

fn check_body(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::UnexpectedResponse("image body was empty".into()));
    }
    Ok(())
}

/// File name for the image at 0-based `index`, e.g. `generated-image-1.webp`.
pub fn download_file_name(index: usize) -> String {
    format!(
        "generated-image-{}.{}",
        index + 1,
        ImageFormat::WebP.extension()
    )
}

/// Fetches the image at `url` and saves it in `dir` under [`download_file_name`].
///
/// Bytes go to a temporary file in `dir` first, which is removed on every failure
/// path and renamed into place only once fully written. Any error is wrapped as
/// [`Error::Download`].
pub async fn save_image(
    fetcher: &dyn ImageFetcher,
    url: &str,
    index: usize,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = fetcher
        .fetch(url)
        .await
        .map_err(|e| Error::download(index, e))?;

    if ImageFormat::from_magic_bytes(&bytes) != Some(ImageFormat::WebP) {
        tracing::debug!(url, "downloaded image does not look like WebP; saving as-is");
    }

    let target = dir.join(download_file_name(index));
    write_atomically(&bytes, dir, &target).map_err(|e| Error::download(index, e))?;

    tracing::info!(path = %target.display(), size_bytes = bytes.len(), "saved image");
    Ok(target)
}

fn write_atomically(bytes: &[u8], dir: &Path, target: &Path) -> Result<()> {
    let mut partial = tempfile::Builder::new()
        .prefix(".generated-image-")
        .suffix(".part")
        .tempfile_in(dir)?;
    partial.write_all(bytes)?;
    partial.flush()?;
    partial.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(Vec<u8>);

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ImageFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Err(Error::Api {
                status: 404,
                message: "gone".into(),
            })
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(reqwest::StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(reqwest::StatusCode::NOT_FOUND),
            Err(Error::Api { status: 404, .. })
        ));
        assert!(matches!(
            check_status(reqwest::StatusCode::FORBIDDEN),
            Err(Error::Api { status: 403, .. })
        ));
    }

    #[test]
    fn test_check_body_rejects_empty() {
        assert!(matches!(check_body(&[]), Err(Error::UnexpectedResponse(_))));
        assert!(check_body(b"RIFF").is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_unreachable_host() {
        let result = HttpFetcher::new().fetch("http://127.0.0.1:9/image.webp").await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[test]
    fn test_download_file_name_is_one_based() {
        assert_eq!(download_file_name(0), "generated-image-1.webp");
        assert_eq!(download_file_name(2), "generated-image-3.webp");
    }

    #[tokio::test]
    async fn test_save_image_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"RIFF\x10\x00\x00\x00WEBPVP8 ".to_vec();
        let fetcher = StaticFetcher(bytes.clone());

        let path = save_image(&fetcher, "https://im.runware.ai/c.webp", 2, dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("generated-image-3.webp"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(entries(dir.path()), vec!["generated-image-3.webp".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();

        let err = save_image(&FailingFetcher, "https://im.runware.ai/x.webp", 0, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { position: 0, .. }));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_target_cleans_up_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the final rename fail.
        std::fs::create_dir(dir.path().join("generated-image-1.webp")).unwrap();
        std::fs::write(
            dir.path().join("generated-image-1.webp").join("keep"),
            b"occupied",
        )
        .unwrap();

        let fetcher = StaticFetcher(vec![1, 2, 3]);
        let err = save_image(&fetcher, "https://im.runware.ai/a.webp", 0, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { position: 0, .. }));
        assert_eq!(entries(dir.path()), vec!["generated-image-1.webp".to_string()]);
    }
}
