//! HTTP transport
//!
//! Metadata queries are bounded by a global timeout; tarball downloads only
//! bound the connect phase, since their duration legitimately varies.

use crate::error::{PhpsmithError, PhpsmithResult};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking-free access to remote resources
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET a small text document
    async fn get_text(&self, url: &str) -> PhpsmithResult<String>;

    /// Stream a file to `dest`
    async fn download(&self, url: &str, dest: &Path) -> PhpsmithResult<()>;
}

/// `ureq` transport running on the blocking pool
pub struct UreqTransport {
    metadata: ureq::Agent,
    downloads: ureq::Agent,
}

impl UreqTransport {
    pub fn new(metadata_timeout: Duration) -> Self {
        let user_agent = concat!("phpsmith/", env!("CARGO_PKG_VERSION"));
        let metadata = ureq::Agent::config_builder()
            .timeout_global(Some(metadata_timeout))
            .user_agent(user_agent)
            .build()
            .into();
        let downloads = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .user_agent(user_agent)
            .build()
            .into();
        Self {
            metadata,
            downloads,
        }
    }
}

fn download_error(url: &str, reason: impl ToString) -> PhpsmithError {
    PhpsmithError::Download {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn get_text(&self, url: &str) -> PhpsmithResult<String> {
        debug!("GET {}", url);
        let agent = self.metadata.clone();
        let owned_url = url.to_string();

        tokio::task::spawn_blocking(move || {
            let mut response = agent
                .get(&owned_url)
                .call()
                .map_err(|e| download_error(&owned_url, e))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| download_error(&owned_url, e))
        })
        .await
        .map_err(|e| PhpsmithError::Internal(format!("download task failed: {}", e)))?
    }

    async fn download(&self, url: &str, dest: &Path) -> PhpsmithResult<()> {
        debug!("Downloading {} to {}", url, dest.display());
        let agent = self.downloads.clone();
        let owned_url = url.to_string();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let response = agent
                .get(&owned_url)
                .call()
                .map_err(|e| download_error(&owned_url, e))?;
            let mut reader = response.into_body().into_reader();
            let mut file = std::fs::File::create(&dest)
                .map_err(|e| PhpsmithError::io(format!("creating {}", dest.display()), e))?;
            std::io::copy(&mut reader, &mut file).map_err(|e| download_error(&owned_url, e))?;
            file.sync_all()
                .map_err(|e| PhpsmithError::io(format!("syncing {}", dest.display()), e))?;
            Ok(())
        })
        .await
        .map_err(|e| PhpsmithError::Internal(format!("download task failed: {}", e)))?
    }
}
