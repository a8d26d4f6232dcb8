use crate::config::ProvisionConfig;
use crate::provider::CapabilityProvider;
use anyhow::{anyhow, Context, Result};
use async_std::fs;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::io::{AsyncReadExt, AsyncWriteExt};
use futures::sink::SinkExt;
use log::{debug, info};
use std::path::{Path, PathBuf};
use superres_core::manifest::ModelSpec;
use superres_core::protocol::AssetEvent;
use superres_core::state::{ProviderState, ProvisionOutcome};

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_REDIRECTS: u8 = 5;

/// Treats "model file present in the cache directory" as readiness and
/// installs the model by downloading it over HTTP.
pub struct LocalModelProvider {
    model: ModelSpec,
    cache_dir: PathBuf,
    ai_disabled: bool,
}

impl LocalModelProvider {
    pub fn new(config: &ProvisionConfig) -> Self {
        Self {
            model: config.model.clone(),
            cache_dir: config.cache_dir.clone(),
            ai_disabled: config.ai_disabled,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model.filename)
    }

    async fn is_installed(&self) -> bool {
        match fs::metadata(self.model_path()).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    async fn download(&self, path: &Path, progress: &mut mpsc::Sender<AssetEvent>) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .with_context(|| format!("Failed to create cache dir {:?}", self.cache_dir))?;

        let client = surf::Client::new().with(FollowRedirects::new(MAX_REDIRECTS));
        let mut response = client
            .get(&self.model.url)
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Download failed with status: {}", status));
        }

        let total = response.len().map(|len| len as u64).unwrap_or(0);
        let partial = path.with_extension("part");

        info!("Downloading {} to {:?}", self.model.url, path);
        let streamed = stream_to_file(&mut response, &partial, total, progress).await;
        let current = match streamed {
            Ok(current) => current,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        fs::rename(&partial, path)
            .await
            .with_context(|| format!("Failed to move download into {:?}", path))?;
        debug!("Downloaded {} bytes", current);
        Ok(())
    }
}

/// Follows `Location` headers by re-running only the rest of the middleware
/// chain, so every hop is requested exactly once.
struct FollowRedirects {
    max_hops: u8,
}

impl FollowRedirects {
    fn new(max_hops: u8) -> Self {
        Self { max_hops }
    }
}

#[surf::utils::async_trait]
impl surf::middleware::Middleware for FollowRedirects {
    async fn handle(
        &self,
        req: surf::Request,
        client: surf::Client,
        next: surf::middleware::Next<'_>,
    ) -> surf::Result<surf::Response> {
        let mut hops = 0;
        let mut current = req;

        loop {
            let response = next.run(current.clone(), client.clone()).await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = match response.header("Location") {
                Some(values) => values.last().as_str().to_string(),
                None => return Ok(response),
            };

            hops += 1;
            if hops > self.max_hops {
                return Err(surf::Error::from_str(
                    surf::StatusCode::LoopDetected,
                    "Too many redirects",
                ));
            }

            // Relative locations resolve against the URL that answered.
            let target = current.url().join(&location).map_err(|_| {
                surf::Error::from_str(surf::StatusCode::BadGateway, "Invalid redirect location")
            })?;
            debug!("Following redirect to {}", target);
            current = surf::Request::new(current.method(), target);
        }
    }
}

/// Copy the response body into `partial`, reporting progress when the length
/// is known. Returns the number of bytes written.
async fn stream_to_file(
    response: &mut surf::Response,
    partial: &Path,
    total: u64,
    progress: &mut mpsc::Sender<AssetEvent>,
) -> Result<u64> {
    let mut file = fs::File::create(partial)
        .await
        .with_context(|| format!("Failed to create {:?}", partial))?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut current = 0u64;
    loop {
        let read = response
            .read(&mut buf)
            .await
            .context("Streaming failed")?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read]).await?;
        current += read as u64;
        if total > 0 {
            let _ = progress.send(AssetEvent::Progress(current, total)).await;
        }
    }
    file.sync_all().await?;

    if current == 0 {
        return Err(anyhow!("Server returned an empty model file"));
    }
    if total > 0 && current != total {
        return Err(anyhow!("Download truncated at {} of {} bytes", current, total));
    }
    Ok(current)
}

#[async_trait]
impl CapabilityProvider for LocalModelProvider {
    async fn ready_state(&self) -> Result<ProviderState> {
        if self.ai_disabled {
            return Ok(ProviderState::DisabledByUser);
        }
        if self.is_installed().await {
            Ok(ProviderState::Ready)
        } else {
            Ok(ProviderState::NotReady)
        }
    }

    async fn ensure_ready(
        &self,
        mut progress: mpsc::Sender<AssetEvent>,
    ) -> Result<ProvisionOutcome> {
        let _ = progress
            .send(AssetEvent::Started(self.model.name.clone()))
            .await;

        let path = self.model_path();
        if !self.is_installed().await {
            if let Err(e) = self.download(&path, &mut progress).await {
                let _ = progress.send(AssetEvent::Error(e.to_string())).await;
                return Ok(ProvisionOutcome::Failure(e.to_string()));
            }
        }

        let _ = progress
            .send(AssetEvent::Complete(path.to_string_lossy().to_string()))
            .await;
        Ok(ProvisionOutcome::Success)
    }
}
