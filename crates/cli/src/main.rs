//! # superres
//! Terminal front end for the AI super-resolution gate: inspect availability,
//! toggle the preference, install the model and preview output sizes.

mod progress;
mod report;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::StreamExt;
use log::{debug, info};
use progress::DownloadBar;
use std::path::PathBuf;
use std::sync::Arc;
use superres::{AssetEvent, FeatureState, SuperResolution};
use superres_core::protocol::StemOutput;
use superres_core::view::ViewState;
use superres_cortex::NoOpFactory;
use superres_provision::ProvisionConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether AI super resolution is available
    Status,
    /// Opt in and check availability
    Enable,
    /// Opt out (the model stays installed)
    Disable,
    /// Opt in and download the AI model if it is missing
    Download,
    /// Print current and upscaled sizes for the given images
    Preview {
        /// Image files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Upscale factor (1-8)
        #[arg(long)]
        scale: Option<u32>,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = ProvisionConfig::load()?;
    info!(
        "Config: {}, cache: {}",
        config.config_dir.display(),
        config.cache_dir.display()
    );
    let mut session = SuperResolution::from_config(&config, Arc::new(NoOpFactory))?;
    let view = session.wait_until(report::settled).await?;

    match cli.command {
        Commands::Status => {
            println!("{}", report::render(&view));
        }
        Commands::Enable => {
            session.toggle_feature(true).await?;
            let view = session.wait_until(|v| v.state.is_resolved()).await?;
            println!("{}", report::render(&view));
        }
        Commands::Disable => {
            session.toggle_feature(false).await?;
            let view = session.wait_until(|v| !v.show_size_descriptions).await?;
            println!("{} AI super resolution turned off", "✔".green());
            println!("{}", report::render(&view));
        }
        Commands::Download => {
            session.toggle_feature(true).await?;
            let view = session.wait_until(|v| v.state.is_resolved()).await?;
            let result = match view.state {
                FeatureState::Ready => {
                    println!("{} Model already installed", "✔".green());
                    Ok(())
                }
                FeatureState::ModelNotReady => download(&mut session).await,
                _ => Err(anyhow!("{}", view.status_message)),
            };
            session.shutdown().await?;
            return result;
        }
        Commands::Preview { files, scale } => {
            let count = files.len();
            if let Some(scale) = scale {
                session.set_scale(scale).await?;
            }
            session.set_batch(files).await?;
            let view = session
                .wait_until(move |v| preview_ready(v, count))
                .await?;
            println!("{}", report::render_sizes(&view, count));
        }
    }

    session.shutdown().await
}

fn preview_ready(view: &ViewState, count: usize) -> bool {
    if count > 1 {
        return !view.show_size_descriptions;
    }
    !view.show_size_descriptions || !view.new_resolution_text.is_empty()
}

async fn download(session: &mut SuperResolution) -> Result<()> {
    println!("📥 Downloading AI model");
    let mut updates = session.updates();
    session.request_download().await?;

    let bar = DownloadBar::new()?;
    let mut started = false;
    while let Some(output) = updates.next().await {
        match output {
            StemOutput::Asset(AssetEvent::Progress(current, total)) => bar.update(current, total),
            StemOutput::Asset(AssetEvent::Complete(path)) => {
                bar.finish("done");
                println!("✅ Download complete: {}", path.green());
            }
            StemOutput::View(view) => {
                if view.state == FeatureState::ModelDownloading && !started {
                    debug!("Download started");
                    started = true;
                }
                if let Some(outcome) = download_outcome(&view, started) {
                    if outcome.is_err() {
                        bar.abandon();
                    }
                    return outcome;
                }
            }
            _ => {}
        }
    }
    Err(anyhow!("session closed during download"))
}

/// `None` while the download is still running.
fn download_outcome(view: &ViewState, started: bool) -> Option<Result<()>> {
    match view.state {
        FeatureState::Ready => Some(Ok(())),
        FeatureState::ModelNotReady if started => Some(Err(anyhow!("{}", view.status_message))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(state: FeatureState, message: &str) -> ViewState {
        ViewState {
            state,
            status_message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_download_is_an_error() {
        let failed = view(FeatureState::ModelNotReady, "Model download failed: 404");
        let outcome = download_outcome(&failed, true).expect("download finished");
        let err = outcome.expect_err("failure must not exit cleanly");
        assert_eq!(err.to_string(), "Model download failed: 404");
    }

    #[test]
    fn test_download_outcome_waits_for_a_result() {
        // ModelNotReady before the download started is the prompt, not a failure.
        assert!(download_outcome(&view(FeatureState::ModelNotReady, "missing"), false).is_none());
        assert!(download_outcome(&view(FeatureState::ModelDownloading, ""), true).is_none());
        assert!(matches!(
            download_outcome(&view(FeatureState::Ready, ""), true),
            Some(Ok(()))
        ));
    }
}
