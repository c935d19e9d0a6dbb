// jpm/src/cli/install.rs

use clap::Args;
use colored::Colorize;
use jpm_common::config::{Config, MANIFEST_FILENAME};
use jpm_common::error::{JpmError, Result};
use jpm_common::pipeline::InstallEvent;
use jpm_core::{Installer, Manifest};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

const EVENT_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Exit with an error if any dependency failed to install
    #[arg(long)]
    strict: bool,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(strict = self.strict))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let manifest = Manifest::load(&config.manifest_path())?;
        let Some(dependencies) = manifest.dependencies() else {
            println!("No dependencies found in {MANIFEST_FILENAME}");
            return Ok(());
        };

        let (event_tx, event_rx) = broadcast::channel::<InstallEvent>(EVENT_CHANNEL_SIZE);
        let status_handle = tokio::spawn(crate::cli::status::handle_events(event_rx));

        let installer = Installer::from_config(config.clone())?.with_events(event_tx);

        let outcome = tokio::select! {
            result = installer.install(&dependencies) => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; abandoning in-flight installs");
                Err(JpmError::Cancelled)
            }
        };
        // The install future is gone by now, so every staging dir it owned
        // has been dropped. Extractions it abandoned may still be winding down.
        installer.sweep_staging().await;

        // Closing the channel lets the status task finish.
        drop(installer);
        if let Err(e) = status_handle.await {
            debug!("Status display task ended abnormally: {}", e);
        }

        let report = outcome?;
        if self.strict && report.has_failures() {
            let names: Vec<String> = report
                .failed
                .iter()
                .map(|f| f.request.to_string())
                .collect();
            return Err(JpmError::Generic(format!(
                "{} package(s) failed to install: {}",
                names.len(),
                names.join(", ")
            )));
        }
        if report.has_failures() {
            eprintln!(
                "{} {} package(s) failed; see messages above",
                "Warning:".yellow(),
                report.failed.len()
            );
        }
        Ok(())
    }
}
