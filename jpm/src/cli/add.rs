// jpm/src/cli/add.rs
use clap::Args;
use jpm_common::config::Config;
use jpm_common::error::Result;
use jpm_common::model::PackageSpec;
use jpm_core::Manifest;
use jpm_net::registry::{MetadataSource, RegistryClient};
use tracing::{debug, instrument};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Package to add, as name or name@version
    #[arg(value_name = "PACKAGE")]
    package: PackageSpec,
}

impl AddArgs {
    #[instrument(skip(self, config), fields(package = %self.package))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let mut manifest = Manifest::load(&config.manifest_path())?;

        let version = match &self.package.version {
            Some(version) => version.clone(),
            None => {
                let registry = RegistryClient::from_config(config)?;
                let metadata = registry
                    .metadata(&self.package.name, self.package.version_or_latest())
                    .await?;
                debug!(
                    "Resolved {} to {}@{}",
                    self.package, metadata.name, metadata.version
                );
                metadata.version
            }
        };

        manifest.add_dependency(&self.package.name, &version);
        manifest.save()?;
        println!("Added {}@{} to dependencies.", self.package.name, version);
        Ok(())
    }
}
