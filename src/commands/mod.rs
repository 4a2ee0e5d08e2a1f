pub mod build;
pub mod clean;
pub mod info;
pub mod list;

use crate::cli::parser::CliParser;
use crate::result::Result;
use smol_str::SmolStr;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CommandType {
    Build { package: SmolStr, fresh: bool },
    Clean { package: SmolStr },
    Info { package: SmolStr, json: bool },
    List,
}

impl CommandType {
    pub async fn execute(self, config: Option<PathBuf>) -> Result<()> {
        let config = config.as_deref();
        match self {
            CommandType::Build { package, fresh } => build::execute(config, &package, fresh).await,
            CommandType::Clean { package } => clean::execute(config, &package).await,
            CommandType::Info { package, json } => info::execute(config, &package, json).await,
            CommandType::List => list::execute(config).await,
        }
    }
}

/// Validates shared arguments, then hands each subcommand to its module.
#[derive(Default)]
pub struct CommandExecutor {
    config: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(config: Option<String>) -> Result<Self> {
        let config = config
            .as_deref()
            .map(CliParser::validate_config_path)
            .transpose()?;
        Ok(Self { config })
    }

    pub async fn build_package(&self, package: String, fresh: bool) -> Result<()> {
        CliParser::validate_package_name(&package)?;
        CommandType::Build {
            package: package.into(),
            fresh,
        }
        .execute(self.config.clone())
        .await
    }

    pub async fn clean_package(&self, package: String) -> Result<()> {
        CliParser::validate_package_name(&package)?;
        CommandType::Clean {
            package: package.into(),
        }
        .execute(self.config.clone())
        .await
    }

    pub async fn package_info(&self, package: String, json: bool) -> Result<()> {
        CliParser::validate_package_name(&package)?;
        CommandType::Info {
            package: package.into(),
            json,
        }
        .execute(self.config.clone())
        .await
    }

    pub async fn list_packages(&self) -> Result<()> {
        CommandType::List.execute(self.config.clone()).await
    }
}
