pub mod parser;

use crate::commands::CommandExecutor;
use crate::result::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tpbuild")]
#[command(about = "Fetch, configure, build, install and archive third-party libraries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(
    help_template = "{before-help}{name} v{version}\n\n{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file (defaults to TPBUILD_CONFIG, then the user config directory)"
    )]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the full build pipeline for a package")]
    Build {
        #[arg(help = "Package name")]
        package: String,

        #[arg(long, help = "Remove previous installs and extracted sources first")]
        fresh: bool,
    },

    #[command(about = "Remove a package's install, source and build directories")]
    Clean {
        #[arg(help = "Package name")]
        package: String,
    },

    #[command(about = "Show computed paths and names for a package")]
    Info {
        #[arg(help = "Package name")]
        package: String,

        #[arg(long, help = "Print as JSON")]
        json: bool,
    },

    #[command(about = "List known packages")]
    List,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let executor = CommandExecutor::new(self.config)?;

        match self.command {
            Commands::Build { package, fresh } => executor.build_package(package, fresh).await,
            Commands::Clean { package } => executor.clean_package(package).await,
            Commands::Info { package, json } => executor.package_info(package, json).await,
            Commands::List => executor.list_packages().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_with_global_config() {
        let cli = Cli::try_parse_from(["tpbuild", "build", "qwt", "--fresh", "--config", "x.toml"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(matches!(
            cli.command,
            Commands::Build { ref package, fresh: true } if package == "qwt"
        ));
    }

    #[test]
    fn info_json_flag() {
        let cli = Cli::try_parse_from(["tpbuild", "info", "zlib", "--json"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Info { json: true, .. }));
    }

    #[test]
    fn package_name_is_required() {
        assert!(Cli::try_parse_from(["tpbuild", "clean"]).is_err());
    }
}
