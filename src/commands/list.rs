use crate::config::Settings;
use crate::packages::{self, PackageSource};
use crate::result::Result;
use std::path::Path;

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config_path).await?;
    let entries = packages::known_packages(&settings)?;

    println!("Known packages ({}):", entries.len());
    for entry in entries {
        match entry.source {
            PackageSource::Builtin => println!("  {} (built-in)", entry.name),
            PackageSource::Manifest => {
                let version = settings
                    .config()
                    .packages
                    .get(entry.name.as_str())
                    .map(|spec| spec.version.as_str())
                    .unwrap_or("?");
                println!("  {} {} (manifest)", entry.name, version)
            }
        }
    }
    Ok(())
}
