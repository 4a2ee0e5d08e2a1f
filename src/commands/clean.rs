use crate::build::BuildContext;
use crate::package::PackageBuilder;
use crate::packages;
use crate::result::Result;
use std::path::Path;

pub async fn execute(config_path: Option<&Path>, package: &str) -> Result<()> {
    let ctx = BuildContext::load(config_path).await?;
    let package = packages::resolve(package, &ctx.settings)?;
    let builder = PackageBuilder::new(package.as_ref(), &ctx).await?;

    builder.clean_installation().await;
    log::info!("Cleaned {}", builder.output_base_name());
    Ok(())
}
