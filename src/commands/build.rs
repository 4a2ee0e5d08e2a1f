use crate::build::BuildContext;
use crate::package::PackageBuilder;
use crate::packages;
use crate::result::Result;
use std::path::Path;
use std::time::Instant;

pub async fn execute(config_path: Option<&Path>, package: &str, fresh: bool) -> Result<()> {
    let ctx = BuildContext::load(config_path).await?;
    ctx.prepare().await?;

    let package = packages::resolve(package, &ctx.settings)?;
    let builder = PackageBuilder::new(package.as_ref(), &ctx).await?;

    if fresh {
        builder.clean_installation().await;
    }

    println!(
        "Building {} {} ({})",
        package.name(),
        package.version(),
        builder.output_base_name()
    );
    let start = Instant::now();

    if let Err(e) = builder.build().await {
        log::error!("Build of {} failed: {}", builder.output_base_name(), e);
        if let Some(output) = e.command_output() {
            log::error!("Captured output:\n{}", output);
        }
        return Err(e);
    }

    let elapsed = start.elapsed();
    println!(
        "Built {} in {:.2}s, installed to {}",
        builder.output_base_name(),
        elapsed.as_secs_f64(),
        builder.install_directory().display()
    );
    log::info!(
        "Build of {} completed in {:.2}s",
        builder.output_base_name(),
        elapsed.as_secs_f64()
    );
    Ok(())
}
