use crate::build::layout::Layout;
use crate::build::platform::Platform;
use crate::config::Settings;
use crate::result::Result;
use std::path::Path;

/// Settings, platform and layout, computed once per run and borrowed by every builder.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub settings: Settings,
    pub platform: Platform,
    pub layout: Layout,
}

impl BuildContext {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let settings = Settings::load(config_path).await?;
        let platform = Platform::detect().await?;
        let layout = Layout::resolve(&platform, &settings);
        Ok(Self {
            settings,
            platform,
            layout,
        })
    }

    pub fn new(settings: Settings, platform: Platform, layout: Layout) -> Self {
        Self {
            settings,
            platform,
            layout,
        }
    }

    /// Create the base directories; called once before any package work.
    pub async fn prepare(&self) -> Result<()> {
        self.layout.prepare(&self.platform, &self.settings).await
    }
}
