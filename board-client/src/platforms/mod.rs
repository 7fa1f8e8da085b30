pub mod ashby;
pub mod greenhouse;
pub mod lever;
pub mod workable;

pub use ashby::AshbyAdapter;
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
pub use workable::WorkableAdapter;

use crate::adapter::PlatformAdapter;
use crate::proxy::ProxyPool;
use jobscout_core::{AppConfig, CoreError, Platform};
use std::sync::Arc;

/// The production adapter for `platform`.
pub fn build_adapter(
    platform: Platform,
    config: &AppConfig,
    proxies: Option<Arc<ProxyPool>>,
) -> Result<Arc<dyn PlatformAdapter>, CoreError> {
    Ok(match platform {
        Platform::Ashby => Arc::new(AshbyAdapter::new(config, proxies)?),
        Platform::Greenhouse => Arc::new(GreenhouseAdapter::new(config, proxies)?),
        Platform::Lever => Arc::new(LeverAdapter::new(config, proxies)?),
        Platform::Workable => Arc::new(WorkableAdapter::new(config, proxies)?),
    })
}
