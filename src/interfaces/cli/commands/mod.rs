mod config_gen;
mod links;
mod simulate;

pub use config_gen::config_generate;
pub use links::{issue_link, resolve_link};
pub use simulate::simulate_visit;

use crate::config::get_config;
use crate::registry::LinkRegistry;
use crate::runtime::lifetime::startup::build_registry;

use super::CliError;

/// 按当前配置打开注册表
async fn open_registry() -> Result<LinkRegistry, CliError> {
    let config = get_config();
    let registry = build_registry(&config).await?;
    if registry.backend_name() == "memory" {
        eprintln!(
            "note: registry.store is \"memory\"; links issued from the CLI are not persisted"
        );
    }
    Ok(registry)
}
