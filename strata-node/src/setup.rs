use std::fs;
use std::path::Path;

use strata_common::Result;
use tracing::info;

use crate::config::NodeConfig;

/// Loads the config at `path`, writing the default one first if it does not exist.
pub fn ensure_config<P: AsRef<Path>>(path: P) -> Result<NodeConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("⚠️ Config não encontrada. Gerando padrão em {}...", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        NodeConfig::default().save_to_file(path)?;
        info!("✅ Config gerada com sucesso!");
    }
    NodeConfig::load_from_file(path)
}
