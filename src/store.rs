//! Record-store construction from configuration.

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;

use sensemaker_core::store::RecordStore;

use crate::config::Config;
use crate::store_file::FileStore;
use crate::store_rest::RestStore;

/// Open the store named by `[store].kind`.
pub fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.store.kind.as_str() {
        "rest" => Ok(Arc::new(RestStore::from_config(&config.store)?)),
        "file" => {
            let dir = config
                .store
                .dir
                .clone()
                .ok_or_else(|| anyhow!("store.dir required for kind 'file'"))?;
            Ok(Arc::new(FileStore::new(dir)))
        }
        other => bail!("Unknown store kind: '{}'", other),
    }
}
