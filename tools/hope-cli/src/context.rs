//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};

use hope_cache::{Cache, FileStore, IdempotencyKeys};
use hope_commerce::api::ApiClient;
use hope_commerce::cart::CartStore;
use hope_commerce::checkout::CheckoutFlow;
use hope_data::{FetchClient, ReqwestTransport};

use crate::config::{CliConfig, CONFIG_FILE_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => (CliConfig::load(path)?, Some(PathBuf::from(path))),
            // Try to find config in current directory or parent directories
            None => match find_config(&cwd) {
                Some(path) => (CliConfig::load(&path)?, Some(path)),
                None => (CliConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Open the local store holding the cart and idempotency records.
    pub fn cache(&self) -> Result<Cache> {
        let path = self.resolve_path(&self.config.storage.path);
        let store = FileStore::open(&path)
            .with_context(|| format!("Failed to open storage at {}", path.display()))?;
        self.output
            .debug(&format!("Using storage {}", path.display()));
        Ok(Cache::new(store))
    }

    /// Build an API client from the `[api]` section.
    pub fn api(&self) -> Result<ApiClient> {
        let transport =
            ReqwestTransport::with_timeout(Duration::from_secs(self.config.api.timeout_secs))
                .context("Failed to create HTTP client")?;
        let http = FetchClient::with_transport(Arc::new(transport))
            .with_base_url(self.config.api.base_url.clone());

        let api = ApiClient::new(http);
        Ok(match &self.config.api.token {
            Some(token) => api.with_bearer_token(token.clone()),
            None => api,
        })
    }

    /// Open the persisted cart.
    pub fn cart(&self, cache: &Cache) -> Result<CartStore> {
        CartStore::open(cache.clone()).context("Failed to load cart")
    }

    /// A checkout flow over `api` keyed by the configured order context.
    pub fn checkout(&self, api: ApiClient, cache: &Cache) -> CheckoutFlow {
        CheckoutFlow::new(Arc::new(api), IdempotencyKeys::new(cache.clone()))
            .with_order_context(self.config.checkout.order_context.clone())
    }
}

/// Find a config file in `start` or its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
