//! Startup configuration, resolved once from the environment and passed down.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use studio_core::FlowKind;
use studio_engine::{
    ApiSettings, AutosaveSettings, EngineConfig, OperationSettings, DEFAULT_API_BASE_URL,
};

pub const ENV_API_BASE_URL: &str = "STUDIO_API_BASE_URL";
pub const ENV_DATA_DIR: &str = "STUDIO_DATA_DIR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "STUDIO_REQUEST_TIMEOUT_SECS";
const DEFAULT_DATA_DIR: &str = "./.studio";

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub initial_flow: FlowKind,
    pub request_timeout: Option<Duration>,
    pub autosave: AutosaveSettings,
}

impl StudioConfig {
    pub fn from_env(flow_arg: Option<String>) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), flow_arg.as_deref())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        flow_arg: Option<&str>,
    ) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_base_url = non_empty(ENV_API_BASE_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let data_dir = PathBuf::from(
            non_empty(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let export_dir = data_dir.join("exports");

        let initial_flow = match flow_arg {
            Some(raw) => raw.parse().map_err(|err: String| anyhow!(err))?,
            None => FlowKind::default(),
        };

        let request_timeout = match non_empty(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().with_context(|| {
                    format!("{ENV_REQUEST_TIMEOUT_SECS} must be whole seconds, got {raw:?}")
                })?;
                Some(Duration::from_secs(secs.max(1)))
            }
            None => None,
        };

        Ok(Self {
            api_base_url,
            data_dir,
            export_dir,
            initial_flow,
            request_timeout,
            autosave: AutosaveSettings::default(),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            api: ApiSettings {
                base_url: self.api_base_url.clone(),
                request_timeout: self.request_timeout,
                ..ApiSettings::default()
            },
            data_dir: self.data_dir.clone(),
            export_dir: self.export_dir.clone(),
            autosave: self.autosave.clone(),
            operation: OperationSettings::default(),
        }
    }
}
