//! Built-in tools for Stepwise.
//!
//! The tool set is closed: [`BuiltinTool`] names every tool the agent can
//! call, and [`ToolRegistry::invoke`] dispatches with an exhaustive match.
//! Tools never fail toward the loop. Whatever happens inside a tool comes
//! back as a readable result string; the only error is an unknown name.

pub mod create_file;
pub mod files;
pub mod weather;

use std::path::PathBuf;
use std::time::Duration;

use stepwise_config::ToolsConfig;
use stepwise_core::error::ToolError;
use tracing::debug;

pub use files::{CreatedFile, CreatedFiles};

/// Every tool the agent can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    GetWeather,
    CreateFile,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 2] = [BuiltinTool::GetWeather, BuiltinTool::CreateFile];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::GetWeather => "get_weather",
            BuiltinTool::CreateFile => "create_file",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuiltinTool::GetWeather => "Get the current weather for a city. Input: the city name.",
            BuiltinTool::CreateFile => {
                "Create a text file. Input: filename|content (split on the first '|')."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Runtime settings for the built-in tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Directory `create_file` writes into
    pub workspace_dir: PathBuf,
    pub weather_url: String,
    pub weather_format: String,
    pub weather_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from(&ToolsConfig::default())
    }
}

impl From<&ToolsConfig> for ToolSettings {
    fn from(config: &ToolsConfig) -> Self {
        Self {
            workspace_dir: config.workspace_dir.clone(),
            weather_url: config.weather_url.clone(),
            weather_format: config.weather_format.clone(),
            weather_timeout: Duration::from_secs(config.weather_timeout_secs),
        }
    }
}

/// The set of tools enabled for a loop, plus what they need to run.
pub struct ToolRegistry {
    tools: Vec<BuiltinTool>,
    settings: ToolSettings,
    client: reqwest::Client,
}

impl ToolRegistry {
    /// A registry with every built-in tool enabled.
    pub fn new(settings: ToolSettings) -> Self {
        Self::with_tools(settings, BuiltinTool::ALL.to_vec())
    }

    /// A registry with only `tools` enabled, in the given order.
    pub fn with_tools(settings: ToolSettings, tools: Vec<BuiltinTool>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.weather_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            tools,
            settings,
            client,
        }
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn tools(&self) -> &[BuiltinTool] {
        &self.tools
    }

    /// Look up an enabled tool by name.
    pub fn get(&self, name: &str) -> Option<BuiltinTool> {
        BuiltinTool::from_name(name).filter(|t| self.tools.contains(t))
    }

    /// Render the tool list for the system instruction.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke a tool by name.
    ///
    /// `Err` only when no enabled tool has that name; every other outcome
    /// is in the returned string.
    pub async fn invoke(
        &self,
        name: &str,
        input: &str,
        ledger: &mut CreatedFiles,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(tool = tool.name(), input_len = input.len(), "Invoking tool");

        let result = match tool {
            BuiltinTool::GetWeather => {
                weather::get_weather(
                    &self.client,
                    &self.settings.weather_url,
                    &self.settings.weather_format,
                    input,
                )
                .await
            }
            BuiltinTool::CreateFile => {
                create_file::create_file(&self.settings.workspace_dir, input, ledger).await
            }
        };

        Ok(result)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolSettings::default())
    }
}
