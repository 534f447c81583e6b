use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::settings::{AdvancePolicy, EngineSettings, Timing};
use crate::scheduler::rescan::SchedulerConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "job-autofill",
    version,
    about = "Detects job-application forms and fills them from an answer service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Answer service endpoint (overrides the config file)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Path to config file (default: job-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect application forms in an HTML file and print them as JSON
    Detect {
        /// HTML file to scan
        #[arg(long)]
        html: String,

        /// URL the page was loaded from
        #[arg(long, default_value = "https://localhost/")]
        url: String,
    },

    /// Run one retry-aware autofill session against an HTML file
    Fill {
        /// HTML file to fill
        #[arg(long)]
        html: String,

        /// URL the page was loaded from
        #[arg(long, default_value = "https://localhost/")]
        url: String,

        /// YAML map of label (or field id) to answer; replaces the HTTP service
        #[arg(long)]
        answers: Option<String>,

        /// Write the filled page here
        #[arg(short, long)]
        out: Option<String>,

        /// Click a safe next-step control when every required field resolves
        #[arg(long, default_value_t = false)]
        advance: bool,
    },

    /// Answer host commands as NDJSON on stdin/stdout
    Serve {
        /// Start with automatic filling enabled
        #[arg(long, default_value_t = false)]
        auto: bool,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `job-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub answer_service: AnswerServiceConfig,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub advance: AdvancePolicy,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub min_confidence: f32,
    pub store_path: Option<String>,
    pub trace_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerServiceConfig {
    pub endpoint: Option<String>,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user_id: default_user_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Serde default helpers
fn default_user_id() -> String { "anonymous".to_string() }
fn default_timeout_secs() -> u64 { 30 }

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            user_id: self.answer_service.user_id.clone(),
            min_confidence: self.min_confidence,
            timing: self.timing.clone(),
            advance: self.advance.clone(),
        }
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("job-autofill.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "Malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}
