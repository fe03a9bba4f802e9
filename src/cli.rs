use clap::{Parser, ValueEnum};

// Display order for pipeline command options (placed at top of help text)
const COMMAND_DISPLAY_ORDER: usize = 0;
// Display order for inference server options
const SERVER_DISPLAY_ORDER: usize = 50;
// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// Pipeline run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Build and test; analyze only when something failed or warned
    Auto,
    /// Build and test, then always review the latest commit's diff
    Review,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Review => "review",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "buildkeeper", version, about = "Build-test-analyze pipeline with local LLM diagnostics", long_about = None)]
pub struct Cli {
    /// Run mode
    #[arg(value_enum, default_value_t = Mode::Auto)]
    pub mode: Mode,

    /// Build command (default: cmake configure + build)
    #[arg(long, env = "BUILD_CMD", display_order = COMMAND_DISPLAY_ORDER)]
    pub build_cmd: Option<String>,

    /// Test command (default: ctest)
    #[arg(long, env = "TEST_CMD", display_order = COMMAND_DISPLAY_ORDER)]
    pub test_cmd: Option<String>,

    /// Command to run once before the build
    #[arg(long, env = "BUILD_SETUP_CMD", display_order = COMMAND_DISPLAY_ORDER)]
    pub setup_cmd: Option<String>,

    /// System role content for the inference request
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Space- or comma-separated file globs included in review-mode diffs
    #[arg(long, env = "REVIEW_EXTS")]
    pub review_exts: Option<String>,

    /// Model file passed to the inference server
    #[arg(
        long,
        env = "MODEL_PATH",
        default_value = "/models/model.gguf",
        display_order = SERVER_DISPLAY_ORDER
    )]
    pub model_path: String,

    /// Inference server binary
    #[arg(
        long,
        env = "LLAMA_SERVER_BIN",
        default_value = "llama-server",
        display_order = SERVER_DISPLAY_ORDER
    )]
    pub server_bin: String,

    /// Inference server bind port
    #[arg(
        long,
        env = "LLAMA_PORT",
        default_value_t = 8012,
        display_order = SERVER_DISPLAY_ORDER
    )]
    pub port: u16,

    /// Inference server context window size
    #[arg(
        long,
        env = "CONTEXT_SIZE",
        default_value_t = 4096,
        display_order = SERVER_DISPLAY_ORDER
    )]
    pub context_size: u32,

    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: BUILDKEEPER_LOG=] [default: info]
    #[arg(
        long,
        env = "BUILDKEEPER_LOG",
        default_value = "info",
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_auto() {
        let cli = Cli::parse_from(["buildkeeper"]);
        assert_eq!(cli.mode, Mode::Auto);
    }

    #[test]
    fn test_positional_review_mode() {
        let cli = Cli::parse_from(["buildkeeper", "review"]);
        assert_eq!(cli.mode, Mode::Review);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["buildkeeper", "deploy"]).is_err());
    }
}
