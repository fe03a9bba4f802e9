use crate::cli::Cli;

/// Default build sequence when BUILD_CMD is not set
const DEFAULT_BUILD: &[&str] = &["cmake -S . -B build", "cmake --build build -j"];
/// Default test command when TEST_CMD is not set
const DEFAULT_TEST: &[&str] = &["ctest --test-dir build --output-on-failure"];

/// Default reviewer persona for the inference system role
const DEFAULT_SYSTEM_PROMPT: &str = "You are a senior software engineer reviewing CI output \
for a software project. Be concise and specific: identify root causes, point at the exact \
lines that matter, and suggest concrete fixes.";

/// Default file globs included in review-mode diffs
const DEFAULT_REVIEW_EXTS: &str = "*.c *.h *.cpp *.hpp *.cc *.cxx *.cu *.py *.sh *.cmake";

/// An external command to execute.
///
/// Plain commands are split into an argument vector so no shell ever
/// re-interprets them. Strings that use shell operators keep their shell
/// semantics via an explicit `sh -c` wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandSpec {
    Argv(Vec<String>),
    Shell(String),
}

/// Shell metacharacters that force `sh -c` execution
const SHELL_OPERATORS: &[char] = &['|', '&', ';', '<', '>', '$', '`', '(', ')'];

impl CommandSpec {
    /// Parse a raw command string into an argv or shell command
    pub fn parse(raw: &str) -> Self {
        if raw.chars().any(|c| SHELL_OPERATORS.contains(&c)) {
            return Self::Shell(raw.to_string());
        }
        match shell_words::split(raw) {
            Ok(argv) if !argv.is_empty() => Self::Argv(argv),
            // Unbalanced quotes or similar: let the shell have it
            _ => Self::Shell(raw.to_string()),
        }
    }
}

/// Immutable pipeline configuration, built once at startup.
///
/// Components receive this by reference; nothing reads the environment after
/// construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub setup: Option<CommandSpec>,
    pub build: Vec<CommandSpec>,
    pub test: Vec<CommandSpec>,
    pub system_prompt: String,
    pub review_exts: Vec<String>,
    pub model_path: String,
    pub server_bin: String,
    pub port: u16,
    pub context_size: u32,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let build = match &cli.build_cmd {
            Some(raw) => vec![CommandSpec::parse(raw)],
            None => DEFAULT_BUILD.iter().map(|s| CommandSpec::parse(s)).collect(),
        };
        let test = match &cli.test_cmd {
            Some(raw) => vec![CommandSpec::parse(raw)],
            None => DEFAULT_TEST.iter().map(|s| CommandSpec::parse(s)).collect(),
        };
        let review_exts = cli
            .review_exts
            .as_deref()
            .unwrap_or(DEFAULT_REVIEW_EXTS)
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        Self {
            setup: cli.setup_cmd.as_deref().map(CommandSpec::parse),
            build,
            test,
            system_prompt: cli
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            review_exts,
            model_path: cli.model_path.clone(),
            server_bin: cli.server_bin.clone(),
            port: cli.port,
            context_size: cli.context_size,
        }
    }

    /// Base URL of the inference server
    pub fn server_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_simple_argv() {
        let spec = CommandSpec::parse("cmake --build build -j");
        assert_eq!(
            spec,
            CommandSpec::Argv(vec![
                "cmake".into(),
                "--build".into(),
                "build".into(),
                "-j".into()
            ])
        );
    }

    #[test]
    fn test_parse_quoted_argument() {
        let spec = CommandSpec::parse("make -C \"my dir\"");
        assert_eq!(
            spec,
            CommandSpec::Argv(vec!["make".into(), "-C".into(), "my dir".into()])
        );
    }

    #[test]
    fn test_parse_shell_operators() {
        let spec = CommandSpec::parse("mkdir -p build && cd build && make");
        assert_eq!(
            spec,
            CommandSpec::Shell("mkdir -p build && cd build && make".into())
        );
    }

    #[test]
    fn test_parse_redirect_is_shell() {
        assert!(matches!(
            CommandSpec::parse("make 2>&1"),
            CommandSpec::Shell(_)
        ));
    }

    #[test]
    fn test_default_review_exts_count() {
        let cli = Cli::parse_from(["buildkeeper"]);
        let config = Config::from_cli(&cli);
        assert_eq!(config.review_exts.len(), 10);
    }

    #[test]
    fn test_default_commands() {
        let cli = Cli::parse_from(["buildkeeper"]);
        let config = Config::from_cli(&cli);
        assert_eq!(config.build.len(), 2);
        assert_eq!(config.test.len(), 1);
        assert!(config.setup.is_none());
        assert_eq!(config.port, 8012);
        assert_eq!(config.context_size, 4096);
        assert_eq!(config.model_path, "/models/model.gguf");
    }

    #[test]
    fn test_review_exts_comma_separated() {
        let cli = Cli::parse_from(["buildkeeper", "--review-exts", "*.rs,*.toml"]);
        let config = Config::from_cli(&cli);
        assert_eq!(config.review_exts, vec!["*.rs", "*.toml"]);
    }
}
