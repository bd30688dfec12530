//! Layered configuration: CLI flags and environment, config file, defaults.
//!
//! Environment variables reach us through clap (`env = ...`), so the layers
//! collapse to `args > file > defaults` here.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pdfharvest_core::{ExistingFilePolicy, PipelineConfig};
use tracing::debug;

use crate::cli::Args;

/// Values read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) max_retries: Option<u32>,
    pub(crate) backoff_base_ms: Option<u64>,
    pub(crate) concurrency: Option<usize>,
    pub(crate) on_existing: Option<ExistingFilePolicy>,
    pub(crate) run_timeout_secs: Option<u64>,
    pub(crate) browser_user_agent: Option<bool>,
}

/// Configuration after all layers were applied.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub(crate) pipeline: PipelineConfig,
    pub(crate) browser_user_agent: bool,
    /// Config file that contributed values, if any.
    pub(crate) config_path: Option<PathBuf>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/pdfharvest/config.toml`
/// 2. `$HOME/.config/pdfharvest/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("pdfharvest")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("pdfharvest")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Builds the effective configuration for this run.
///
/// An explicit `--config` path must exist; the default location is optional.
pub(crate) fn resolve_config(args: &Args) -> Result<ResolvedConfig> {
    let (config_path, file) = match args.config.as_deref() {
        Some(path) => (Some(path.to_path_buf()), load_file_config(path)?),
        None => match resolve_default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                let file = load_file_config(&path)?;
                (Some(path), file)
            }
            None => (None, FileConfig::default()),
        },
    };

    if let Some(path) = &config_path {
        debug!(path = %path.display(), ?file, "loaded config file");
    }

    let pipeline = merge(args, &file);
    pipeline.validate().context("Invalid configuration")?;

    Ok(ResolvedConfig {
        pipeline,
        browser_user_agent: args.browser_user_agent || file.browser_user_agent.unwrap_or(false),
        config_path,
    })
}

/// Applies `args` over `file` over the built-in defaults.
pub(crate) fn merge(args: &Args, file: &FileConfig) -> PipelineConfig {
    let mut config = PipelineConfig::default();

    if let Some(dir) = args.output_dir.clone().or_else(|| file.output_dir.clone()) {
        config.output_dir = dir;
    }
    if let Some(concurrency) = args
        .concurrency
        .map(usize::from)
        .or(file.concurrency)
    {
        config.concurrency = concurrency;
    }
    if let Some(policy) = args.on_existing.or(file.on_existing) {
        config.on_existing = policy;
    }
    if let Some(secs) = args.run_timeout.or(file.run_timeout_secs) {
        config.run_timeout = Some(Duration::from_secs(secs));
    }
    if let Some(secs) = args.timeout.or(file.timeout_secs) {
        config.fetch.timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = args.max_retries.or(file.max_retries) {
        config.fetch.max_retries = retries;
    }
    if let Some(ms) = args.backoff_base_ms.or(file.backoff_base_ms) {
        config.fetch.backoff_base = Duration::from_millis(ms);
    }

    config
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "timeout_secs" => {
                cfg.timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.max_retries = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))?,
                );
            }
            "backoff_base_ms" => {
                cfg.backoff_base_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.concurrency = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("concurrency out of range for usize"))?,
                );
            }
            "on_existing" => {
                let label = parse_string_literal(value).with_context(invalid)?;
                cfg.on_existing = Some(label.parse::<ExistingFilePolicy>().with_context(invalid)?);
            }
            "run_timeout_secs" => {
                cfg.run_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "browser_user_agent" => {
                cfg.browser_user_agent = Some(parse_boolean(value).with_context(invalid)?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["pdfharvest"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/tmp/papers"
timeout_secs = 60
max_retries = 5
backoff_base_ms = 250
concurrency = 4
on_existing = "overwrite"
run_timeout_secs = 600
browser_user_agent = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/papers")));
        assert_eq!(cfg.timeout_secs, Some(60));
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.backoff_base_ms, Some(250));
        assert_eq!(cfg.concurrency, Some(4));
        assert_eq!(cfg.on_existing, Some(ExistingFilePolicy::Overwrite));
        assert_eq!(cfg.run_timeout_secs, Some(600));
        assert_eq!(cfg.browser_user_agent, Some(true));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            "# defaults for the lab machine\nconcurrency = 2 # be gentle\noutput_dir = \"a#b\"\n",
        )
        .unwrap();
        assert_eq!(cfg.concurrency, Some(2));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("a#b")));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("rate_limit = 5").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("concurrency 4").unwrap_err();
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_parse_config_rejects_bad_values() {
        assert!(parse_config_str("timeout_secs = -1").is_err());
        assert!(parse_config_str("timeout_secs = 10s").is_err());
        assert!(parse_config_str("output_dir = unquoted").is_err());
        assert!(parse_config_str("on_existing = \"merge\"").is_err());
        assert!(parse_config_str("browser_user_agent = yes").is_err());
    }

    #[test]
    fn test_merge_defaults_when_nothing_set() {
        let config = merge(&args(&[]), &FileConfig::default());
        let defaults = PipelineConfig::default();
        assert_eq!(config.concurrency, defaults.concurrency);
        assert_eq!(config.on_existing, ExistingFilePolicy::Skip);
        assert_eq!(config.run_timeout, None);
    }

    #[test]
    fn test_merge_file_fills_unset_flags() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("from-file")),
            concurrency: Some(6),
            backoff_base_ms: Some(10),
            ..FileConfig::default()
        };
        let config = merge(&args(&["-o", "from-cli"]), &file);
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.fetch.backoff_base, Duration::from_millis(10));
    }

    #[test]
    fn test_merge_cli_wins_over_file() {
        let file = FileConfig {
            timeout_secs: Some(90),
            max_retries: Some(7),
            on_existing: Some(ExistingFilePolicy::Overwrite),
            ..FileConfig::default()
        };
        let config = merge(
            &args(&["-t", "5", "-r", "2", "--on-existing", "skip"]),
            &file,
        );
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.on_existing, ExistingFilePolicy::Skip);
    }

    #[test]
    fn test_out_of_range_file_value_fails_validation() {
        let file = FileConfig {
            concurrency: Some(64),
            ..FileConfig::default()
        };
        assert!(merge(&args(&[]), &file).validate().is_err());
    }
}
