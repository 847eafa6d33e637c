//! Configuration: CLI arguments, optional TOML settings file, defaults.
//!
//! Rules can come from three places, in precedence order:
//!
//! 1. positional CLI arguments,
//! 2. the `rules` array of the TOML file named by `--config`,
//! 3. the built-in defaults (Ctrl and CapsLock tapped alone emit Escape).
//!
//! The debounce timeout follows the same ladder: `--timeout` beats the
//! file's `timeout_ms` beats the 1000 ms default.
//!
//! Every configuration problem — unreadable file, bad TOML, unparseable
//! rule, empty effective rule set — is fatal here, before any device is
//! opened, and echoes the offending input.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use tapkey_core::{Rule, RuleParseError};

/// Rules applied when neither the CLI nor the settings file supplies any.
pub const DEFAULT_RULES: &[&str] = &[
    "press:leftctrl,release:leftctrl=press:esc,release:esc",
    "press:capslock,release:capslock=press:esc,release:esc",
];

/// Default debounce timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Command-line interface of `tapkeyd`.
#[derive(Debug, Parser)]
#[command(
    name = "tapkeyd",
    about = "Remap rapid keystroke gestures system-wide via a virtual keyboard",
    after_help = "Rule syntax: press:leftctrl,release:leftctrl=press:esc,release:esc"
)]
pub struct Cli {
    /// Remap rules (pattern-list=action-list); defaults apply when omitted.
    #[arg(value_name = "RULE")]
    pub rules: Vec<String>,

    /// Maximum gap between consecutive keystrokes of a gesture, in
    /// milliseconds.
    #[arg(long, value_name = "MILLIS")]
    pub timeout: Option<u64>,

    /// Optional TOML settings file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// On-disk settings schema.
///
/// ```toml
/// timeout_ms = 750
/// rules = [
///     "press:capslock,release:capslock=press:esc,release:esc",
/// ]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    /// Absent key: fall back to the defaults.  Present but empty: a
    /// configuration error (an explicitly empty rule set is never what the
    /// user meant).
    pub rules: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid rule {rule:?}: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RuleParseError,
    },

    /// The settings file supplied `rules = []` and the CLI added none.
    #[error("no rules configured")]
    NoRules,
}

/// Fully resolved runtime settings.
#[derive(Debug)]
pub struct Settings {
    pub rules: Vec<Rule>,
    pub timeout: Duration,
}

impl Settings {
    /// Resolves settings from the CLI, loading the settings file if one
    /// was named.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable or invalid input; all
    /// variants are fatal at startup.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => Some(load_file(path)?),
            None => None,
        };
        resolve_parts(&cli.rules, cli.timeout, file)
    }
}

fn load_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pure precedence logic, separated from file I/O for testability.
fn resolve_parts(
    cli_rules: &[String],
    cli_timeout: Option<u64>,
    file: Option<FileSettings>,
) -> Result<Settings, ConfigError> {
    let file = file.unwrap_or_default();

    let rule_strings: Vec<String> = if !cli_rules.is_empty() {
        cli_rules.to_vec()
    } else {
        match file.rules {
            Some(rules) if rules.is_empty() => return Err(ConfigError::NoRules),
            Some(rules) => rules,
            None => DEFAULT_RULES.iter().map(|s| s.to_string()).collect(),
        }
    };

    let rules = rule_strings
        .iter()
        .map(|s| {
            Rule::parse(s).map_err(|source| ConfigError::Rule {
                rule: s.clone(),
                source,
            })
        })
        .collect::<Result<Vec<Rule>, ConfigError>>()?;

    let timeout_ms = cli_timeout
        .or(file.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    Ok(Settings {
        rules,
        timeout: Duration::from_millis(timeout_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_cli_or_file() {
        let settings = resolve_parts(&[], None, None).expect("defaults must resolve");
        assert_eq!(settings.rules.len(), DEFAULT_RULES.len());
        assert_eq!(settings.timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_cli_rules_override_file_rules() {
        let file = FileSettings {
            rules: Some(vec![
                "press:capslock,release:capslock=press:esc,release:esc".to_string(),
            ]),
            timeout_ms: None,
        };
        let cli_rules = vec!["press:f1,release:f1=press:esc,release:esc".to_string()];

        let settings =
            resolve_parts(&cli_rules, None, Some(file)).expect("cli rules must resolve");

        assert_eq!(settings.rules.len(), 1);
        // KEY_F1 = 59 appears in the pattern, proving the CLI rule won.
        assert_eq!(settings.rules[0].patterns()[0].code.code(), 59);
    }

    #[test]
    fn test_cli_timeout_overrides_file_timeout() {
        let file = FileSettings {
            rules: None,
            timeout_ms: Some(250),
        };
        let settings = resolve_parts(&[], Some(400), Some(file)).expect("must resolve");
        assert_eq!(settings.timeout, Duration::from_millis(400));
    }

    #[test]
    fn test_file_timeout_applies_when_cli_silent() {
        let file = FileSettings {
            rules: None,
            timeout_ms: Some(250),
        };
        let settings = resolve_parts(&[], None, Some(file)).expect("must resolve");
        assert_eq!(settings.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_explicitly_empty_rule_set_is_fatal() {
        let file = FileSettings {
            rules: Some(Vec::new()),
            timeout_ms: None,
        };
        let err = resolve_parts(&[], None, Some(file)).unwrap_err();
        assert!(matches!(err, ConfigError::NoRules));
    }

    #[test]
    fn test_bad_rule_is_fatal_and_echoed() {
        let cli_rules = vec!["press:nosuchkey=press:esc".to_string()];
        let err = resolve_parts(&cli_rules, None, None).unwrap_err();
        assert!(err.to_string().contains("press:nosuchkey=press:esc"));
    }

    #[test]
    fn test_settings_file_parses() {
        let file: FileSettings = toml::from_str(
            r#"
            timeout_ms = 750
            rules = ["press:capslock,release:capslock=press:esc,release:esc"]
            "#,
        )
        .expect("valid TOML must parse");
        assert_eq!(file.timeout_ms, Some(750));
        assert_eq!(file.rules.map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_settings_file_rejects_bad_toml() {
        let result: Result<FileSettings, _> = toml::from_str("rules = 5");
        assert!(result.is_err());
    }
}
