//! Configuration file loading and validation
//!
//! The configuration is a small YAML mapping holding the Slack bot token and
//! the default user to invite. Validation is deliberately explicit so that a
//! broken file produces a message naming exactly what is wrong with it.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing or unreadable
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not parseable YAML
    #[error("configuration is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The top-level document is something other than a mapping
    #[error("configuration must be a mapping, found {0}")]
    NotAMapping(&'static str),

    /// A required field is absent
    #[error("no {0} found in the configuration")]
    MissingField(&'static str),

    /// A field holds the wrong type of value
    #[error("the {field} must be a string, found {found}")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    /// The token is not a bot token
    #[error("the token does not appear to be a bot token")]
    NotABotToken,
}

/// Validated configuration for the tool
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack bot token used for all API calls
    pub token: String,
    /// User to invite when none is named on the command line
    pub user: String,
}

/// Loads, validates, and returns the configuration file at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let document: serde_yaml::Value = serde_yaml::from_str(&raw)?;
    if !document.is_mapping() {
        return Err(ConfigError::NotAMapping(type_name(&document)));
    }

    let token = string_field(&document, "token")?;
    if !token.starts_with("xoxb-") {
        return Err(ConfigError::NotABotToken);
    }
    let user = string_field(&document, "user")?;

    Ok(Config { token, user })
}

/// Extracts a required string field from the configuration document.
fn string_field(
    document: &serde_yaml::Value,
    field: &'static str,
) -> Result<String, ConfigError> {
    let value = document.get(field).ok_or(ConfigError::MissingField(field))?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::WrongType {
            field,
            found: type_name(value),
        })
}

/// Names a YAML value's type the way the error messages spell it.
fn type_name(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
