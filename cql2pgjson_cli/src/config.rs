// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use cql2pgjson::{Configuration, ForeignKeyMode};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::utils::absolute_path;

const CONFIG_FILE_NAME: &str = "cql2pgjson.toml";

const ENV_PREFIX: &str = "CQL2PGJSON_";

const DEFAULT_LOG_LEVEL: &str = "off";

const DEFAULT_FIELD: &str = "jsonb";

pub type ConfigFilePath = Option<PathBuf>;

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

/// Translator settings which can be de/serialized from a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Log verbosity: ERROR, WARN, INFO, DEBUG or TRACE, scoped to "cql2pgjson".
    ///
    /// Use a filter value like "=TRACE" or "cql2pgjson=DEBUG" to change the scope.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Table the query runs against.
    #[serde(default)]
    pub table: Option<String>,

    /// JSONB column of the table holding the documents, defaults to "jsonb".
    #[serde(default = "default_field")]
    pub field: String,

    /// Path to the JSON schema file describing tables, indexes and foreign keys.
    #[serde(default)]
    pub db_schema: Option<PathBuf>,

    /// Indexes searched by terms without an index.
    #[serde(default)]
    pub server_choice: Vec<String>,

    /// Allow search terms to compare against values of other tables, for example
    /// `tableaId == tablea.id`.
    #[serde(default)]
    pub permissive_foreign_keys: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            table: None,
            field: default_field(),
            db_schema: None,
            server_choice: Vec::new(),
            permissive_foreign_keys: false,
        }
    }
}

impl TryFrom<ConfigFile> for Configuration {
    type Error = anyhow::Error;

    fn try_from(value: ConfigFile) -> Result<Self, Self::Error> {
        let table = match value.table {
            Some(table) if !table.trim().is_empty() => table,
            _ => bail!("No table given, set it with '--table' or in the config file"),
        };

        let db_schema_path = match value.db_schema {
            Some(path) => Some(absolute_path(path)?),
            None => None,
        };

        let foreign_key_mode = if value.permissive_foreign_keys {
            ForeignKeyMode::Permissive
        } else {
            ForeignKeyMode::Strict
        };

        Ok(Configuration {
            document_columns: vec![format!("{}.{}", table.trim(), value.field.trim())],
            server_choice_indexes: value.server_choice,
            db_schema_path,
            foreign_key_mode,
        })
    }
}

/// Command line arguments.
///
/// Options are not serialized to Figment when they're None, so that unset arguments don't
/// overwrite values from the config file or environment.
#[derive(Parser, Serialize, Debug)]
#[command(
    name = "cql2pgjson",
    about = "Compile CQL queries into SQL for PostgreSQL tables with JSONB documents",
    long_about = None,
    version
)]
pub struct Cli {
    /// Path to an optional "cql2pgjson.toml" file for further configuration.
    ///
    /// When not set the program looks for it in the current folder and then in the XDG config
    /// directory ("$HOME/.config/cql2pgjson/cql2pgjson.toml" on Linux).
    #[arg(short = 'c', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,

    /// Table the query runs against.
    #[arg(short = 't', long, value_name = "TABLE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<String>,

    /// JSONB column holding the documents. Defaults to "jsonb".
    #[arg(short = 'f', long, value_name = "FIELD")]
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,

    /// Path to the JSON file describing tables, indexes and foreign keys.
    #[arg(short = 'b', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    db_schema: Option<PathBuf>,

    /// Index searched by terms without an index, repeat for more than one.
    #[arg(short = 's', long, value_name = "INDEX")]
    #[serde(skip_serializing_if = "Option::is_none")]
    server_choice: Option<Vec<String>>,

    /// Allow search terms qualified with a table name to compare against that table.
    #[arg(
        long,
        value_name = "BOOL",
        default_missing_value = "true",
        num_args = 0..=1,
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    permissive_foreign_keys: Option<bool>,

    /// Log verbosity, for example "debug" to see the SQL generated for every search clause.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,

    /// CQL query, for example 'title all "dogs cats" sortBy date/sort.descending'.
    #[arg(value_name = "QUERY")]
    #[serde(skip)]
    pub query: String,
}

/// Get configuration from 1. .toml file, 2. environment variables prefixed with "CQL2PGJSON_" and
/// 3. command line arguments (in that order, later sources take precedence).
pub fn load_config(cli: &Cli) -> Result<(ConfigFilePath, ConfigFile)> {
    let config_file_path: ConfigFilePath = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file '{}' does not exist", path.display());
            }

            Some(path.clone())
        }
        None => try_determine_config_file_path(),
    };

    let mut figment = Figment::from(Serialized::defaults(ConfigFile::default()));
    if let Some(path) = &config_file_path {
        figment = figment.merge(Toml::file(path));
    }

    let config = figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()?;

    Ok((config_file_path, config))
}

fn try_determine_config_file_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(mut current_dir) = std::env::current_dir() {
        current_dir.push(CONFIG_FILE_NAME);
        candidates.push(current_dir);
    }

    if let Some(project_dirs) = ProjectDirs::from("", "", "cql2pgjson") {
        candidates.push(project_dirs.config_dir().join(CONFIG_FILE_NAME));
    }

    candidates.into_iter().find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;
    use std::path::PathBuf;

    use clap::Parser;
    use cql2pgjson::{Configuration, ForeignKeyMode};
    use figment::Jail;

    use super::{load_config, Cli, ConfigFile};

    #[test]
    fn defaults() {
        Jail::expect_with(|_| {
            let cli = Cli::parse_from(["cql2pgjson", "-t", "users", "name = x"]);
            let (path, config) = load_config(&cli).unwrap();

            assert!(path.is_none());
            assert_eq!(cli.query, "name = x");
            assert_eq!(config.table.as_deref(), Some("users"));
            assert_eq!(config.field, "jsonb");
            assert_eq!(config.log_level, "off");
            assert!(config.server_choice.is_empty());
            assert!(!config.permissive_foreign_keys);

            Ok(())
        });
    }

    #[test]
    fn merge_config_file_env_and_arguments() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cql2pgjson.toml",
                r#"
                table = "instance"
                field = "doc"
                server_choice = ["title"]
                log_level = "debug"
                "#,
            )?;
            jail.set_env("CQL2PGJSON_FIELD", "jsonb");
            jail.set_env("CQL2PGJSON_PERMISSIVE_FOREIGN_KEYS", "true");

            let cli = Cli::parse_from([
                "cql2pgjson",
                "-s",
                "title",
                "-s",
                "contributors",
                "--log-level",
                "warn",
                "cat",
            ]);
            let (path, config) = load_config(&cli).unwrap();

            assert!(path.is_some());
            assert_eq!(config.table.as_deref(), Some("instance"));
            assert_eq!(config.field, "jsonb");
            assert_eq!(config.server_choice, vec!["title", "contributors"]);
            assert_eq!(config.log_level, "warn");
            assert!(config.permissive_foreign_keys);

            Ok(())
        });
    }

    #[test]
    fn missing_config_file() {
        Jail::expect_with(|_| {
            let cli = Cli::parse_from(["cql2pgjson", "-c", "missing.toml", "cat"]);
            assert!(load_config(&cli).is_err());

            Ok(())
        });
    }

    #[test]
    fn into_configuration() {
        let config = Configuration::try_from(ConfigFile {
            table: Some("users".into()),
            db_schema: Some(PathBuf::from("/etc/cql2pgjson/schema.json")),
            server_choice: vec!["name".into()],
            permissive_foreign_keys: true,
            ..ConfigFile::default()
        })
        .unwrap();

        assert_eq!(config.document_columns, vec!["users.jsonb"]);
        assert_eq!(config.server_choice_indexes, vec!["name"]);
        assert_eq!(
            config.db_schema_path,
            Some(PathBuf::from("/etc/cql2pgjson/schema.json"))
        );
        assert_eq!(config.foreign_key_mode, ForeignKeyMode::Permissive);
    }

    #[test]
    fn table_is_required() {
        let result = Configuration::try_from(ConfigFile::default());

        assert_eq!(
            result.unwrap_err().to_string(),
            "No table given, set it with '--table' or in the config file"
        );
    }
}
