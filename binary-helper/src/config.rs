use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::Config;
use crate::logging::Mode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level filter, any `EnvFilter` directive is accepted
	pub level: String,

	/// The output format
	pub mode: Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_owned(),
			mode: Mode::Default,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
	/// Path to the PEM encoded certificate chain
	pub cert: String,

	/// Path to the PEM encoded PKCS#8 private key
	pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound = "")]
pub struct AppConfig<T: ConfigExtention> {
	/// The name of the application
	pub name: String,

	/// The path to the config file
	pub config_file: Option<String>,

	/// The logging configuration
	pub logging: LoggingConfig,

	#[serde(flatten)]
	pub extra: T,

	#[serde(skip)]
	pub ignored_keys: Vec<String>,
}

pub trait ConfigExtention: Serialize + DeserializeOwned + Default {
	const APP_NAME: &'static str;

	/// Environment variables named `{ENV_PREFIX}_{PATH}` override config keys.
	const ENV_PREFIX: &'static str;

	fn config_default() -> AppConfig<Self> {
		AppConfig {
			name: Self::APP_NAME.to_owned(),
			config_file: Some("config".to_owned()),
			logging: Default::default(),
			extra: Self::default(),
			ignored_keys: Vec::new(),
		}
	}

	fn pre_hook(_config: &mut AppConfig<Self>) -> anyhow::Result<()> {
		Ok(())
	}
}

impl<T: ConfigExtention> Default for AppConfig<T> {
	fn default() -> Self {
		T::config_default()
	}
}

impl<T: ConfigExtention> Config for AppConfig<T> {
	fn logging(&self) -> &LoggingConfig {
		&self.logging
	}

	fn parse() -> anyhow::Result<Self> {
		let cli = if cfg!(test) { Cli::default() } else { Cli::parse() };

		let sources = Sources {
			env_prefix: T::ENV_PREFIX.to_owned(),
			env: std::env::vars().collect(),
			cli,
		};

		let loaded = load::<Self>(&sources, Self::default().config_file)?;

		let mut config = loaded.config;
		config.config_file = loaded.config_file;
		config.ignored_keys = loaded.ignored_keys;

		Ok(config)
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn ignored_keys(&self) -> &[String] {
		&self.ignored_keys
	}

	fn pre_hook(&mut self) -> anyhow::Result<()> {
		T::pre_hook(self)
	}
}

#[derive(Debug, Default, Clone, Parser)]
pub struct Cli {
	/// Path to a TOML, YAML or JSON config file
	#[arg(long, short = 'c', value_name = "PATH")]
	pub config_file: Option<String>,

	/// Overrides a single config key, e.g. `--set api.bind_address=127.0.0.1:4000`
	#[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
	pub overrides: Vec<(String, String)>,
}

fn parse_override(s: &str) -> Result<(String, String), String> {
	let (key, value) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
	if key.is_empty() {
		return Err(format!("empty key in `{s}`"));
	}

	Ok((key.to_owned(), value.to_owned()))
}

/// Everything a config is assembled from, in increasing priority: the
/// defaults, the config file, the environment, the command line.
#[derive(Debug, Default, Clone)]
pub struct Sources {
	pub env_prefix: String,
	pub env: Vec<(String, String)>,
	pub cli: Cli,
}

#[derive(Debug)]
pub struct Loaded<C> {
	pub config: C,
	pub config_file: Option<String>,
	pub ignored_keys: Vec<String>,
}

pub fn load<C: Serialize + DeserializeOwned + Default>(
	sources: &Sources,
	default_file: Option<String>,
) -> anyhow::Result<Loaded<C>> {
	let defaults = serde_json::to_value(C::default()).context("failed to serialize default config")?;

	let env = env_overrides(&defaults, &sources.env_prefix, &sources.env);

	let explicit_file = sources.cli.config_file.clone().or_else(|| {
		env.iter()
			.find(|(path, _)| path.len() == 1 && path[0] == "config_file")
			.map(|(_, raw)| raw.clone())
	});

	let config_file = match (&explicit_file, &default_file) {
		(Some(path), _) => Some(resolve_file(path).with_context(|| format!("config file not found: {path}"))?),
		(None, Some(path)) => resolve_file(path),
		(None, None) => None,
	};

	let mut value = defaults.clone();
	if let Some(path) = &config_file {
		merge(&mut value, read_file(path)?);
	}

	for (path, raw) in &env {
		let coerced = coerce(raw, lookup(&defaults, path)).with_context(|| {
			format!(
				"invalid value for environment variable {}",
				env_name(&sources.env_prefix, path)
			)
		})?;
		insert(&mut value, path, coerced);
	}

	for (key, raw) in &sources.cli.overrides {
		let path = key.split('.').map(str::to_owned).collect::<Vec<_>>();
		let coerced = coerce(raw, lookup(&defaults, &path)).with_context(|| format!("invalid value for --set {key}"))?;
		insert(&mut value, &path, coerced);
	}

	let config: C = serde_json::from_value(value.clone()).context("failed to deserialize config")?;

	let known = serde_json::to_value(&config).context("failed to serialize config")?;
	let mut ignored_keys = Vec::new();
	collect_unknown(&value, &known, "", &mut ignored_keys);

	Ok(Loaded {
		config,
		config_file: config_file.map(|p| p.display().to_string()),
		ignored_keys,
	})
}

fn env_name(prefix: &str, path: &[String]) -> String {
	let key = path.join("_");
	if prefix.is_empty() {
		key.to_uppercase()
	} else {
		format!("{prefix}_{key}").to_uppercase()
	}
}

/// Finds the environment variables that name a leaf of the default config tree.
fn env_overrides(defaults: &Value, prefix: &str, env: &[(String, String)]) -> Vec<(Vec<String>, String)> {
	let mut leaves = Vec::new();
	leaf_paths(defaults, &mut Vec::new(), &mut leaves);

	leaves
		.into_iter()
		.filter_map(|path| {
			let name = env_name(prefix, &path);
			env.iter().find(|(k, _)| *k == name).map(|(_, v)| (path, v.clone()))
		})
		.collect()
}

fn leaf_paths(value: &Value, current: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
	match value {
		Value::Object(map) => {
			for (key, child) in map {
				current.push(key.clone());
				leaf_paths(child, current, out);
				current.pop();
			}
		}
		_ => out.push(current.clone()),
	}
}

fn resolve_file(path: &str) -> Option<PathBuf> {
	let path = Path::new(path);
	if path.extension().is_some() {
		return path.is_file().then(|| path.to_path_buf());
	}

	["toml", "yaml", "yml", "json"]
		.iter()
		.map(|ext| path.with_extension(ext))
		.find(|p| p.is_file())
}

fn read_file(path: &Path) -> anyhow::Result<Value> {
	let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

	let value = match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
		"toml" => toml::from_str::<Value>(&contents).with_context(|| format!("invalid toml in {}", path.display()))?,
		"yaml" | "yml" => {
			serde_yaml::from_str::<Value>(&contents).with_context(|| format!("invalid yaml in {}", path.display()))?
		}
		"json" => serde_json::from_str::<Value>(&contents).with_context(|| format!("invalid json in {}", path.display()))?,
		ext => anyhow::bail!("unsupported config file extension: {ext:?}"),
	};

	match value {
		Value::Object(_) => Ok(value),
		// an empty yaml document
		Value::Null => Ok(Value::Object(Map::new())),
		_ => anyhow::bail!("config file {} must contain a table at the top level", path.display()),
	}
}

fn merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base), Value::Object(overlay)) => {
			for (key, value) in overlay {
				match base.get_mut(&key) {
					Some(existing) => merge(existing, value),
					None => {
						base.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
	path.iter().try_fold(value, |value, key| value.get(key))
}

fn insert(root: &mut Value, path: &[String], value: Value) {
	let Some((first, rest)) = path.split_first() else {
		*root = value;
		return;
	};

	if !root.is_object() {
		*root = Value::Object(Map::new());
	}

	if let Value::Object(map) = root {
		insert(map.entry(first.clone()).or_insert(Value::Null), rest, value);
	}
}

/// Converts a raw string into the JSON type of the default value at the same
/// path.
pub(crate) fn coerce(raw: &str, template: Option<&Value>) -> anyhow::Result<Value> {
	Ok(match template {
		Some(Value::Bool(_)) => Value::Bool(raw.trim().parse().context("expected true or false")?),
		Some(Value::Number(_)) => {
			let raw = raw.trim();
			if let Ok(n) = raw.parse::<i64>() {
				Value::Number(n.into())
			} else if let Ok(n) = raw.parse::<u64>() {
				Value::Number(n.into())
			} else {
				let n = raw.parse::<f64>().context("expected a number")?;
				Value::Number(Number::from_f64(n).context("expected a finite number")?)
			}
		}
		Some(Value::String(_)) => Value::String(raw.to_owned()),
		Some(Value::Array(_)) => match serde_json::from_str::<Value>(raw) {
			Ok(value @ Value::Array(_)) => value,
			_ => Value::Array(
				raw.split(',')
					.map(str::trim)
					.filter(|s| !s.is_empty())
					.map(|s| Value::String(s.to_owned()))
					.collect(),
			),
		},
		Some(Value::Object(_)) => serde_json::from_str::<Value>(raw)
			.ok()
			.filter(Value::is_object)
			.context("expected a JSON object")?,
		Some(Value::Null) | None => {
			let trimmed = raw.trim_start();
			if trimmed.starts_with('{') || trimmed.starts_with('[') {
				serde_json::from_str(raw).context("invalid JSON")?
			} else {
				Value::String(raw.to_owned())
			}
		}
	})
}

fn collect_unknown(input: &Value, known: &Value, prefix: &str, out: &mut Vec<String>) {
	let (Value::Object(input), Value::Object(known)) = (input, known) else {
		return;
	};

	for (key, value) in input {
		let path = if prefix.is_empty() {
			key.clone()
		} else {
			format!("{prefix}.{key}")
		};

		match known.get(key) {
			Some(known) => collect_unknown(value, known, &path, out),
			None => out.push(path),
		}
	}
}
