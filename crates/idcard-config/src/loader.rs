//! Multi-file configuration loading.
//!
//! The root file may move component sections into other files with
//! `include = "file.toml"` or `include = ["a.toml", "b.toml"]`. Included files
//! may include further files; paths are relative to the including file.
//! `[service]` and `[ledger]` decide which deployment the service signs for
//! and are only accepted from the root file.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const SECTIONS: [&str; 6] = ["service", "chain", "account", "storage", "ledger", "api"];
const ROOT_ONLY: [&str; 2] = ["service", "ledger"];

/// A file waiting to be read, with the file that included it.
struct Pending {
	path: PathBuf,
	included_from: Option<PathBuf>,
}

/// Loads `root` and everything it includes into one validated [`Config`].
pub(crate) async fn load(root: &Path) -> Result<Config, ConfigError> {
	let mut merged = toml::Table::new();
	let mut owners: HashMap<String, PathBuf> = HashMap::new();
	let mut seen: HashSet<PathBuf> = HashSet::new();
	let mut pending = vec![Pending {
		path: root.to_path_buf(),
		included_from: None,
	}];

	while let Some(file) = pending.pop() {
		let canonical = file.path.canonicalize().map_err(|e| missing(&file, e))?;
		if !seen.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} is included more than once",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(&canonical)
			.await
			.map_err(|e| missing(&file, e))?;
		let mut table: toml::Table = toml::from_str(&resolve_env_vars(&content)?)?;

		let dir = canonical.parent().unwrap_or_else(|| Path::new("."));
		for include in includes(table.remove("include"), &canonical)? {
			pending.push(Pending {
				path: dir.join(include),
				included_from: Some(canonical.clone()),
			});
		}

		let is_root = file.included_from.is_none();
		for (section, value) in table {
			if !SECTIONS.contains(&section.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Unknown section [{}] in {}",
					section,
					canonical.display()
				)));
			}
			if !is_root && ROOT_ONLY.contains(&section.as_str()) {
				return Err(ConfigError::Validation(format!(
					"[{}] must be set in the root configuration, not in included file {}",
					section,
					canonical.display()
				)));
			}
			if let Some(owner) = owners.get(&section) {
				return Err(ConfigError::Validation(format!(
					"Section [{}] is defined in both {} and {}",
					section,
					owner.display(),
					canonical.display()
				)));
			}
			owners.insert(section.clone(), canonical.clone());
			merged.insert(section, value);
		}
	}

	let config: Config = toml::Value::Table(merged).try_into()?;
	config.validate()?;
	Ok(config)
}

fn includes(value: Option<toml::Value>, file: &Path) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || {
		ConfigError::Validation(format!(
			"include in {} must be a path or a list of paths",
			file.display()
		))
	};

	match value {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| item.as_str().map(PathBuf::from).ok_or_else(invalid))
			.collect(),
		Some(_) => Err(invalid()),
	}
}

fn missing(file: &Pending, e: std::io::Error) -> ConfigError {
	let message = match &file.included_from {
		Some(parent) => format!(
			"Cannot read {} (included from {}): {}",
			file.path.display(),
			parent.display(),
			e
		),
		None => format!("Cannot read {}: {}", file.path.display(), e),
	};
	ConfigError::Io(std::io::Error::new(e.kind(), message))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const SERVICE: &str = r#"
[service]
id = "idcard-test"
expiry_window_blocks = 30
"#;

	const CHAIN: &str = r#"
[chain]
primary = "local"
[chain.implementations.local]
chain_id = 31337
"#;

	const ACCOUNT_AND_STORAGE: &str = r#"
[account]
primary = "local"
[account.implementations.local]
private_key = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data/storage"
"#;

	const LEDGER: &str = r#"
[ledger]
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
mint_price_wei = "1000"
"#;

	fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
		let path = dir.join(name);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(&path, content).unwrap();
		path
	}

	async fn load_err(root: &Path) -> String {
		load(root).await.unwrap_err().to_string()
	}

	#[tokio::test]
	async fn test_single_file_config() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"config.toml",
			&format!("{}{}{}{}", SERVICE, CHAIN, ACCOUNT_AND_STORAGE, LEDGER),
		);

		let config = load(&root).await.unwrap();
		assert_eq!(config.service.id, "idcard-test");
		assert_eq!(config.service.expiry_window_blocks, 30);
		assert_eq!(config.storage.primary, "file");
	}

	#[tokio::test]
	async fn test_nested_includes_resolve_from_including_file() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!("include = \"components/chain.toml\"\n{}{}", SERVICE, LEDGER),
		);
		write(
			dir.path(),
			"components/chain.toml",
			&format!("include = [\"signing.toml\"]\n{}", CHAIN),
		);
		write(dir.path(), "components/signing.toml", ACCOUNT_AND_STORAGE);

		let config = load(&root).await.unwrap();
		assert_eq!(config.chain.primary, "local");
		assert_eq!(config.account.primary, "local");
		assert_eq!(config.ledger.mint_price_wei, "1000");
	}

	#[tokio::test]
	async fn test_ledger_only_from_root() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!("include = \"rest.toml\"\n{}", SERVICE),
		);
		write(
			dir.path(),
			"rest.toml",
			&format!("{}{}{}", CHAIN, ACCOUNT_AND_STORAGE, LEDGER),
		);

		let err = load_err(&root).await;
		assert!(err.contains("[ledger] must be set in the root configuration"), "{err}");
	}

	#[tokio::test]
	async fn test_service_only_from_root() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!("include = \"rest.toml\"\n{}{}", CHAIN, LEDGER),
		);
		write(dir.path(), "rest.toml", &format!("{}{}", SERVICE, ACCOUNT_AND_STORAGE));

		let err = load_err(&root).await;
		assert!(err.contains("[service] must be set in the root configuration"), "{err}");
	}

	#[tokio::test]
	async fn test_duplicate_component_section() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!(
				"include = \"more.toml\"\n{}{}{}{}",
				SERVICE, CHAIN, ACCOUNT_AND_STORAGE, LEDGER
			),
		);
		write(dir.path(), "more.toml", CHAIN);

		let err = load_err(&root).await;
		assert!(err.contains("Section [chain] is defined in both"), "{err}");
	}

	#[tokio::test]
	async fn test_include_cycle() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!("include = \"a.toml\"\n{}{}", SERVICE, LEDGER),
		);
		write(dir.path(), "a.toml", &format!("include = \"b.toml\"\n{}", CHAIN));
		write(dir.path(), "b.toml", "include = \"a.toml\"\n");

		let err = load_err(&root).await;
		assert!(err.contains("included more than once"), "{err}");
	}

	#[tokio::test]
	async fn test_unknown_section() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!(
				"{}{}{}{}\n[solver]\nid = \"x\"\n",
				SERVICE, CHAIN, ACCOUNT_AND_STORAGE, LEDGER
			),
		);

		let err = load_err(&root).await;
		assert!(err.contains("Unknown section [solver]"), "{err}");
	}

	#[tokio::test]
	async fn test_bad_include_value() {
		let dir = TempDir::new().unwrap();
		let root = write(dir.path(), "main.toml", &format!("include = 3\n{}", SERVICE));

		let err = load_err(&root).await;
		assert!(err.contains("must be a path or a list of paths"), "{err}");
	}

	#[tokio::test]
	async fn test_missing_include_names_parent() {
		let dir = TempDir::new().unwrap();
		let root = write(
			dir.path(),
			"main.toml",
			&format!("include = \"absent.toml\"\n{}", SERVICE),
		);

		match load(&root).await {
			Err(ConfigError::Io(e)) => {
				assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
				assert!(e.to_string().contains("included from"));
			},
			other => panic!("expected io error, got {:?}", other.map(|c| c.service.id)),
		}
	}
}
