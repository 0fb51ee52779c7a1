//! File-based storage backend.
//!
//! Each namespace is a directory under `storage_path` and each entry a
//! `<id>.bin` file: a 16-byte header followed by the JSON payload. Writes go
//! to a temp file first and are renamed into place, so a reader sees either
//! the old or the new snapshot.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use idcard_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Header layout (16 bytes):
/// - [0-3]: magic `IDCS`
/// - [4-5]: version (u16, little-endian)
/// - [6-7]: reserved
/// - [8-15]: payload length (u64, little-endian)
struct FileHeader {
	version: u16,
	payload_len: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"IDCS";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	fn encode(payload_len: usize) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&Self::VERSION.to_le_bytes());
		bytes[8..16].copy_from_slice(&(payload_len as u64).to_le_bytes());
		bytes
	}

	fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE || &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Not a storage file".into()));
		}
		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		let mut len = [0u8; 8];
		len.copy_from_slice(&bytes[8..16]);
		Ok(Self {
			version,
			payload_len: u64::from_le_bytes(len),
		})
	}
}

/// Storage that persists entries as files.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps `namespace:id` to `<base>/<namespace>/<id>.bin`.
	fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Malformed key '{}'", key)))?;
		Ok(self
			.base_path
			.join(sanitize(namespace))
			.join(format!("{}.bin", sanitize(id))))
	}
}

fn sanitize(part: &str) -> String {
	part.replace(['/', '\\', ':'], "_")
}

fn backend_error(path: &Path, e: std::io::Error) -> StorageError {
	StorageError::Backend(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key)?;
		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(backend_error(&path, e)),
		};

		let header = FileHeader::decode(&data)?;
		if header.version > FileHeader::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version {} in {}",
				header.version,
				path.display()
			)));
		}
		let payload = &data[FileHeader::SIZE..];
		if payload.len() as u64 != header.payload_len {
			return Err(StorageError::Backend(format!(
				"Truncated file {}: expected {} bytes, found {}",
				path.display(),
				header.payload_len,
				payload.len()
			)));
		}
		Ok(payload.to_vec())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| backend_error(parent, e))?;
		}

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&FileHeader::encode(value.len()));
		file_data.extend_from_slice(&value);

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| backend_error(&temp_path, e))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| backend_error(&path, e))?;

		tracing::trace!(key, bytes = value.len(), "Wrote storage file");
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
