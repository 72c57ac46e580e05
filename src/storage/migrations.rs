use std::path::Path;

use serde_json::Value;

use crate::storage::StorageError;

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

/// Index `n` upgrades version `n + 1` to `n + 2`.
fn get_migrations() -> Vec<MigrationFn> {
    vec![]
}

/// Returns 1 if version field is missing (assumes v1, our first versioned schema)
pub fn detect_version(value: &Value, path: &Path) -> Result<u32, StorageError> {
    match value.get("version") {
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| StorageError::InvalidVersion {
                path: path.to_path_buf(),
            }),
        None => Ok(1),
    }
}

/// Migrations are applied sequentially: v1→v2→v3→...→target
pub fn apply_migrations(
    data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    apply_with(get_migrations(), data, from_version, to_version)
}

fn apply_with(
    migrations: Vec<MigrationFn>,
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    for version in from_version..to_version {
        let migration = version
            .checked_sub(1)
            .and_then(|idx| migrations.get(idx as usize))
            .ok_or(StorageError::UnsupportedVersion(version))?;
        data = migration(data)?;
    }

    Ok(data)
}
