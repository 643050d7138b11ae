use crate::error::SchemaError;
use crate::schema::Migration;

/// Computes the ordered chain of migrations leading from `current` to
/// `target`.
///
/// An empty chain means the database is already current. Every step is
/// applied individually, even when a release shipped several of them at once.
pub fn resolve(
    migrations: &[Migration],
    current: i64,
    target: i64,
) -> Result<Vec<&Migration>, SchemaError> {
    if current == target {
        return Ok(Vec::new());
    }
    if current > target {
        return Err(SchemaError::UnsupportedDowngrade {
            stored: current,
            target,
        });
    }

    let start = migrations
        .iter()
        .position(|m| m.from == current)
        .ok_or(SchemaError::UnknownVersion(current))?;

    let mut chain = Vec::new();
    let mut version = current;
    for migration in &migrations[start..] {
        if version == target {
            break;
        }
        if migration.from != version {
            return Err(SchemaError::InvalidStepTable(format!(
                "no migration from version {}",
                version
            )));
        }
        chain.push(migration);
        version = migration.to();
    }

    if version != target {
        return Err(SchemaError::InvalidStepTable(format!(
            "no migration path from version {} to {}",
            current, target
        )));
    }

    Ok(chain)
}
