//! Local side of the export action: the server snapshot is written verbatim to a file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

/// `simulation-<instance>-<UTC capture time>.json`, safe for any filesystem.
pub fn export_file_name(instance_id: &str, captured_at: OffsetDateTime) -> String {
    let id: String = instance_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stamp = captured_at
        .to_offset(time::UtcOffset::UTC)
        .format(format_description!(
            "[year][month][day]T[hour][minute][second]Z"
        ))
        .unwrap_or_else(|_| captured_at.unix_timestamp().to_string());
    format!("simulation-{id}-{stamp}.json")
}

/// Write the snapshot under `dir` and return the absolute path of the new file.
pub fn write_snapshot(
    dir: &Path,
    instance_id: &str,
    snapshot: &serde_json::Value,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(export_file_name(instance_id, OffsetDateTime::now_utc()));
    let body = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(std::fs::canonicalize(&path).unwrap_or(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn file_name_has_instance_and_timestamp() {
        let name = export_file_name("abc123", datetime!(2026-10-16 08:30:05 UTC));
        assert_eq!(name, "simulation-abc123-20261016T083005Z.json");
    }

    #[test]
    fn file_name_sanitises_instance_id() {
        let name = export_file_name("team/a b", datetime!(2026-01-02 03:04:05 UTC));
        assert_eq!(name, "simulation-team_a_b-20260102T030405Z.json");
    }

    #[test]
    fn snapshot_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = serde_json::json!({"summary": {"completed": 25}, "events": []});
        let path = write_snapshot(dir.path(), "abc123", &snapshot).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("simulation-abc123-"));
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, snapshot);
    }
}
