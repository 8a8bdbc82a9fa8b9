use std::path::PathBuf;

use crate::metadata::MetadataRecord;
use crate::{files_with_extension, Anomaly, PipelineError, Result};

/// Locator prefix every rewritten pointer is rebuilt on.
pub const GATEWAY_PREFIX: &str = "https://ipfs.io/ipfs/";
/// Path marker that identifies a hosted-content locator.
const PATH_MARKER: &str = "ipfs.io/ipfs/";

#[derive(Debug, Clone)]
pub struct RepointSettings {
    pub metadata_dir: PathBuf,
    /// New base content id, e.g. a freshly pinned CID.
    pub new_base: String,
}

#[derive(Debug, Default)]
pub struct RepointReport {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Rebuild a hosted-content locator on a new base content id, keeping
/// the trailing filename. Returns `None` when the locator carries no
/// recognized marker. Re-applying with the same base id reproduces the
/// same locator.
pub fn rewrite_locator(locator: &str, new_base: &str) -> Option<String> {
    if !locator.contains(PATH_MARKER) {
        return None;
    }
    let filename = locator.rsplit('/').next()?;
    if filename.is_empty() {
        return None;
    }
    Some(format!("{}{}/{}", GATEWAY_PREFIX, new_base, filename))
}

/// Rewrite the `image` locator of every record in the store to the new
/// base content id, in place. Records lacking an `image` field or a
/// recognized locator are skipped and reported.
pub fn repoint(settings: &RepointSettings) -> Result<RepointReport> {
    let files = files_with_extension(&settings.metadata_dir, "json")?;
    let mut report = RepointReport::default();

    for path in files {
        report.processed += 1;

        let mut record = match MetadataRecord::from_file(&path) {
            Ok(record) => record,
            Err(PipelineError::Metadata(err)) => {
                log::warn!("malformed metadata {}: {}", path.display(), err);
                report.anomalies.push(Anomaly::MalformedMetadata {
                    path,
                    detail: err.to_string(),
                });
                report.failed += 1;
                continue;
            }
            Err(err) => {
                log::warn!("failed to read {}: {}", path.display(), err);
                report.anomalies.push(Anomaly::IoFailure {
                    path,
                    detail: err.to_string(),
                });
                report.failed += 1;
                continue;
            }
        };

        let Some(locator) = record.image.clone() else {
            log::warn!("no image field in {}", path.display());
            report.anomalies.push(Anomaly::LocatorMismatch {
                path,
                locator: None,
            });
            report.skipped += 1;
            continue;
        };

        match rewrite_locator(&locator, &settings.new_base) {
            Some(rewritten) => {
                record.image = Some(rewritten);
                match record.write_to(&path) {
                    Ok(()) => {
                        log::info!("updated {}", path.display());
                        report.updated += 1;
                    }
                    Err(err) => {
                        log::warn!("failed to write {}: {}", path.display(), err);
                        report.anomalies.push(Anomaly::IoFailure {
                            path,
                            detail: err.to_string(),
                        });
                        report.failed += 1;
                    }
                }
            }
            None => {
                log::warn!("not a hosted-content locator in {}: {}", path.display(), locator);
                report.anomalies.push(Anomaly::LocatorMismatch {
                    path,
                    locator: Some(locator),
                });
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

/// Read-only sample of the planned rewrites: the first `limit` records
/// with a recognized locator, as (path, old, new).
pub fn preview_repoint(
    settings: &RepointSettings,
    limit: usize,
) -> Result<Vec<(PathBuf, String, String)>> {
    let files = files_with_extension(&settings.metadata_dir, "json")?;
    let mut sample = Vec::new();

    for path in files {
        if sample.len() == limit {
            break;
        }
        let Ok(record) = MetadataRecord::from_file(&path) else {
            continue;
        };
        let Some(locator) = record.image else {
            continue;
        };
        if let Some(rewritten) = rewrite_locator(&locator, &settings.new_base) {
            sample.push((path, locator, rewritten));
        }
    }

    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn rewrites_base_and_keeps_filename() {
        let rewritten =
            rewrite_locator("https://ipfs.io/ipfs/OLDID/7.png", "NEWID").unwrap();
        assert_eq!(rewritten, "https://ipfs.io/ipfs/NEWID/7.png");
    }

    #[test]
    fn rewrite_is_idempotent_for_a_fixed_base() {
        let once = rewrite_locator("https://ipfs.io/ipfs/OLDID/12.png", "NEWID").unwrap();
        let twice = rewrite_locator(&once, "NEWID").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unmarked_locators_are_not_rewritten() {
        assert!(rewrite_locator("https://example.com/static/7.png", "NEWID").is_none());
    }

    fn seed_record(dir: &Path, name: &str, body: serde_json::Value) {
        fs::write(
            dir.join(name),
            serde_json::to_string_pretty(&body).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn repoints_a_store_in_place() {
        let dir = tempfile::tempdir().unwrap();
        for id in 0..3u64 {
            seed_record(
                dir.path(),
                &format!("{}.json", id),
                serde_json::json!({
                    "name": format!("HERO OF AFRICA #{}", id),
                    "image": format!("https://ipfs.io/ipfs/OLDID/{}.png", id),
                }),
            );
        }
        // One record points outside the gateway, one has no image field.
        seed_record(
            dir.path(),
            "3.json",
            serde_json::json!({ "image": "https://example.com/3.png" }),
        );
        seed_record(dir.path(), "4.json", serde_json::json!({ "name": "no image" }));

        let settings = RepointSettings {
            metadata_dir: dir.path().to_path_buf(),
            new_base: "NEWID".to_string(),
        };
        let report = repoint(&settings).unwrap();

        assert_eq!(report.processed, 5);
        assert_eq!(report.updated, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);

        let record = MetadataRecord::from_file(&dir.path().join("2.json")).unwrap();
        assert_eq!(
            record.image.as_deref(),
            Some("https://ipfs.io/ipfs/NEWID/2.png")
        );
        // Untouched fields survive the in-place rewrite.
        assert_eq!(record.name.as_deref(), Some("HERO OF AFRICA #2"));
        let record = MetadataRecord::from_file(&dir.path().join("3.json")).unwrap();
        assert_eq!(record.image.as_deref(), Some("https://example.com/3.png"));
    }

    #[test]
    fn repoint_twice_matches_repoint_once() {
        let dir = tempfile::tempdir().unwrap();
        seed_record(
            dir.path(),
            "0.json",
            serde_json::json!({ "image": "https://ipfs.io/ipfs/OLDID/0.png" }),
        );
        let settings = RepointSettings {
            metadata_dir: dir.path().to_path_buf(),
            new_base: "NEWID".to_string(),
        };

        repoint(&settings).unwrap();
        let first = fs::read_to_string(dir.path().join("0.json")).unwrap();
        repoint(&settings).unwrap();
        let second = fs::read_to_string(dir.path().join("0.json")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn preview_is_bounded_and_read_only() {
        let dir = tempfile::tempdir().unwrap();
        for id in 0..8u64 {
            seed_record(
                dir.path(),
                &format!("{}.json", id),
                serde_json::json!({
                    "image": format!("https://ipfs.io/ipfs/OLDID/{}.png", id),
                }),
            );
        }
        let settings = RepointSettings {
            metadata_dir: dir.path().to_path_buf(),
            new_base: "NEWID".to_string(),
        };

        let sample = preview_repoint(&settings, 5).unwrap();
        assert_eq!(sample.len(), 5);

        // Nothing was written back.
        let record = MetadataRecord::from_file(&dir.path().join("0.json")).unwrap();
        assert!(record.image.unwrap().contains("OLDID"));
    }
}
