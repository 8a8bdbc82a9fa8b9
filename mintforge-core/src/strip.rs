use std::fs;
use std::path::{Path, PathBuf};

use crate::{files_with_extension, Anomaly, Result};

#[derive(Debug, Clone)]
pub struct StripSettings {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Default)]
pub struct StripReport {
    pub copied: usize,
    pub failed: usize,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub source_count: usize,
    pub destination_count: usize,
    pub matched: usize,
    pub mismatched: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.source_count == self.destination_count
            && self.mismatched.is_empty()
            && self.missing.is_empty()
    }
}

/// Planned copies, source to bare-identifier destination. Pass a limit
/// for a bounded preview, `None` for the full plan.
pub fn plan_strip(
    settings: &StripSettings,
    limit: Option<usize>,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let files = files_with_extension(&settings.source, "json")?;
    let mut plan = Vec::new();

    for path in files.into_iter().take(limit.unwrap_or(usize::MAX)) {
        if let Some(stem) = path.file_stem() {
            let destination = settings.destination.join(stem);
            plan.push((path, destination));
        }
    }
    Ok(plan)
}

/// Copy every `<id>.json` of the source store byte-for-byte to `<id>`
/// (no extension) in the destination store. Pure projection, no
/// content transformation.
pub fn strip_extensions(settings: &StripSettings) -> Result<StripReport> {
    let plan = plan_strip(settings, None)?;
    fs::create_dir_all(&settings.destination)?;

    let mut report = StripReport::default();
    for (source, destination) in plan {
        match fs::copy(&source, &destination) {
            Ok(_) => {
                log::debug!("{} -> {}", source.display(), destination.display());
                report.copied += 1;
            }
            Err(err) => {
                log::warn!("failed to copy {}: {}", source.display(), err);
                report.anomalies.push(Anomaly::IoFailure {
                    path: source,
                    detail: err.to_string(),
                });
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Post-copy check: equal file count, and equal byte size for every
/// matched pair.
pub fn verify_strip(settings: &StripSettings) -> Result<VerifyReport> {
    let sources = files_with_extension(&settings.source, "json")?;

    let mut report = VerifyReport {
        source_count: sources.len(),
        destination_count: file_count(&settings.destination)?,
        ..VerifyReport::default()
    };

    for source in &sources {
        let Some(stem) = source.file_stem() else {
            continue;
        };
        let destination = settings.destination.join(stem);
        if !destination.is_file() {
            report.missing.push(destination);
            continue;
        }
        let source_len = fs::metadata(source)?.len();
        let destination_len = fs::metadata(&destination)?.len();
        if source_len == destination_len {
            report.matched += 1;
        } else {
            report.mismatched.push(destination);
        }
    }
    Ok(report)
}

fn file_count(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0usize;
    for entry in fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clear_dir;

    fn seed_store(dir: &Path, ids: &[u64]) {
        fs::create_dir_all(dir).unwrap();
        for &id in ids {
            fs::write(
                dir.join(format!("{}.json", id)),
                format!("{{\"name\": \"#{}\"}}", id),
            )
            .unwrap();
        }
    }

    #[test]
    fn copies_are_byte_identical_under_bare_names() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StripSettings {
            source: dir.path().join("Metadata"),
            destination: dir.path().join("NoJson"),
        };
        seed_store(&settings.source, &[0, 1, 2]);

        let report = strip_extensions(&settings).unwrap();
        assert_eq!(report.copied, 3);
        assert_eq!(report.failed, 0);

        // Appending .json to a bare name reproduces the source bytes.
        for id in 0..3u64 {
            let bare = fs::read(settings.destination.join(format!("{}", id))).unwrap();
            let source = fs::read(settings.source.join(format!("{}.json", id))).unwrap();
            assert_eq!(bare, source);
        }
    }

    #[test]
    fn plan_is_bounded_and_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StripSettings {
            source: dir.path().join("Metadata"),
            destination: dir.path().join("NoJson"),
        };
        seed_store(&settings.source, &[0, 1, 2, 3, 4]);

        let plan = plan_strip(&settings, Some(2)).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(!settings.destination.exists());
    }

    #[test]
    fn verify_reports_counts_and_size_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StripSettings {
            source: dir.path().join("Metadata"),
            destination: dir.path().join("NoJson"),
        };
        seed_store(&settings.source, &[0, 1]);
        strip_extensions(&settings).unwrap();

        let report = verify_strip(&settings).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.matched, 2);

        // Tamper with one copy; verification flags it.
        fs::write(settings.destination.join("1"), b"tampered").unwrap();
        let report = verify_strip(&settings).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.mismatched.len(), 1);

        // Remove one copy; it shows up as missing and the counts drift.
        fs::remove_file(settings.destination.join("0")).unwrap();
        let report = verify_strip(&settings).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_ne!(report.source_count, report.destination_count);
    }

    #[test]
    fn clear_removes_destination_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StripSettings {
            source: dir.path().join("Metadata"),
            destination: dir.path().join("NoJson"),
        };
        seed_store(&settings.source, &[0, 1]);
        strip_extensions(&settings).unwrap();

        let removed = clear_dir(&settings.destination).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(file_count(&settings.destination).unwrap(), 0);
        assert_eq!(files_with_extension(&settings.source, "json").unwrap().len(), 2);
    }
}
