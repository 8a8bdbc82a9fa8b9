use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::metadata::MetadataRecord;
use crate::{Anomaly, OrphanKind, PipelineError, Result};

#[derive(Debug, Clone)]
pub struct ShuffleSettings {
    pub source_images: PathBuf,
    pub source_metadata: PathBuf,
    pub output_images: PathBuf,
    pub output_metadata: PathBuf,
    pub name_prefix: String,
    pub image_extension: String,
}

/// Result of pairing the image and metadata stores: identifiers with
/// both halves present, in ascending order, plus the orphans.
#[derive(Debug, Default)]
pub struct PairScan {
    pub pairs: Vec<u64>,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Default)]
pub struct ShuffleReport {
    /// Number of complete pairs the permutation was drawn over.
    pub pairs: usize,
    pub shuffled: usize,
    pub failed: usize,
    /// The drawn old -> new assignment for every attempted pair.
    pub mapping: Vec<(u64, u64)>,
    pub anomalies: Vec<Anomaly>,
}

/// Intersect the two stores by identifier. Files whose stem is not a
/// decimal identifier are ignored; identifiers present in only one
/// store are reported as orphans and excluded.
pub fn scan_pairs(
    images_dir: &Path,
    metadata_dir: &Path,
    image_extension: &str,
) -> Result<PairScan> {
    let images = numbered_files(images_dir, image_extension)?;
    let metadata = numbered_files(metadata_dir, "json")?;

    let mut scan = PairScan::default();
    for &id in images.keys() {
        if metadata.contains_key(&id) {
            scan.pairs.push(id);
        } else {
            log::warn!("{}.{} has no metadata record", id, image_extension);
            scan.anomalies.push(Anomaly::OrphanPair {
                identifier: id,
                missing: OrphanKind::Metadata,
            });
        }
    }
    for &id in metadata.keys() {
        if !images.contains_key(&id) {
            log::warn!("{}.json has no image", id);
            scan.anomalies.push(Anomaly::OrphanPair {
                identifier: id,
                missing: OrphanKind::Image,
            });
        }
    }
    Ok(scan)
}

/// Shuffle with a fresh entropy draw. Each run is a one-time,
/// non-repeatable reveal-order draw.
pub fn shuffle(settings: &ShuffleSettings) -> Result<ShuffleReport> {
    shuffle_with(settings, &mut StdRng::from_entropy())
}

/// Shuffle with a caller-supplied random source, so a fixed seed can
/// reproduce an exact mapping.
///
/// The permutation is drawn over the count of complete pairs: output
/// identifiers are dense in `[0, n)` even when source identifiers have
/// gaps.
pub fn shuffle_with<R: Rng + ?Sized>(
    settings: &ShuffleSettings,
    rng: &mut R,
) -> Result<ShuffleReport> {
    let scan = scan_pairs(
        &settings.source_images,
        &settings.source_metadata,
        &settings.image_extension,
    )?;
    if scan.pairs.is_empty() {
        return Err(PipelineError::Config(
            "no complete image/metadata pairs to shuffle".to_string(),
        ));
    }

    fs::create_dir_all(&settings.output_images)?;
    fs::create_dir_all(&settings.output_metadata)?;

    let mut destinations: Vec<u64> = (0..scan.pairs.len() as u64).collect();
    destinations.shuffle(rng);

    let mut report = ShuffleReport {
        pairs: scan.pairs.len(),
        anomalies: scan.anomalies,
        ..ShuffleReport::default()
    };

    for (index, &old_id) in scan.pairs.iter().enumerate() {
        let new_id = destinations[index];
        report.mapping.push((old_id, new_id));
        match relocate_pair(settings, old_id, new_id, &mut report.anomalies) {
            Ok(()) => {
                log::info!("{} -> {}", old_id, new_id);
                report.shuffled += 1;
            }
            Err(PipelineError::Metadata(err)) => {
                log::warn!("malformed metadata for pair {}: {}", old_id, err);
                report.anomalies.push(Anomaly::MalformedMetadata {
                    path: settings.source_metadata.join(format!("{}.json", old_id)),
                    detail: err.to_string(),
                });
                report.failed += 1;
            }
            Err(err) => {
                log::warn!("failed to shuffle pair {}: {}", old_id, err);
                report.anomalies.push(Anomaly::IoFailure {
                    path: settings.source_images.join(format!(
                        "{}.{}",
                        old_id, settings.image_extension
                    )),
                    detail: err.to_string(),
                });
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn relocate_pair(
    settings: &ShuffleSettings,
    old_id: u64,
    new_id: u64,
    anomalies: &mut Vec<Anomaly>,
) -> Result<()> {
    let ext = &settings.image_extension;

    let image_src = settings.source_images.join(format!("{}.{}", old_id, ext));
    let image_dst = settings.output_images.join(format!("{}.{}", new_id, ext));
    fs::copy(&image_src, &image_dst)?;

    let metadata_src = settings.source_metadata.join(format!("{}.json", old_id));
    let mut record = MetadataRecord::from_file(&metadata_src)?;
    record.name = Some(format!("{}{}", settings.name_prefix, new_id));

    // Rewrite the locator only when its path ends in exactly
    // /<old>.<ext>; anything else is left untouched.
    if let Some(locator) = record.image.clone() {
        let old_suffix = format!("/{}.{}", old_id, ext);
        if let Some(base) = locator.strip_suffix(&old_suffix) {
            record.image = Some(format!("{}/{}.{}", base, new_id, ext));
        } else {
            log::warn!("locator does not end in {}: {}", old_suffix, locator);
            anomalies.push(Anomaly::LocatorMismatch {
                path: metadata_src.clone(),
                locator: Some(locator),
            });
        }
    }

    record.write_to(&settings.output_metadata.join(format!("{}.json", new_id)))
}

fn numbered_files(dir: &Path, extension: &str) -> Result<BTreeMap<u64, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
        {
            continue;
        }
        match path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
        {
            Some(id) => {
                files.insert(id, path);
            }
            None => log::debug!("ignoring non-numeric file name: {}", path.display()),
        }
    }
    Ok(files)
}
