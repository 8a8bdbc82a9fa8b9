use std::fs;
use std::path::PathBuf;

use crate::compose::{CaptionLayout, ComposeJob, Compositor};
use crate::discover::discover_assets;
use crate::metadata::MetadataRecord;
use crate::{Anomaly, RarityTier, Result};

#[derive(Debug, Clone)]
pub struct AssembleSettings {
    pub images_root: PathBuf,
    pub border_root: PathBuf,
    pub output_images: PathBuf,
    pub output_metadata: PathBuf,
    pub template_path: PathBuf,
    /// Everything before the decimal identifier in `name`, e.g.
    /// `"HERO OF AFRICA #"`.
    pub name_prefix: String,
    /// Locator base the per-item file name is appended to, e.g.
    /// `"https://ipfs.io/ipfs/<base-content-id>"`.
    pub locator_base: String,
    pub image_extension: String,
    pub captions: CaptionLayout,
}

#[derive(Debug, Clone)]
pub struct TierTally {
    pub tier: RarityTier,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct AssembleReport {
    pub processed: usize,
    pub images_written: usize,
    pub metadata_written: usize,
    pub failed: usize,
    /// Next unassigned identifier; equals the number of identifiers
    /// consumed, including ones whose compositing failed.
    pub item_count: u64,
    pub per_tier: Vec<TierTally>,
    pub anomalies: Vec<Anomaly>,
}

/// Walk the discovered tiers in enumeration order, assign each item the
/// next global identifier starting at 0, composite its card and derive
/// its metadata record from the template. A failed item consumes its
/// identifier all the same; identifiers are never reused or renumbered.
pub fn assemble(settings: &AssembleSettings, compositor: &dyn Compositor) -> Result<AssembleReport> {
    let template = MetadataRecord::from_file(&settings.template_path)?;

    fs::create_dir_all(&settings.output_images)?;
    fs::create_dir_all(&settings.output_metadata)?;

    let discovery = discover_assets(&settings.images_root, &settings.border_root);
    let locator_base = settings.locator_base.trim_end_matches('/');

    let mut report = AssembleReport {
        anomalies: discovery.anomalies.clone(),
        ..AssembleReport::default()
    };
    let mut next_id: u64 = 0;

    for tier_assets in &discovery.tiers {
        let tier = tier_assets.tier;
        let mut tally = TierTally {
            tier,
            processed: 0,
            succeeded: 0,
            failed: 0,
        };

        for character in &tier_assets.characters {
            let id = next_id;
            next_id += 1;
            report.processed += 1;
            tally.processed += 1;

            let job = ComposeJob {
                character: character.clone(),
                border: tier_assets.border.clone(),
                output: settings
                    .output_images
                    .join(format!("{}.{}", id, settings.image_extension)),
                captions: settings.captions.clone(),
            };
            let image_ok = match compositor.compose(&job) {
                Ok(()) => {
                    report.images_written += 1;
                    true
                }
                Err(err) => {
                    log::warn!("compositing failed for {}: {}", character.display(), err);
                    report.anomalies.push(Anomaly::IoFailure {
                        path: character.clone(),
                        detail: err.to_string(),
                    });
                    false
                }
            };

            // Metadata generation is independent of the image result.
            let mut record = template.clone();
            record.assign_identity(
                format!("{}{}", settings.name_prefix, id),
                format!("{}/{}.{}", locator_base, id, settings.image_extension),
                tier.display_name(),
            );
            let metadata_path = settings.output_metadata.join(format!("{}.json", id));
            match record.write_to(&metadata_path) {
                Ok(()) => report.metadata_written += 1,
                Err(err) => {
                    log::warn!("metadata failed for {}: {}", metadata_path.display(), err);
                    report.anomalies.push(Anomaly::IoFailure {
                        path: metadata_path,
                        detail: err.to_string(),
                    });
                }
            }

            if image_ok {
                tally.succeeded += 1;
            } else {
                tally.failed += 1;
                report.failed += 1;
            }
            log::info!("{} -> {} ({})", character.display(), id, tier);
        }

        log::info!(
            "{}: {}/{} processed successfully",
            tier,
            tally.succeeded,
            tally.processed
        );
        report.per_tier.push(tally);
    }

    report.item_count = next_id;
    Ok(report)
}
