use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Anomaly, RarityTier};

/// Character images of one tier, paired with the tier's border asset.
#[derive(Debug, Clone)]
pub struct TierAssets {
    pub tier: RarityTier,
    pub border: PathBuf,
    pub characters: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub tiers: Vec<TierAssets>,
    pub anomalies: Vec<Anomaly>,
}

impl Discovery {
    pub fn total_characters(&self) -> usize {
        self.tiers.iter().map(|t| t.characters.len()).sum()
    }
}

/// Walk the tier enumeration in order and pair every tier's character
/// folder with its border asset. A tier missing either half is skipped
/// with a recorded warning; the rest of the run continues. Pure
/// discovery, no side effects.
pub fn discover_assets(images_root: &Path, border_root: &Path) -> Discovery {
    let mut discovery = Discovery::default();

    for tier in RarityTier::ALL {
        let character_dir = images_root.join(tier.folder_name());
        let border = border_root.join(tier.border_file());

        if !character_dir.is_dir() {
            let detail = format!("character folder not found: {}", character_dir.display());
            log::warn!("{}", detail);
            discovery
                .anomalies
                .push(Anomaly::MissingTierAssets { tier, detail });
            continue;
        }
        if !border.is_file() {
            let detail = format!("border file not found: {}", border.display());
            log::warn!("{}", detail);
            discovery
                .anomalies
                .push(Anomaly::MissingTierAssets { tier, detail });
            continue;
        }

        let characters = png_files(&character_dir);
        if characters.is_empty() {
            log::info!("no PNG files in {}", character_dir.display());
        }
        discovery.tiers.push(TierAssets {
            tier,
            border,
            characters,
        });
    }

    discovery
}

// Name-sorted so identifier assignment is deterministic for a fixed
// directory content.
fn png_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn discovers_tiers_in_enumeration_order() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("IMAGES");
        let borders = dir.path().join("BORDER");
        fs::create_dir_all(images.join("2_RARE")).unwrap();
        fs::create_dir_all(images.join("1_COMMON")).unwrap();
        fs::create_dir_all(&borders).unwrap();
        touch(&borders.join("1_common.png"));
        touch(&borders.join("2_rare.png"));
        touch(&images.join("1_COMMON").join("b.png"));
        touch(&images.join("1_COMMON").join("a.png"));
        touch(&images.join("2_RARE").join("solo.png"));

        let discovery = discover_assets(&images, &borders);

        let tiers: Vec<RarityTier> = discovery.tiers.iter().map(|t| t.tier).collect();
        assert_eq!(tiers, vec![RarityTier::Common, RarityTier::Rare]);
        // Within a tier, listing order is name-sorted.
        let common_names: Vec<_> = discovery.tiers[0]
            .characters
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(common_names, vec!["a.png", "b.png"]);
        // Tiers with neither folder nor border are anomalies, not errors.
        assert_eq!(discovery.anomalies.len(), 3);
    }

    #[test]
    fn missing_border_skips_tier_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("IMAGES");
        let borders = dir.path().join("BORDER");
        fs::create_dir_all(images.join("1_COMMON")).unwrap();
        fs::create_dir_all(&borders).unwrap();
        touch(&images.join("1_COMMON").join("a.png"));

        let discovery = discover_assets(&images, &borders);

        assert!(discovery.tiers.is_empty());
        assert!(discovery.anomalies.iter().any(|a| matches!(
            a,
            Anomaly::MissingTierAssets {
                tier: RarityTier::Common,
                ..
            }
        )));
    }

    #[test]
    fn non_png_files_are_not_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("IMAGES");
        let borders = dir.path().join("BORDER");
        fs::create_dir_all(images.join("1_COMMON")).unwrap();
        fs::create_dir_all(&borders).unwrap();
        touch(&borders.join("1_common.png"));
        touch(&images.join("1_COMMON").join("keep.png"));
        touch(&images.join("1_COMMON").join("notes.txt"));

        let discovery = discover_assets(&images, &borders);
        assert_eq!(discovery.total_characters(), 1);
    }
}
