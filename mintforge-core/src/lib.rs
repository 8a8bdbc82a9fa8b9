use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod assemble;
mod compose;
mod discover;
mod metadata;
mod repoint;
mod shuffle;
mod strip;

pub use assemble::{assemble, AssembleReport, AssembleSettings, TierTally};
pub use compose::{
    CaptionLayout, ComposeJob, Compositor, PngCompositor, TextLine, CANVAS_SIZE, CHARACTER_OFFSET,
    CHARACTER_SIZE,
};
pub use discover::{discover_assets, Discovery, TierAssets};
pub use metadata::{Attribute, MetadataRecord, RARITY_TRAIT};
pub use repoint::{
    preview_repoint, repoint, rewrite_locator, RepointReport, RepointSettings, GATEWAY_PREFIX,
};
pub use shuffle::{scan_pairs, shuffle, shuffle_with, PairScan, ShuffleReport, ShuffleSettings};
pub use strip::{
    plan_strip, strip_extensions, verify_strip, StripReport, StripSettings, VerifyReport,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Rarity categories in enumeration order. The assembler walks tiers in
/// this order, so it also fixes which identifier block each tier
/// occupies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RarityTier {
    Common,
    Rare,
    Legendary,
    Exotic,
    UltraExotic,
}

impl RarityTier {
    pub const ALL: [RarityTier; 5] = [
        RarityTier::Common,
        RarityTier::Rare,
        RarityTier::Legendary,
        RarityTier::Exotic,
        RarityTier::UltraExotic,
    ];

    /// Character folder name under the IMAGES root.
    pub fn folder_name(self) -> &'static str {
        match self {
            RarityTier::Common => "1_COMMON",
            RarityTier::Rare => "2_RARE",
            RarityTier::Legendary => "3_LEGENDARY",
            RarityTier::Exotic => "4_EXOTIC",
            RarityTier::UltraExotic => "5_ULTRA-EXOTIC",
        }
    }

    /// Border file name under the BORDER root.
    pub fn border_file(self) -> &'static str {
        match self {
            RarityTier::Common => "1_common.png",
            RarityTier::Rare => "2_rare.png",
            RarityTier::Legendary => "3_legendary.png",
            RarityTier::Exotic => "4_exotic.png",
            RarityTier::UltraExotic => "5_ultra-exotic.png",
        }
    }

    /// Display name used in metadata RARITY fields.
    pub fn display_name(self) -> &'static str {
        match self {
            RarityTier::Common => "COMMON",
            RarityTier::Rare => "RARE",
            RarityTier::Legendary => "LEGENDARY",
            RarityTier::Exotic => "EXOTIC",
            RarityTier::UltraExotic => "ULTRA-EXOTIC",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Directory layout of one collection root. Directories are the wire
/// format between stages.
#[derive(Debug, Clone)]
pub struct CollectionLayout {
    pub root: PathBuf,
}

impl CollectionLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CollectionLayout { root: root.into() }
    }

    pub fn source_images(&self) -> PathBuf {
        self.root.join("IMAGES")
    }

    pub fn borders(&self) -> PathBuf {
        self.root.join("BORDER")
    }

    pub fn assembled_images(&self) -> PathBuf {
        self.root.join("Final").join("Images")
    }

    pub fn assembled_metadata(&self) -> PathBuf {
        self.root.join("Final").join("Metadata")
    }

    pub fn shuffled_images(&self) -> PathBuf {
        self.root.join("Shuffled").join("Images")
    }

    pub fn shuffled_metadata(&self) -> PathBuf {
        self.root.join("Shuffled").join("Metadata")
    }

    pub fn bare_metadata(&self) -> PathBuf {
        self.root.join("Shuffled").join("NoJson")
    }
}

/// Which half of an image/metadata pair is missing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OrphanKind {
    Image,
    Metadata,
}

/// Per-item condition recorded during a run. Anomalies never abort a
/// stage; they are counted and reported alongside the stage summary.
#[derive(Debug, Clone)]
pub enum Anomaly {
    MissingTierAssets { tier: RarityTier, detail: String },
    MalformedMetadata { path: PathBuf, detail: String },
    OrphanPair { identifier: u64, missing: OrphanKind },
    LocatorMismatch { path: PathBuf, locator: Option<String> },
    IoFailure { path: PathBuf, detail: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MissingTierAssets { tier, detail } => {
                write!(f, "tier {} skipped: {}", tier, detail)
            }
            Anomaly::MalformedMetadata { path, detail } => {
                write!(f, "malformed metadata {}: {}", path.display(), detail)
            }
            Anomaly::OrphanPair {
                identifier,
                missing: OrphanKind::Metadata,
            } => write!(f, "identifier {} has an image but no metadata", identifier),
            Anomaly::OrphanPair {
                identifier,
                missing: OrphanKind::Image,
            } => write!(f, "identifier {} has metadata but no image", identifier),
            Anomaly::LocatorMismatch {
                path,
                locator: Some(locator),
            } => write!(
                f,
                "unrecognized image locator in {}: {}",
                path.display(),
                locator
            ),
            Anomaly::LocatorMismatch {
                path,
                locator: None,
            } => write!(f, "no image locator in {}", path.display()),
            Anomaly::IoFailure { path, detail } => {
                write!(f, "IO failure on {}: {}", path.display(), detail)
            }
        }
    }
}

/// Remove every regular file directly under `dir`. Returns the number
/// of files removed; a missing directory counts as already clear.
pub fn clear_dir(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    Ok(files)
}
