use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::Result;

pub const CANVAS_SIZE: u32 = 1024;
pub const CHARACTER_SIZE: u32 = 850;
pub const CHARACTER_OFFSET: i64 = ((CANVAS_SIZE - CHARACTER_SIZE) / 2) as i64;

/// One caption anchored at a vertical center line.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub font_size: f32,
    pub center_y: u32,
}

/// The three caption slots of a composed card: collection title at the
/// top, a small kicker line and the role line inside the lower banner.
#[derive(Debug, Clone)]
pub struct CaptionLayout {
    pub lines: [TextLine; 3],
}

impl CaptionLayout {
    pub fn new(
        title: impl Into<String>,
        kicker: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        CaptionLayout {
            lines: [
                TextLine {
                    text: title.into(),
                    font_size: 34.0,
                    center_y: 97,
                },
                TextLine {
                    text: kicker.into(),
                    font_size: 17.0,
                    center_y: 857,
                },
                TextLine {
                    text: subtitle.into(),
                    font_size: 25.0,
                    center_y: 915,
                },
            ],
        }
    }
}

/// One compositing request: character art, the tier border to frame it
/// with, the captions, and where the flattened card goes.
#[derive(Debug, Clone)]
pub struct ComposeJob {
    pub character: PathBuf,
    pub border: PathBuf,
    pub output: PathBuf,
    pub captions: CaptionLayout,
}

/// External image-rendering collaborator. Implementations must paint
/// character first, border second, both centered on the canvas.
pub trait Compositor {
    fn compose(&self, job: &ComposeJob) -> Result<()>;
}

/// Compositor backed by the `image` crate: resizes the character to
/// 850x850, centers it on a transparent 1024x1024 canvas and
/// alpha-composites the border over it. Caption glyph rasterization is
/// left to implementations with font support.
#[derive(Debug, Default)]
pub struct PngCompositor;

impl Compositor for PngCompositor {
    fn compose(&self, job: &ComposeJob) -> Result<()> {
        let character = image::open(&job.character)?.to_rgba8();
        let character = imageops::resize(
            &character,
            CHARACTER_SIZE,
            CHARACTER_SIZE,
            FilterType::Lanczos3,
        );
        let border = image::open(&job.border)?.to_rgba8();

        let mut canvas = RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE);
        imageops::overlay(&mut canvas, &character, CHARACTER_OFFSET, CHARACTER_OFFSET);
        let border_x = i64::from(CANVAS_SIZE.saturating_sub(border.width()) / 2);
        let border_y = i64::from(CANVAS_SIZE.saturating_sub(border.height()) / 2);
        imageops::overlay(&mut canvas, &border, border_x, border_y);

        canvas.save(&job.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn character_offset_is_87() {
        assert_eq!(CHARACTER_OFFSET, 87);
    }

    #[test]
    fn composes_to_fixed_canvas_size() {
        let dir = tempfile::tempdir().unwrap();
        let character_path = dir.path().join("character.png");
        let border_path = dir.path().join("border.png");
        let output_path = dir.path().join("out.png");

        let mut character = RgbaImage::new(8, 8);
        for pixel in character.pixels_mut() {
            *pixel = Rgba([255, 0, 0, 255]);
        }
        character.save(&character_path).unwrap();
        RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE)
            .save(&border_path)
            .unwrap();

        let job = ComposeJob {
            character: character_path,
            border: border_path,
            output: output_path.clone(),
            captions: CaptionLayout::new("TITLE", "KICKER", "SUBTITLE"),
        };
        PngCompositor.compose(&job).unwrap();

        let out = image::open(&output_path).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        // Character pixels land inside the centered 850x850 region.
        assert_eq!(out.get_pixel(512, 512), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(10, 10), &Rgba([0, 0, 0, 0]));
    }
}
