//! Heightmap loading and sampling

use std::path::Path;

use relief_core::{ReliefError, Result};

/// A 2D grid of elevation samples.
///
/// `elevation` is only defined for `0 <= x < width` and `0 <= y < height`.
/// Callers wrap out-of-range coordinates themselves, normally through
/// [`HeightSampler::wrapped`].
pub trait HeightSampler {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn elevation(&self, x: u32, y: u32) -> f32;

    /// Toroidal access: `elevation(x mod width, y mod height)`
    fn wrapped(&self, x: u32, y: u32) -> f32 {
        self.elevation(x % self.width(), y % self.height())
    }
}

/// Elevation samples decoded from an image's red channel, in [0..255]
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    /// Row-major elevation values
    heights: Vec<f32>,
    width: u32,
    height: u32,
}

impl Heightmap {
    /// Load a heightmap from any image format the `image` crate decodes.
    /// Elevation is taken from the red channel of the 8-bit RGB conversion.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| ReliefError::resource_load(path, e))?;
        let rgb = img.into_rgb8();
        let (width, height) = rgb.dimensions();

        let heights = rgb.pixels().map(|p| p.0[0] as f32).collect();

        log::debug!("Loaded heightmap {} ({}x{})", path.display(), width, height);

        Ok(Self {
            heights,
            width,
            height,
        })
    }

    /// Create a heightmap from raw row-major data
    pub fn from_raw(heights: Vec<f32>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize;
        if heights.len() != expected {
            return Err(ReliefError::Config(format!(
                "heightmap data has {} samples, expected {}x{} = {}",
                heights.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            heights,
            width,
            height,
        })
    }

    /// Build a heightmap by evaluating `f(x, y)` for every sample
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let mut heights = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                heights.push(f(x, y));
            }
        }
        Self {
            heights,
            width,
            height,
        }
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }
}

impl HeightSampler for Heightmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn elevation(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.width + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_access_is_toroidal() {
        let hm = Heightmap::from_fn(3, 2, |x, y| (y * 3 + x) as f32);
        assert_eq!(hm.wrapped(3, 0), hm.elevation(0, 0));
        assert_eq!(hm.wrapped(4, 1), hm.elevation(1, 1));
        assert_eq!(hm.wrapped(2, 2), hm.elevation(2, 0));
        assert_eq!(hm.wrapped(3, 2), hm.elevation(0, 0));
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(Heightmap::from_raw(vec![0.0; 6], 3, 2).is_ok());
        assert!(matches!(
            Heightmap::from_raw(vec![0.0; 5], 3, 2),
            Err(ReliefError::Config(_))
        ));
    }

    #[test]
    fn load_missing_file_is_resource_failure() {
        let err = Heightmap::load(Path::new("does/not/exist.ppm")).unwrap_err();
        assert!(matches!(err, ReliefError::ResourceLoad { .. }));
    }

    #[test]
    fn load_reads_red_channel() {
        let dir = std::env::temp_dir().join(format!("relief-hm-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("height.png");

        let mut img = image::RgbImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgb([10, 200, 200]));
        img.put_pixel(1, 0, image::Rgb([20, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([30, 0, 0]));
        img.put_pixel(1, 1, image::Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let hm = Heightmap::load(&path).unwrap();
        assert_eq!((hm.width(), hm.height()), (2, 2));
        assert_eq!(hm.heights(), &[10.0, 20.0, 30.0, 255.0]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
