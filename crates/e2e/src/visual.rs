//! Screenshot comparison: baseline regression checks and before/after diffs

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, Pixel, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::ArtifactsConfig;
use crate::error::{E2eError, E2eResult};

/// Per-channel difference tolerated before a pixel counts as changed
const CHANNEL_TOLERANCE: i32 = 5;

/// Result of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the images match (within threshold)
    pub matches: bool,

    /// Percentage of pixels that differ
    pub diff_percent: f64,

    pub diff_pixels: u64,
    pub total_pixels: u64,

    /// Red-on-dimmed diff image, written only when pixels differ
    pub diff_image_path: Option<PathBuf>,

    pub actual_hash: String,
    pub expected_hash: String,
}

#[derive(Debug, Clone)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub threshold: f64,
    /// Copy the actual screenshot into place when a baseline is missing
    pub auto_update: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self::from(&ArtifactsConfig::default())
    }
}

impl From<&ArtifactsConfig> for VisualConfig {
    fn from(artifacts: &ArtifactsConfig) -> Self {
        Self {
            baseline_dir: artifacts.baseline_dir.clone(),
            actual_dir: artifacts.screenshot_dir.clone(),
            diff_dir: artifacts.diff_dir.clone(),
            threshold: artifacts.visual_threshold,
            auto_update: false,
        }
    }
}

pub struct VisualTester {
    config: VisualConfig,
}

impl VisualTester {
    pub fn new(config: VisualConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.actual_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;
        Ok(Self { config })
    }

    pub fn actual_path(&self, name: &str) -> PathBuf {
        self.config.actual_dir.join(format!("{}.png", name))
    }

    fn baseline_path(&self, name: &str) -> PathBuf {
        self.config.baseline_dir.join(format!("{}.png", name))
    }

    /// Compare `<actual_dir>/<name>.png` with its baseline
    pub fn compare(&self, name: &str, threshold: Option<f64>) -> E2eResult<VisualDiff> {
        let threshold = threshold.unwrap_or(self.config.threshold);
        let actual_path = self.actual_path(name);
        let baseline_path = self.baseline_path(name);

        if !actual_path.exists() {
            return Err(E2eError::ScreenshotMissing(actual_path.to_string_lossy().to_string()));
        }

        if !baseline_path.exists() {
            if !self.config.auto_update {
                return Err(E2eError::BaselineNotFound(baseline_path.to_string_lossy().to_string()));
            }
            info!("Creating baseline for '{}'", name);
            std::fs::copy(&actual_path, &baseline_path)?;
            let hash = hash_file(&actual_path)?;
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: 0,
                diff_image_path: None,
                actual_hash: hash.clone(),
                expected_hash: hash,
            });
        }

        let diff = self.diff_files(name, &actual_path, &baseline_path, threshold)?;
        if !diff.matches {
            warn!(
                "Visual regression in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
                name, diff.diff_percent, threshold
            );
        }
        Ok(diff)
    }

    /// Compare two arbitrary screenshots; the diff image is named after `name`
    pub fn diff_files(&self, name: &str, actual: &Path, expected: &Path, threshold: f64) -> E2eResult<VisualDiff> {
        let actual_hash = hash_file(actual)?;
        let expected_hash = hash_file(expected)?;
        let actual_img = image::open(actual)?;

        if actual_hash == expected_hash {
            debug!("Screenshots are byte-identical");
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: u64::from(actual_img.width()) * u64::from(actual_img.height()),
                diff_image_path: None,
                actual_hash,
                expected_hash,
            });
        }

        let expected_img = image::open(expected)?;
        let (diff_pixels, total_pixels, diff_img) = pixel_diff(&actual_img, &expected_img);
        let diff_percent = if total_pixels == 0 {
            0.0
        } else {
            diff_pixels as f64 / total_pixels as f64 * 100.0
        };

        let diff_image_path = if diff_pixels > 0 {
            let path = self.config.diff_dir.join(format!("{}-diff.png", name));
            diff_img.save(&path)?;
            Some(path)
        } else {
            None
        };

        Ok(VisualDiff {
            matches: diff_percent <= threshold,
            diff_percent,
            diff_pixels,
            total_pixels,
            diff_image_path,
            actual_hash,
            expected_hash,
        })
    }

    pub fn update_baseline(&self, name: &str) -> E2eResult<()> {
        let actual_path = self.actual_path(name);
        if !actual_path.exists() {
            return Err(E2eError::ScreenshotMissing(actual_path.to_string_lossy().to_string()));
        }
        std::fs::copy(&actual_path, self.baseline_path(name))?;
        info!("Updated baseline for '{}'", name);
        Ok(())
    }

    /// Promote the named screenshots to baselines
    pub fn update_baselines(&self, names: &[String]) -> E2eResult<usize> {
        for name in names {
            self.update_baseline(name)?;
        }
        Ok(names.len())
    }

    pub fn list_baselines(&self) -> E2eResult<Vec<String>> {
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.config.baseline_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "png").unwrap_or(false))
            .filter_map(|e| e.path().file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn clean_diffs(&self) -> E2eResult<()> {
        for entry in std::fs::read_dir(&self.config.diff_dir)? {
            std::fs::remove_file(entry?.path())?;
        }
        Ok(())
    }
}

/// Count differing pixels over the larger canvas; area outside the overlap
/// counts as changed.
fn pixel_diff(actual: &DynamicImage, expected: &DynamicImage) -> (u64, u64, RgbaImage) {
    if actual.dimensions() != expected.dimensions() {
        warn!(
            "Screenshot dimensions differ: {:?} vs {:?}",
            actual.dimensions(),
            expected.dimensions()
        );
    }

    let width = actual.width().max(expected.width());
    let height = actual.height().max(expected.height());
    let actual = actual.to_rgba8();
    let expected = expected.to_rgba8();

    let mut diff_img = RgbaImage::new(width, height);
    let mut diff_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let in_actual = x < actual.width() && y < actual.height();
            let in_expected = x < expected.width() && y < expected.height();

            if in_actual && in_expected {
                let a = actual.get_pixel(x, y);
                if pixels_differ(a, expected.get_pixel(x, y)) {
                    diff_pixels += 1;
                    diff_img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                } else {
                    let c = a.channels();
                    diff_img.put_pixel(x, y, Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]));
                }
            } else {
                diff_pixels += 1;
                diff_img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
    }

    (diff_pixels, u64::from(width) * u64::from(height), diff_img)
}

fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(x, y)| (i32::from(*x) - i32::from(*y)).abs() > CHANNEL_TOLERANCE)
}

fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tester(dir: &TempDir, auto_update: bool) -> VisualTester {
        VisualTester::new(VisualConfig {
            baseline_dir: dir.path().join("baselines"),
            actual_dir: dir.path().join("actual"),
            diff_dir: dir.path().join("diffs"),
            threshold: 1.0,
            auto_update,
        })
        .unwrap()
    }

    fn write_png(path: &Path, width: u32, height: u32, paint: impl Fn(u32, u32) -> [u8; 4]) {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba(paint(x, y)));
        img.save(path).unwrap();
    }

    #[test]
    fn test_identical_screenshots_match() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, false);
        write_png(&t.actual_path("login"), 10, 10, |_, _| [255, 255, 255, 255]);
        std::fs::copy(t.actual_path("login"), t.baseline_path("login")).unwrap();

        let diff = t.compare("login", None).unwrap();
        assert!(diff.matches);
        assert_eq!(diff.total_pixels, 100);
        assert_eq!(diff.actual_hash, diff.expected_hash);
    }

    #[test]
    fn test_changed_pixels_exceed_threshold() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, false);
        write_png(&t.baseline_path("dash"), 10, 10, |_, _| [255, 255, 255, 255]);
        // top two rows turned dark: 20% of pixels
        write_png(&t.actual_path("dash"), 10, 10, |_, y| {
            if y < 2 { [20, 20, 20, 255] } else { [255, 255, 255, 255] }
        });

        let diff = t.compare("dash", None).unwrap();
        assert!(!diff.matches);
        assert_eq!(diff.diff_pixels, 20);
        assert!((diff.diff_percent - 20.0).abs() < 1e-9);
        assert!(diff.diff_image_path.unwrap().exists());
    }

    #[test]
    fn test_small_color_noise_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, false);
        write_png(&t.baseline_path("noise"), 4, 4, |_, _| [100, 100, 100, 255]);
        write_png(&t.actual_path("noise"), 4, 4, |_, _| [103, 98, 100, 255]);

        let diff = t.compare("noise", None).unwrap();
        assert!(diff.matches);
        assert_eq!(diff.diff_pixels, 0);
        assert!(diff.diff_image_path.is_none());
    }

    #[test]
    fn test_size_change_counts_as_diff() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, false);
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, 10, 10, |_, _| [0, 0, 0, 255]);
        write_png(&b, 10, 5, |_, _| [0, 0, 0, 255]);

        let diff = t.diff_files("resize", &a, &b, 1.0).unwrap();
        assert_eq!(diff.total_pixels, 100);
        assert_eq!(diff.diff_pixels, 50);
        assert!(!diff.matches);
    }

    #[test]
    fn test_missing_baseline() {
        let dir = TempDir::new().unwrap();
        let strict = tester(&dir, false);
        write_png(&strict.actual_path("new"), 2, 2, |_, _| [1, 2, 3, 255]);
        assert!(matches!(strict.compare("new", None), Err(E2eError::BaselineNotFound(_))));

        let auto = tester(&dir, true);
        assert!(auto.compare("new", None).unwrap().matches);
        assert_eq!(auto.list_baselines().unwrap(), vec!["new".to_string()]);
    }

    #[test]
    fn test_missing_capture_is_not_a_missing_baseline() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, true);
        write_png(&t.baseline_path("gone"), 2, 2, |_, _| [0, 0, 0, 255]);

        assert!(matches!(t.compare("gone", None), Err(E2eError::ScreenshotMissing(_))));
        assert!(matches!(t.compare("never", None), Err(E2eError::ScreenshotMissing(_))));
        assert!(matches!(t.update_baseline("never"), Err(E2eError::ScreenshotMissing(_))));
        assert!(t.list_baselines().unwrap().iter().all(|name| name != "never"));
    }

    #[test]
    fn test_update_baselines() {
        let dir = TempDir::new().unwrap();
        let t = tester(&dir, false);
        write_png(&t.actual_path("b"), 2, 2, |_, _| [0, 0, 0, 255]);
        write_png(&t.actual_path("a"), 2, 2, |_, _| [0, 0, 0, 255]);

        let updated = t.update_baselines(&["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(updated, 2);
        assert_eq!(t.list_baselines().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(t.update_baseline("missing").is_err());
    }
}
