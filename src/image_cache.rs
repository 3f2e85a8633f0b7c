//! In-memory cache of decoded key images.
//!
//! The indicator reloads the same handful of bundled PNGs on every launch or
//! terminate event; cache them keyed by path and invalidate when the file's
//! mtime changes.

use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

struct CacheEntry {
    image: DynamicImage,
    /// Modification time at cache fill; a mismatch on lookup invalidates.
    mtime: Option<SystemTime>,
}

#[derive(Default)]
pub struct ImageCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an image through the cache. Returns None when the file is
    /// missing or undecodable; the caller treats that as a skipped layer.
    pub fn load(&mut self, path: &Path) -> Option<DynamicImage> {
        let mtime = std::fs::metadata(path).ok().and_then(|m| m.modified().ok());

        if let Some(entry) = self.entries.get(path) {
            if mtime.is_some() && entry.mtime == mtime {
                return Some(entry.image.clone());
            }
        }

        match image::open(path) {
            Ok(image) => {
                self.entries.insert(
                    path.to_path_buf(),
                    CacheEntry {
                        image: image.clone(),
                        mtime,
                    },
                );
                Some(image)
            }
            Err(e) => {
                eprintln!("Failed to load image {}: {e}", path.display());
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn temp_png(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("warudo-deck-{}-{name}", std::process::id()));
        RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn missing_files_load_as_none() {
        let mut cache = ImageCache::new();
        assert!(cache.load(Path::new("no/such/image.png")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn repeated_loads_hit_the_cache() {
        let path = temp_png("cache-hit.png");
        let mut cache = ImageCache::new();

        assert!(cache.load(&path).is_some());
        assert!(cache.load(&path).is_some());
        assert_eq!(cache.len(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
