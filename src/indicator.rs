//! Running-app indicator.
//!
//! When the host reports a monitored application launching or terminating,
//! the indicator updates key images on every active context and pushes the
//! running-apps list to property inspectors. Image work is plain canvas
//! compositing: draw loaded layers at offsets and opacities onto an RGBA
//! canvas and serialize the result to a PNG data URI.

use crate::host::HostHandle;
use crate::image_cache::ImageCache;
use crate::launch::Platform;
use crate::state::PluginState;
use anyhow::{Context, Result};
use base64::Engine;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Canvas size for merged key images (the 144x144 key asset size).
pub const CANVAS_WIDTH: u32 = 144;
pub const CANVAS_HEIGHT: u32 = 144;

/// How long the terminated overlay stays up before keys revert to default.
pub const REVERT_DELAY: Duration = Duration::from_millis(1500);

/// One compositing layer. Load failures surface as a missing image on the
/// layer rather than as an error, so callers branch on status.
pub struct Layer {
    pub source: PathBuf,
    pub image: Option<DynamicImage>,
    pub x: i64,
    pub y: i64,
    pub opacity: f32,
}

impl Layer {
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }
}

pub struct Indicator {
    platform: Platform,
    images_dir: PathBuf,
    cache: ImageCache,
}

impl Indicator {
    pub fn new(platform: Platform, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            images_dir: images_dir.into(),
            cache: ImageCache::new(),
        }
    }

    /// Display name for an application identifier: last dot-component on
    /// mac bundle ids, first elsewhere, with the first letter capitalized.
    pub fn display_name(&self, application: &str) -> String {
        let stem = match self.platform {
            Platform::Mac => application.rsplit('.').next().unwrap_or(application),
            Platform::Windows => application.split('.').next().unwrap_or(application),
        };
        capitalize(stem)
    }

    fn image_path(&self, stem: &str) -> PathBuf {
        self.images_dir.join(format!("{stem}.png"))
    }

    fn load_layer(&mut self, source: PathBuf, x: i64, y: i64, opacity: f32) -> Layer {
        let image = self.cache.load(&source);
        Layer {
            source,
            image,
            x,
            y,
            opacity,
        }
    }

    /// A monitored application launched: show its key image on every active
    /// context (when the asset loads) and record it as running.
    pub fn on_launch(
        &mut self,
        state: &mut PluginState,
        host: &dyn HostHandle,
        application: &str,
    ) -> Result<()> {
        let path = self.image_path(application);
        let layer = self.load_layer(path, 0, 0, 1.0);
        if layer.is_loaded() {
            let image_ref = layer.source.to_string_lossy().into_owned();
            for context in state.contexts_vec() {
                host.set_image(&context, &image_ref)?;
            }
        }

        state.add_running_app(self.display_name(application));
        push_running_apps(state, host)
    }

    /// A monitored application quit: flash the terminated overlay on every
    /// active context, schedule the revert to the default image, and drop
    /// the app from the running list.
    pub fn on_terminate(
        &mut self,
        state: &mut PluginState,
        host: &dyn HostHandle,
        application: &str,
    ) -> Result<()> {
        let app = self.display_name(application);
        state.remove_running_app(&app);

        let app_path = self.image_path(application);
        let overlay_path = self.image_path("terminated");
        let layers = [
            self.load_layer(app_path, 0, 0, 1.0),
            self.load_layer(overlay_path, 0, 0, 1.0),
        ];
        if layers.iter().all(Layer::is_loaded) {
            let uri = merge_layers(&layers, CANVAS_WIDTH, CANVAS_HEIGHT)?;
            for context in state.contexts_vec() {
                host.set_image(&context, &uri)?;
            }
            state.schedule_image_revert(Instant::now() + REVERT_DELAY);
        }

        push_running_apps(state, host)
    }

    /// Revert every active context to the default key image. Called by the
    /// main loop when the revert deadline fires.
    pub fn revert_all(&mut self, state: &mut PluginState, host: &dyn HostHandle) -> Result<()> {
        state.clear_image_revert();
        let default_ref = self.image_path("default").to_string_lossy().into_owned();
        for context in state.contexts_vec() {
            host.set_image(&context, &default_ref)?;
        }
        Ok(())
    }
}

/// Push the running-apps list to every active context's inspector.
fn push_running_apps(state: &PluginState, host: &dyn HostHandle) -> Result<()> {
    let payload = json!({"runningApps": state.running_apps()});
    for context in state.contexts_vec() {
        host.send_to_property_inspector(&context, payload.clone())?;
    }
    Ok(())
}

/// Draw loaded layers onto a transparent canvas at their offsets and
/// opacities, then serialize to a PNG data URI. Unloaded layers are skipped.
pub fn merge_layers(layers: &[Layer], width: u32, height: u32) -> Result<String> {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for layer in layers {
        let Some(image) = &layer.image else {
            continue;
        };
        let mut rgba = image.to_rgba8();
        let opacity = layer.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in rgba.pixels_mut() {
                pixel[3] = (f32::from(pixel[3]) * opacity) as u8;
            }
        }
        image::imageops::overlay(&mut canvas, &rgba, layer.x, layer.y);
    }

    to_data_uri(&DynamicImage::ImageRgba8(canvas))
}

/// PNG-encode an image and wrap it as a base64 data URI.
pub fn to_data_uri(image: &DynamicImage) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .context("Failed to encode merged key image")?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/png;base64,{encoded}"))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
