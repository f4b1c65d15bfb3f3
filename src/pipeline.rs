use std::time::Instant;

use image::{Rgb, RgbImage};

use super::*;

/// Per-pixel fluence at scene resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FluenceBuffer {
    size: UVec2,
    data: Vec<Radiance>,
}

impl FluenceBuffer {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            data: vec![Radiance::ZERO; size.x as usize * size.y as usize],
        }
    }
    pub fn size(&self) -> UVec2 {
        self.size
    }
    pub fn width(&self) -> u32 {
        self.size.x
    }
    pub fn height(&self) -> u32 {
        self.size.y
    }
    pub fn data(&self) -> &[Radiance] {
        &self.data
    }
    pub fn get(&self, x: u32, y: u32) -> Radiance {
        self.data[y as usize * self.size.x as usize + x as usize]
    }
    pub fn add(&mut self, x: u32, y: u32, radiance: Radiance) {
        self.data[y as usize * self.size.x as usize + x as usize] += radiance;
    }
    pub fn max(&self) -> f32 {
        self.data
            .iter()
            .map(|radiance| radiance.max_element())
            .fold(0.0, f32::max)
    }

    pub fn to_image(&self, exposure: f32) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let color = self.get(x, y) * exposure;
            let mapped = (color / (color + 1.0)).powf(1.0 / 2.2);
            let [r, g, b] = (mapped.clamp(Radiance::ZERO, Radiance::ONE) * 255.0)
                .round()
                .to_array();
            Rgb([r as u8, g as u8, b as u8])
        })
    }
    pub fn save_png(&self, path: impl AsRef<Path>, exposure: f32) -> Result<()> {
        self.to_image(exposure).save(path.as_ref())?;
        log::info!("Wrote fluence to {:?}", path.as_ref());
        Ok(())
    }
}

/// Owns every cascade buffer and runs the passes in dependency order.
///
/// The buffers are sized for the last scene seen and are reallocated when a
/// scene of a different size arrives.
pub struct Pipeline<D: Device> {
    device: D,
    settings: Option<CascadeSettings>,
    intervals: Vec<CascadeStorage<Fluence>>,
    radiance: Vec<CascadeStorage<Fluence>>,
    output: Option<FluenceBuffer>,
    dirty: bool,
}

impl<D: Device> Pipeline<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            settings: None,
            intervals: Vec::new(),
            radiance: Vec::new(),
            output: None,
            dirty: true,
        }
    }
    pub fn device(&self) -> &D {
        &self.device
    }
    pub fn cascade_settings(&self) -> Option<&CascadeSettings> {
        self.settings.as_ref()
    }
    pub fn intervals(&self) -> &[CascadeStorage<Fluence>] {
        &self.intervals
    }
    pub fn radiance(&self) -> &[CascadeStorage<Fluence>] {
        &self.radiance
    }
    /// Last successfully computed fluence.
    pub fn output(&self) -> Option<&FluenceBuffer> {
        self.output.as_ref()
    }
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Allocates `T_0..=T_N` and `R_0..R_N` for `scene_size`, keeping the
    /// current buffers if the size is unchanged.
    pub fn configure(&mut self, scene_size: UVec2) -> CascadeSettings {
        if let Some(settings) = self.settings.filter(|s| s.scene_size == scene_size) {
            return settings;
        }
        let settings = CascadeSettings::new(scene_size);
        self.intervals = (0..=settings.top_level)
            .map(|level| CascadeStorage::new(settings.interval_size(level)))
            .collect();
        self.radiance = (0..settings.top_level)
            .map(|level| CascadeStorage::new(settings.radiance_size(level)))
            .collect();
        log::debug!(
            "Allocated {} cascades for a {}x{} scene",
            settings.num_cascades(),
            scene_size.x,
            scene_size.y
        );
        self.settings = Some(settings);
        self.dirty = true;
        settings
    }

    /// Recomputes only if something marked the pipeline dirty.
    pub fn update(&mut self, scene: &Scene) -> Result<Option<&FluenceBuffer>> {
        self.configure(scene.size());
        if !self.dirty {
            return Ok(None);
        }
        self.recompute(scene).map(Some)
    }

    /// Runs every pass for `scene`. On failure the previous output is kept.
    pub fn recompute(&mut self, scene: &Scene) -> Result<&FluenceBuffer> {
        if scene.width() == 0 || scene.height() == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "scene must not be empty, got {}x{}",
                scene.width(),
                scene.height()
            )));
        }
        let settings = self.configure(scene.size());
        let start = Instant::now();

        self.run_passes(scene, &settings)?;

        let mut fluence = FluenceBuffer::new(settings.scene_size);
        for (out, value) in fluence.data.iter_mut().zip(self.radiance[0].as_slice()) {
            *out = value.radiance;
        }
        self.dirty = false;
        log::debug!(
            "Recomputed {}x{} fluence on {} in {:.2}ms",
            settings.width(),
            settings.height(),
            self.device.name(),
            start.elapsed().as_secs_f32() * 1000.0
        );
        Ok(self.output.insert(fluence))
    }

    fn run_passes(&mut self, scene: &Scene, settings: &CascadeSettings) -> Result<()> {
        let top = settings.top_level;

        for level in 0..TRACED_CASCADES.min(top + 1) {
            trace_base(
                &self.device,
                scene,
                settings,
                level,
                &mut self.intervals[level as usize],
            )?;
        }

        for level in TRACED_CASCADES..=top {
            let (finer, rest) = self.intervals.split_at_mut(level as usize);
            merge_up(
                &self.device,
                settings,
                level,
                &finer[level as usize - 1],
                &mut rest[0],
            )?;
        }

        for level in (0..top).rev() {
            let (lower, upper) = self.radiance.split_at_mut(level as usize + 1);
            let sources = MergeSources {
                intervals: &self.intervals[level as usize],
                coarse_intervals: &self.intervals[level as usize + 1],
                coarse_radiance: upper.first(),
            };
            merge_down(&self.device, settings, level, sources, &mut lower[level as usize])?;
        }
        Ok(())
    }
}
