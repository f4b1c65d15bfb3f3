use super::*;

/// Smallest top cascade index, whatever the scene size.
pub const MIN_TOP_LEVEL: u32 = 4;

fn ceil_log2(x: u32) -> u32 {
    if x <= 1 {
        0
    } else {
        u32::BITS - (x - 1).leading_zeros()
    }
}

/// Probe spacing along the ray axis at `level`.
pub fn step(level: u32) -> u32 {
    1 << level
}

/// Number of radiance cones at `level`. Interval facings number `2 * dirs + 1`.
pub fn dirs(level: u32) -> u32 {
    1 << level
}

/// Far endpoint of interval facing `facing` (the doubled half-integer index)
/// relative to its probe: `(step, 2k - step)` with `k = facing / 2`.
pub fn interval_offset(level: u32, facing: u32) -> IVec2 {
    let step = step(level) as i32;
    IVec2::new(step, facing as i32 - step)
}

/// Flat row of `(py, facing)` in a packed cascade image.
pub fn packed_row(py: u32, facing: u32, height: u32) -> u32 {
    py + height * facing
}

/// Geometry of the whole hierarchy for a given scene size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSettings {
    pub scene_size: UVec2,
    /// Index `N` of the top cascade. Intervals exist for `0..=N`, radiance for `0..N`.
    pub top_level: u32,
}
impl CascadeSettings {
    pub fn new(scene_size: UVec2) -> Self {
        let top_level = ceil_log2(scene_size.max_element()).max(MIN_TOP_LEVEL);
        Self {
            scene_size,
            top_level,
        }
    }
    pub fn width(&self) -> u32 {
        self.scene_size.x
    }
    pub fn height(&self) -> u32 {
        self.scene_size.y
    }
    /// Number of interval cascades, `N + 1`.
    pub fn num_cascades(&self) -> u32 {
        self.top_level + 1
    }
    pub fn probe_count(&self, level: u32) -> UVec2 {
        UVec2::new(self.width().div_ceil(step(level)), self.height())
    }
    pub fn interval_size(&self, level: u32) -> CascadeSize {
        CascadeSize {
            probes: self.probe_count(level),
            facings: 2 * dirs(level) + 1,
        }
    }
    pub fn radiance_size(&self, level: u32) -> CascadeSize {
        CascadeSize {
            probes: self.probe_count(level),
            facings: dirs(level),
        }
    }
    /// Scene-space cell of a probe. Only the ray axis is subsampled.
    pub fn probe_location(&self, probe: UVec2, level: u32) -> IVec2 {
        IVec2::new((probe.x * step(level)) as i32, probe.y as i32)
    }
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as u32) < self.width()
            && (cell.y as u32) < self.height()
    }
}

/// Dimensions of one packed cascade buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSize {
    /// Probe columns and rows.
    pub probes: UVec2,
    pub facings: u32,
}
impl CascadeSize {
    /// Extent of the packed image: probe columns by `rows * facings`.
    pub fn extent(&self) -> UVec2 {
        UVec2::new(self.probes.x, self.probes.y * self.facings)
    }
    pub fn len(&self) -> usize {
        self.probes.x as usize * self.probes.y as usize * self.facings as usize
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn texel(&self, ray: RayLocation) -> UVec2 {
        UVec2::new(
            ray.probe.x,
            packed_row(ray.probe.y, ray.facing, self.probes.y),
        )
    }
    pub fn ray(&self, texel: UVec2) -> RayLocation {
        RayLocation {
            probe: UVec2::new(texel.x, texel.y % self.probes.y),
            facing: texel.y / self.probes.y,
        }
    }
    pub fn index(&self, ray: RayLocation) -> usize {
        let texel = self.texel(ray);
        texel.y as usize * self.probes.x as usize + texel.x as usize
    }
    pub fn unpack(&self, index: usize) -> RayLocation {
        let width = self.probes.x as usize;
        self.ray(UVec2::new((index % width) as u32, (index / width) as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RayLocation {
    pub probe: UVec2,
    pub facing: u32,
}
impl RayLocation {
    pub fn new(probe: UVec2, facing: u32) -> Self {
        Self { probe, facing }
    }
}

/// One cascade's worth of per-probe, per-facing values in the packed layout.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStorage<T> {
    size: CascadeSize,
    buffer: Vec<T>,
}
impl<T: Copy + Default> CascadeStorage<T> {
    pub fn new(size: CascadeSize) -> Self {
        Self {
            size,
            buffer: vec![T::default(); size.len()],
        }
    }
    pub fn size(&self) -> CascadeSize {
        self.size
    }
    pub fn read(&self, ray: RayLocation) -> T {
        self.buffer[self.size.index(ray)]
    }
    pub fn write(&mut self, ray: RayLocation, value: T) {
        let index = self.size.index(ray);
        self.buffer[index] = value;
    }
    /// Bounds-checked lookup by signed probe coordinates.
    pub fn sample(&self, probe: IVec2, facing: u32) -> Option<T> {
        debug_assert!(facing < self.size.facings);
        if probe.x < 0
            || probe.y < 0
            || probe.x as u32 >= self.size.probes.x
            || probe.y as u32 >= self.size.probes.y
        {
            return None;
        }
        Some(self.read(RayLocation::new(probe.as_uvec2(), facing)))
    }
    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buffer
    }
}
