use super::*;

pub type Radiance = FVec3;
pub type Transmittance = f32;
pub type Extinction = f32;

/// Below this extinction a cell is treated as a vacuum that only emits.
pub const EXTINCTION_EPSILON: f32 = 0.0001;

/// Emission and extinction of a single scene cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub emission: Radiance,
    pub extinction: Extinction,
}
impl Color {
    pub fn new(emission: Radiance, extinction: Extinction) -> Self {
        Self {
            emission,
            extinction,
        }
    }
    /// Closed-form transport through `segment_size` units of this cell,
    /// assuming emission and extinction are constant inside it.
    pub fn as_fluence(&self, segment_size: f32) -> Fluence {
        if self.extinction > EXTINCTION_EPSILON {
            let transmittance = (-self.extinction * segment_size).exp();
            Fluence {
                radiance: self.emission * (1.0 - transmittance) / self.extinction,
                transmittance,
            }
        } else {
            // Limit of the expression above as the extinction goes to zero.
            Fluence {
                radiance: self.emission * segment_size,
                transmittance: 1.0,
            }
        }
    }
}

/// Radiance gathered along a ray interval, together with how much of whatever
/// lies behind the interval still makes it through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluence {
    pub radiance: Radiance,
    pub transmittance: Transmittance,
}

impl Default for Fluence {
    fn default() -> Self {
        Self::transparent()
    }
}

impl Fluence {
    pub fn transparent() -> Self {
        Self {
            radiance: Radiance::ZERO,
            transmittance: 1.0,
        }
    }
    /// Accumulated light; nothing behind it is attenuated any further.
    pub fn light(radiance: Radiance) -> Self {
        Self {
            radiance,
            transmittance: 1.0,
        }
    }
    /// Composes `self` (near) in front of `far`.
    pub fn over(self, far: Fluence) -> Fluence {
        Fluence {
            radiance: self.radiance + self.transmittance * far.radiance,
            transmittance: self.transmittance * far.transmittance,
        }
    }
    /// Composes `self` in front of plain radiance, keeping the near transmittance.
    pub fn over_color(self, far: Radiance) -> Fluence {
        Fluence {
            radiance: self.radiance + self.transmittance * far,
            transmittance: self.transmittance,
        }
    }
    pub fn restrict_angle(self, angle: f32) -> Fluence {
        Fluence {
            radiance: self.radiance * angle,
            transmittance: self.transmittance,
        }
    }
    /// `self` moved `t` of the way toward `other`.
    pub fn lerp(self, other: Fluence, t: f32) -> Fluence {
        Fluence {
            radiance: self.radiance.lerp(other.radiance, t),
            transmittance: self.transmittance + (other.transmittance - self.transmittance) * t,
        }
    }
    pub fn average(self, other: Fluence) -> Fluence {
        self.lerp(other, 0.5)
    }
}
