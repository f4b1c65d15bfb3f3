use super::*;

/// Angle subtended by cone `cone` of cascade `level`, bounded by the interval
/// facings `2 * cone` and `2 * cone + 2`.
pub fn cone_angular_size(level: u32, cone: u32) -> f32 {
    let step = step(level) as f32;
    let lower = interval_offset(level, 2 * cone).y as f32;
    let upper = interval_offset(level, 2 * cone + 2).y as f32;
    upper.atan2(step) - lower.atan2(step)
}

/// `near` in front of already-accumulated radiance. The result keeps `near`'s
/// transmittance.
pub fn merge_r(near: Fluence, far_radiance: Radiance) -> Fluence {
    near.over_color(far_radiance)
}

/// Inputs of one merge-down pass: `T_level`, `T_{level + 1}` and, unless
/// `level + 1` is the top cascade, `R_{level + 1}`.
#[derive(Clone, Copy)]
pub struct MergeSources<'a> {
    pub intervals: &'a CascadeStorage<Fluence>,
    pub coarse_intervals: &'a CascadeStorage<Fluence>,
    pub coarse_radiance: Option<&'a CascadeStorage<Fluence>>,
}

impl MergeSources<'_> {
    fn far_radiance(&self, probe: IVec2, cone: u32) -> Radiance {
        self.coarse_radiance
            .and_then(|radiance| radiance.sample(probe, cone))
            .map_or(Radiance::ZERO, |fluence| fluence.radiance)
    }
}

/// Share of a child cone's far radiance that is read along the centre ray of
/// the parent cone. The rest is read along the parent's boundary ray.
fn centre_weight(level: u32) -> f32 {
    if level == 0 { 0.5 } else { 0.25 }
}

/// Radiance cone `ray` of cascade `level`.
pub fn merge_radiance(sources: MergeSources, level: u32, ray: RayLocation) -> Fluence {
    let cone = ray.facing;
    let probe = ray.probe.as_ivec2();
    let centre = 2 * cone + 1;
    let weight = centre_weight(level);

    let mut total = Radiance::ZERO;
    // Each cone splits into two cones of the next level, bounded by the lower
    // and upper interval facings of this one. Both meet at the centre facing,
    // so each child is read along its boundary facing and along the centre.
    for (branch, facing) in [(2 * cone, 2 * cone), (2 * cone + 1, 2 * cone + 2)] {
        let angle = cone_angular_size(level + 1, branch);

        let merged = if probe.x % 2 == 1 {
            let along = |facing: u32| {
                let near = sources
                    .intervals
                    .read(RayLocation::new(ray.probe, facing))
                    .restrict_angle(angle);
                let offset = interval_offset(level, facing);
                let far_probe = IVec2::new((probe.x + 1) / 2, probe.y + offset.y);
                merge_r(near, sources.far_radiance(far_probe, branch))
            };
            along(facing).lerp(along(centre), weight)
        } else {
            // This probe is also a probe of the next level. Sampling it only
            // through the neighbouring column would count the same ray twice,
            // so blend the coarse value here with a twice-as-long interval.
            let coarse_probe = IVec2::new(probe.x / 2, probe.y);
            let same = Fluence::light(sources.far_radiance(coarse_probe, branch));
            let along = |facing: u32| {
                let near = sources
                    .coarse_intervals
                    .read(RayLocation::new(coarse_probe.as_uvec2(), 2 * facing))
                    .restrict_angle(angle);
                let offset = interval_offset(level, facing);
                let far_probe = coarse_probe + IVec2::new(1, 2 * offset.y);
                merge_r(near, sources.far_radiance(far_probe, branch))
            };
            same.average(along(facing).lerp(along(centre), weight))
        };
        total += merged.radiance;
    }
    Fluence::light(total)
}

/// Fills `R_level` from the coarser radiance and the interval buffers.
pub fn merge_down<D: Device>(
    device: &D,
    settings: &CascadeSettings,
    level: u32,
    sources: MergeSources,
    radiance: &mut CascadeStorage<Fluence>,
) -> Result<()> {
    let size = radiance.size();
    debug_assert_eq!(size, settings.radiance_size(level));
    debug_assert_eq!(sources.intervals.size(), settings.interval_size(level));
    debug_assert_eq!(sources.coarse_intervals.size(), settings.interval_size(level + 1));
    debug_assert_eq!(sources.coarse_radiance.is_some(), level + 1 < settings.top_level);
    log::debug!("merge down level {}", level);
    device.dispatch(radiance, |texel| merge_radiance(sources, level, size.ray(texel)))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn constant(size: CascadeSize, fluence: Fluence) -> CascadeStorage<Fluence> {
        let mut storage = CascadeStorage::new(size);
        storage.as_mut_slice().fill(fluence);
        storage
    }

    #[test]
    fn cones_tile_the_quadrant() {
        for level in 0..6 {
            let total = (0..dirs(level))
                .map(|cone| cone_angular_size(level, cone))
                .sum::<f32>();
            assert!((total - FRAC_PI_2).abs() < 1e-5, "level {level}");
        }
        assert!((cone_angular_size(0, 0) - FRAC_PI_2).abs() < 1e-6);
        // Cones near the axis are wider than the diagonal ones.
        assert!(cone_angular_size(3, 3) > cone_angular_size(3, 0));
    }

    #[test]
    fn merge_r_keeps_near_transmittance() {
        let near = Fluence {
            radiance: Radiance::splat(1.0),
            transmittance: 0.5,
        };
        let merged = merge_r(near, Radiance::splat(2.0));
        assert_eq!(merged.radiance, Radiance::splat(2.0));
        assert_eq!(merged.transmittance, 0.5);
    }

    #[test]
    fn top_cascade_only_sees_its_intervals() {
        let settings = CascadeSettings::new(UVec2::new(16, 16));
        let level = settings.top_level - 1;
        let glow = Fluence {
            radiance: Radiance::ONE,
            transmittance: 0.5,
        };
        let intervals = constant(settings.interval_size(level), glow);
        let coarse_intervals = constant(settings.interval_size(level + 1), glow);
        let sources = MergeSources {
            intervals: &intervals,
            coarse_intervals: &coarse_intervals,
            coarse_radiance: None,
        };
        for cone in 0..dirs(level) {
            let expected = cone_angular_size(level + 1, 2 * cone)
                + cone_angular_size(level + 1, 2 * cone + 1);
            // Even column: average of zero and the coarse interval.
            let even = merge_radiance(sources, level, RayLocation::new(UVec2::new(0, 5), cone));
            assert!((even.radiance.x - expected / 2.0).abs() < 1e-5);
            assert_eq!(even.transmittance, 1.0);
        }
    }

    #[test]
    fn odd_column_reaches_the_next_probe() {
        let settings = CascadeSettings::new(UVec2::new(16, 16));
        let level = 1;
        let clear = Fluence::transparent();
        let intervals = constant(settings.interval_size(level), clear);
        let coarse_intervals = constant(settings.interval_size(level + 1), clear);
        let mut coarse_radiance = CascadeStorage::new(settings.radiance_size(level + 1));
        // Light arrives at level 2 probe column 1 through its cone 2 only.
        for py in 0..16 {
            coarse_radiance.write(
                RayLocation::new(UVec2::new(1, py), 2),
                Fluence::light(Radiance::splat(3.0)),
            );
        }
        let sources = MergeSources {
            intervals: &intervals,
            coarse_intervals: &coarse_intervals,
            coarse_radiance: Some(&coarse_radiance),
        };
        // Cone 1 of level 1 splits into cones 2 and 3 of level 2.
        let lit = merge_radiance(sources, level, RayLocation::new(UVec2::new(1, 8), 1));
        assert!((lit.radiance.x - 3.0).abs() < 1e-6);
        let dark = merge_radiance(sources, level, RayLocation::new(UVec2::new(1, 8), 0));
        assert_eq!(dark.radiance, Radiance::ZERO);
        // Even column: half from the same probe, half from column 2 which is dark.
        let even = merge_radiance(sources, level, RayLocation::new(UVec2::new(2, 8), 1));
        assert!((even.radiance.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn centre_ray_feeds_both_children() {
        let settings = CascadeSettings::new(UVec2::new(16, 16));
        let level = 1;
        let clear = Fluence::transparent();
        let intervals = constant(settings.interval_size(level), clear);
        let coarse_intervals = constant(settings.interval_size(level + 1), clear);
        let mut coarse_radiance = CascadeStorage::new(settings.radiance_size(level + 1));
        // Cone 0 of level 1 has boundary facings 0 and 2 and centre facing 1.
        // From probe (1, 8) these end at rows 6, 8 and 7 of level 2 column 1.
        for cone in [0, 1] {
            coarse_radiance.write(
                RayLocation::new(UVec2::new(1, 7), cone),
                Fluence::light(Radiance::splat(4.0)),
            );
        }
        let sources = MergeSources {
            intervals: &intervals,
            coarse_intervals: &coarse_intervals,
            coarse_radiance: Some(&coarse_radiance),
        };
        let lit = merge_radiance(sources, level, RayLocation::new(UVec2::new(1, 8), 0));
        let expected = 2.0 * centre_weight(level) * 4.0;
        assert!((lit.radiance.x - expected).abs() < 1e-6, "{}", lit.radiance.x);
        // One row further up only the upper boundary ray ends on the lit row.
        let upper = merge_radiance(sources, level, RayLocation::new(UVec2::new(1, 7), 0));
        let expected = (1.0 - centre_weight(level)) * 4.0;
        assert!((upper.radiance.x - expected).abs() < 1e-6, "{}", upper.radiance.x);
    }

    #[test]
    fn even_column_reads_the_centre_of_the_long_interval() {
        let settings = CascadeSettings::new(UVec2::new(16, 16));
        let level = 0;
        let clear = Fluence::transparent();
        let intervals = constant(settings.interval_size(level), clear);
        let coarse_intervals = constant(settings.interval_size(level + 1), clear);
        let mut coarse_radiance = CascadeStorage::new(settings.radiance_size(level + 1));
        // Level 0 cone 0 has its centre on the axis; the doubled interval from
        // even probe (2, 8) ends at level 1 column 2, row 8.
        for cone in [0, 1] {
            coarse_radiance.write(
                RayLocation::new(UVec2::new(2, 8), cone),
                Fluence::light(Radiance::splat(2.0)),
            );
        }
        let sources = MergeSources {
            intervals: &intervals,
            coarse_intervals: &coarse_intervals,
            coarse_radiance: Some(&coarse_radiance),
        };
        let even = merge_radiance(sources, level, RayLocation::new(UVec2::new(2, 8), 0));
        // Half comes from the dark probe shared with level 1.
        let expected = 2.0 * 0.5 * centre_weight(level) * 2.0;
        assert!((even.radiance.x - expected).abs() < 1e-6, "{}", even.radiance.x);
    }
}
