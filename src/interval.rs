use super::*;

/// Interval `ray` of cascade `level` built from two half-length intervals of
/// `level - 1`, stored in `finer`.
pub fn merge_interval(finer: &CascadeStorage<Fluence>, level: u32, ray: RayLocation) -> Fluence {
    let finer_level = level - 1;
    // Every probe of `level` is the even column `2 * px` of `level - 1`.
    let near_probe = IVec2::new(2 * ray.probe.x as i32, ray.probe.y as i32);

    let merge = |near_facing: u32, far_facing: u32| -> Fluence {
        let near = finer.read(RayLocation::new(near_probe.as_uvec2(), near_facing));
        let offset = interval_offset(finer_level, near_facing);
        let far_probe = near_probe + IVec2::new(1, offset.y);
        match finer.sample(far_probe, far_facing) {
            Some(far) => near.over(far),
            None => near,
        }
    };

    if ray.facing % 2 == 0 {
        let k = ray.facing / 2;
        merge(k, k)
    } else {
        let lower = ray.facing / 2;
        let upper = lower + 1;
        merge(lower, upper).average(merge(upper, lower))
    }
}

/// Fills `T_level` from `T_{level - 1}` without touching the scene.
pub fn merge_up<D: Device>(
    device: &D,
    settings: &CascadeSettings,
    level: u32,
    finer: &CascadeStorage<Fluence>,
    intervals: &mut CascadeStorage<Fluence>,
) -> Result<()> {
    debug_assert!(level >= 1);
    debug_assert_eq!(finer.size(), settings.interval_size(level - 1));
    let size = intervals.size();
    debug_assert_eq!(size, settings.interval_size(level));
    log::debug!("merge up level {}", level);
    device.dispatch(intervals, |texel| merge_interval(finer, level, size.ray(texel)))
}
