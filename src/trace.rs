use super::*;

/// Segments shorter than this carry no light.
pub const MIN_SEGMENT_LENGTH: f32 = 0.001;
/// Hard cap on cells visited by one walk.
pub const MAX_STEPS: u32 = 512;

/// Number of base cascades that are ray-marched directly; the rest are merged.
pub const TRACED_CASCADES: u32 = 3;

fn axis_setup(start: f32, cell: i32, dir: f32) -> (i32, f32, f32) {
    if dir > 0.0 {
        let delta = dir.recip();
        (1, delta, (cell as f32 + 1.0 - start) * delta)
    } else if dir < 0.0 {
        let delta = -dir.recip();
        (-1, delta, (start - cell as f32) * delta)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

/// Marches the scene grid from `ray_start` to `ray_end`, compositing every
/// cell crossed front to back.
pub fn trace_interval(scene: &Scene, ray_start: Vec2, ray_end: Vec2) -> Fluence {
    let delta = ray_end - ray_start;
    let dist = delta.length();
    if dist < MIN_SEGMENT_LENGTH {
        return Fluence::transparent();
    }
    let ray_dir = delta / dist;

    let mut pos = ray_start.floor().as_ivec2();
    let end_pos = ray_end.floor().as_ivec2();

    let (step_x, delta_x, side_x) = axis_setup(ray_start.x, pos.x, ray_dir.x);
    let (step_y, delta_y, side_y) = axis_setup(ray_start.y, pos.y, ray_dir.y);
    let ray_step = IVec2::new(step_x, step_y);
    let delta_dist = Vec2::new(delta_x, delta_y);
    let mut side_dist = Vec2::new(side_x, side_y);

    // A 4-connected walk enters one cell per axis crossing, so it visits at
    // most `ceil|dx| + ceil|dy| + 2` cells, capped at `MAX_STEPS`.
    let max_steps = ((delta.x.abs().ceil() + delta.y.abs().ceil()) as u32 + 2).min(MAX_STEPS);

    let mut last_t = 0.0_f32;
    let mut fluence = Fluence::transparent();

    for _ in 0..max_steps {
        let Some(color) = scene.color(pos) else {
            break;
        };
        let next_t = side_dist.min_element().min(dist);
        fluence = fluence.over(color.as_fluence(next_t - last_t));
        last_t = next_t;

        if last_t >= dist || pos == end_pos {
            break;
        }

        if side_dist.x < side_dist.y {
            side_dist.x += delta_dist.x;
            pos.x += ray_step.x;
        } else {
            side_dist.y += delta_dist.y;
            pos.y += ray_step.y;
        }
    }
    fluence
}

/// Interval `ray` of cascade `level`, traced directly against the scene.
pub fn trace_ray(scene: &Scene, settings: &CascadeSettings, level: u32, ray: RayLocation) -> Fluence {
    let ray_start = settings.probe_location(ray.probe, level).as_vec2() + 0.5;
    let ray_end = ray_start + interval_offset(level, ray.facing).as_vec2();
    trace_interval(scene, ray_start, ray_end)
}

/// Fills `T_level` by ray-marching every probe and facing.
pub fn trace_base<D: Device>(
    device: &D,
    scene: &Scene,
    settings: &CascadeSettings,
    level: u32,
    intervals: &mut CascadeStorage<Fluence>,
) -> Result<()> {
    let size = intervals.size();
    debug_assert_eq!(size, settings.interval_size(level));
    log::debug!("trace level {} ({}x{} texels)", level, size.extent().x, size.extent().y);
    device.dispatch(intervals, |texel| {
        trace_ray(scene, settings, level, size.ray(texel))
    })
}
