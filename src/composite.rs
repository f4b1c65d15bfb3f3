use std::f32::consts::TAU;

use super::*;

/// Turns single-quadrant pipeline runs into full fluence: one run per quarter
/// turn of the scene, summed, optionally repeated to bounce light off
/// reflective occluders.
pub struct Composer<D: Device> {
    pipeline: Pipeline<D>,
    quadrants: bool,
    bounces: u32,
}

impl<D: Device> Composer<D> {
    pub fn new(pipeline: Pipeline<D>, settings: &Settings) -> Self {
        Self {
            pipeline,
            quadrants: settings.quadrants,
            bounces: settings.bounces(),
        }
    }

    /// Direct fluence from every direction.
    pub fn fluence(&mut self, scene: &Scene) -> Result<FluenceBuffer> {
        let size = scene.size();
        let mut total = FluenceBuffer::new(size);
        let turns = if self.quadrants { 4 } else { 1 };
        for quarter_turns in 0..turns {
            let rotated = scene.rotated(quarter_turns);
            self.pipeline.mark_dirty();
            let fluence = self.pipeline.recompute(&rotated)?;
            for y in 0..fluence.height() {
                for x in 0..fluence.width() {
                    let source = unrotate(size, quarter_turns, UVec2::new(x, y));
                    total.add(source.x, source.y, fluence.get(x, y));
                }
            }
            log::debug!("Quadrant {} done", quarter_turns);
        }
        Ok(total)
    }

    /// Fluence after `bounce_count` rounds of light transport.
    pub fn render(&mut self, scene: &Scene) -> Result<FluenceBuffer> {
        let start = std::time::Instant::now();
        let mut fluence = self.fluence(scene)?;
        if self.bounces > 1 {
            let mut lit = scene.clone();
            for bounce in 1..self.bounces {
                lit.set_emission(|texel, i| {
                    scene.texels()[i].emission
                        + texel.diffuse * texel.extinction * fluence.data()[i] / TAU
                });
                fluence = self.fluence(&lit)?;
                log::debug!("Bounce {} done", bounce);
            }
        }
        log::info!(
            "Rendered {}x{} scene ({} bounce{}) in {:.2}ms",
            scene.width(),
            scene.height(),
            self.bounces,
            if self.bounces == 1 { "" } else { "s" },
            start.elapsed().as_secs_f32() * 1000.0
        );
        Ok(fluence)
    }
}
