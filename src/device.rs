use rayon::prelude::*;

use super::*;

/// Compute context the cascade passes are dispatched on.
///
/// `dispatch` evaluates `kernel` once for every texel of `target`'s packed
/// image and writes the result to that texel. Kernels only read buffers
/// finished by earlier passes, so invocations are independent. The call
/// returns once every write has landed.
pub trait Device {
    fn name(&self) -> &str;

    fn dispatch<T, F>(&self, target: &mut CascadeStorage<T>, kernel: F) -> Result<()>
    where
        T: Copy + Default + Send,
        F: Fn(UVec2) -> T + Sync;
}

/// Runs kernels on a dedicated rayon pool, one task per packed row.
pub struct CpuDevice {
    pool: rayon::ThreadPool,
    name: String,
}

impl CpuDevice {
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("hrc-worker-{i}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::Device(format!("failed to start worker pool: {e}")))?;
        let name = format!("cpu ({} threads)", pool.current_num_threads());
        log::info!("Created compute device: {}", name);
        Ok(Self { pool, name })
    }
}

impl Device for CpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch<T, F>(&self, target: &mut CascadeStorage<T>, kernel: F) -> Result<()>
    where
        T: Copy + Default + Send,
        F: Fn(UVec2) -> T + Sync,
    {
        let width = target.size().probes.x as usize;
        if width == 0 {
            return Ok(());
        }
        self.pool.install(|| {
            target
                .as_mut_slice()
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, texel) in row.iter_mut().enumerate() {
                        *texel = kernel(UVec2::new(x as u32, y as u32));
                    }
                });
        });
        Ok(())
    }
}

/// Single-threaded reference device.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialDevice;

impl Device for SerialDevice {
    fn name(&self) -> &str {
        "serial"
    }

    fn dispatch<T, F>(&self, target: &mut CascadeStorage<T>, kernel: F) -> Result<()>
    where
        T: Copy + Default + Send,
        F: Fn(UVec2) -> T + Sync,
    {
        let width = target.size().probes.x as usize;
        if width == 0 {
            return Ok(());
        }
        for (y, row) in target.as_mut_slice().chunks_mut(width).enumerate() {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = kernel(UVec2::new(x as u32, y as u32));
            }
        }
        Ok(())
    }
}
