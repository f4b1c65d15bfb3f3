//! Holographic radiance cascades for 2D scenes.
//!
//! A [`Scene`] of emission and extinction cells goes in, a [`FluenceBuffer`]
//! comes out. [`Pipeline`] computes the light arriving from one quadrant
//! (rays along `+x`); [`Composer`] runs it for the four quarter turns and sums
//! the results.

use std::{fs::File, path::Path};

pub use glam::{IVec2, UVec2, Vec2, Vec3 as FVec3};
use serde::{Deserialize, Serialize};
use tiff::{
    decoder::{Decoder as TiffDecoder, DecodingResult},
    encoder::{colortype, TiffEncoder},
    tags::Tag,
    ColorType,
};

pub mod cascade;
pub mod color;
pub mod composite;
pub mod data;
pub mod device;
pub mod error;
pub mod interval;
pub mod pipeline;
pub mod radiance;
pub mod scene;
pub mod trace;

pub use cascade::{
    dirs, interval_offset, packed_row, step, CascadeSettings, CascadeSize, CascadeStorage,
    RayLocation,
};
pub use color::{Color, Extinction, Fluence, Radiance, Transmittance};
pub use composite::Composer;
pub use data::{ColorSpec, RegionDescription, RegionKindDescription, SceneDescription, Settings};
pub use device::{CpuDevice, Device, SerialDevice};
pub use error::{Error, Result};
pub use interval::{merge_interval, merge_up};
pub use pipeline::{FluenceBuffer, Pipeline};
pub use radiance::{cone_angular_size, merge_down, merge_r, merge_radiance, MergeSources};
pub use scene::{rotated_size, unrotate, Rect, Region, RegionKind, Scene, Texel};
pub use trace::{trace_base, trace_interval, trace_ray, TRACED_CASCADES};
