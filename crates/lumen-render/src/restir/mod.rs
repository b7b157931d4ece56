//! Reservoir-based spatiotemporal importance resampling for direct light.

mod history;
mod resample;
mod reservoir;

pub use history::{FrameHistory, PixelRecord, ReservoirBuffer, DEPTH_THRESHOLD, NORMAL_THRESHOLD};
pub use resample::{spatial_offsets, ReservoirResampler, Reuse, ShadingPoint};
pub use reservoir::{LightKind, LightSample, Reservoir};
