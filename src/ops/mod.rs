// Engine operations: pure transforms and raster mutations.

pub mod adjustments;
pub mod brush;
pub mod crop;
pub mod segmentation;
pub mod transform;
