// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Detection of volcanic ash in GOES ABI L2 imagery.
//!
//! For one acquisition moment the library locates the seven input products
//! (six CMI bands plus the cloud-top phase), reads a geographic window of
//! each, derives brightness-temperature differences and a local texture
//! anomaly, classifies every pixel into an ash-confidence category and
//! writes a georeferenced RGBA raster, optionally reprojected to EPSG:4326
//! and annotated as a PNG.

pub mod classifier;
pub mod error;
pub mod moment;
pub mod netcdf_read;
pub mod overlay;
pub mod pipeline;
pub mod product_files;
pub mod projection;
pub mod raster;
pub mod reproject;
pub mod solar;
pub mod texture;

// Re-exports.
pub use classifier::{classify, AshCategory, BandStack, Phase};
pub use error::CenizaError;
pub use moment::{ImagingMode, Moment, MomentError};
pub use netcdf_read::ProductFile;
pub use pipeline::{Pipeline, PipelineOptions, Report};
pub use product_files::{Product, ProductCoverage};
pub use projection::GeosProjection;

/// Raster code for "no valid input at this pixel"; rendered fully
/// transparent.
pub const NODATA: u8 = 255;

/// Cadence of ABI acquisition moments, used for range expansion and for
/// grouping failed moments into intervals.
pub const MOMENT_STRIDE_MINUTES: i64 = 5;
