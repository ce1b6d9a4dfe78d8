// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for Error handling

use thiserror::Error;

/// CenizaError subtypes
#[derive(Error, Debug)]
pub enum CenizaError {
    /// An error derived from `MomentError`.
    #[error("{0}")]
    Moment(#[from] crate::moment::MomentError),

    /// An error derived from `ResolveError`.
    #[error("{0}")]
    Resolve(#[from] crate::product_files::ResolveError),

    /// An error derived from `NcReadError`.
    #[error("{0}")]
    NcRead(#[from] crate::netcdf_read::NcReadError),

    /// An error derived from `ProjectionError`.
    #[error("{0}")]
    Projection(#[from] crate::projection::ProjectionError),

    /// An error derived from `RasterError`.
    #[error("{0}")]
    Raster(#[from] crate::raster::RasterError),

    /// An error derived from `OverlayError`.
    #[error("{0}")]
    Overlay(#[from] crate::overlay::OverlayError),
}
