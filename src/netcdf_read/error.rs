// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading NetCDF product files

use std::path::PathBuf;

use thiserror::Error;

/// NcReadError subtypes
#[derive(Error, Debug)]
pub enum NcReadError {
    /// The file could not be opened by the NetCDF library
    #[error("could not open {}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        source: netcdf::Error,
    },

    /// A required variable is absent
    #[error("{} has no variable '{name}'", .path.display())]
    MissingVariable { name: String, path: PathBuf },

    /// A required attribute is absent or of an unusable type
    #[error("{} has no usable attribute '{name}'", .path.display())]
    MissingAttribute { name: String, path: PathBuf },

    /// A data variable does not have the expected rank
    #[error("variable '{name}' in {} has {rank} dimensions, expected {expected}", .path.display())]
    BadRank {
        name: String,
        path: PathBuf,
        rank: usize,
        expected: usize,
    },

    /// The requested window does not fit inside the variable
    #[error("window {window:?} exceeds variable '{name}' of shape {shape:?}")]
    WindowOutOfBounds {
        name: String,
        window: (usize, usize, usize, usize),
        shape: (usize, usize),
    },

    /// A product file's grid does not match the scene's reference grid
    #[error("{} carries a {got:?} grid, expected {expected:?}", .path.display())]
    GridMismatch {
        path: PathBuf,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// `time_coverage_start` could not be parsed as a UTC instant
    #[error("could not parse time_coverage_start '{value}' in {}", .path.display())]
    BadTimestamp { value: String, path: PathBuf },

    /// Any other error coming from the NetCDF library
    #[error("{0}")]
    Netcdf(#[from] netcdf::Error),
}
