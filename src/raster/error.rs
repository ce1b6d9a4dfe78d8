// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with writing the output raster

use std::path::PathBuf;

use thiserror::Error;

/// RasterError subtypes
#[derive(Error, Debug)]
pub enum RasterError {
    /// The GeoTIFF encoder failed
    #[error("could not write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: tiff::TiffError,
    },

    /// The output file could not be created
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
