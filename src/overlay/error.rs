// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the annotated PNG overlay

use std::path::PathBuf;

use thiserror::Error;

/// OverlayError subtypes
#[derive(Error, Debug)]
pub enum OverlayError {
    /// A vector layer could not be read; the PNG is still produced
    #[error("layer '{name}' unavailable at {}: {reason}", .path.display())]
    LayerUnavailable {
        name: String,
        path: PathBuf,
        reason: String,
    },

    /// A layer name with no registry entry
    #[error("layer '{0}' is not registered")]
    UnknownLayer(String),

    /// The PNG could not be encoded or written
    #[error("{0}")]
    Image(#[from] image::ImageError),
}
