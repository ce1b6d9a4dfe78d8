// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the geostationary projection model

use thiserror::Error;

/// ProjectionError subtypes
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Projection attributes are absent, non-finite or unsupported
    #[error("bad projection: {0}")]
    BadProjection(String),

    /// A clip bbox produced no usable pixel window
    #[error("clip bbox {0} selects no pixels on this grid")]
    EmptyWindow(String),

    /// Coordinate arrays too short to derive a transform
    #[error("need at least 2 coordinates per axis, got {x} x and {y} y")]
    DegenerateCoords { x: usize, y: usize },
}
