// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with parsing acquisition moments

use thiserror::Error;

/// MomentError subtypes
#[derive(Error, Debug)]
pub enum MomentError {
    /// String does not have the shape of a moment or a moment range
    #[error("'{0}' is not a valid moment; expected YYYYjjjHHMM, YYYYMMDDHHMM or either followed by -HHMM")]
    BadFormat(String),

    /// String has the right shape but does not name a real calendar instant
    #[error("'{0}' does not name a real calendar instant")]
    BadMoment(String),

    /// A range whose end precedes its start
    #[error("range '{0}' ends before it starts")]
    BadRange(String),
}
