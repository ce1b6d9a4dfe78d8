// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with resolving product files from the archive

use std::path::PathBuf;

use thiserror::Error;

use crate::product_files::Product;

/// ResolveError subtypes
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The search directory for the moment does not exist
    #[error("archive directory {} does not exist", .0.display())]
    DirMissing(PathBuf),

    /// One or more products have no file for the moment
    #[error("moment {moment} is missing products {missing:?}")]
    Incomplete {
        moment: String,
        missing: Vec<Product>,
    },

    /// The archive directory could not be listed
    #[error("could not list {}: {source}", .path.display())]
    ListFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
