// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Functions for locating and organising the product files of one moment.

ABI L2 archives hold one NetCDF file per product per scan; filenames embed
the scan-start time as `s{YYYYjjjHHMMSSs}` and the product as a band code
(`M6C07`) or a product tag (`ACTP`). The resolver never fails on missing
files; it reports what coverage exists and lets the caller decide.
*/
pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::moment::Moment;
pub use error::ResolveError;


/// The products one moment needs. Six imager-band CMI products plus the
/// cloud-top phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Product {
    /// Cloud Top Phase
    Actp,
    /// Band 4, 1.37 µm cirrus (reflectance)
    C04,
    /// Band 7, 3.9 µm shortwave window
    C07,
    /// Band 11, 8.4 µm cloud-top phase window
    C11,
    /// Band 13, 10.3 µm clean longwave IR
    C13,
    /// Band 14, 11.2 µm longwave IR
    C14,
    /// Band 15, 12.3 µm dirty longwave IR
    C15,
}

/// All products required for a classification, in resolver scan order.
pub const ALL_PRODUCTS: [Product; 7] = [
    Product::Actp,
    Product::C04,
    Product::C07,
    Product::C11,
    Product::C13,
    Product::C14,
    Product::C15,
];

impl Product {
    /// The tag used in filenames: a band code `Cnn` or `ACTP`.
    pub fn tag(&self) -> &'static str {
        match self {
            Product::Actp => "ACTP",
            Product::C04 => "C04",
            Product::C07 => "C07",
            Product::C11 => "C11",
            Product::C13 => "C13",
            Product::C14 => "C14",
            Product::C15 => "C15",
        }
    }

    /// Whether this is an imager band CMI product (as opposed to ACTP).
    pub fn is_band(&self) -> bool {
        !matches!(self, Product::Actp)
    }

    /// Matches this product's tag in a filename.
    ///
    /// Band codes must sit against a non-alphanumeric boundary (`M3C07`,
    /// `M6C07`, `-C07_`, `_C07`) so that `C14` does not fire on `C141` or on
    /// the digits of a timestamp. `ACTP` may carry `-`/`_` separators or a
    /// trailing mode letter `C` (`ACTPC-M6`).
    fn matches(&self, filename: &str) -> bool {
        match self {
            Product::Actp => RE_ACTP.is_match(filename),
            band => {
                let code = band.tag();
                for (pos, _) in filename.match_indices(code) {
                    let after = filename[pos + code.len()..].bytes().next();
                    let boundary_after = !matches!(after, Some(b) if b.is_ascii_alphanumeric());
                    // A scan-mode prefix (M3/M4/M6) counts as a boundary
                    // before the band code.
                    let before = &filename[..pos];
                    let boundary_before = before.ends_with("M3")
                        || before.ends_with("M4")
                        || before.ends_with("M6")
                        || !matches!(before.bytes().last(), Some(b) if b.is_ascii_alphanumeric());
                    if boundary_after && boundary_before {
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

lazy_static! {
    // ACTP with an optional trailing scene letter, set off by separators,
    // e.g. OR_ABI-L2-ACTPC-M6_G16_s...
    static ref RE_ACTP: Regex = Regex::new(r"(^|[^0-9A-Za-z])ACTP(C)?([^0-9A-Za-z]|$)").unwrap();
}

/// One resolved product file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    /// Which product the file carries
    pub product: Product,
    /// Full path of the file
    pub path: PathBuf,
    /// Provider prefix of the filename (`OR`, `CG`, ...)
    pub provider: String,
}

/// Per-product coverage of one moment.
#[derive(Debug, Default)]
pub struct ProductCoverage {
    /// One resolved file per covered product
    pub files: BTreeMap<Product, FileMatch>,
}

impl ProductCoverage {
    /// The products in `wanted` that have no resolved file.
    pub fn missing(&self, wanted: &[Product]) -> Vec<Product> {
        wanted
            .iter()
            .copied()
            .filter(|p| !self.files.contains_key(p))
            .collect()
    }

    /// Whether every wanted product resolved.
    pub fn is_complete(&self, wanted: &[Product]) -> bool {
        self.missing(wanted).is_empty()
    }

    /// The resolved path of one product, if covered.
    pub fn path(&self, product: Product) -> Option<&Path> {
        self.files.get(&product).map(|m| m.path.as_path())
    }
}

/// Returns the provider prefix of a filename: the leading characters up to
/// the first underscore.
fn provider_prefix(filename: &str) -> &str {
    filename.split('_').next().unwrap_or(filename)
}

/// A CG_ file beats any other provider; otherwise the incumbent stays.
fn prefer(incumbent: &FileMatch, challenger: &FileMatch) -> bool {
    challenger.provider == "CG" && incumbent.provider != "CG"
}

/// Locates the product files of one moment under an archive root.
///
/// The search directory is `root/YYYY/MM/DD` when `tiered`, else `root`
/// itself. Candidates are files matching `*s{julian}*.nc`; each candidate
/// is attributed to the products whose tag it carries, and duplicates are
/// resolved by provider preference (`CG_` beats all, otherwise the first
/// match in lexicographic order).
///
/// A missing directory is logged and yields empty coverage. The resolver
/// never errors on missing files.
///
/// # Arguments
///
/// * `root` - the archive root directory.
///
/// * `moment` - the moment whose files are wanted.
///
/// * `products` - the products to look for.
///
/// * `tiered` - whether the archive is date-tiered `root/YYYY/MM/DD`.
///
///
/// # Returns
///
/// * A Result containing the per-product coverage found.
///
pub fn resolve(
    root: &Path,
    moment: &Moment,
    products: &[Product],
    tiered: bool,
) -> Result<ProductCoverage, ResolveError> {
    let dir = if tiered {
        root.join(format!("{:04}", moment.year))
            .join(format!("{:02}", moment.month))
            .join(format!("{:02}", moment.day))
    } else {
        root.to_path_buf()
    };

    let mut coverage = ProductCoverage::default();
    if !dir.is_dir() {
        warn!("{}", ResolveError::DirMissing(dir.clone()));
        return Ok(coverage);
    }

    let needle = format!("s{}", moment.format());
    let mut names: Vec<(String, PathBuf)> = std::fs::read_dir(&dir)
        .map_err(|e| ResolveError::ListFailed {
            path: dir.clone(),
            source: e,
        })?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name().to_str()?.to_string();
            (name.contains(&needle) && name.ends_with(".nc")).then(|| (name, entry.path()))
        })
        .collect();
    // Directory order is platform-dependent; sort so "first match" is
    // deterministic.
    names.sort();

    for (name, path) in &names {
        for &product in products {
            if !product.matches(name) {
                continue;
            }
            // Band files must be CMI products, not some other L2 product
            // that happens to name a band.
            if product.is_band() && !name.contains("CMIP") {
                continue;
            }
            let challenger = FileMatch {
                product,
                path: path.clone(),
                provider: provider_prefix(name).to_string(),
            };
            let replace = match coverage.files.get(&product) {
                None => true,
                Some(incumbent) => prefer(incumbent, &challenger),
            };
            if replace {
                debug!("{product}: {name}");
                coverage.files.insert(product, challenger);
            }
        }
    }

    Ok(coverage)
}

/// As [`resolve`], but errors with [`ResolveError::Incomplete`] when any
/// wanted product is uncovered, so pipeline callers can skip the moment.
pub fn resolve_complete(
    root: &Path,
    moment: &Moment,
    products: &[Product],
    tiered: bool,
) -> Result<ProductCoverage, ResolveError> {
    let coverage = resolve(root, moment, products, tiered)?;
    let missing = coverage.missing(products);
    if missing.is_empty() {
        Ok(coverage)
    } else {
        Err(ResolveError::Incomplete {
            moment: moment.format(),
            missing,
        })
    }
}
