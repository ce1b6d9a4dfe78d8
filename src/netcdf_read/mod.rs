// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Functions for reading ABI L2 NetCDF product files.

The data variables (`CMI`, `Phase`) are stored packed: an integer array plus
`scale_factor`/`add_offset`/`_FillValue` attributes. Everything read here is
unpacked on the way out, with fill values replaced by NaN in floating
outputs, so downstream numeric kernels never branch on "is masked". Window
reads use NetCDF hyperslabs and never materialize the full array.
*/
pub mod error;

use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;

pub use error::NcReadError;

#[cfg(test)]
mod test;

/// Fill marker used for the phase array after unpacking; ACTP codes are
/// small non-negative integers.
pub const PHASE_FILL: i8 = -1;

/// The geostationary projection attributes carried by every ABI product
/// file on its `goes_imager_projection` variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionAttrs {
    /// Height of the perspective point above the ellipsoid, metres
    pub perspective_point_height: f64,
    /// Longitude of the projection origin (satellite subpoint), degrees
    pub longitude_of_projection_origin: f64,
    /// Scan sweep axis, `"x"` for the GOES-R series
    pub sweep_angle_axis: String,
    /// Ellipsoid semi-major axis, metres
    pub semi_major_axis: f64,
    /// Ellipsoid semi-minor axis, metres
    pub semi_minor_axis: f64,
}

/// An open ABI L2 product file.
pub struct ProductFile {
    file: netcdf::File,
    path: PathBuf,
}

/// Unpacking parameters of one packed variable.
#[derive(Debug, Clone, Copy, Default)]
struct Packing {
    scale: f64,
    offset: f64,
    fill: Option<f64>,
}

/// Replaces raw fill values with NaN and applies scale/offset.
///
/// The comparison happens against the raw (pre-scale) value, which is how
/// the packing convention defines `_FillValue`.
fn unpack(raw: f64, packing: &Packing) -> f64 {
    match packing.fill {
        Some(fill) if raw == fill => f64::NAN,
        _ => raw * packing.scale + packing.offset,
    }
}

/// Extracts a numeric attribute value, accepting any scalar numeric type
/// and single-element vectors (netcdf-c reports both).
fn attr_f64(value: &netcdf::AttributeValue) -> Option<f64> {
    use netcdf::AttributeValue::*;
    match value {
        Uchar(v) => Some(*v as f64),
        Schar(v) => Some(*v as f64),
        Ushort(v) => Some(*v as f64),
        Short(v) => Some(*v as f64),
        Uint(v) => Some(*v as f64),
        Int(v) => Some(*v as f64),
        Ulonglong(v) => Some(*v as f64),
        Longlong(v) => Some(*v as f64),
        Float(v) => Some(*v as f64),
        Double(v) => Some(*v),
        Uchars(v) if v.len() == 1 => Some(v[0] as f64),
        Schars(v) if v.len() == 1 => Some(v[0] as f64),
        Ushorts(v) if v.len() == 1 => Some(v[0] as f64),
        Shorts(v) if v.len() == 1 => Some(v[0] as f64),
        Uints(v) if v.len() == 1 => Some(v[0] as f64),
        Ints(v) if v.len() == 1 => Some(v[0] as f64),
        Ulonglongs(v) if v.len() == 1 => Some(v[0] as f64),
        Longlongs(v) if v.len() == 1 => Some(v[0] as f64),
        Floats(v) if v.len() == 1 => Some(v[0] as f64),
        Doubles(v) if v.len() == 1 => Some(v[0]),
        _ => None,
    }
}

/// Extracts a string attribute value.
fn attr_str(value: &netcdf::AttributeValue) -> Option<String> {
    use netcdf::AttributeValue::*;
    match value {
        Str(s) => Some(s.clone()),
        Strs(v) if v.len() == 1 => Some(v[0].clone()),
        _ => None,
    }
}

impl ProductFile {
    /// Opens a product file read-only.
    ///
    /// # Arguments
    ///
    /// * `path` - filename of the NetCDF product file.
    ///
    ///
    /// # Returns
    ///
    /// * A Result containing the open file, or `OpenFailed`.
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ProductFile, NcReadError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path).map_err(|source| NcReadError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        Ok(ProductFile { file, path })
    }

    /// The path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>, NcReadError> {
        self.file
            .variable(name)
            .ok_or_else(|| NcReadError::MissingVariable {
                name: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Numeric attribute of a variable, if present.
    fn var_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
        var.attribute(name)
            .and_then(|a| a.value().ok())
            .as_ref()
            .and_then(attr_f64)
    }

    fn packing(var: &netcdf::Variable) -> Packing {
        Packing {
            scale: Self::var_attr_f64(var, "scale_factor").unwrap_or(1.0),
            offset: Self::var_attr_f64(var, "add_offset").unwrap_or(0.0),
            fill: Self::var_attr_f64(var, "_FillValue"),
        }
    }

    /// The `(rows, cols)` shape of a 2-D data variable.
    pub fn shape(&self, name: &str) -> Result<(usize, usize), NcReadError> {
        let var = self.variable(name)?;
        let dims = var.dimensions();
        if dims.len() != 2 {
            return Err(NcReadError::BadRank {
                name: name.to_string(),
                path: self.path.clone(),
                rank: dims.len(),
                expected: 2,
            });
        }
        Ok((dims[0].len(), dims[1].len()))
    }

    fn check_window(
        &self,
        name: &str,
        shape: (usize, usize),
        rows: &Range<usize>,
        cols: &Range<usize>,
    ) -> Result<(), NcReadError> {
        if rows.end > shape.0 || cols.end > shape.1 || rows.start > rows.end || cols.start > cols.end
        {
            return Err(NcReadError::WindowOutOfBounds {
                name: name.to_string(),
                window: (rows.start, rows.end, cols.start, cols.end),
                shape,
            });
        }
        Ok(())
    }

    /// Reads a rectangular window of a 2-D variable, unpacked to f32 with
    /// fill values replaced by NaN.
    ///
    /// `None` reads the whole array. The window is a half-open
    /// `(rows, cols)` pair in native grid indices.
    pub fn read_f32(
        &self,
        name: &str,
        window: Option<(Range<usize>, Range<usize>)>,
    ) -> Result<Array2<f32>, NcReadError> {
        let shape = self.shape(name)?;
        let (rows, cols) = window.unwrap_or((0..shape.0, 0..shape.1));
        self.check_window(name, shape, &rows, &cols)?;

        let var = self.variable(name)?;
        let packing = Self::packing(&var);
        let raw: Vec<f64> = var.get_values((rows.clone(), cols.clone()))?;
        let data: Vec<f32> = raw.iter().map(|&v| unpack(v, &packing) as f32).collect();

        Ok(Array2::from_shape_vec((rows.len(), cols.len()), data)
            .expect("hyperslab length matches window shape"))
    }

    /// Reads a rectangular window of a small-integer categorical variable
    /// (the ACTP `Phase`), with fill values replaced by [`PHASE_FILL`].
    pub fn read_i8(
        &self,
        name: &str,
        window: Option<(Range<usize>, Range<usize>)>,
    ) -> Result<Array2<i8>, NcReadError> {
        let shape = self.shape(name)?;
        let (rows, cols) = window.unwrap_or((0..shape.0, 0..shape.1));
        self.check_window(name, shape, &rows, &cols)?;

        let var = self.variable(name)?;
        let fill = Self::var_attr_f64(&var, "_FillValue");
        let raw: Vec<i32> = var.get_values((rows.clone(), cols.clone()))?;
        let data: Vec<i8> = raw
            .iter()
            .map(|&v| match fill {
                Some(f) if v as f64 == f => PHASE_FILL,
                _ => v as i8,
            })
            .collect();

        Ok(Array2::from_shape_vec((rows.len(), cols.len()), data)
            .expect("hyperslab length matches window shape"))
    }

    /// Reads a 1-D coordinate variable unpacked to f64.
    fn read_coord(&self, name: &str) -> Result<Vec<f64>, NcReadError> {
        let var = self.variable(name)?;
        if var.dimensions().len() != 1 {
            return Err(NcReadError::BadRank {
                name: name.to_string(),
                path: self.path.clone(),
                rank: var.dimensions().len(),
                expected: 1,
            });
        }
        let packing = Self::packing(&var);
        let raw: Vec<f64> = var.get_values(..)?;
        Ok(raw.iter().map(|&v| unpack(v, &packing)).collect())
    }

    /// Pixel-centre scan angles `(x, y)` in radians.
    ///
    /// These are the dimensionless fixed-grid coordinates; multiply by the
    /// perspective height to obtain projection metres.
    pub fn scan_angles(&self) -> Result<(Vec<f64>, Vec<f64>), NcReadError> {
        Ok((self.read_coord("x")?, self.read_coord("y")?))
    }

    /// Pixel-centre coordinates `(x, y)` in projection metres.
    pub fn coords_m(&self) -> Result<(Vec<f64>, Vec<f64>), NcReadError> {
        let attrs = self.projection_attrs()?;
        let h = attrs.perspective_point_height;
        let (x, y) = self.scan_angles()?;
        Ok((
            x.iter().map(|v| v * h).collect(),
            y.iter().map(|v| v * h).collect(),
        ))
    }

    /// The geostationary projection attributes.
    pub fn projection_attrs(&self) -> Result<ProjectionAttrs, NcReadError> {
        let var = self.variable("goes_imager_projection")?;
        let need = |name: &str| {
            Self::var_attr_f64(&var, name).ok_or_else(|| NcReadError::MissingAttribute {
                name: name.to_string(),
                path: self.path.clone(),
            })
        };
        let sweep = var
            .attribute("sweep_angle_axis")
            .and_then(|a| a.value().ok())
            .as_ref()
            .and_then(attr_str)
            .unwrap_or_else(|| "x".to_string());

        Ok(ProjectionAttrs {
            perspective_point_height: need("perspective_point_height")?,
            longitude_of_projection_origin: need("longitude_of_projection_origin")?,
            sweep_angle_axis: sweep,
            semi_major_axis: need("semi_major_axis")?,
            semi_minor_axis: need("semi_minor_axis")?,
        })
    }

    /// The scan start instant from the `time_coverage_start` global
    /// attribute.
    pub fn time_coverage_start(&self) -> Result<DateTime<Utc>, NcReadError> {
        let value = self
            .file
            .attribute("time_coverage_start")
            .and_then(|a| a.value().ok())
            .as_ref()
            .and_then(attr_str)
            .ok_or_else(|| NcReadError::MissingAttribute {
                name: "time_coverage_start".to_string(),
                path: self.path.clone(),
            })?;

        parse_utc(&value).ok_or_else(|| NcReadError::BadTimestamp {
            value,
            path: self.path.clone(),
        })
    }
}

/// Parses the ISO-8601 timestamps ABI files carry, with or without
/// fractional seconds.
fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some producers drop the trailing Z.
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
