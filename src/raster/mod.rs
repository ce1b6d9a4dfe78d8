// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Writing the classified raster as an RGBA GeoTIFF.

The category codes are mapped through a fixed palette (clear and nodata
fully transparent), written as 8-bit RGBA with LZW compression, and
georeferenced with ModelPixelScale/ModelTiepoint plus a GeoKey directory:
EPSG:4326 for reprojected output, a user-defined projected CS carrying the
PROJ string citation for the native geostationary grid.
*/
pub mod error;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::Array2;
use tiff::encoder::{colortype, Compression, TiffEncoder};
use tiff::tags::Tag;

use crate::projection::{GeoTransform, GeosProjection};
pub use error::RasterError;

#[cfg(test)]
mod test;

/// GDAL's private TIFF tags for metadata and the nodata marker.
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

/// The CRS the output raster is expressed in.
#[derive(Debug, Clone)]
pub enum OutputCrs {
    /// The native geostationary grid of the scene
    Geostationary(GeosProjection),
    /// EPSG:4326 after reprojection
    Geographic,
}

/// RGBA palette entry of one category code.
///
/// Codes 1..5 are opaque colours; clear, nodata and anything unassigned
/// render fully transparent.
pub fn palette_rgba(code: u8) -> [u8; 4] {
    match code {
        1 => [255, 0, 0, 255],
        2 => [255, 165, 0, 255],
        3 => [255, 255, 0, 255],
        4 => [0, 255, 0, 255],
        5 => [0, 0, 255, 255],
        _ => [0, 0, 0, 0],
    }
}

/// Expands a category raster into interleaved RGBA samples.
pub fn apply_palette(ash: &Array2<u8>) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(ash.len() * 4);
    for &code in ash.iter() {
        rgba.extend_from_slice(&palette_rgba(code));
    }
    rgba
}

/// The GeoKey directory for the output CRS, plus the ASCII params it
/// references.
fn geo_keys(crs: &OutputCrs) -> (Vec<u16>, Option<String>) {
    match crs {
        OutputCrs::Geographic => (
            vec![
                1, 1, 0, 4, // directory header
                1024, 0, 1, 2, // GTModelType = geographic
                1025, 0, 1, 1, // GTRasterType = pixel-is-area
                2048, 0, 1, 4326, // GeographicType = WGS 84
                2054, 0, 1, 9102, // GeogAngularUnits = degree
            ],
            None,
        ),
        OutputCrs::Geostationary(proj) => {
            // No EPSG code exists for a satellite-specific geostationary
            // grid; write a user-defined projected CS and cite the PROJ
            // string.
            let citation = format!("{}|", proj.proj_string());
            let len = citation.len() as u16;
            (
                vec![
                    1, 1, 0, 5, // directory header
                    1024, 0, 1, 1, // GTModelType = projected
                    1025, 0, 1, 1, // GTRasterType = pixel-is-area
                    1026, 34737, len, 0, // GTCitation -> ascii params
                    3072, 0, 1, 32767, // ProjectedCSType = user-defined
                    3076, 0, 1, 9001, // ProjLinearUnits = metre
                ],
                Some(citation),
            )
        }
    }
}

/// GDAL-style metadata XML carrying the raster attributes.
fn gdal_metadata() -> String {
    concat!(
        "<GDALMetadata>",
        "<Item name=\"long_name\">Ash Detection Classification</Item>",
        "<Item name=\"units\">category</Item>",
        "</GDALMetadata>"
    )
    .to_string()
}

/// Writes the category raster as a 4-band RGBA 8-bit GeoTIFF with LZW
/// compression.
///
/// # Arguments
///
/// * `path` - output filename.
///
/// * `ash` - the category raster, row-major from the upper-left corner.
///
/// * `transform` - the raster's pixel→world affine.
///
/// * `crs` - the CRS the transform is expressed in.
///
///
/// # Returns
///
/// * A Result; failure is `WriteFailed` with the encoder's error.
///
pub fn write_geotiff(
    path: &Path,
    ash: &Array2<u8>,
    transform: &GeoTransform,
    crs: &OutputCrs,
) -> Result<(), RasterError> {
    let (rows, cols) = ash.dim();
    let rgba = apply_palette(ash);

    let file = File::create(path)?;
    let failed = |source| RasterError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(failed)?
        .with_compression(Compression::Lzw);

    let mut image = encoder
        .new_image::<colortype::RGBA8>(cols as u32, rows as u32)
        .map_err(failed)?;

    // Georeferencing: pixel scale (positive y), upper-left tiepoint, CRS
    // keys and the GDAL nodata/metadata tags.
    let scale = [transform.xres, -transform.yres, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.x_ul, transform.y_ul, 0.0];
    let (keys, ascii_params) = geo_keys(crs);

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(failed)?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(failed)?;
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &keys[..])
        .map_err(failed)?;
    if let Some(params) = &ascii_params {
        image
            .encoder()
            .write_tag(Tag::GeoAsciiParamsTag, params.as_str())
            .map_err(failed)?;
    }
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GDAL_METADATA), gdal_metadata().as_str())
        .map_err(failed)?;
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GDAL_NODATA), "255")
        .map_err(failed)?;

    image.write_data(&rgba).map_err(failed)?;
    Ok(())
}
