// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit tests for the GeoTIFF writer

use super::*;
use ndarray::array;
use tempdir::TempDir;
use tiff::decoder::{Decoder, DecodingResult};

use crate::projection::Sweep;

fn goes16() -> GeosProjection {
    GeosProjection {
        h: 35_786_023.0,
        lon0: -75.0,
        sweep: Sweep::X,
        a: 6_378_137.0,
        b: 6_356_752.31414,
    }
}

fn sample_transform() -> GeoTransform {
    GeoTransform {
        xres: 0.02,
        x_ul: -100.0,
        yres: -0.02,
        y_ul: 20.0,
    }
}

#[test]
fn test_palette_values() {
    assert_eq!(palette_rgba(0), [0, 0, 0, 0]);
    assert_eq!(palette_rgba(1), [255, 0, 0, 255]);
    assert_eq!(palette_rgba(2), [255, 165, 0, 255]);
    assert_eq!(palette_rgba(3), [255, 255, 0, 255]);
    assert_eq!(palette_rgba(4), [0, 255, 0, 255]);
    assert_eq!(palette_rgba(5), [0, 0, 255, 255]);
    assert_eq!(palette_rgba(255), [0, 0, 0, 0]);
}

#[test]
fn test_palette_alpha_rule() {
    // Every code that is neither clear nor nodata is fully opaque; clear
    // and nodata are fully transparent.
    for code in 1..=5u8 {
        assert_eq!(palette_rgba(code)[3], 255);
    }
    assert_eq!(palette_rgba(0)[3], 0);
    assert_eq!(palette_rgba(255)[3], 0);
}

#[test]
fn test_apply_palette_interleaves() {
    let ash = array![[1u8, 0], [255, 3]];
    let rgba = apply_palette(&ash);
    assert_eq!(rgba.len(), 16);
    assert_eq!(&rgba[0..4], &[255, 0, 0, 255]);
    assert_eq!(&rgba[4..8], &[0, 0, 0, 0]);
    assert_eq!(&rgba[8..12], &[0, 0, 0, 0]);
    assert_eq!(&rgba[12..16], &[255, 255, 0, 255]);
}

#[test]
fn test_write_geographic_geotiff_round_trip() {
    let tdir = TempDir::new("ceniza-raster").unwrap();
    let path = tdir.path().join("ceniza_20253161601_geo.tif");
    let ash = array![[1u8, 0, 2], [255, 3, 0]];

    write_geotiff(&path, &ash, &sample_transform(), &OutputCrs::Geographic).unwrap();

    let mut decoder = Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (3, 2));
    assert_eq!(
        decoder.colortype().unwrap(),
        tiff::ColorType::RGBA(8)
    );

    // Pixel data round-trips through the palette and LZW.
    let image = match decoder.read_image().unwrap() {
        DecodingResult::U8(data) => data,
        _ => panic!("unexpected sample format"),
    };
    assert_eq!(image.len(), 24);
    assert_eq!(&image[0..4], &[255, 0, 0, 255]);
    assert_eq!(&image[12..16], &[0, 0, 0, 0]);
    assert_eq!(&image[16..20], &[255, 255, 0, 255]);

    // Georeferencing tags.
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap();
    assert_eq!(scale, vec![0.02, 0.02, 0.0]);
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap();
    assert_eq!(tiepoint, vec![0.0, 0.0, 0.0, -100.0, 20.0, 0.0]);

    let keys = decoder.get_tag_u64_vec(Tag::GeoKeyDirectoryTag).unwrap();
    assert_eq!(&keys[0..4], &[1, 1, 0, 4]);
    // GeographicTypeGeoKey carries EPSG:4326.
    assert!(keys.chunks(4).any(|k| k == [2048, 0, 1, 4326]));

    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(42113))
        .unwrap();
    assert_eq!(nodata.trim_end_matches('\0'), "255");

    let metadata = decoder
        .get_tag_ascii_string(Tag::Unknown(42112))
        .unwrap();
    assert!(metadata.contains("Ash Detection Classification"));
    assert!(metadata.contains("category"));
}

#[test]
fn test_write_geostationary_geotiff_cites_proj_string() {
    let tdir = TempDir::new("ceniza-raster").unwrap();
    let path = tdir.path().join("ceniza_20253161601.tif");
    let ash = array![[0u8, 1], [2, 255]];
    let transform = GeoTransform {
        xres: 2004.0,
        x_ul: -2_405_000.0,
        yres: -2004.0,
        y_ul: 2_065_000.0,
    };

    write_geotiff(
        &path,
        &ash,
        &transform,
        &OutputCrs::Geostationary(goes16()),
    )
    .unwrap();

    let mut decoder = Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
    let keys = decoder.get_tag_u64_vec(Tag::GeoKeyDirectoryTag).unwrap();
    // Projected model, user-defined CS.
    assert!(keys.chunks(4).any(|k| k == [1024, 0, 1, 1]));
    assert!(keys.chunks(4).any(|k| k == [3072, 0, 1, 32767]));

    let citation = decoder.get_tag_ascii_string(Tag::GeoAsciiParamsTag).unwrap();
    assert!(citation.contains("+proj=geos"));
    assert!(citation.contains("+h=35786023"));
    assert!(citation.contains("+sweep=x"));
}

#[test]
fn test_write_failure_on_bad_path() {
    let ash = array![[0u8]];
    let err = write_geotiff(
        Path::new("/definitely/not/here/out.tif"),
        &ash,
        &sample_transform(),
        &OutputCrs::Geographic,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::Io(_)));
}
