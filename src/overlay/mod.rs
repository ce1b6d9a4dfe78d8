// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Rendering the annotated PNG: vector layers, logo, timestamp and legend.

Vector layers come from shapefiles under a resource directory and are read
once per path into a cache. Features are rejected early against the image
bounds plus a margin; surviving vertices are transformed world→pixel
(through the geostationary projection when the base raster is in native
coordinates, linearly otherwise) with soft clipping: a vertex outside the
margin breaks the polyline and drawing resumes at the next inside vertex.

Every resource failure here is non-fatal. A missing shapefile, logo or
font is logged and skipped; the PNG is still produced.
*/
pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use chrono::{DateTime, Utc};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{debug, warn};

use crate::projection::{GeosProjection, LatLonBounds};
pub use error::OverlayError;


/// Default resource directory holding `shapefiles/` and `logos/`.
pub const DEFAULT_RESOURCE_DIR: &str = "/usr/local/share/lanot";

/// Geographic margin (degrees) for feature rejection and soft clipping.
const CLIP_MARGIN_DEG: f64 = 5.0;

/// Font files probed for text rendering (Debian and Rocky layouts).
const FONT_PATHS: [&str; 2] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
];

/// Anchor corner encoded as a 2-bit position: bit 0 = right, bit 1 =
/// bottom (0 = upper left, 1 = upper right, 2 = lower left, 3 = lower
/// right).
fn anchor(position: u8, canvas: (u32, u32), object: (u32, u32), margin: i64) -> (i64, i64) {
    let x = if position & 1 != 0 {
        canvas.0 as i64 - object.0 as i64 - margin
    } else {
        margin
    };
    let y = if position & 2 != 0 {
        canvas.1 as i64 - object.1 as i64 - margin
    } else {
        margin
    };
    (x, y)
}

/// One vector feature: its bbox and its parts in lon/lat.
#[derive(Debug, Clone)]
struct Feature {
    // (min_lon, min_lat, max_lon, max_lat)
    bbox: (f64, f64, f64, f64),
    parts: Vec<Vec<(f64, f64)>>,
}

impl Feature {
    fn rejects(&self, bounds: &LatLonBounds, margin: f64) -> bool {
        self.bbox.2 < bounds.lon_min - margin
            || self.bbox.0 > bounds.lon_max + margin
            || self.bbox.3 < bounds.lat_min - margin
            || self.bbox.1 > bounds.lat_max + margin
    }
}

/// The world→pixel strategy for one image.
struct PixelMapper<'a> {
    width: f64,
    height: f64,
    bounds: LatLonBounds,
    // Projected corner frame when the raster is in native coordinates.
    proj: Option<(&'a GeosProjection, f64, f64, f64, f64)>,
}

impl<'a> PixelMapper<'a> {
    fn new(
        image: &RgbaImage,
        bounds: &LatLonBounds,
        proj: Option<&'a GeosProjection>,
    ) -> PixelMapper<'a> {
        let projected = proj.and_then(|p| {
            let (ulx, uly) = p.forward(bounds.lon_min, bounds.lat_max)?;
            let (lrx, lry) = p.forward(bounds.lon_max, bounds.lat_min)?;
            let (width_m, height_m) = (lrx - ulx, lry - uly);
            if width_m == 0.0 || height_m == 0.0 {
                return None;
            }
            Some((p, ulx, uly, width_m, height_m))
        });
        if proj.is_some() && projected.is_none() {
            warn!("image bounds do not project; falling back to linear interpolation");
        }
        PixelMapper {
            width: image.width() as f64,
            height: image.height() as f64,
            bounds: *bounds,
            proj: projected,
        }
    }

    /// Pixel position of a lon/lat vertex, `None` when unprojectable.
    fn map(&self, lon: f64, lat: f64) -> Option<(f32, f32)> {
        match &self.proj {
            Some((p, ulx, uly, width_m, height_m)) => {
                let (x, y) = p.forward(lon, lat)?;
                let u = self.width * (x - ulx) / width_m;
                let v = self.height * (y - uly) / height_m;
                Some((u as f32, v as f32))
            }
            None => {
                let span_x = self.bounds.width();
                let span_y = self.bounds.height();
                if span_x == 0.0 || span_y == 0.0 {
                    return None;
                }
                let u = self.width * (lon - self.bounds.lon_min) / span_x;
                let v = self.height * (self.bounds.lat_max - lat) / span_y;
                Some((u as f32, v as f32))
            }
        }
    }
}

/// Map annotation state shared across moments: the layer registry, the
/// shapefile cache and the probed font.
pub struct MapDrawer {
    resource_dir: PathBuf,
    layers: HashMap<String, PathBuf>,
    cache: HashMap<PathBuf, Option<Vec<Feature>>>,
    font: Option<FontVec>,
    font_probed: bool,
}

impl MapDrawer {
    /// Creates a drawer rooted at a resource directory.
    pub fn new<P: AsRef<Path>>(resource_dir: P) -> MapDrawer {
        let mut layers = HashMap::new();
        layers.insert(
            "COASTLINE".to_string(),
            PathBuf::from("shapefiles/ne_10m_coastline.shp"),
        );
        layers.insert(
            "COUNTRIES".to_string(),
            PathBuf::from("shapefiles/ne_10m_admin_0_countries.shp"),
        );
        layers.insert(
            "MEXSTATES".to_string(),
            PathBuf::from("shapefiles/mexico_estados_2023_wgs84_lines.shp"),
        );
        MapDrawer {
            resource_dir: resource_dir.as_ref().to_path_buf(),
            layers,
            cache: HashMap::new(),
            font: None,
            font_probed: false,
        }
    }

    /// Registers or replaces a named layer; names are case-insensitive.
    pub fn add_layer<P: AsRef<Path>>(&mut self, name: &str, rel_path: P) {
        self.layers
            .insert(name.to_uppercase(), rel_path.as_ref().to_path_buf());
    }

    /// The registered layer names, sorted.
    pub fn list_layers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Loads (or recalls) the features of a shapefile. A failed load is
    /// cached as unavailable so the disk is not re-probed per moment.
    fn features(&mut self, name: &str, path: &Path) -> Result<&[Feature], OverlayError> {
        if !self.cache.contains_key(path) {
            let loaded = read_shapefile(path);
            if let Err(reason) = &loaded {
                warn!("layer '{name}': {reason}");
            }
            self.cache.insert(path.to_path_buf(), loaded.ok());
        }
        match self.cache.get(path).and_then(|v| v.as_ref()) {
            Some(features) => Ok(features.as_slice()),
            None => Err(OverlayError::LayerUnavailable {
                name: name.to_string(),
                path: path.to_path_buf(),
                reason: "unreadable shapefile".to_string(),
            }),
        }
    }

    /// Strokes one registered layer onto the image.
    ///
    /// # Arguments
    ///
    /// * `image` - the canvas.
    ///
    /// * `name` - registered layer name, case-insensitive.
    ///
    /// * `bounds` - geographic bounds of the canvas.
    ///
    /// * `proj` - the native CRS when the canvas is not geographic.
    ///
    /// * `color` - stroke colour.
    ///
    ///
    /// # Returns
    ///
    /// * A Result; `LayerUnavailable`/`UnknownLayer` are advisory, the
    ///   image is left usable either way.
    ///
    pub fn draw_layer(
        &mut self,
        image: &mut RgbaImage,
        name: &str,
        bounds: &LatLonBounds,
        proj: Option<&GeosProjection>,
        color: Rgba<u8>,
    ) -> Result<(), OverlayError> {
        let key = name.to_uppercase();
        let rel = self
            .layers
            .get(&key)
            .ok_or_else(|| OverlayError::UnknownLayer(key.clone()))?;
        let path = self.resource_dir.join(rel);

        let mapper = PixelMapper::new(image, bounds, proj);
        let features = self.features(&key, &path)?;

        let mut drawn = 0usize;
        for feature in features {
            if feature.rejects(bounds, CLIP_MARGIN_DEG) {
                continue;
            }
            for part in &feature.parts {
                stroke_part(image, part, bounds, &mapper, color);
            }
            drawn += 1;
        }
        debug!("layer '{key}': {drawn}/{} features drawn", features.len());
        Ok(())
    }

    /// Strokes the default layer set for the image span: within a small
    /// region (< 20 degrees in both axes) only the state borders, else
    /// coastline, country and state borders.
    pub fn draw_default_layers(
        &mut self,
        image: &mut RgbaImage,
        bounds: &LatLonBounds,
        proj: Option<&GeosProjection>,
    ) {
        let yellow = Rgba([255, 255, 0, 255]);
        let small = bounds.width().abs() < 20.0 && bounds.height().abs() < 20.0;
        let names: &[&str] = if small {
            &["MEXSTATES"]
        } else {
            &["COASTLINE", "COUNTRIES", "MEXSTATES"]
        };
        for name in names {
            if let Err(e) = self.draw_layer(image, name, bounds, proj, yellow) {
                warn!("{e}");
            }
        }
    }

    fn font(&mut self) -> Option<&FontVec> {
        if !self.font_probed {
            self.font_probed = true;
            for candidate in FONT_PATHS {
                if let Ok(data) = std::fs::read(candidate) {
                    match FontVec::try_from_vec(data) {
                        Ok(font) => {
                            self.font = Some(font);
                            break;
                        }
                        Err(e) => warn!("unusable font {candidate}: {e}"),
                    }
                }
            }
            if self.font.is_none() {
                warn!("no monospace font found; text annotations are skipped");
            }
        }
        self.font.as_ref()
    }

    /// Pastes the logo, anchored by the 2-bit position code.
    pub fn draw_logo(&self, image: &mut RgbaImage, logosize: u32, position: u8) {
        let path = self.resource_dir.join("logos/lanot_negro_sn-128.png");
        let logo = match image::open(&path) {
            Ok(logo) => logo,
            Err(e) => {
                warn!("logo {} not drawn: {e}", path.display());
                return;
            }
        };
        let aspect = logo.height() as f64 / logo.width() as f64;
        let new_h = (logosize as f64 * aspect) as u32;
        let logo = imageops::resize(&logo.to_rgba8(), logosize, new_h.max(1), imageops::FilterType::Lanczos3);
        let (x, y) = anchor(position, image.dimensions(), logo.dimensions(), 10);
        imageops::overlay(image, &logo, x, y);
    }

    /// Draws the acquisition timestamp.
    pub fn draw_timestamp(
        &mut self,
        image: &mut RgbaImage,
        timestamp: DateTime<Utc>,
        position: u8,
        fontsize: u32,
        color: Rgba<u8>,
    ) {
        let text = timestamp.format("%Y/%m/%d %H:%MZ").to_string();
        let dims = image.dimensions();
        let Some(font) = self.font() else { return };
        let text_w = (text.len() as f64 * fontsize as f64 * 0.6) as u32;
        let text_h = fontsize + 4;
        let (x, y) = anchor(position, dims, (text_w, text_h), 10);
        draw_text_mut(
            image,
            color,
            x as i32,
            y as i32,
            PxScale::from(fontsize as f32),
            font,
            &text,
        );
    }

    /// Draws a legend of colour swatches and labels.
    ///
    /// `vertical_offset` moves the box away from the anchored edge, so a
    /// legend can sit above a timestamp sharing the same corner.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_legend(
        &mut self,
        image: &mut RgbaImage,
        items: &[(&str, Rgba<u8>)],
        position: u8,
        fontsize: u32,
        vertical_offset: i64,
        bg_color: Rgba<u8>,
        text_color: Rgba<u8>,
        border_color: Option<Rgba<u8>>,
    ) {
        if items.is_empty() {
            return;
        }
        let box_size = fontsize;
        let (padding, gap, margin) = (10u32, 6u32, 10i64);
        let line_h = (fontsize + 4).max(box_size);
        let text_w = |s: &str| (s.len() as f64 * fontsize as f64 * 0.6) as u32;

        let legend_w = items
            .iter()
            .map(|(label, _)| padding + box_size + gap + text_w(label) + padding)
            .max()
            .unwrap_or(0);
        let legend_h = padding + items.len() as u32 * line_h + padding;

        let (x0, mut y0) = anchor(position, image.dimensions(), (legend_w, legend_h), margin);
        y0 += if position & 2 != 0 {
            -vertical_offset
        } else {
            vertical_offset
        };

        let background = Rect::at(x0 as i32, y0 as i32).of_size(legend_w, legend_h);
        draw_filled_rect_mut(image, background, bg_color);
        if let Some(border) = border_color {
            draw_hollow_rect_mut(image, background, border);
        }

        let font = self.font();
        let mut cy = y0 as i32 + padding as i32;
        for (label, color) in items {
            let bx = x0 as i32 + padding as i32;
            let by = cy + (line_h - box_size) as i32 / 2;
            draw_filled_rect_mut(image, Rect::at(bx, by).of_size(box_size, box_size), *color);
            if let Some(font) = font {
                let tx = bx + box_size as i32 + gap as i32;
                let ty = cy + (line_h - fontsize) as i32 / 2;
                draw_text_mut(
                    image,
                    text_color,
                    tx,
                    ty,
                    PxScale::from(fontsize as f32),
                    font,
                    label,
                );
            }
            cy += line_h as i32;
        }
    }
}

/// Soft-clipped stroke of one polyline part.
///
/// Vertices outside the bounds + margin break the line: whatever is
/// accumulated is stroked and drawing resumes at the next mappable vertex.
fn stroke_part(
    image: &mut RgbaImage,
    part: &[(f64, f64)],
    bounds: &LatLonBounds,
    mapper: &PixelMapper,
    color: Rgba<u8>,
) {
    let inside = |lon: f64, lat: f64| {
        lon > bounds.lon_min - CLIP_MARGIN_DEG
            && lon < bounds.lon_max + CLIP_MARGIN_DEG
            && lat > bounds.lat_min - CLIP_MARGIN_DEG
            && lat < bounds.lat_max + CLIP_MARGIN_DEG
    };

    let mut run: Vec<(f32, f32)> = Vec::new();
    for &(lon, lat) in part {
        let mapped = if inside(lon, lat) {
            mapper.map(lon, lat)
        } else {
            None
        };
        match mapped {
            Some(p) => run.push(p),
            None => {
                stroke_run(image, &run, color);
                run.clear();
            }
        }
    }
    stroke_run(image, &run, color);
}

fn stroke_run(image: &mut RgbaImage, run: &[(f32, f32)], color: Rgba<u8>) {
    for pair in run.windows(2) {
        draw_line_segment_mut(image, pair[0], pair[1], color);
    }
}

/// Reads every polyline/polygon feature of a shapefile into lon/lat parts.
fn read_shapefile(path: &Path) -> Result<Vec<Feature>, String> {
    let shapes = shapefile::read_shapes(path).map_err(|e| e.to_string())?;
    let mut features = Vec::with_capacity(shapes.len());
    for shape in shapes {
        match shape {
            shapefile::Shape::Polyline(line) => {
                features.push(polyline_feature(line.bbox(), line.parts()));
            }
            shapefile::Shape::Polygon(polygon) => {
                let parts: Vec<Vec<shapefile::Point>> = polygon
                    .rings()
                    .iter()
                    .map(|ring| ring.points().to_vec())
                    .collect();
                features.push(polyline_feature(polygon.bbox(), &parts));
            }
            _ => {}
        }
    }
    Ok(features)
}

fn polyline_feature(
    bbox: &shapefile::record::GenericBBox<shapefile::Point>,
    parts: &[Vec<shapefile::Point>],
) -> Feature {
    Feature {
        bbox: (bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y),
        parts: parts
            .iter()
            .map(|part| part.iter().map(|p| (p.x, p.y)).collect())
            .collect(),
    }
}

/// Saves the annotated image as a PNG.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OverlayError> {
    image.save(path)?;
    Ok(())
}
