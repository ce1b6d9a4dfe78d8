// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Orchestration of one run: resolve, read, classify, reproject and write,
moment by moment.

Moments are processed in ascending time order. Any failure inside one
moment is caught at this boundary, recorded, and the run continues with
the next moment; at end of run the failed moments are grouped into
consecutive intervals for the report. The vector-layer cache and the
probed font live across moments; everything else is created and released
inside a single moment.
*/

use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use log::{info, warn};
use ndarray::Array2;

use crate::classifier::{classify, BandStack};
use crate::error::CenizaError;
use crate::moment::{group_failures, Moment};
use crate::netcdf_read::{NcReadError, ProductFile};
use crate::overlay::{self, MapDrawer, DEFAULT_RESOURCE_DIR};
use crate::product_files::{self, Product, ProductCoverage, ALL_PRODUCTS};
use crate::projection::{
    pixel_grid_to_latlon, window_from_bbox, GeoTransform, GeosProjection, LatLonBounds,
};
use crate::raster::{self, OutputCrs};
use crate::reproject::{warp_to_geographic, GeographicGrid, DEFAULT_GEO_RES};
use crate::solar::solar_zenith_angle;
use crate::MOMENT_STRIDE_MINUTES;


/// Relative window padding applied when a reprojection will follow, so the
/// nearest-neighbour warp never samples off the clipped edge.
const REPROJECTION_PAD: f64 = 0.1;

/// A named clip region `(lon_min, lat_max, lon_max, lat_min)` in WGS84.
const CLIP_REGIONS: [(&str, (f64, f64, f64, f64)); 3] = [
    ("mexico", (-118.0, 33.0, -86.0, 14.0)),
    ("popocatepetl", (-100.12, 20.52, -97.12, 17.52)),
    ("valle", (-99.9, 20.1, -98.5, 19.0)),
];

/// Resolves a `--clip` argument: a region name with an optional `geo`
/// suffix requesting EPSG:4326 output.
pub fn clip_region(arg: &str) -> Option<(LatLonBounds, bool)> {
    let (name, geographic) = match arg.strip_suffix("geo") {
        Some(base) => (base, true),
        None => (arg, false),
    };
    CLIP_REGIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, (lon_min, lat_max, lon_max, lat_min))| {
            (
                LatLonBounds::new(*lon_min, *lat_max, *lon_max, *lat_min),
                geographic,
            )
        })
}

/// Options of one processing run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Archive root directory
    pub root: PathBuf,
    /// Whether the archive is date-tiered `root/YYYY/MM/DD`
    pub tiered: bool,
    /// Optional clip bounds in WGS84
    pub clip: Option<LatLonBounds>,
    /// Reproject the output to EPSG:4326
    pub to_geographic: bool,
    /// Target resolution in degrees for reprojected output
    pub geo_res: f64,
    /// Also render the annotated PNG
    pub png: bool,
    /// Output file (single moment) or directory; the working directory
    /// when absent
    pub output: Option<PathBuf>,
    /// Resource directory for shapefiles and logos
    pub resource_dir: PathBuf,
    /// Only check product coverage; write nothing
    pub dry_run: bool,
}

impl PipelineOptions {
    /// Options with defaults for everything but the archive root.
    pub fn new<P: AsRef<Path>>(root: P) -> PipelineOptions {
        PipelineOptions {
            root: root.as_ref().to_path_buf(),
            tiered: false,
            clip: None,
            to_geographic: false,
            geo_res: DEFAULT_GEO_RES,
            png: false,
            output: None,
            resource_dir: PathBuf::from(DEFAULT_RESOURCE_DIR),
            dry_run: false,
        }
    }
}

/// One failed moment and why it failed.
#[derive(Debug)]
pub struct MomentFailure {
    pub moment: Moment,
    pub error: CenizaError,
}

/// The outcome of a run.
#[derive(Debug, Default)]
pub struct Report {
    /// Moments fully processed
    pub processed: Vec<Moment>,
    /// Moments skipped with their errors
    pub failures: Vec<MomentFailure>,
}

impl Report {
    /// Whether every moment processed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failed moments collapsed into consecutive intervals.
    pub fn failure_intervals(&self) -> Vec<(Moment, Moment)> {
        let moments: Vec<Moment> = self.failures.iter().map(|f| f.moment).collect();
        group_failures(&moments, MOMENT_STRIDE_MINUTES)
    }
}

/// A processing run over one or more moments.
pub struct Pipeline {
    options: PipelineOptions,
    drawer: MapDrawer,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Pipeline {
        let drawer = MapDrawer::new(&options.resource_dir);
        Pipeline { options, drawer }
    }

    /// Processes the moments in ascending order with per-moment error
    /// isolation, and reports the outcome.
    pub fn run(&mut self, moments: &[Moment]) -> Report {
        let mut sorted: Vec<Moment> = moments.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut report = Report::default();
        for moment in sorted {
            info!("moment {moment}");
            let outcome = if self.options.dry_run {
                self.check_moment(&moment)
            } else {
                self.process_moment(&moment)
            };
            match outcome {
                Ok(()) => report.processed.push(moment),
                Err(error) => {
                    warn!("moment {moment} skipped: {error}");
                    report.failures.push(MomentFailure { moment, error });
                }
            }
        }

        for (first, last) in report.failure_intervals() {
            if first == last {
                warn!("missing moment {first}");
            } else {
                warn!("missing interval {first}-{last}");
            }
        }
        report
    }

    /// Coverage check only (`--dry-run`).
    fn check_moment(&self, moment: &Moment) -> Result<(), CenizaError> {
        product_files::resolve_complete(&self.options.root, moment, &ALL_PRODUCTS, self.options.tiered)?;
        Ok(())
    }

    /// The full resolve → read → classify → write chain for one moment.
    fn process_moment(&mut self, moment: &Moment) -> Result<(), CenizaError> {
        let options = self.options.clone();
        let coverage = product_files::resolve_complete(
            &options.root,
            moment,
            &ALL_PRODUCTS,
            options.tiered,
        )?;

        // The clean longwave band is the geometry reference; every other
        // product must share its grid.
        let reference = open_product(&coverage, Product::C13)?;
        let attrs = reference.projection_attrs()?;
        let proj = GeosProjection::from_attrs(&attrs)?;
        let (x_m, y_m) = reference.coords_m()?;
        let timestamp = reference.time_coverage_start()?;
        let full_shape = reference.shape("CMI")?;

        let (rows, cols) = match &options.clip {
            Some(bbox) => {
                let pad = if options.to_geographic {
                    REPROJECTION_PAD
                } else {
                    0.0
                };
                window_from_bbox(&x_m, &y_m, &proj, bbox, pad)?
            }
            None => (0..y_m.len(), 0..x_m.len()),
        };
        info!(
            "window rows {}..{} cols {}..{} of {}x{}",
            rows.start, rows.end, cols.start, cols.end, full_shape.0, full_shape.1
        );

        let bands = read_band_stack(&coverage, full_shape, &rows, &cols)?;

        let x_win = x_m[cols.clone()].to_vec();
        let y_win = y_m[rows.clone()].to_vec();
        let transform = GeoTransform::from_coords(&x_win, &y_win)?;
        let (lat, lon) = pixel_grid_to_latlon(&x_win, &y_win, &proj);

        let valid = bands.valid_mask(&lat, &lon);
        let sza = solar_zenith_angle(&lat, &lon, timestamp);
        let ash = classify(&bands, &sza, &valid);

        let (tif_path, png_path) = self.output_paths(moment, options.to_geographic);
        let png_bounds = options
            .clip
            .or_else(|| scene_bounds(&lat, &lon))
            .unwrap_or_else(|| LatLonBounds::new(-180.0, 90.0, 180.0, -90.0));

        if options.to_geographic {
            let grid = GeographicGrid::from_bounds(&png_bounds, options.geo_res);
            let warped = warp_to_geographic(&ash, &transform, &proj, &grid);
            raster::write_geotiff(&tif_path, &warped, &grid.transform(), &OutputCrs::Geographic)?;
            info!("wrote {}", tif_path.display());
            if options.png {
                self.render_png(&png_path, &warped, &png_bounds, None, timestamp)?;
            }
        } else {
            raster::write_geotiff(
                &tif_path,
                &ash,
                &transform,
                &OutputCrs::Geostationary(proj.clone()),
            )?;
            info!("wrote {}", tif_path.display());
            if options.png {
                self.render_png(&png_path, &ash, &png_bounds, Some(&proj), timestamp)?;
            }
        }
        Ok(())
    }

    /// Renders and saves the annotated PNG for one raster.
    fn render_png(
        &mut self,
        path: &Path,
        ash: &Array2<u8>,
        bounds: &LatLonBounds,
        proj: Option<&GeosProjection>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CenizaError> {
        let (rows, cols) = ash.dim();
        let rgba = raster::apply_palette(ash);
        let mut image = RgbaImage::from_raw(cols as u32, rows as u32, rgba)
            .expect("palette buffer matches image size");

        self.drawer.draw_default_layers(&mut image, bounds, proj);
        self.drawer.draw_logo(&mut image, 128, 3);
        self.drawer
            .draw_timestamp(&mut image, timestamp, 2, 15, Rgba([255, 255, 255, 255]));
        let legend = [
            ("Ceniza", Rgba([255, 0, 0, 255])),
            ("Ceniza probable", Rgba([255, 165, 0, 255])),
            ("Ceniza menos probable", Rgba([255, 255, 0, 255])),
        ];
        self.drawer.draw_legend(
            &mut image,
            &legend,
            2,
            15,
            30,
            Rgba([255, 255, 255, 255]),
            Rgba([0, 0, 0, 255]),
            None,
        );

        overlay::save_png(&image, path)?;
        info!("wrote {}", path.display());
        Ok(())
    }

    /// Output file paths of one moment: `ceniza_{julian}[_geo].tif` and
    /// its PNG sibling, under the output directory (or at the explicit
    /// output file path).
    fn output_paths(&self, moment: &Moment, geographic: bool) -> (PathBuf, PathBuf) {
        let default_name = if geographic {
            format!("ceniza_{}_geo.tif", moment.format())
        } else {
            format!("ceniza_{}.tif", moment.format())
        };
        let tif = match &self.options.output {
            Some(path) if path.is_dir() => path.join(default_name),
            Some(path) => path.clone(),
            None => PathBuf::from(default_name),
        };
        let png = tif.with_extension("png");
        (tif, png)
    }
}

fn open_product(coverage: &ProductCoverage, product: Product) -> Result<ProductFile, NcReadError> {
    let path = coverage
        .path(product)
        .expect("coverage was checked complete");
    ProductFile::open(path)
}

/// Reads all seven products over one window, verifying every file shares
/// the reference grid.
fn read_band_stack(
    coverage: &ProductCoverage,
    full_shape: (usize, usize),
    rows: &Range<usize>,
    cols: &Range<usize>,
) -> Result<BandStack, NcReadError> {
    let window = Some((rows.clone(), cols.clone()));

    let read_band = |product: Product| -> Result<Array2<f32>, NcReadError> {
        let file = open_product(coverage, product)?;
        check_grid(&file, "CMI", full_shape)?;
        file.read_f32("CMI", window.clone())
    };

    let actp = open_product(coverage, Product::Actp)?;
    check_grid(&actp, "Phase", full_shape)?;
    let phase = actp.read_i8("Phase", window.clone())?;

    Ok(BandStack {
        c04: read_band(Product::C04)?,
        c07: read_band(Product::C07)?,
        c11: read_band(Product::C11)?,
        c13: read_band(Product::C13)?,
        c14: read_band(Product::C14)?,
        c15: read_band(Product::C15)?,
        phase,
    })
}

fn check_grid(
    file: &ProductFile,
    var: &str,
    expected: (usize, usize),
) -> Result<(), NcReadError> {
    let shape = file.shape(var)?;
    if shape != expected {
        return Err(NcReadError::GridMismatch {
            path: file.path().to_path_buf(),
            expected,
            got: shape,
        });
    }
    Ok(())
}

/// The geographic extent of a scene from its coordinate grids, ignoring
/// off-disk pixels.
fn scene_bounds(lat: &Array2<f64>, lon: &Array2<f64>) -> Option<LatLonBounds> {
    let mut lon_min = f64::INFINITY;
    let mut lon_max = f64::NEG_INFINITY;
    let mut lat_min = f64::INFINITY;
    let mut lat_max = f64::NEG_INFINITY;
    for (&la, &lo) in lat.iter().zip(lon.iter()) {
        if la.is_finite() && lo.is_finite() {
            lat_min = lat_min.min(la);
            lat_max = lat_max.max(la);
            lon_min = lon_min.min(lo);
            lon_max = lon_max.max(lo);
        }
    }
    if lon_min.is_finite() {
        Some(LatLonBounds::new(lon_min, lat_max, lon_max, lat_min))
    } else {
        None
    }
}
