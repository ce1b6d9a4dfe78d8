// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line driver for the ash detection pipeline.
//!
//! Exits non-zero only on argument errors; processing failures are
//! reported and grouped per moment, and the process still exits 0 so a
//! scheduler does not treat data gaps as crashes.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;

use cenizalib::moment::{self, ImagingMode};
use cenizalib::pipeline::clip_region;
use cenizalib::{Moment, Pipeline, PipelineOptions};

#[derive(Parser, Debug)]
#[command(name = "ceniza", author, version, about = "Detect volcanic ash in GOES ABI L2 imagery")]
struct Opt {
    /// Archive directory holding the ABI L2 products.
    #[arg(short, long, default_value = "/data/output/abi/l2/conus")]
    path: PathBuf,

    /// Moment (YYYYjjjHHMM or YYYYMMDDHHMM) or same-day range (...-HHMM);
    /// the most recent scan when absent.
    #[arg(short, long)]
    moment: Option<String>,

    /// Output file, or directory for ceniza_{julian}[_geo].tif.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Clip region name (mexico, popocatepetl, valle); append 'geo' for
    /// EPSG:4326 output.
    #[arg(short, long)]
    clip: Option<String>,

    /// Also render the annotated PNG.
    #[arg(long)]
    png: bool,

    /// The archive is date-tiered root/YYYY/MM/DD.
    #[arg(long = "date-tree")]
    date_tree: bool,

    /// Check product coverage and report gaps without writing anything.
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Quantize the default moment on the full-disk cadence instead of
    /// CONUS.
    #[arg(long)]
    fulldisk: bool,

    /// Resource directory for shapefiles and logos.
    #[arg(long, default_value = cenizalib::overlay::DEFAULT_RESOURCE_DIR)]
    resources: PathBuf,

    /// Target resolution in degrees for reprojected output.
    #[arg(long, default_value_t = cenizalib::reproject::DEFAULT_GEO_RES)]
    geo_res: f64,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let opts = Opt::parse();

    let moments: Vec<Moment> = match &opts.moment {
        Some(s) => Moment::parse(s).with_context(|| format!("bad --moment '{s}'"))?,
        None => {
            let mode = if opts.fulldisk {
                ImagingMode::FullDisk
            } else {
                ImagingMode::Conus
            };
            vec![moment::now_quantized(mode)]
        }
    };

    let mut options = PipelineOptions::new(&opts.path);
    options.tiered = opts.date_tree;
    options.png = opts.png;
    options.dry_run = opts.dry_run;
    options.output = opts.output.clone();
    options.resource_dir = opts.resources.clone();
    options.geo_res = opts.geo_res;
    if let Some(clip) = &opts.clip {
        let (bounds, geographic) =
            clip_region(clip).ok_or_else(|| anyhow!("unknown clip region '{clip}'"))?;
        options.clip = Some(bounds);
        options.to_geographic = geographic;
    }

    let mut pipeline = Pipeline::new(options);
    let report = pipeline.run(&moments);

    println!(
        "{} moment(s) processed, {} failed",
        report.processed.len(),
        report.failures.len()
    );
    for (first, last) in report.failure_intervals() {
        if first == last {
            println!("missing: {first}");
        } else {
            println!("missing: {first}-{last}");
        }
    }

    Ok(())
}
