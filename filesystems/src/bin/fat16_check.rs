// Command-line tool to inspect and check a FAT16 image
// Prints a JSON report; exits non-zero when the FAT copies disagree

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Serialize;
use sfat_filesystems::{DirectoryListing, Fat16Fs, FileDevice, FilesystemInfo, VolumeMetadata};
use std::env;

#[derive(Serialize)]
struct CheckReport {
    image: String,
    geometry: VolumeMetadata,
    usage: FilesystemInfo,
    mismatched_fat_sectors: Vec<u64>,
    root_directory: Vec<DirectoryListing>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <image_path>", args[0]);
        std::process::exit(2);
    }
    let image = &args[1];

    let device = FileDevice::open(image).with_context(|| format!("opening {}", image))?;
    let mut fs = Fat16Fs::mount(device).with_context(|| format!("mounting {}", image))?;

    let usage = fs.statfs().context("counting free clusters")?;
    let mismatched_fat_sectors = fs.verify_fat_copies().context("comparing FAT copies")?;
    let root_directory = fs.readdir("/").context("listing the root directory")?;
    info!(
        "{} of {} clusters free",
        usage.free_clusters, usage.total_clusters
    );

    let report = CheckReport {
        image: image.clone(),
        geometry: fs.metadata().clone(),
        usage,
        mismatched_fat_sectors,
        root_directory,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.mismatched_fat_sectors.is_empty() {
        warn!("FAT copies differ in {} sector(s)", report.mismatched_fat_sectors.len());
        bail!("FAT copies are inconsistent");
    }
    Ok(())
}
