use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;
use dynacon_pipeline::ligands::{LigandDetectionAggregator, LigandTables, read_frame_reports};
use log::info;

use crate::load_config;

pub fn run_ligands(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let frames = matches
        .get_one::<String>("frames")
        .expect("A frames folder is required");
    let chebi_folder = matches
        .get_one::<String>("chebi-folder")
        .map(PathBuf::from)
        .unwrap_or(config.chebi_folder);

    let reports = read_frame_reports(Path::new(frames))?;
    let total_frames = matches
        .get_one::<usize>("total-frames")
        .copied()
        .unwrap_or(reports.len());

    let mut aggregator = LigandDetectionAggregator::new();
    for report in &reports {
        aggregator.add_frame(report);
    }
    info!(
        "{} distinct ligands in {} reports",
        aggregator.distinct(),
        reports.len()
    );

    let summary = aggregator.summarize(total_frames, &LigandTables::load(&chebi_folder));
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
