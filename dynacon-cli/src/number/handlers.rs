use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use dynacon_core::files::TrajectoryFiles;
use dynacon_numbering::aligner::BlastAligner;
use dynacon_numbering::cache::ReferenceNumberingCacheBuilder;
use dynacon_numbering::pdb::PdbTopologyLoader;
use dynacon_numbering::NumberingResolver;
use log::info;

use crate::load_config;

pub fn run_number(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;

    let topology = matches
        .get_one::<String>("topology")
        .map(PathBuf::from)
        .expect("A topology file is required");
    let trajectory = matches
        .get_one::<String>("trajectory")
        .map(PathBuf::from)
        .unwrap_or_else(|| topology.clone());

    let cache = ReferenceNumberingCacheBuilder::from_config(&config).finish()?;
    let resolver = NumberingResolver::new(
        Arc::new(BlastAligner::from_config(&config)),
        Arc::new(cache),
    );

    let files = TrajectoryFiles::new(topology, trajectory);
    let report = resolver.resolve(&PdbTopologyLoader::new(), &files)?;
    info!(
        "{} residues numbered, {} diagnostics",
        report.map.len(),
        report.diagnostics.len()
    );

    match matches.get_one::<String>("output") {
        Some(output) => {
            fs::write(output, serde_json::to_vec_pretty(&report)?)
                .with_context(|| format!("Failed to write {}", output))?;
        }
        None => {
            for (residue, label) in report.map.iter() {
                println!("{}\t{}", residue, label);
            }
        }
    }
    Ok(())
}
