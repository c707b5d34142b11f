use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;
use dynacon_numbering::cache::ReferenceNumberingCacheBuilder;

use super::cli::{CACHE_FETCH, CACHE_INSPECT, CACHE_REMOVE, CACHE_SEEK};
use crate::load_config;

/// Execute a `cache` subcommand
/// # Arguments
/// - matches: matched items from CLAP args
pub fn run_cache(matches: &ArgMatches) -> Result<()> {
    let (subcmd, matches) = matches.subcommand().expect("A subcommand is required");
    let config = load_config(matches)?;

    let mut builder = ReferenceNumberingCacheBuilder::from_config(&config);
    if let Some(folder) = matches.get_one::<String>("cache-folder") {
        builder = builder.with_cache_folder(PathBuf::from(folder));
    }
    let cache = builder.finish()?;

    let accession = || {
        matches
            .get_one::<String>("accession")
            .expect("An accession is required")
    };

    match subcmd {
        CACHE_FETCH => {
            let records = cache.prefetch(accession())?;
            println!("{}: {} reference residues", accession(), records);
        }
        CACHE_SEEK => {
            println!("{}", cache.seek(accession())?.display());
        }
        CACHE_INSPECT => {
            let accessions = cache.list()?;
            for accession in &accessions {
                println!("{}", accession);
            }
            println!("Number of cached accessions: {}", accessions.len());
        }
        CACHE_REMOVE => {
            cache.remove(accession())?;
        }
        _ => unreachable!("Unknown cache subcommand: {subcmd}"),
    }
    Ok(())
}
