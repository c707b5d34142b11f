use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use dynacon_pipeline::contacts::{interaction_counts, read_contacts_tsv};
use dynacon_pipeline::ligands::write_contacts_frame_reports;
use log::info;

pub fn run_contacts(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<String>("input")
        .expect("A contacts file is required");

    let contacts = read_contacts_tsv(Path::new(input))?;
    let counts = interaction_counts(&contacts);

    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for (frame, per_type) in &counts {
        for (interaction, n) in per_type {
            println!("{}\t{}\t{}", frame, interaction, n);
            *totals.entry(interaction.as_str()).or_default() += n;
        }
    }
    for (interaction, n) in &totals {
        println!("total\t{}\t{}", interaction, n);
    }
    println!("Number of contacts: {} over {} frames", contacts.len(), counts.len());

    if let Some(frames) = matches.get_one::<String>("frames") {
        let written = write_contacts_frame_reports(Path::new(input), Path::new(frames))?;
        info!("{} frame reports written to {}", written, frames);
    }
    Ok(())
}
