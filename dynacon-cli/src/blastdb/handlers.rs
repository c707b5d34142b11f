use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;
use dynacon_numbering::refdb::{
    DEFAULT_RECEPTOR_LIST_API, build_blast_db, fetch_receptor_list, read_receptor_list,
};
use log::info;

use crate::load_config;

pub fn run_blastdb(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;

    let entries = match matches.get_one::<String>("receptors") {
        Some(path) => read_receptor_list(Path::new(path))?,
        None => {
            let api = matches
                .get_one::<String>("api")
                .map(String::as_str)
                .unwrap_or(DEFAULT_RECEPTOR_LIST_API);
            fetch_receptor_list(api, config.http_timeout())?
        }
    };
    info!("{} reference receptors", entries.len());

    let db_name = config
        .blast_db
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("receptors_db")
        .to_string();
    let out_dir = match matches.get_one::<String>("out") {
        Some(out) => PathBuf::from(out),
        None => config
            .blast_db
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let makeblastdb = matches
        .get_one::<String>("makeblastdb")
        .map(PathBuf::from)
        .expect("makeblastdb has a default");

    build_blast_db(&entries, &makeblastdb, &out_dir, &db_name)?;
    println!("{}", out_dir.join(&db_name).display());
    Ok(())
}
