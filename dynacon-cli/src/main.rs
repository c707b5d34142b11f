mod blastdb;
mod cache;
mod contacts;
mod ligands;
mod number;
mod run;

use std::path::Path;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use dynacon_core::Config;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "dynacon";
    pub const CONFIG_ARG: &str = "config";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Generic residue numbering and receptor-ligand contact analysis of molecular dynamics trajectories.")
        .subcommand_required(true)
        .arg(
            Arg::new(consts::CONFIG_ARG)
                .long("config")
                .short('c')
                .global(true)
                .help("TOML configuration file; DYNACON_* variables override it"),
        )
        .subcommand(number::cli::create_number_cli())
        .subcommand(cache::cli::create_cache_cli())
        .subcommand(contacts::cli::create_contacts_cli())
        .subcommand(ligands::cli::create_ligands_cli())
        .subcommand(run::cli::create_run_cli())
        .subcommand(blastdb::cli::create_blastdb_cli())
}

/// Configuration from `--config` (or defaults) with environment overrides applied.
pub fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config = match matches.get_one::<String>(consts::CONFIG_ARG) {
        Some(path) => Config::from_toml_file(Path::new(path))?,
        None => Config::default(),
    };
    Ok(config.with_env_overrides())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // NUMBERING OF ONE STRUCTURE
        //
        Some((number::cli::NUMBER_CMD, matches)) => {
            number::handlers::run_number(matches)?;
        }

        //
        // REFERENCE NUMBERING CACHE
        //
        Some((cache::cli::CACHE_CMD, matches)) => {
            cache::handlers::run_cache(matches)?;
        }

        //
        // CONTACTS SUMMARY
        //
        Some((contacts::cli::CONTACTS_CMD, matches)) => {
            contacts::handlers::run_contacts(matches)?;
        }

        //
        // LIGAND DETECTION
        //
        Some((ligands::cli::LIGANDS_CMD, matches)) => {
            ligands::handlers::run_ligands(matches)?;
        }

        //
        // FULL SUBMISSION
        //
        Some((run::cli::RUN_CMD, matches)) => {
            run::handlers::run_submission(matches)?;
        }

        //
        // REFERENCE BLAST DATABASE
        //
        Some((blastdb::cli::BLASTDB_CMD, matches)) => {
            blastdb::handlers::run_blastdb(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
