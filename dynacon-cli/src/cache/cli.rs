use clap::{Arg, Command};

pub const CACHE_CMD: &str = "cache";
pub const CACHE_FETCH: &str = "fetch";
pub const CACHE_SEEK: &str = "seek";
pub const CACHE_INSPECT: &str = "inspect";
pub const CACHE_REMOVE: &str = "rm";

fn accession_arg() -> Arg {
    Arg::new("accession")
        .long("accession")
        .short('a')
        .required(true)
        .help("UniProt accession of the reference receptor, e.g. P41143")
}

fn cache_folder_arg() -> Arg {
    Arg::new("cache-folder")
        .long("cache-folder")
        .short('f')
        .help("Cache folder path")
}

pub fn create_cache_cli() -> Command {
    Command::new(CACHE_CMD)
        .about("Fetches and caches reference residue numbering from the residue registry")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CACHE_FETCH)
                .about("Fetch the reference numbering of an accession into the cache")
                .arg(accession_arg())
                .arg(cache_folder_arg()),
        )
        .subcommand(
            Command::new(CACHE_SEEK)
                .about("Print the cache file of an accession")
                .arg(accession_arg())
                .arg(cache_folder_arg()),
        )
        .subcommand(
            Command::new(CACHE_INSPECT)
                .about("List the cached accessions")
                .arg(cache_folder_arg()),
        )
        .subcommand(
            Command::new(CACHE_REMOVE)
                .about("Remove an accession from the cache")
                .arg(accession_arg())
                .arg(cache_folder_arg()),
        )
}
