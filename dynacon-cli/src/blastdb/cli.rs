use clap::{Arg, Command};

pub const BLASTDB_CMD: &str = "blastdb";

pub fn create_blastdb_cli() -> Command {
    Command::new(BLASTDB_CMD)
        .about("Build the BLAST database of reference receptors")
        .arg(
            Arg::new("out")
                .long("out")
                .short('o')
                .help("Output folder; defaults to the folder of the configured database"),
        )
        .arg(
            Arg::new("receptors")
                .long("receptors")
                .short('r')
                .help("Saved receptor list (JSON); fetched from the registry when absent"),
        )
        .arg(
            Arg::new("api")
                .long("api")
                .help("Receptor list endpoint"),
        )
        .arg(
            Arg::new("makeblastdb")
                .long("makeblastdb")
                .default_value("makeblastdb")
                .help("makeblastdb executable"),
        )
}
