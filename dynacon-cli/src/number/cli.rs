use clap::{Arg, Command};

pub const NUMBER_CMD: &str = "number";

pub fn create_number_cli() -> Command {
    Command::new(NUMBER_CMD)
        .about("Resolve generic residue numbering of a structure through alignment to reference receptors")
        .arg(
            Arg::new("topology")
                .long("topology")
                .short('t')
                .required(true)
                .help("Topology file (PDB)"),
        )
        .arg(
            Arg::new("trajectory")
                .long("trajectory")
                .short('x')
                .help("Trajectory file; defaults to the topology"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the numbering map and diagnostics as JSON to this file"),
        )
}
