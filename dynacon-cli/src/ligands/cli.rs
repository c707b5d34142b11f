use clap::{Arg, Command, value_parser};

pub const LIGANDS_CMD: &str = "ligands";

pub fn create_ligands_cli() -> Command {
    Command::new(LIGANDS_CMD)
        .about("Report the ligands seen in enough frames of a run")
        .arg(
            Arg::new("frames")
                .long("frames")
                .short('f')
                .required(true)
                .help("Folder of per frame ligand reports"),
        )
        .arg(
            Arg::new("total-frames")
                .long("total-frames")
                .short('n')
                .value_parser(value_parser!(usize))
                .help("Frames of the trajectory; defaults to the number of reports"),
        )
        .arg(
            Arg::new("chebi-folder")
                .long("chebi-folder")
                .help("Folder of the InChIKey lookup tables"),
        )
}
