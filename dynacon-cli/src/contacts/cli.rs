use clap::{Arg, Command};

pub const CONTACTS_CMD: &str = "contacts";

pub fn create_contacts_cli() -> Command {
    Command::new(CONTACTS_CMD)
        .about("Summarise a contacts file: contacts per frame and interaction type")
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .help("Contacts TSV (plain or gzipped)"),
        )
        .arg(
            Arg::new("frames")
                .long("frames")
                .help("Also write one ligand report per frame into this folder"),
        )
}
