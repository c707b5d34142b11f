use clap::{Arg, ArgAction, Command, value_parser};

pub const RUN_CMD: &str = "run";

pub fn create_run_cli() -> Command {
    Command::new(RUN_CMD)
        .about("Run interactions, numbering and analysis of a submission directory")
        .arg(
            Arg::new("submission")
                .long("submission")
                .short('s')
                .required(true)
                .help("Submission directory holding one folder per form"),
        )
        .arg(
            Arg::new("forms")
                .long("forms")
                .required(true)
                .help("JSON list of the submitted forms"),
        )
        .arg(
            Arg::new("common-numbering")
                .long("common-numbering")
                .action(ArgAction::SetTrue)
                .help("Add generic numbering columns to the contacts"),
        )
        .arg(
            Arg::new("poll")
                .long("poll")
                .value_parser(value_parser!(u64))
                .default_value("5")
                .help("Seconds between progress reports"),
        )
}
