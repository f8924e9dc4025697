use clap::Parser;

/// This is a chamber seat election tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON description of the election: candidates, seats, ballot
    /// file sources and rules. For more information about the file format, read the
    /// documentation of the chamber_voting crate.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the summary of an election in JSON
    /// format. If provided, chambertally will check that the tabulated output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election
    /// will be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
