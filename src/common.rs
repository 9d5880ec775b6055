//! Common functionality shared by every CLI sub command.

use clap::Parser;
use clap_verbosity_flag::Verbosity;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program.
    #[clap(flatten)]
    pub verbose: Verbosity,
}
