use std::process;

use clap::Parser;
use logger::Logger;

#[macro_use]
extern crate log;

/// Parse command line arguments and run `sam2codfreq::run()`
fn main() {
    // ----------------------------- Run CLI Parser
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    Logger::init(cli.verbosity());

    // ----------------------------- Serialize command line arguments
    cli.serialize();

    // ----------------------------- Run the pipeline.
    match sam2codfreq::run(&cli) {
        Ok(()) => (),
        Err(e) => {
            error!("{e:?}");
            process::exit(1);
        }
    };
}
