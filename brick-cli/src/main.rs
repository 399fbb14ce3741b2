//! Entry point for the `brick` command-line interface.
#![forbid(unsafe_code)]

use brick_cli::CliError;

fn main() {
    match brick_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("brick: {err}");
            std::process::exit(1);
        }
    }
}
