//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = velotour_cli::run() {
        eprintln!("velotour: {err}");
        std::process::exit(1);
    }
}
