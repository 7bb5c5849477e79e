//! classlens binary entry point.

fn main() {
    if let Err(e) = classlens::cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
