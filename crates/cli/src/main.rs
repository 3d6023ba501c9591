fn main() {
    if let Err(e) = rescope_cli::run() {
        eprintln!("{}", rescope_cli::render_error(e.as_ref()));
        std::process::exit(1);
    }
}
