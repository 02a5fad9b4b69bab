fn main() {
    if let Err(e) = glslpack::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
