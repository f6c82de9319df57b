fn main() {
    if let Err(err) = spotquest_lib::run() {
        eprintln!("spotquest: {err:#}");
        std::process::exit(1);
    }
}
