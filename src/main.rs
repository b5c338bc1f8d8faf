fn main() {
    if let Err(err) = csv_mix::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
