fn main() {
    if let Err(err) = pam_asset_migrator::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
