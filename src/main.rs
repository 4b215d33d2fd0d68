fn main() {
    if let Err(err) = sales_api::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
