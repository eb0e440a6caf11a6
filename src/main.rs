fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = tibia_house_store::run(&args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
