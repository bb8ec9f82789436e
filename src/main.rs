fn main() {
    match app_updater::run() {
        Ok(reason) => log::info!("Exiting: {:?}", reason),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("app-updater: {}", e);
            std::process::exit(1);
        }
    }
}
