use rtps::config::Config;
use rtps::error::AppError;
use rtps::window::App;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional JSON config path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    App::run(config)
}
