use anyhow::Result;
use tracing::level_filters::LevelFilter;

use hearth::config::Config;
use hearth::server::Server;

fn main() -> Result<()> {
    let cfg = Config::load()?;
    cfg.validate()?;

    let level = if cfg.log.enabled {
        parse_level(&cfg.log.level)
    } else {
        LevelFilter::OFF
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    let mut server = Server::new(&cfg)?;
    server.run()
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}
