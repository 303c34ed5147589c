use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    std::process::exit(comodes_cli::cli::run_from_env());
}
