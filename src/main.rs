use clap::Parser;
use dermascan_lib::app::Cli;

#[tokio::main]
async fn main() {
    dermascan_lib::app::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = dermascan_lib::app::run(cli).await {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
