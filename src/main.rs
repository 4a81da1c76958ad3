use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crossing_browser::init_logging();
    cli::run(cli::Cli::parse()).await
}
