use amm_quoter::cli::{self, output, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
