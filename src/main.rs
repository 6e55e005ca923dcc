use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use afford::api::{ProjectArgs, run_http_server, run_project_command};

#[derive(Parser, Debug)]
#[command(
    name = "afford",
    about = "Net-worth projection and home-affordability estimator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web UI and the JSON projection API
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
    /// Run one scenario and print the projection as JSON
    Project(ProjectArgs),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        Command::Project(args) => match run_project_command(args) {
            Ok(json) => println!("{json}"),
            Err(msg) => {
                tracing::error!("{msg}");
                std::process::exit(1);
            }
        },
    }
}
