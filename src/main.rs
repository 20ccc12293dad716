//! Keygate CLI binary entry point.

use keygate::cli::commands::{self, App};
use keygate::cli::{Cli, Commands};
use keygate::config::KeygateConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse_args();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> keygate::error::Result<()> {
    let app = App::bootstrap(KeygateConfig::from_env()).await?;
    match command {
        Commands::Login(args) => commands::handle_login(&app, &args.email, args.password).await,
        Commands::Register(args) => {
            commands::handle_register(
                &app,
                &args.email,
                &args.username,
                args.password,
                args.first_name,
                args.last_name,
            )
            .await
        }
        Commands::Confirm(args) => commands::handle_confirm(&app, &args.email, &args.code).await,
        Commands::Logout => commands::handle_logout(&app).await,
        Commands::Status => commands::handle_status(&app).await,
        Commands::Request(args) => {
            commands::handle_request(
                &app,
                &args.target,
                &args.method,
                &args.headers,
                args.data.as_deref(),
            )
            .await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keygate=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
