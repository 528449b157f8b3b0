use authvault::cli::{commands, output, Cli, Commands};
use authvault::config::Settings;
use authvault::vault::VaultService;
use clap::Parser;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    authvault::logging::init(cli.verbose);

    let settings = Settings::from_env();
    let service = VaultService::initialize(&settings).await;

    let result = match cli.command {
        Commands::Save {
            ref label,
            ref secret,
        } => commands::save::execute(&cli, &service, label, secret).await,
        Commands::List => commands::list::execute(&cli, &service).await,
        Commands::Remove { ref label } => commands::remove::execute(&cli, &service, label).await,
        Commands::SetDefault { ref label } => {
            commands::set_default::execute(&cli, &service, label).await
        }
        Commands::Code {
            ref label,
            ref secret,
        } => commands::code::execute(&cli, &service, label.as_deref(), secret.as_deref()).await,
        Commands::Status => commands::status::execute(&cli, &service).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
