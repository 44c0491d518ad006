//! Command-line front end for the user directory.
//!
//! # Responsibility
//! - Drive `UserDirectoryController` against the configured store, the same
//!   way a form-based view would.
//! - Print the resulting status message and listing deterministically.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use upa_core::{
    describe_error, init_logging, open_gateway, AppConfig, DirectoryError, DirectorySnapshot,
    DraftField, UserDirectoryController, UserGateway, UserId,
};

#[derive(Debug, Parser)]
#[command(name = "upa", version, about = "Manage the UPA user directory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every user, newest first.
    List,
    /// Create a user.
    Add {
        name: String,
        login: String,
        credential: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Change the name of an existing user.
    Rename { id: UserId, name: String },
    /// Delete a user.
    Remove { id: UserId },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let gateway = match open_gateway(&config.store) {
        Ok(gateway) => gateway,
        Err(err) => {
            log::error!("event=cli_start module=cli status=error error={err}");
            eprintln!("{}", describe_error(&DirectoryError::unknown(err)));
            return ExitCode::FAILURE;
        }
    };

    let controller = UserDirectoryController::init(gateway, config.identifier).await;
    let succeeded = run(&controller, cli.command).await;

    print_snapshot(&controller.snapshot());
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(controller: &UserDirectoryController<dyn UserGateway>, command: Command) -> bool {
    match command {
        Command::List => controller
            .snapshot()
            .message
            .map_or(true, |message| !message.is_failure()),
        Command::Add {
            name,
            login,
            credential,
            role,
        } => {
            controller.update_field(DraftField::Name, name);
            controller.update_field(DraftField::Login, login);
            controller.update_field(DraftField::Credential, credential);
            controller.update_field(DraftField::Role, role.unwrap_or_default());
            controller.save().await.is_ok()
        }
        Command::Rename { id, name } => {
            let Some(record) = controller
                .snapshot()
                .records
                .into_iter()
                .find(|record| record.id == id)
            else {
                eprintln!("user #{id} is not in the directory");
                return false;
            };
            controller.start_edit(&record);
            controller.update_field(DraftField::Name, name);
            controller.save().await.is_ok()
        }
        Command::Remove { id } => controller.remove(id).await.is_ok(),
    }
}

fn print_snapshot(snapshot: &DirectorySnapshot) {
    if let Some(message) = &snapshot.message {
        let tone = if message.is_failure() { "error" } else { "ok" };
        println!("[{tone}] {}: {}", message.title, message.description);
    }

    if snapshot.records.is_empty() {
        println!("No users registered.");
        return;
    }
    for record in &snapshot.records {
        println!(
            "{:>5}  {:<32}  {:<24}  {}",
            record.id,
            record.login,
            record.name,
            record.role.as_deref().unwrap_or("-")
        );
    }
}
