use std::{error::Error, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::*;
use jiff::Zoned;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    models::client::{ClientDraft, Union},
    notifications::{Notifier, terminal::TerminalNotifier},
    services::{
        clients::{ClientRegistry, resolve_client},
        unions::{ReminderError, check_union_notifications, schedule_monthly_check, unique_unions},
    },
    session::Session,
    storage::{json::JsonFileStorage, writer::PersistenceEvent},
};

mod config;
mod models;
mod notifications;
mod services;
mod session;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "exito",
    about = "Client payroll checklist and union reminders for bookkeeping practices"
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding clients and reminders
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommands),

    /// Manage unions
    #[command(subcommand)]
    Union(UnionCommands),

    /// Fire due reminders, check union base dates and arm next month's check
    Remind,

    /// Interactive monthly payroll checklist
    Session,
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Add a new client
    Add {
        /// Client name
        name: String,

        #[command(flatten)]
        fields: ClientFields,

        /// Only the owners' pro-labore is processed
        #[arg(long)]
        pro_labore: bool,
    },
    /// Edit a client (by list position, id or part of the name)
    Edit {
        client: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ClientFields,

        /// Set whether only the pro-labore is processed
        #[arg(long)]
        pro_labore: Option<bool>,

        /// Remove the union affiliation
        #[arg(long, conflicts_with_all = ["union", "base_date"])]
        no_union: bool,
    },
    /// Delete a client
    Delete { client: String },
    /// List all clients
    List,
    /// Show every field of a client
    View { client: String },
}

#[derive(Args, Default)]
struct ClientFields {
    /// Tax registration number
    #[arg(long)]
    cnpj: Option<String>,

    #[arg(long)]
    address: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    email: Option<String>,

    /// Union name
    #[arg(short, long)]
    union: Option<String>,

    /// Union base date as a month number (1-12)
    #[arg(short, long)]
    base_date: Option<String>,
}

impl ClientFields {
    fn apply_to(self, draft: &mut ClientDraft) {
        if let Some(cnpj) = self.cnpj {
            draft.cnpj = cnpj;
        }
        if let Some(address) = self.address {
            draft.address = address;
        }
        if let Some(phone) = self.phone {
            draft.phone = phone;
        }
        if let Some(email) = self.email {
            draft.email = email;
        }
        if self.union.is_some() || self.base_date.is_some() {
            let union = draft.union.get_or_insert_with(Union::default);
            if let Some(name) = self.union {
                union.name = name;
            }
            if let Some(base_date) = self.base_date {
                union.base_date = base_date;
            }
        }
    }
}

#[derive(Subcommand)]
enum UnionCommands {
    /// List the unions already assigned to clients
    List,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("exito=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = Some(data_dir);
    }

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir).map_err(|e| {
        format!("Failed to create data directory '{}': {}", data_dir.display(), e)
    })?;

    let storage =
        JsonFileStorage::new(config.clients_path()).with_backups_to_keep(config.backups_to_keep);
    let mut registry = ClientRegistry::open(storage);
    let notifier = TerminalNotifier::new(config.reminders_path());
    let now = Zoned::now();

    if matches!(cli.command, Commands::Remind | Commands::Session) {
        notifier.fire_due(&now)?;
    }

    // Whatever happened, mutations already queued still reach the disk.
    let result = execute(cli.command, &config, &mut registry, &notifier, &now);
    finish(&registry);
    result
}

fn execute<N: Notifier>(
    command: Commands,
    config: &Config,
    registry: &mut ClientRegistry,
    notifier: &N,
    now: &Zoned,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Client(ClientCommands::Add {
            name,
            fields,
            pro_labore,
        }) => {
            let mut draft = ClientDraft {
                pro_labore,
                ..ClientDraft::named(name)
            };
            fields.apply_to(&mut draft);

            let client = registry.add(draft)?;
            println!("{} {}", "Added".green(), client.name.bold());
            check_union_notifications(registry.list(), now, notifier)?;
        }
        Commands::Client(ClientCommands::Edit {
            client,
            name,
            fields,
            pro_labore,
            no_union,
        }) => {
            let existing = resolve_client(registry.list(), &client)?;
            let id = existing.id.clone();
            let mut draft = ClientDraft::from(existing);

            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(pro_labore) = pro_labore {
                draft.pro_labore = pro_labore;
            }
            if no_union {
                draft.union = None;
            }
            fields.apply_to(&mut draft);

            let client = registry.update(&id, draft)?;
            println!("{} {}", "Updated".green(), client.name.bold());
            check_union_notifications(registry.list(), now, notifier)?;
        }
        Commands::Client(ClientCommands::Delete { client }) => {
            let id = resolve_client(registry.list(), &client)?.id.clone();
            if let Some(client) = registry.delete(&id) {
                println!("{} {}", "Deleted".red(), client.name.bold());
            }
            check_union_notifications(registry.list(), now, notifier)?;
        }
        Commands::Client(ClientCommands::List) => {
            let clients = registry.list();
            if clients.is_empty() {
                println!("No clients found");
            } else {
                ui::render_view_header("Clients", clients.len());
                for (index, client) in clients.iter().enumerate() {
                    ui::render_client_line(index + 1, client, None);
                }
                println!();
            }
        }
        Commands::Client(ClientCommands::View { client }) => {
            let client = resolve_client(registry.list(), &client)?;
            ui::render_client_details(client);
        }
        Commands::Union(UnionCommands::List) => {
            let unions = unique_unions(registry.list());
            if unions.is_empty() {
                println!("No unions found");
            } else {
                println!("{} ({})\n", "UNIONS".cyan(), unions.len());
                for union in &unions {
                    ui::render_union_line(union);
                }
            }
        }
        Commands::Remind => {
            let matched = check_union_notifications(registry.list(), now, notifier)?;
            if matched == 0 {
                println!("No union base dates this month");
            }

            arm_monthly_check(config, now, notifier)?;
        }
        Commands::Session => {
            check_union_notifications(registry.list(), now, notifier)?;
            arm_monthly_check(config, now, notifier)?;

            let mut session = Session::new(registry, notifier, now.clone());
            session.run(std::io::stdin().lock())?;
        }
    }

    Ok(())
}

fn finish(registry: &ClientRegistry) {
    registry.flush();
    for event in registry.drain_events() {
        if let PersistenceEvent::SaveFailed { error } = event {
            eprintln!("{} changes were not saved: {}", "Warning:".yellow(), error);
        }
    }
}

fn arm_monthly_check(config: &Config, now: &Zoned, notifier: &impl Notifier) -> Result<(), ReminderError> {
    let when = schedule_monthly_check(now, config.reminder_hour, notifier).inspect_err(|e| {
        warn!(error = %e, "failed to arm monthly union check");
    })?;
    println!(
        "{} {}",
        "Next union check:".dimmed(),
        when.strftime("%Y-%m-%d %H:%M")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::{civil::date, tz::TimeZone};

    use super::*;
    use crate::{
        models::{
            client::{Client, ClientId},
            store::Store,
        },
        notifications::recording::RecordingNotifier,
        storage::memory::InMemoryStorage,
    };

    fn may_2024() -> Zoned {
        date(2024, 5, 15)
            .at(10, 0, 0, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap()
    }

    fn add(name: &str, union: &str, base_date: &str) -> Commands {
        Commands::Client(ClientCommands::Add {
            name: name.to_string(),
            fields: ClientFields {
                union: Some(union.to_string()),
                base_date: Some(base_date.to_string()),
                ..ClientFields::default()
            },
            pro_labore: false,
        })
    }

    #[test]
    fn test_added_client_is_saved_when_the_union_notice_fails() {
        let storage = InMemoryStorage::default();
        let mut registry = ClientRegistry::open(storage.clone());
        let notifier = RecordingNotifier::failing();

        let result = execute(
            add("Padaria", "Sindpan", "5"),
            &Config::default(),
            &mut registry,
            &notifier,
            &may_2024(),
        );
        finish(&registry);

        assert!(result.is_err());
        let saved = storage.snapshot().expect("document should be saved");
        assert_eq!(saved.clients.len(), 1);
        assert_eq!(saved.clients[0].name, "Padaria");
    }

    #[test]
    fn test_delete_is_saved_when_the_union_notice_fails() {
        let clients = vec![
            Client {
                id: ClientId::from("1"),
                name: "Padaria".to_string(),
                ..Client::default()
            },
            Client {
                id: ClientId::from("2"),
                name: "Oficina".to_string(),
                union: Some(Union {
                    name: "Metalúrgicos".to_string(),
                    base_date: "5".to_string(),
                }),
                ..Client::default()
            },
        ];
        let storage = InMemoryStorage::with_store(Store::new(clients));
        let mut registry = ClientRegistry::open(storage.clone());
        let notifier = RecordingNotifier::failing();

        let result = execute(
            Commands::Client(ClientCommands::Delete {
                client: "padaria".to_string(),
            }),
            &Config::default(),
            &mut registry,
            &notifier,
            &may_2024(),
        );
        finish(&registry);

        assert!(result.is_err());
        let saved = storage.snapshot().expect("document should be saved");
        assert_eq!(saved.clients.len(), 1);
        assert_eq!(saved.clients[0].name, "Oficina");
    }

    #[test]
    fn test_remind_with_invalid_hour_fails_without_scheduling() {
        let mut registry = ClientRegistry::open(InMemoryStorage::default());
        let notifier = RecordingNotifier::default();
        let config = Config {
            reminder_hour: 24,
            ..Config::default()
        };

        let result = execute(Commands::Remind, &config, &mut registry, &notifier, &may_2024());

        assert!(result.is_err());
        assert!(notifier.scheduled.borrow().is_empty());
    }
}
