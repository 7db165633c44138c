use std::{io::BufRead, str::FromStr};

use colored::*;
use jiff::Zoned;
use thiserror::Error;

use crate::{
    models::{client::ClientDraft, period::Period},
    notifications::{Notifier, NotifyError},
    services::{
        clients::{ClientError, ClientRegistry, ResolveClientError, resolve_client},
        payroll::{PayrollTracker, ReferenceMonth},
        unions::check_union_notifications,
    },
    ui,
};

const HELP: &str = "\
  ls              show the checklist for the current month
  t <client>      toggle payroll sent (position, id or part of the name)
  next, >         go to the next month
  prev, <         go to the previous month
  add <name>      add a client
  rm <client>     delete a client and its payroll history
  help            show this help
  q               quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    List,
    Toggle(String),
    Next,
    Previous,
    Add(String),
    Remove(String),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionCommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}', type 'help'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(String),
}

impl FromStr for SessionCommand {
    type Err = SessionCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let required = |build: fn(String) -> SessionCommand| {
            if argument.is_empty() {
                Err(SessionCommandError::MissingArgument(verb.to_string()))
            } else {
                Ok(build(argument.to_string()))
            }
        };

        match verb {
            "" => Err(SessionCommandError::Empty),
            "ls" | "list" => Ok(SessionCommand::List),
            "t" | "toggle" => required(SessionCommand::Toggle),
            ">" | "next" => Ok(SessionCommand::Next),
            "<" | "prev" => Ok(SessionCommand::Previous),
            "add" => required(SessionCommand::Add),
            "rm" | "delete" => required(SessionCommand::Remove),
            "help" | "?" => Ok(SessionCommand::Help),
            "q" | "quit" | "exit" => Ok(SessionCommand::Quit),
            other => Err(SessionCommandError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] SessionCommandError),

    #[error(transparent)]
    Resolve(#[from] ResolveClientError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Interactive checklist. Payroll flags live only as long as the session.
pub struct Session<'a, N: Notifier> {
    registry: &'a mut ClientRegistry,
    notifier: &'a N,
    tracker: PayrollTracker,
    reference: ReferenceMonth,
    now: Zoned,
}

impl<'a, N: Notifier> Session<'a, N> {
    pub fn new(registry: &'a mut ClientRegistry, notifier: &'a N, now: Zoned) -> Self {
        let reference = ReferenceMonth::starting_at(Period::from_date(now.date()));
        Self {
            registry,
            notifier,
            tracker: PayrollTracker::new(),
            reference,
            now,
        }
    }

    pub fn reference(&self) -> Period {
        self.reference.current()
    }

    pub fn tracker(&self) -> &PayrollTracker {
        &self.tracker
    }

    /// Reads commands until `q` or end of input. Bad input is reported and
    /// skipped; notification failures end the session. Pending writes are
    /// flushed either way.
    pub fn run(&mut self, input: impl BufRead) -> Result<(), SessionError> {
        self.render_checklist();

        let result = self.read_commands(input);
        self.registry.flush();
        result
    }

    fn read_commands(&mut self, input: impl BufRead) -> Result<(), SessionError> {
        for line in input.lines() {
            let line = line?;
            let result = line
                .parse::<SessionCommand>()
                .map_err(SessionError::from)
                .and_then(|command| self.apply(command));

            match result {
                Ok(Outcome::Quit) => break,
                Ok(Outcome::Continue) => {}
                Err(SessionError::Command(SessionCommandError::Empty)) => {}
                Err(e @ SessionError::Notify(_)) | Err(e @ SessionError::Input(_)) => {
                    return Err(e);
                }
                Err(e) => eprintln!("  {} {}", "Error:".red(), e),
            }
        }

        Ok(())
    }

    pub fn apply(&mut self, command: SessionCommand) -> Result<Outcome, SessionError> {
        match command {
            SessionCommand::List => self.render_checklist(),
            SessionCommand::Toggle(query) => {
                let period = self.reference.current();
                let client = resolve_client(self.registry.list(), &query)?;
                let sent = self.tracker.toggle(&client.id, period);
                println!(
                    "  {} {} ({})",
                    ui::get_status_glyph(sent),
                    client.name,
                    period
                );
            }
            SessionCommand::Next => {
                self.reference.change_month(1);
                self.render_checklist();
            }
            SessionCommand::Previous => {
                self.reference.change_month(-1);
                self.render_checklist();
            }
            SessionCommand::Add(name) => {
                let client = self.registry.add(ClientDraft::named(name))?;
                println!("  {} {}", "Added".green(), client.name.bold());
                check_union_notifications(self.registry.list(), &self.now, self.notifier)?;
            }
            SessionCommand::Remove(query) => {
                let id = resolve_client(self.registry.list(), &query)?.id.clone();
                if let Some(client) = self.registry.delete(&id) {
                    self.tracker.on_client_deleted(&id);
                    println!("  {} {}", "Deleted".red(), client.name.bold());
                }
                check_union_notifications(self.registry.list(), &self.now, self.notifier)?;
            }
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => return Ok(Outcome::Quit),
        }

        Ok(Outcome::Continue)
    }

    fn render_checklist(&self) {
        let period = self.reference.current();
        let clients = self.registry.list();

        ui::render_checklist_header(period, self.tracker.sent_count(clients, period), clients.len());
        if clients.is_empty() {
            println!("  No clients yet, add one with 'add <name>'");
            return;
        }
        for (index, client) in clients.iter().enumerate() {
            ui::render_client_line(index + 1, client, Some(self.tracker.is_sent(&client.id, period)));
        }
    }
}
