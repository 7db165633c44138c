use jiff::Zoned;
use thiserror::Error;
use tracing::info;

use crate::{
    models::{
        client::{Client, Union},
        period::{Period, PeriodError},
    },
    notifications::{Notification, Notifier, NotifyError},
};

pub const DEFAULT_REMINDER_HOUR: i8 = 9;

const NOTICE_TITLE: &str = "Aviso de Sindicatos";
const CHECK_TITLE: &str = "Verificação de Sindicatos";
const CHECK_BODY: &str = "Verificando sindicatos com data base neste mês...";

/// Unions already typed in, deduplicated by name. The first client carrying a
/// given name decides its base date.
pub fn unique_unions(clients: &[Client]) -> Vec<Union> {
    let mut unions: Vec<Union> = Vec::new();

    for union in clients.iter().filter_map(|client| client.union.as_ref()) {
        if union.name.trim().is_empty() || unions.iter().any(|known| known.name == union.name) {
            continue;
        }
        unions.push(union.clone());
    }

    unions
}

pub fn clients_due_in_month(clients: &[Client], month: i8) -> Vec<&Client> {
    clients
        .iter()
        .filter(|client| client.union_base_month() == Some(month))
        .collect()
}

pub fn union_notice(due: &[&Client]) -> Notification {
    let names: Vec<&str> = due.iter().map(|client| client.name.as_str()).collect();
    Notification::new(
        NOTICE_TITLE,
        format!(
            "Existem {} cliente(s) com data base do sindicato neste mês: {}",
            due.len(),
            names.join(", ")
        ),
    )
}

/// Shows one notice listing every client whose union base date falls in the
/// month of `now`. Nothing is shown when there are none. Returns how many
/// clients were listed.
pub fn check_union_notifications(
    clients: &[Client],
    now: &Zoned,
    notifier: &impl Notifier,
) -> Result<usize, NotifyError> {
    let due = clients_due_in_month(clients, now.month());
    if due.is_empty() {
        return Ok(0);
    }

    notifier.display(&union_notice(&due))?;
    info!(clients = due.len(), month = now.month(), "union base date notice shown");

    Ok(due.len())
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Invalid reminder hour {0}: expected 0 to 23")]
    InvalidHour(i8),

    #[error("Cannot compute next reminder: {0}")]
    Period(#[from] PeriodError),

    #[error("Cannot compute next reminder: {0}")]
    Time(#[from] jiff::Error),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// First day of the month after `now`, at `hour`:00 in `now`'s time zone.
pub fn next_monthly_check(now: &Zoned, hour: i8) -> Result<Zoned, ReminderError> {
    if !(0..=23).contains(&hour) {
        return Err(ReminderError::InvalidHour(hour));
    }

    let next = Period::from_date(now.date()).shift(1)?;
    let when = next
        .first_day()
        .at(hour, 0, 0, 0)
        .to_zoned(now.time_zone().clone())?;
    Ok(when)
}

/// Registers the single trigger for the next monthly union check and returns
/// its instant. The trigger does not re-arm itself; whoever handles it calls
/// this again.
pub fn schedule_monthly_check(
    now: &Zoned,
    hour: i8,
    notifier: &impl Notifier,
) -> Result<Zoned, ReminderError> {
    let when = next_monthly_check(now, hour)?;
    notifier.schedule(&when, &Notification::new(CHECK_TITLE, CHECK_BODY))?;
    Ok(when)
}
