use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque client identity. New clients get a UUID, but any string found in a
/// loaded document is accepted as-is.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique identity, assigned at creation
    pub id: ClientId,
    /// Display name, never blank once persisted
    pub name: String,
    /// Tax registration number, free text
    #[serde(default)]
    pub cnpj: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Legacy flag carried over from older documents. Payroll completion lives
    /// in the per-month tracker; this value is preserved but never read.
    #[serde(default)]
    pub payroll_sent: bool,
    /// Only the owners' pro-labore is processed, not a full payroll
    #[serde(default, rename = "isProLabore")]
    pub pro_labore: bool,
    /// Union affiliation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union: Option<Union>,
}

impl Client {
    pub fn payroll_kind(&self) -> &'static str {
        if self.pro_labore {
            "Pró-Labore"
        } else {
            "Folha Completa"
        }
    }

    /// Month number (1-12) of the union base date, when there is a valid one.
    pub fn union_base_month(&self) -> Option<i8> {
        self.union.as_ref().and_then(Union::base_month)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Union {
    #[serde(default)]
    pub name: String,
    /// Calendar month number as typed by the operator, "1" to "12"
    #[serde(default)]
    pub base_date: String,
}

impl Union {
    pub fn base_month(&self) -> Option<i8> {
        let trimmed = self.base_date.trim();
        if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed
            .parse::<i8>()
            .ok()
            .filter(|month| (1..=12).contains(month))
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.base_date.trim().is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientValidationError {
    #[error("Client name cannot be blank")]
    BlankName,

    #[error("Invalid union base date '{0}': expected a month number between 1 and 12")]
    InvalidBaseDate(String),
}

/// A client as typed by the operator, before it gets an identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub cnpj: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub pro_labore: bool,
    pub union: Option<Union>,
}

impl ClientDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.name.trim().is_empty() {
            return Err(ClientValidationError::BlankName);
        }

        if let Some(union) = &self.union
            && !union.base_date.trim().is_empty()
            && union.base_month().is_none()
        {
            return Err(ClientValidationError::InvalidBaseDate(union.base_date.clone()));
        }

        Ok(())
    }

    /// Builds the stored client. Callers validate first.
    pub fn into_client(self, id: ClientId, payroll_sent: bool) -> Client {
        Client {
            id,
            name: self.name,
            cnpj: self.cnpj,
            address: self.address,
            phone: self.phone,
            email: self.email,
            payroll_sent,
            pro_labore: self.pro_labore,
            union: self.union.filter(|union| !union.is_blank()),
        }
    }
}

impl From<&Client> for ClientDraft {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            cnpj: client.cnpj.clone(),
            address: client.address.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            pro_labore: client.pro_labore,
            union: client.union.clone(),
        }
    }
}
