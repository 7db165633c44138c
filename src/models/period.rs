use std::fmt;

use jiff::civil::Date;
use thiserror::Error;

pub const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const MIN_YEAR: i64 = -9999;
const MAX_YEAR: i64 = 9999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid month {0}: expected 1 to 12")]
    InvalidMonth(i64),

    #[error("Unknown month name '{0}'")]
    UnknownMonthName(String),

    #[error("Invalid year '{0}'")]
    InvalidYear(String),

    #[error("Year {0} is out of the supported range")]
    YearOutOfRange(i64),
}

/// A calendar month of a given year, the unit payroll completion is tracked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i16,
    month: i8,
}

impl Period {
    pub fn new(year: i16, month: i8) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(i64::from(month)));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&i64::from(year)) {
            return Err(PeriodError::YearOutOfRange(i64::from(year)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses a lowercase Portuguese month name ("março") and a year ("2024").
    pub fn from_month_name(name: &str, year: &str) -> Result<Self, PeriodError> {
        let normalized = name.trim().to_lowercase();
        let index = MONTH_NAMES
            .iter()
            .position(|candidate| *candidate == normalized)
            .ok_or_else(|| PeriodError::UnknownMonthName(name.to_string()))?;

        let year = year
            .trim()
            .parse::<i16>()
            .map_err(|_| PeriodError::InvalidYear(year.to_string()))?;

        Self::new(year, index as i8 + 1)
    }

    pub fn year(&self) -> i16 {
        self.year
    }

    pub fn month(&self) -> i8 {
        self.month
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn first_day(&self) -> Date {
        jiff::civil::date(self.year, self.month, 1)
    }

    /// Moves by `delta` months, carrying into the year.
    pub fn shift(self, delta: i32) -> Result<Self, PeriodError> {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) + i64::from(delta);
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) + 1;

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PeriodError::YearOutOfRange(year));
        }

        Self::new(year as i16, month as i8)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.month_name();
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
        }
        write!(f, "/{}", self.year)
    }
}
