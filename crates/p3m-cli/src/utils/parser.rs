use p3m::core::models::mesh::WrapStrategy;
use p3m::engine::config::Execution;
use p3m::engine::tuning::ChargeModel;
use serde::Deserialize;
use serde::de::IntoDeserializer;
use serde::de::value::{Error as ValueError, StrDeserializer};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid {kind} '{value}'. Expected one of: {expected}.")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid entry '{entry}' in list '{list}'.")]
    InvalidListEntry { list: String, entry: String },

    #[error("List '{0}' cannot be empty.")]
    EmptyList(String),
}

fn parse_named<'a, T: Deserialize<'a>>(
    value: &'a str,
    kind: &'static str,
    expected: &'static str,
) -> Result<T, ParseError> {
    let deserializer: StrDeserializer<'a, ValueError> = value.trim().into_deserializer();
    T::deserialize(deserializer).map_err(|_| ParseError::UnknownVariant {
        kind,
        value: value.to_string(),
        expected,
    })
}

pub fn parse_charge_model(value: &str) -> Result<ChargeModel, ParseError> {
    parse_named(
        value,
        "charge model",
        "point-charge, correlated-dipole, water",
    )
}

pub fn parse_wrap_strategy(value: &str) -> Result<WrapStrategy, ParseError> {
    parse_named(value, "wrap strategy", "modulo, bitmask")
}

pub fn parse_execution(value: &str) -> Result<Execution, ParseError> {
    parse_named(value, "execution mode", "serial, parallel")
}

/// Parses a comma separated list such as `16,32,64`.
pub fn parse_list<T: FromStr>(value: &str) -> Result<Vec<T>, ParseError> {
    let entries = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse().map_err(|_| ParseError::InvalidListEntry {
                list: value.to_string(),
                entry: entry.to_string(),
            })
        })
        .collect::<Result<Vec<T>, _>>()?;
    if entries.is_empty() {
        return Err(ParseError::EmptyList(value.to_string()));
    }
    Ok(entries)
}
