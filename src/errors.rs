// src/errors.rs

use colored::Colorize;
use thiserror::Error;

use crate::models::SymbolKind;

/// The error categories reported by the binding pipeline and the mapped
/// argument provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandLineErrorKind {
    ConversionFailed,
    ValidationFailed,
    MinimumArityNotMet,
    MaximumArityExceeded,
    InvalidArgument,
    MissingOperand,
    InvalidCommand,
}

/// A failure found in argument input (not in configuration).
///
/// Every variant carries enough structured data to format a precise message
/// without re-parsing; the `Display` output is a convenience, not a separate
/// contract. The first error encountered aborts the pipeline.
#[derive(Debug, Clone, Error)]
pub enum CommandLineError {
    #[error("{} '{}': cannot convert argument \"{}\": {reason}", kind_label(.symbol_kind), .symbol.cyan(), .value.yellow())]
    ConversionFailed {
        symbol_kind: SymbolKind,
        symbol: String,
        value: String,
        reason: String,
    },

    #[error("{} '{}': {message}", kind_label(.symbol_kind), .symbol.cyan())]
    ValidationFailed {
        symbol_kind: SymbolKind,
        symbol: String,
        value: String,
        message: String,
    },

    #[error("{} '{}' expected at least {expected} use(s), {}", kind_label(.symbol_kind), .symbol.cyan(), received_clause(.values))]
    MinimumArityNotMet {
        symbol_kind: SymbolKind,
        symbol: String,
        expected: usize,
        values: Vec<String>,
    },

    #[error("{} '{}' expected no more than {allowed} use(s), {}", kind_label(.symbol_kind), .symbol.cyan(), received_clause(.values))]
    MaximumArityExceeded {
        symbol_kind: SymbolKind,
        symbol: String,
        allowed: usize,
        values: Vec<String>,
    },

    #[error("{}", invalid_argument_message(.text, .prefixed))]
    InvalidArgument { text: String, prefixed: bool },

    #[error("{} '{}' requires an argument.", kind_label(.symbol_kind), .symbol.cyan())]
    MissingOperand { symbol_kind: SymbolKind, symbol: String },

    #[error("{}", invalid_command_message(.expected))]
    InvalidCommand { subject: String, expected: Vec<String> },
}

impl CommandLineError {
    pub fn kind(&self) -> CommandLineErrorKind {
        match self {
            Self::ConversionFailed { .. } => CommandLineErrorKind::ConversionFailed,
            Self::ValidationFailed { .. } => CommandLineErrorKind::ValidationFailed,
            Self::MinimumArityNotMet { .. } => CommandLineErrorKind::MinimumArityNotMet,
            Self::MaximumArityExceeded { .. } => CommandLineErrorKind::MaximumArityExceeded,
            Self::InvalidArgument { .. } => CommandLineErrorKind::InvalidArgument,
            Self::MissingOperand { .. } => CommandLineErrorKind::MissingOperand,
            Self::InvalidCommand { .. } => CommandLineErrorKind::InvalidCommand,
        }
    }
}

fn kind_label(kind: &SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Option => "Option",
        SymbolKind::Switch => "Switch",
        SymbolKind::Argument => "Argument",
    }
}

fn received_clause(values: &[String]) -> String {
    if values.is_empty() {
        return "but none were received.".to_string();
    }

    let list: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
    format!("but received: {}.", list.join(", ").yellow())
}

fn invalid_argument_message(text: &str, prefixed: &bool) -> String {
    if *prefixed {
        format!("Unknown option or switch {}.", text.cyan())
    } else {
        format!("Invalid argument {}.", format!("\"{text}\"").yellow())
    }
}

fn invalid_command_message(expected: &[String]) -> String {
    if expected.is_empty() {
        return "Invalid command.".to_string();
    }

    let list: Vec<String> = expected.iter().map(|id| format!("  > {}", id.cyan())).collect();
    format!("Invalid command. Expected one of the following:\n{}", list.join("\n"))
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_accessor_matches_variant() {
        let error = CommandLineError::MissingOperand {
            symbol_kind: SymbolKind::Option,
            symbol: "--count".to_string(),
        };
        assert_eq!(error.kind(), CommandLineErrorKind::MissingOperand);
    }

    #[test]
    fn test_invalid_argument_message_depends_on_anatomy() {
        colored::control::set_override(false);

        let unknown = CommandLineError::InvalidArgument {
            text: "--bogus".to_string(),
            prefixed: true,
        };
        assert_eq!(unknown.to_string(), "Unknown option or switch --bogus.");

        let invalid = CommandLineError::InvalidArgument {
            text: "extra".to_string(),
            prefixed: false,
        };
        assert_eq!(invalid.to_string(), "Invalid argument \"extra\".");
    }

    #[test]
    fn test_arity_message_lists_received_values() {
        colored::control::set_override(false);

        let error = CommandLineError::MaximumArityExceeded {
            symbol_kind: SymbolKind::Option,
            symbol: "--tag".to_string(),
            allowed: 1,
            values: vec!["a".to_string(), "b".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("no more than 1"));
        assert!(message.contains("\"a\", \"b\""));
    }
}
