// src/core/config_validator.rs

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::constants::ROOT_COMMAND_ID;
use crate::models::{Command, SymbolKind};

lazy_static! {
    static ref COMMAND_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").unwrap();
    static ref OPTION_ID_RE: Regex =
        Regex::new(r"^(?:-[A-Za-z0-9]|--[A-Za-z0-9][A-Za-z0-9-]*|/[A-Za-z0-9]+)$").unwrap();
    static ref ARGUMENT_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").unwrap();
}

/// A mistake in the declared schema, found before any user input is parsed.
///
/// Distinct from [`crate::errors::CommandLineError`]: these are development
/// time failures, meant to be caught by a test or a startup assertion rather
/// than reported to an end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Command '{command}': duplicate binding identifier '{identifier}'.")]
    DuplicateBindingIdentifier { command: String, identifier: String },

    #[error("Command '{parent}': duplicate sub-command identifier '{identifier}'.")]
    DuplicateCommandIdentifier { parent: String, identifier: String },

    #[error("Command '{command}': identifier '{identifier}' is not a valid command name.")]
    MalformedCommandIdentifier { command: String, identifier: String },

    #[error("Symbol '{id}': not a valid option or switch identifier.")]
    MalformedOptionIdentifier { id: String },

    #[error("Symbol '{id}': not a valid argument identifier.")]
    MalformedArgumentIdentifier { id: String },

    #[error("Symbol '{id}': arity minimum {min} exceeds maximum {max}.")]
    InvalidArity { id: String, min: usize, max: usize },

    #[error(
        "Command '{command}': argument '{id}' must have a fixed arity because later arguments follow it."
    )]
    AmbiguousArgumentArity { command: String, id: String },

    #[error("No handler is reachable on command path '{path}'.")]
    NoHandlerInPath { path: String },
}

/// Validates the schema tree, collecting every problem found. An empty
/// result means the configuration is sound.
pub fn validate(root: &Command) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut path: Vec<&Command> = Vec::new();

    visit(root, &mut path, &mut errors);
    errors
}

/// Validates the schema tree and fails on the first problem. Intended for
/// startup assertions and tests.
pub fn ensure_valid(root: &Command) -> Result<(), ConfigError> {
    match validate(root).into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn visit<'a>(command: &'a Command, path: &mut Vec<&'a Command>, errors: &mut Vec<ConfigError>) {
    path.push(command);

    validate_command(command, path.len() == 1, errors);

    if command.children().is_empty() {
        validate_leaf_path(path, errors);
    }

    for child in command.children() {
        visit(child, path, errors);
    }

    path.pop();
}

fn validate_command(command: &Command, is_root: bool, errors: &mut Vec<ConfigError>) {
    // The reserved root id is exempt from the identifier grammar.
    if !(is_root && command.id() == ROOT_COMMAND_ID) {
        for identifier in command.identifiers() {
            if !COMMAND_ID_RE.is_match(&identifier) {
                errors.push(ConfigError::MalformedCommandIdentifier {
                    command: command.id().to_string(),
                    identifier,
                });
            }
        }
    }

    validate_child_identifiers(command, errors);
    validate_binding_identifiers(command, errors);
    validate_argument_ordering(command, errors);
}

fn validate_child_identifiers(command: &Command, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();

    for child in command.children() {
        for identifier in child.identifiers() {
            if !seen.insert(identifier.clone()) {
                errors.push(ConfigError::DuplicateCommandIdentifier {
                    parent: command.id().to_string(),
                    identifier,
                });
            }
        }
    }
}

fn validate_binding_identifiers(command: &Command, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();

    for symbol in command.bindings() {
        for identifier in symbol.identifiers() {
            if !seen.insert(identifier.clone()) {
                errors.push(ConfigError::DuplicateBindingIdentifier {
                    command: command.id().to_string(),
                    identifier: identifier.clone(),
                });
            }

            let well_formed = match symbol.kind() {
                SymbolKind::Argument => ARGUMENT_ID_RE.is_match(&identifier),
                _ => OPTION_ID_RE.is_match(&identifier),
            };
            if !well_formed {
                let id = identifier.clone();
                errors.push(match symbol.kind() {
                    SymbolKind::Argument => ConfigError::MalformedArgumentIdentifier { id },
                    _ => ConfigError::MalformedOptionIdentifier { id },
                });
            }
        }

        let arity = symbol.arity();
        if let Some(max) = arity.max()
            && arity.min() > max
        {
            errors.push(ConfigError::InvalidArity {
                id: symbol.id().to_string(),
                min: arity.min(),
                max,
            });
        }
    }
}

/// Positional arguments bind greedily in declaration order, so every
/// argument except the last needs a fixed count; anything looser would
/// swallow values meant for its successors.
fn validate_argument_ordering(command: &Command, errors: &mut Vec<ConfigError>) {
    let positionals: Vec<_> = command
        .bindings()
        .iter()
        .filter(|symbol| symbol.kind() == SymbolKind::Argument)
        .collect();

    for symbol in positionals.iter().rev().skip(1) {
        let arity = symbol.arity();
        if arity.max() != Some(arity.min()) {
            errors.push(ConfigError::AmbiguousArgumentArity {
                command: command.id().to_string(),
                id: symbol.id().to_string(),
            });
        }
    }
}

fn validate_leaf_path(path: &[&Command], errors: &mut Vec<ConfigError>) {
    if path.iter().any(|command| command.handler_ref().is_some()) {
        return;
    }

    let joined: Vec<&str> = path.iter().map(|command| command.id()).collect();
    errors.push(ConfigError::NoHandlerInPath { path: joined.join(" > ") });
}

// MARK: --- UNIT TESTS ---
