// src/core/collection.rs

use std::collections::{BTreeMap, HashMap};

use crate::core::semantics::SemanticArgument;

/// An indexed view over parsed semantic arguments, consumed during binding.
///
/// Arguments are partitioned into an ordinal-keyed map of non-option
/// arguments and an identifier-keyed lookup of option/switch arguments with
/// an unconsumed set. Removal is the only mutation; the collection is never
/// re-populated.
#[derive(Debug)]
pub struct SemanticArgumentCollection {
    positional: BTreeMap<usize, SemanticArgument>,
    unconsumed_options: BTreeMap<usize, SemanticArgument>,
    option_lookup: HashMap<String, Vec<usize>>,
}

impl SemanticArgumentCollection {
    pub fn new(arguments: Vec<SemanticArgument>) -> Self {
        let mut positional = BTreeMap::new();
        let mut unconsumed_options = BTreeMap::new();
        let mut option_lookup: HashMap<String, Vec<usize>> = HashMap::new();

        for argument in arguments {
            if argument.is_option() {
                option_lookup
                    .entry(argument.prefixed_identifier())
                    .or_default()
                    .push(argument.ordinal());
                unconsumed_options.insert(argument.ordinal(), argument);
            } else {
                positional.insert(argument.ordinal(), argument);
            }
        }

        Self { positional, unconsumed_options, option_lookup }
    }

    /// True iff every argument supplied at construction has been removed.
    /// Used as the final validation gate: any leftover is a binding error.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.unconsumed_options.is_empty()
    }

    /// Removes every unconsumed option argument matching any of the given
    /// identifiers, in input order. Each match is paired with the argument at
    /// the next ordinal position, peeked but *not* removed: a speculative
    /// operand candidate the caller may decide to consume.
    pub fn remove_option_arguments(
        &mut self,
        identifiers: &[String],
    ) -> Vec<(SemanticArgument, Option<SemanticArgument>)> {
        let mut ordinals: Vec<usize> = identifiers
            .iter()
            .filter_map(|identifier| self.option_lookup.get(identifier))
            .flatten()
            .copied()
            .collect();
        ordinals.sort_unstable();
        ordinals.dedup();

        let mut removed = Vec::with_capacity(ordinals.len());
        for ordinal in ordinals {
            if let Some(argument) = self.unconsumed_options.remove(&ordinal) {
                removed.push(argument);
            }
        }

        removed
            .into_iter()
            .map(|argument| {
                let speculative = self.peek_value_argument(argument.ordinal() + 1).cloned();
                (argument, speculative)
            })
            .collect()
    }

    /// Positional (non-option) access, strictly by ordinal.
    pub fn peek_value_argument(&self, ordinal: usize) -> Option<&SemanticArgument> {
        self.positional.get(&ordinal)
    }

    /// Removes a non-option argument by its ordinal.
    pub fn remove_argument(&mut self, ordinal: usize) -> Option<SemanticArgument> {
        self.positional.remove(&ordinal)
    }

    /// The remaining non-option arguments, in ordinal order.
    pub fn unbound_positionals(&self) -> impl Iterator<Item = &SemanticArgument> {
        self.positional.values()
    }

    /// The first remaining argument: unconsumed options first, then
    /// positionals, each in ordinal order.
    pub fn first_remaining(&self) -> Option<&SemanticArgument> {
        self.unconsumed_options
            .values()
            .next()
            .or_else(|| self.positional.values().next())
    }
}

// MARK: --- UNIT TESTS ---
