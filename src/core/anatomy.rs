// src/core/anatomy.rs

use std::ops::Range;

use crate::constants::{PATH_PREFIX, SHORT_PREFIX};
use crate::core::lexer::{CharacterToken, CharacterType, TokenizedSequence};

/// The prefix style of an argument, derived from its prefix tokens alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixFormat {
    /// No prefix; a bare (discreet) argument.
    None,
    /// POSIX short form, `-x`.
    ShortPosix,
    /// GNU long form, `--option`.
    LongGnu,
    /// Path style, `/option`.
    PathStyle,
}

/// A structural view over a tokenized argument: four contiguous, non
/// overlapping index ranges covering the full sequence in order
/// prefix → identifier → assignment operator → operand value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticAnatomy {
    prefix: Range<usize>,
    identifier: Range<usize>,
    operator: Range<usize>,
    operand: Range<usize>,
    format: PrefixFormat,
}

impl SemanticAnatomy {
    /// Partitions the token sequence in a single left-to-right scan.
    pub fn derive(sequence: &TokenizedSequence) -> Self {
        let tokens = sequence.tokens();
        let mut index = 0;

        let prefix = scan_while(tokens, &mut index, |t| t.kind == CharacterType::Prefix);
        let identifier = scan_while(tokens, &mut index, |t| {
            t.kind != CharacterType::OperandAssignment
        });
        let operator = scan_while(tokens, &mut index, |t| {
            t.kind == CharacterType::OperandAssignment
        });
        let operand = scan_while(tokens, &mut index, |_| true);

        let format = prefix_format(&tokens[prefix.clone()]);

        Self { prefix, identifier, operator, operand, format }
    }

    /// An anatomy over nothing; used for terminated arguments.
    pub fn empty() -> Self {
        Self {
            prefix: 0..0,
            identifier: 0..0,
            operator: 0..0,
            operand: 0..0,
            format: PrefixFormat::None,
        }
    }

    pub fn prefix_format(&self) -> PrefixFormat {
        self.format
    }

    pub fn has_operand(&self) -> bool {
        !self.operand.is_empty()
    }

    /// The identifier tokens, without the prefix.
    pub fn identifier_tokens<'a>(&self, sequence: &'a TokenizedSequence) -> &'a [CharacterToken] {
        &sequence.tokens()[self.identifier.clone()]
    }

    /// The identifier text, without the prefix.
    pub fn identifier(&self, sequence: &TokenizedSequence) -> String {
        collect_text(self.identifier_tokens(sequence))
    }

    /// The prefix together with the identifier, e.g. `--count`. This is the
    /// lookup key options and switches are matched by.
    pub fn prefixed_identifier(&self, sequence: &TokenizedSequence) -> String {
        collect_text(&sequence.tokens()[self.prefix.start..self.identifier.end])
    }

    /// The operand value text, or `None` when the operand range is empty.
    pub fn operand_value(&self, sequence: &TokenizedSequence) -> Option<String> {
        if self.operand.is_empty() {
            None
        } else {
            Some(collect_text(&sequence.tokens()[self.operand.clone()]))
        }
    }

    /// The assignment operator plus the operand, e.g. `=value`. Empty when
    /// no operator is present.
    pub fn operand_expression(&self, sequence: &TokenizedSequence) -> String {
        collect_text(&sequence.tokens()[self.operator.start..])
    }
}

fn prefix_format(prefix_tokens: &[CharacterToken]) -> PrefixFormat {
    match prefix_tokens {
        [t] if t.value == SHORT_PREFIX => PrefixFormat::ShortPosix,
        [a, b] if a.value == SHORT_PREFIX && b.value == SHORT_PREFIX => PrefixFormat::LongGnu,
        [t] if t.value == PATH_PREFIX => PrefixFormat::PathStyle,
        _ => PrefixFormat::None,
    }
}

fn scan_while(
    tokens: &[CharacterToken],
    index: &mut usize,
    predicate: impl Fn(&CharacterToken) -> bool,
) -> Range<usize> {
    let start = *index;
    while *index < tokens.len() && predicate(&tokens[*index]) {
        *index += 1;
    }
    start..*index
}

fn collect_text(tokens: &[CharacterToken]) -> String {
    tokens.iter().map(|token| token.value).collect()
}

// MARK: --- UNIT TESTS ---
