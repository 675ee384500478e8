// src/core/semantics.rs

use std::collections::VecDeque;

use crate::constants::SHORT_PREFIX;
use crate::core::anatomy::{PrefixFormat, SemanticAnatomy};
use crate::core::lexer::TokenizedSequence;

/// A parser-assigned classification disambiguating an argument's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticHint {
    /// Unresolved; the argument may still pair with a following operand.
    None,
    /// A switch that cannot carry an operand (trailing, or followed by
    /// another option).
    KnownSwitch,
    /// A bare argument that cannot be an option's operand.
    DiscreetArgument,
    /// A bare argument tentatively treated as the preceding option's value.
    SpeculativeOperand,
    /// Appears after the `--` terminator; passed through unparsed.
    Terminated,
}

/// A command line argument with semantic meaning attached.
///
/// The ordinal is fixed at creation and serves as the removal key during
/// binding. Only the hint is ever reassigned, by the reverse post-processing
/// pass.
#[derive(Debug, Clone)]
pub struct SemanticArgument {
    ordinal: usize,
    sequence: TokenizedSequence,
    anatomy: SemanticAnatomy,
    hint: SemanticHint,
}

impl SemanticArgument {
    fn new(
        ordinal: usize,
        sequence: TokenizedSequence,
        anatomy: SemanticAnatomy,
        hint: SemanticHint,
    ) -> Self {
        Self { ordinal, sequence, anatomy, hint }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn text(&self) -> &str {
        self.sequence.text()
    }

    pub fn hint(&self) -> SemanticHint {
        self.hint
    }

    pub fn anatomy(&self) -> &SemanticAnatomy {
        &self.anatomy
    }

    /// Whether this argument is an option or switch (any non-`None` prefix).
    pub fn is_option(&self) -> bool {
        self.anatomy.prefix_format() != PrefixFormat::None
    }

    /// Whether this argument carries an attached operand value.
    pub fn has_operand(&self) -> bool {
        self.anatomy.has_operand()
    }

    /// Whether this argument is a bare (non-option) value.
    pub fn is_discreet_argument(&self) -> bool {
        self.anatomy.prefix_format() == PrefixFormat::None
    }

    /// The prefix plus identifier text, e.g. `--count`; the key option and
    /// switch symbols are matched by.
    pub fn prefixed_identifier(&self) -> String {
        self.anatomy.prefixed_identifier(&self.sequence)
    }

    /// The attached operand value, if any.
    pub fn operand_value(&self) -> Option<String> {
        self.anatomy.operand_value(&self.sequence)
    }
}

/// Where an argument sits in the raw input, tracked for the trailing-switch
/// heuristics of the short-option path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueuePosition {
    Single,
    First,
    Last,
    Middle,
}

/// Parses tokenized input sequences into semantic arguments.
///
/// Two passes: a forward structural pass over a lookahead queue, then one
/// reverse pass correcting switch hints. Whether a bare option carries an
/// implicit switch value depends on what follows it, which is only known
/// once the full sequence has been read.
pub fn parse_arguments(sequences: Vec<TokenizedSequence>) -> Vec<SemanticArgument> {
    let total = sequences.len();
    let mut queue: VecDeque<TokenizedSequence> = sequences.into();
    let mut parser = SemanticParser { list: Vec::with_capacity(total) };
    let mut iteration = 0;

    while let Some(sequence) = queue.pop_front() {
        let position = match (total, iteration, queue.len()) {
            (1, _, _) => QueuePosition::Single,
            (_, 0, _) => QueuePosition::First,
            (_, _, 0) => QueuePosition::Last,
            _ => QueuePosition::Middle,
        };
        iteration += 1;

        if sequence.is_terminator() {
            break;
        }

        if let Some(sequence) = parser.try_parse_prefixed(sequence, position) {
            parser.parse_plain(sequence);
        }
    }

    // Everything after the terminator, verbatim; the terminator itself is
    // not part of the output.
    for sequence in queue {
        parser.push(sequence, SemanticAnatomy::empty(), SemanticHint::Terminated);
    }

    parser.post_process_hints();
    parser.list
}

struct SemanticParser {
    list: Vec<SemanticArgument>,
}

impl SemanticParser {
    fn push(&mut self, sequence: TokenizedSequence, anatomy: SemanticAnatomy, hint: SemanticHint) {
        let ordinal = self.list.len();
        self.list.push(SemanticArgument::new(ordinal, sequence, anatomy, hint));
    }

    fn last(&self) -> Option<&SemanticArgument> {
        self.list.last()
    }

    /// Attempts prefix-specific parsing. Returns the sequence back when it is
    /// not actually an option (single character, no recognized prefix, or an
    /// invalid identifier) so it can be handled as a plain argument.
    fn try_parse_prefixed(
        &mut self,
        sequence: TokenizedSequence,
        position: QueuePosition,
    ) -> Option<TokenizedSequence> {
        // Sequences of one character are never options.
        if sequence.len() == 1 {
            return Some(sequence);
        }

        let anatomy = SemanticAnatomy::derive(&sequence);

        match anatomy.prefix_format() {
            PrefixFormat::None => Some(sequence),
            PrefixFormat::ShortPosix => self.parse_short_posix(sequence, anatomy, position),
            PrefixFormat::LongGnu => self.parse_prefixed(sequence, anatomy, |c| {
                c.is_alphanumeric() || c == SHORT_PREFIX
            }),
            PrefixFormat::PathStyle => {
                self.parse_prefixed(sequence, anatomy, char::is_alphanumeric)
            }
        }
    }

    fn parse_short_posix(
        &mut self,
        sequence: TokenizedSequence,
        anatomy: SemanticAnatomy,
        position: QueuePosition,
    ) -> Option<TokenizedSequence> {
        let identifier = anatomy.identifier(&sequence);

        if !identifier.chars().all(char::is_alphanumeric) {
            return Some(sequence);
        }

        if identifier.chars().count() == 1 {
            // A lone short option. Trailing position, or following an
            // argument that already has its operand, marks it as a switch;
            // an attached operand expression keeps it unresolved.
            let hint = if !anatomy.operand_expression(&sequence).is_empty() {
                SemanticHint::None
            } else if matches!(position, QueuePosition::Single | QueuePosition::Last)
                || self.last().is_some_and(SemanticArgument::has_operand)
            {
                SemanticHint::KnownSwitch
            } else {
                SemanticHint::None
            };

            self.push(sequence, anatomy, hint);
            return None;
        }

        // A grouped cluster, e.g. `-abc[=x]`: every member but the last is a
        // synthetic single-character switch; the last keeps the operand
        // expression and resolves like a lone short option would.
        log::trace!("splitting grouped switch cluster '{}'", sequence.text());

        let members: Vec<char> = identifier.chars().collect();
        for &member in &members[..members.len() - 1] {
            self.push_short(format!("{SHORT_PREFIX}{member}"), SemanticHint::KnownSwitch);
        }

        let last_member = members[members.len() - 1];
        let trailing = format!(
            "{SHORT_PREFIX}{last_member}{}",
            anatomy.operand_expression(&sequence)
        );
        self.push_short(trailing, SemanticHint::None);

        None
    }

    fn push_short(&mut self, text: String, hint: SemanticHint) {
        let sequence = TokenizedSequence::from_raw(&text);
        let anatomy = SemanticAnatomy::derive(&sequence);
        self.push(sequence, anatomy, hint);
    }

    fn parse_prefixed(
        &mut self,
        sequence: TokenizedSequence,
        anatomy: SemanticAnatomy,
        valid_char: impl Fn(char) -> bool,
    ) -> Option<TokenizedSequence> {
        let identifier = anatomy.identifier(&sequence);

        if !identifier.chars().all(valid_char) {
            return Some(sequence);
        }

        self.push(sequence, anatomy, SemanticHint::None);
        None
    }

    /// Plain (non-option) arguments are classified by the previously emitted
    /// argument: an operand-less option makes this a speculative operand, a
    /// bare argument (or nothing) makes it discreet. Plain arguments carry an
    /// empty anatomy, including prefixed sequences that fell through on an
    /// invalid identifier.
    fn parse_plain(&mut self, sequence: TokenizedSequence) {
        let hint = match self.last() {
            Some(last) if last.is_option() && !last.has_operand() => {
                SemanticHint::SpeculativeOperand
            }
            Some(last) if last.is_discreet_argument() => SemanticHint::DiscreetArgument,
            None => SemanticHint::DiscreetArgument,
            Some(_) => SemanticHint::None,
        };

        self.push(sequence, SemanticAnatomy::empty(), hint);
    }

    /// Reverse pass: an option with no operand whose following argument is
    /// absent or itself an option can never receive an operand, so it must
    /// be a switch.
    fn post_process_hints(&mut self) {
        let mut next_is_option: Option<bool> = None;

        for argument in self.list.iter_mut().rev() {
            if argument.is_option()
                && !argument.has_operand()
                && next_is_option.unwrap_or(true)
            {
                argument.hint = SemanticHint::KnownSwitch;
            }

            next_is_option = Some(argument.is_option());
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Vec<SemanticArgument> {
        parse_arguments(args.iter().map(|arg| TokenizedSequence::from_raw(arg)).collect())
    }

    fn texts(arguments: &[SemanticArgument]) -> Vec<String> {
        arguments.iter().map(|arg| arg.text().to_string()).collect()
    }

    #[test]
    fn test_trailing_short_option_is_a_known_switch() {
        let arguments = parse(&["-x"]);
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments[0].hint(), SemanticHint::KnownSwitch);
    }

    #[test]
    fn test_short_option_before_another_option_is_a_known_switch() {
        let arguments = parse(&["-x", "--verbose"]);
        assert_eq!(arguments[0].hint(), SemanticHint::KnownSwitch);
    }

    #[test]
    fn test_short_option_before_bare_value_stays_unresolved() {
        let arguments = parse(&["-o", "out.txt"]);
        assert_eq!(arguments[0].hint(), SemanticHint::None);
        assert_eq!(arguments[1].hint(), SemanticHint::SpeculativeOperand);
    }

    #[test]
    fn test_grouped_cluster_splits_into_members() {
        let arguments = parse(&["-abc"]);
        assert_eq!(texts(&arguments), vec!["-a", "-b", "-c"]);
        // The trailing member has no operand and nothing follows it, so the
        // reverse pass marks it too.
        assert!(arguments.iter().all(|arg| arg.hint() == SemanticHint::KnownSwitch));
    }

    #[test]
    fn test_grouped_cluster_with_operand_keeps_it_on_the_last_member() {
        let arguments = parse(&["-abc=x"]);
        assert_eq!(texts(&arguments), vec!["-a", "-b", "-c=x"]);
        assert_eq!(arguments[0].hint(), SemanticHint::KnownSwitch);
        assert_eq!(arguments[1].hint(), SemanticHint::KnownSwitch);
        assert_eq!(arguments[2].hint(), SemanticHint::None);
        assert_eq!(arguments[2].operand_value().as_deref(), Some("x"));
    }

    #[test]
    fn test_ordinals_are_assigned_across_split_members() {
        let arguments = parse(&["-ab", "value"]);
        let ordinals: Vec<usize> = arguments.iter().map(SemanticArgument::ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_identifier_falls_through_to_plain_argument() {
        let arguments = parse(&["-a.b"]);
        assert_eq!(arguments.len(), 1);
        assert!(arguments[0].is_discreet_argument());
        assert_eq!(arguments[0].hint(), SemanticHint::DiscreetArgument);
    }

    #[test]
    fn test_terminator_passes_everything_through() {
        let arguments = parse(&["--", "-x", "--opt=1", "plain"]);
        assert_eq!(texts(&arguments), vec!["-x", "--opt=1", "plain"]);
        assert!(arguments.iter().all(|arg| arg.hint() == SemanticHint::Terminated));
        assert!(arguments.iter().all(|arg| !arg.is_option()));
    }

    #[test]
    fn test_terminator_mid_sequence() {
        let arguments = parse(&["--opt", "--", "--not-an-option"]);
        assert_eq!(texts(&arguments), vec!["--opt", "--not-an-option"]);
        assert_eq!(arguments[1].hint(), SemanticHint::Terminated);
    }

    #[test]
    fn test_bare_arguments_after_bare_arguments_are_discreet() {
        let arguments = parse(&["first", "second"]);
        assert_eq!(arguments[0].hint(), SemanticHint::DiscreetArgument);
        assert_eq!(arguments[1].hint(), SemanticHint::DiscreetArgument);
    }

    #[test]
    fn test_option_with_operand_does_not_capture_the_next_argument() {
        let arguments = parse(&["--opt=1", "value"]);
        // `value` follows an operand-bearing option; it is not speculative.
        assert_eq!(arguments[1].hint(), SemanticHint::None);
    }

    #[test]
    fn test_reverse_pass_marks_adjacent_options_as_switches() {
        let arguments = parse(&["--quiet", "--force", "target"]);
        assert_eq!(arguments[0].hint(), SemanticHint::KnownSwitch);
        // `--force` precedes a bare value, so it may still take an operand.
        assert_eq!(arguments[1].hint(), SemanticHint::None);
        assert_eq!(arguments[2].hint(), SemanticHint::SpeculativeOperand);
    }

    #[test]
    fn test_long_option_with_operand() {
        let arguments = parse(&["--count=3"]);
        assert!(arguments[0].is_option());
        assert!(arguments[0].has_operand());
        assert_eq!(arguments[0].prefixed_identifier(), "--count");
        assert_eq!(arguments[0].operand_value().as_deref(), Some("3"));
    }

    #[test]
    fn test_path_style_option() {
        let arguments = parse(&["/force"]);
        assert!(arguments[0].is_option());
        assert_eq!(arguments[0].prefixed_identifier(), "/force");
        assert_eq!(arguments[0].hint(), SemanticHint::KnownSwitch);
    }
}
