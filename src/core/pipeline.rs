// src/core/pipeline.rs

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::constants::TERMINATOR;
use crate::core::collection::SemanticArgumentCollection;
use crate::core::lexer::TokenizedSequence;
use crate::core::provider::{MappedArgumentProvider, ServiceRegistry, ValueBinding};
use crate::core::semantics::parse_arguments;
use crate::errors::CommandLineError;
use crate::models::{BindingScope, BindingSymbol, Command, SymbolKind};

/// Per-invocation state threaded through the pipeline stages: the invocation
/// path, the raw and leftover arguments, staged symbols and semantic
/// arguments, registered services, and the accumulated value bindings.
/// Owned exclusively by one invocation; never shared.
pub(crate) struct BindingContext<'a> {
    root: &'a Command,
    raw_args: Vec<String>,
    invocation_args: Vec<String>,
    path: Vec<&'a Command>,
    symbols: Vec<Arc<BindingSymbol>>,
    semantic: SemanticArgumentCollection,
    converters: ServiceRegistry,
    validators: ServiceRegistry,
    bindings: Vec<ValueBinding>,
    models: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingContext")
            .field("root", &self.root)
            .field("raw_args", &self.raw_args)
            .field("invocation_args", &self.invocation_args)
            .field("path", &self.path)
            .field("symbols", &self.symbols)
            .field("semantic", &self.semantic)
            .field("converters", &self.converters)
            .field("validators", &self.validators)
            .field("bindings", &self.bindings)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> BindingContext<'a> {
    fn new(root: &'a Command, raw_args: Vec<String>) -> Self {
        Self {
            root,
            raw_args,
            invocation_args: Vec::new(),
            path: Vec::new(),
            symbols: Vec::new(),
            semantic: SemanticArgumentCollection::new(Vec::new()),
            converters: ServiceRegistry::default(),
            validators: ServiceRegistry::default(),
            bindings: Vec::new(),
            models: HashMap::new(),
        }
    }

    /// The matched (deepest) command of the invocation path.
    pub(crate) fn leaf(&self) -> &'a Command {
        self.path.last().copied().unwrap_or(self.root)
    }

    fn create_provider(&self) -> MappedArgumentProvider {
        MappedArgumentProvider::new(
            self.bindings.clone(),
            self.converters.clone(),
            self.validators.clone(),
        )
    }

    /// Finalizes the context into the provider handed to the handler,
    /// carrying any models produced by stage 7.
    pub(crate) fn into_provider(self) -> MappedArgumentProvider {
        let mut provider =
            MappedArgumentProvider::new(self.bindings, self.converters, self.validators);
        provider.attach_models(self.models);
        provider
    }
}

/// Runs the fixed stage chain over a fresh context. Stages never reorder:
/// options must resolve before positionals, because positional arguments are
/// whatever the options did not claim.
pub(crate) fn run<'a>(
    root: &'a Command,
    raw_args: Vec<String>,
) -> Result<BindingContext<'a>, CommandLineError> {
    let stages: [(&str, fn(&mut BindingContext<'a>) -> Result<(), CommandLineError>); 8] = [
        ("build-command-path", build_command_path),
        ("stage-binding-symbols", stage_binding_symbols),
        ("register-services", register_services),
        ("prepare-semantic-arguments", prepare_semantic_arguments),
        ("bind-option-values", bind_option_values),
        ("bind-argument-values", bind_argument_values),
        ("bind-models", bind_models),
        ("post-validate", post_validate),
    ];

    let mut context = BindingContext::new(root, raw_args);

    for (name, stage) in stages {
        log::debug!("binding stage: {name}");
        stage(&mut context)?;
    }

    Ok(context)
}

/// Stage 1: walk from the root, matching leading raw arguments against child
/// command identifiers until no match, a terminator, or a leaf. Whatever is
/// left becomes the invocation arguments.
fn build_command_path(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    let mut command = context.root;
    let mut queue: VecDeque<String> = context.raw_args.clone().into();

    loop {
        context.path.push(command);

        if command.children().is_empty() {
            break;
        }

        let Some(argument) = queue.front() else {
            break;
        };

        if argument.as_str() == TERMINATOR {
            break;
        }

        let Some(child) = command.children().iter().find(|child| child.matches_identifier(argument))
        else {
            break;
        };

        command = child.as_ref();
        queue.pop_front();
    }

    log::debug!(
        "matched command path: {:?}",
        context.path.iter().map(|cmd| cmd.id()).collect::<Vec<_>>()
    );

    context.invocation_args = queue.into();
    Ok(())
}

/// Stage 2: collect the symbols applicable at the leaf. Ancestors contribute
/// their descendant-scoped symbols, the leaf its self-scoped ones; a symbol
/// declared by a closer command replaces an ancestor's with the same id.
fn stage_binding_symbols(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    let mut staged: Vec<Arc<BindingSymbol>> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    let mut stage = |symbol: &Arc<BindingSymbol>| {
        if let Some(&index) = by_id.get(symbol.id()) {
            staged[index] = Arc::clone(symbol);
        } else {
            by_id.insert(symbol.id().to_string(), staged.len());
            staged.push(Arc::clone(symbol));
        }
    };

    let leaf_index = context.path.len().saturating_sub(1);

    for command in &context.path[..leaf_index] {
        for symbol in command.bindings() {
            if matches!(
                symbol.scope(),
                BindingScope::Descendants | BindingScope::SelfAndDescendants
            ) {
                stage(symbol);
            }
        }
    }

    for symbol in context.leaf().bindings() {
        if matches!(symbol.scope(), BindingScope::SelfOnly | BindingScope::SelfAndDescendants) {
            stage(symbol);
        }
    }

    context.symbols = staged;
    Ok(())
}

/// Stage 3: register per-command converter/validator services along the
/// path, keyed by value type. Later (closer) commands win.
fn register_services(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    for command in &context.path {
        for slot in command.converter_services() {
            context.converters.add(slot.clone());
        }
        for slot in command.validator_services() {
            context.validators.add(slot.clone());
        }
    }

    Ok(())
}

/// Stage 4: tokenize and parse the invocation arguments into the semantic
/// argument collection the binding stages consume.
fn prepare_semantic_arguments(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    let sequences: Vec<TokenizedSequence> =
        context.invocation_args.iter().map(|arg| TokenizedSequence::from_raw(arg)).collect();

    let arguments = parse_arguments(sequences);
    log::debug!("parsed {} semantic argument(s)", arguments.len());

    context.semantic = SemanticArgumentCollection::new(arguments);
    Ok(())
}

/// Stage 5: resolve option and switch bindings. Runs before positional
/// binding. Candidate values prefer an attached operand, then (for options)
/// a consumed speculative operand; a switch matched without an operand binds
/// `true`, and an option left without any operand is an error.
fn bind_option_values(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    let symbols = context.symbols.clone();

    for symbol in symbols.iter().filter(|symbol| !symbol.is_positional()) {
        let pairs = context.semantic.remove_option_arguments(&symbol.identifiers());

        let mut candidates: Vec<Option<String>> = Vec::with_capacity(pairs.len());
        for (matched, speculative) in pairs {
            if let Some(operand) = matched.operand_value() {
                candidates.push(Some(operand));
            } else if symbol.kind() == SymbolKind::Option
                && let Some(speculative) = speculative
            {
                // The bare argument after the option becomes its value.
                context.semantic.remove_argument(speculative.ordinal());
                candidates.push(Some(speculative.text().to_string()));
            } else {
                candidates.push(None);
            }
        }

        validate_arity(symbol, candidates.len(), || {
            candidates.iter().flatten().cloned().collect()
        })?;

        let values: Vec<String> = match symbol.kind() {
            SymbolKind::Switch => candidates
                .into_iter()
                .map(|candidate| candidate.unwrap_or_else(|| "true".to_string()))
                .collect(),
            _ => {
                if candidates.iter().any(Option::is_none) {
                    return Err(CommandLineError::MissingOperand {
                        symbol_kind: symbol.kind(),
                        symbol: symbol.display_name(),
                    });
                }
                candidates.into_iter().flatten().collect()
            }
        };

        context.bindings.push(ValueBinding::new(Arc::clone(symbol), values));
    }

    Ok(())
}

/// Stage 6: resolve positional argument bindings in declaration order. Each
/// symbol dequeues up to its maximum count of the remaining non-option
/// arguments.
fn bind_argument_values(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    let symbols = context.symbols.clone();
    let mut queue: VecDeque<_> = context.semantic.unbound_positionals().cloned().collect();

    for symbol in symbols.iter().filter(|symbol| symbol.is_positional()) {
        let max = symbol.arity().max().unwrap_or(usize::MAX);

        let mut taken = Vec::new();
        while taken.len() < max {
            let Some(argument) = queue.pop_front() else {
                break;
            };
            taken.push(argument);
        }

        validate_arity(symbol, taken.len(), || {
            taken.iter().map(|argument| argument.text().to_string()).collect()
        })?;

        let mut values = Vec::with_capacity(taken.len());
        for argument in &taken {
            context.semantic.remove_argument(argument.ordinal());
            values.push(argument.text().to_string());
        }

        context.bindings.push(ValueBinding::new(Arc::clone(symbol), values));
    }

    Ok(())
}

/// Stage 7: run each command's model binders against a provider view over
/// the bindings accumulated so far.
fn bind_models(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    if context.path.iter().all(|command| command.model_binders().is_empty()) {
        return Ok(());
    }

    let provider = context.create_provider();

    for command in &context.path {
        for binder in command.model_binders() {
            let (type_id, model) = binder.bind(&provider)?;
            context.models.insert(type_id, model);
        }
    }

    Ok(())
}

/// Stage 8: every semantic argument must have been consumed. The anatomy of
/// the first leftover decides the report: unknown option/switch, or invalid
/// positional argument.
fn post_validate(context: &mut BindingContext<'_>) -> Result<(), CommandLineError> {
    if let Some(leftover) = context.semantic.first_remaining() {
        return Err(CommandLineError::InvalidArgument {
            text: leftover.text().to_string(),
            prefixed: leftover.is_option(),
        });
    }

    Ok(())
}

fn validate_arity(
    symbol: &Arc<BindingSymbol>,
    count: usize,
    values: impl Fn() -> Vec<String>,
) -> Result<(), CommandLineError> {
    let arity = symbol.arity();

    if count < arity.min() {
        return Err(CommandLineError::MinimumArityNotMet {
            symbol_kind: symbol.kind(),
            symbol: symbol.display_name(),
            expected: arity.min(),
            values: values(),
        });
    }

    if let Some(max) = arity.max()
        && count > max
    {
        return Err(CommandLineError::MaximumArityExceeded {
            symbol_kind: symbol.kind(),
            symbol: symbol.display_name(),
            allowed: max,
            values: values(),
        });
    }

    Ok(())
}

// MARK: --- UNIT TESTS ---
