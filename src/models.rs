// src/models.rs

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::CancellationToken;
use crate::constants::ROOT_COMMAND_ID;
use crate::core::provider::MappedArgumentProvider;
use crate::errors::CommandLineError;

// --- SYMBOL FUNDAMENTALS ---

/// The kinds of binding symbols a command can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A prefixed symbol that carries an operand value.
    Option,
    /// A prefixed symbol whose presence is the value.
    Switch,
    /// A positional symbol bound from bare arguments.
    Argument,
}

/// Where a symbol applies relative to the command that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingScope {
    /// Only the declaring command.
    SelfOnly,
    /// Only sub-commands of the declaring command.
    Descendants,
    /// The declaring command and its sub-commands.
    SelfAndDescendants,
}

/// The usage-count constraint of a symbol. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub const fn zero_or_one() -> Self {
        Self::new(0, Some(1))
    }

    pub const fn one() -> Self {
        Self::new(1, Some(1))
    }

    pub const fn zero_or_many() -> Self {
        Self::new(0, None)
    }

    pub const fn one_or_many() -> Self {
        Self::new(1, None)
    }

    pub const fn exactly(count: usize) -> Self {
        Self::new(count, Some(count))
    }

    pub const fn min(&self) -> usize {
        self.min
    }

    pub const fn max(&self) -> Option<usize> {
        self.max
    }

    /// Whether the symbol can bind more than one value.
    pub fn allows_many(&self) -> bool {
        self.max.is_none_or(|max| max > 1)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "(min={}, max={})", self.min, max),
            None => write!(f, "(min={}, max=unbounded)", self.min),
        }
    }
}

// --- TYPE-ERASED BEHAVIOR SLOTS ---

pub(crate) type ConvertFn<T> = Arc<dyn Fn(&str) -> Result<T, String> + Send + Sync>;
pub(crate) type ValidateFn<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;
pub(crate) type DefaultFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A typed converter, validator, or default provider stored behind `Any`,
/// tagged with the value type it serves. The tag makes mismatched downcasts
/// detectable before they happen.
#[derive(Clone)]
pub struct TypedSlot {
    type_id: TypeId,
    type_name: &'static str,
    cell: Arc<dyn Any + Send + Sync>,
}

impl TypedSlot {
    fn new<T: 'static>(cell: Arc<dyn Any + Send + Sync>) -> Self {
        Self { type_id: TypeId::of::<T>(), type_name: type_name::<T>(), cell }
    }

    pub(crate) fn converter<T: 'static>(
        f: impl Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        let func: ConvertFn<T> = Arc::new(f);
        Self::new::<T>(Arc::new(func))
    }

    pub(crate) fn validator<T: 'static>(
        f: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        let func: ValidateFn<T> = Arc::new(f);
        Self::new::<T>(Arc::new(func))
    }

    pub(crate) fn default_provider<T: 'static>(
        f: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let func: DefaultFn<T> = Arc::new(f);
        Self::new::<T>(Arc::new(func))
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn get<V: Any>(&self) -> Option<&V> {
        self.cell.downcast_ref::<V>()
    }
}

impl fmt::Debug for TypedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedSlot<{}>", self.type_name)
    }
}

// --- BINDING SYMBOLS ---

/// An option, switch, or argument declaration: identity, arity, scope, value
/// type, and optional conversion/validation/default behavior. Immutable once
/// built; shared between the schema tree and per-invocation contexts.
#[derive(Debug)]
pub struct BindingSymbol {
    id: String,
    aliases: Vec<String>,
    kind: SymbolKind,
    arity: Arity,
    scope: BindingScope,
    value_type: TypeId,
    value_type_name: &'static str,
    converter: Option<TypedSlot>,
    validator: Option<TypedSlot>,
    default_provider: Option<TypedSlot>,
}

impl BindingSymbol {
    /// Starts an option declaration carrying values of type `T`.
    pub fn option<T: 'static>(id: impl Into<String>) -> SymbolBuilder<T> {
        SymbolBuilder::new(id.into(), SymbolKind::Option)
    }

    /// Starts a switch declaration. Switches are boolean: present means
    /// `true`, an explicit operand (`--flag=false`) overrides.
    pub fn switch(id: impl Into<String>) -> SymbolBuilder<bool> {
        SymbolBuilder::new(id.into(), SymbolKind::Switch)
    }

    /// Starts a positional argument declaration carrying values of type `T`.
    pub fn argument<T: 'static>(id: impl Into<String>) -> SymbolBuilder<T> {
        SymbolBuilder::new(id.into(), SymbolKind::Argument)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The id followed by every alias; the names the symbol is matched by.
    pub fn identifiers(&self) -> Vec<String> {
        std::iter::once(self.id.clone()).chain(self.aliases.iter().cloned()).collect()
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn scope(&self) -> BindingScope {
        self.scope
    }

    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    pub fn declares_value_type<T: 'static>(&self) -> bool {
        self.value_type == TypeId::of::<T>()
    }

    /// Display form used in error messages: `--id | alias | ...`.
    pub fn display_name(&self) -> String {
        self.identifiers().join(" | ")
    }

    pub(crate) fn is_positional(&self) -> bool {
        self.kind == SymbolKind::Argument
    }

    pub(crate) fn converter_fn<T: 'static>(&self) -> Option<ConvertFn<T>> {
        self.converter.as_ref().and_then(|slot| slot.get::<ConvertFn<T>>()).cloned()
    }

    pub(crate) fn validator_fn<T: 'static>(&self) -> Option<ValidateFn<T>> {
        self.validator.as_ref().and_then(|slot| slot.get::<ValidateFn<T>>()).cloned()
    }

    pub(crate) fn default_fn<T: 'static>(&self) -> Option<DefaultFn<T>> {
        self.default_provider.as_ref().and_then(|slot| slot.get::<DefaultFn<T>>()).cloned()
    }
}

/// Builder for a [`BindingSymbol`] of value type `T`.
#[must_use]
pub struct SymbolBuilder<T> {
    id: String,
    aliases: Vec<String>,
    kind: SymbolKind,
    arity: Arity,
    scope: BindingScope,
    converter: Option<TypedSlot>,
    validator: Option<TypedSlot>,
    default_provider: Option<TypedSlot>,
    _marker: PhantomData<T>,
}

impl<T: 'static> SymbolBuilder<T> {
    fn new(id: String, kind: SymbolKind) -> Self {
        Self {
            id,
            aliases: Vec::new(),
            kind,
            arity: Arity::zero_or_one(),
            scope: BindingScope::SelfOnly,
            converter: None,
            validator: None,
            default_provider: None,
            _marker: PhantomData,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn scope(mut self, scope: BindingScope) -> Self {
        self.scope = scope;
        self
    }

    /// Overrides conversion for this symbol alone. The error string becomes
    /// the reason clause of a `ConversionFailed` report.
    pub fn converter(
        mut self,
        f: impl Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        self.converter = Some(TypedSlot::converter(f));
        self
    }

    /// Validates the converted value. The error string becomes the failed
    /// rule's message in a `ValidationFailed` report.
    pub fn validator(
        mut self,
        f: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(TypedSlot::validator(f));
        self
    }

    /// Supplies the value bound when the symbol receives no argument.
    pub fn default_provider(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.default_provider = Some(TypedSlot::default_provider(f));
        self
    }

    pub fn build(self) -> Arc<BindingSymbol> {
        Arc::new(BindingSymbol {
            id: self.id,
            aliases: self.aliases,
            kind: self.kind,
            arity: self.arity,
            scope: self.scope,
            value_type: TypeId::of::<T>(),
            value_type_name: type_name::<T>(),
            converter: self.converter,
            validator: self.validator,
            default_provider: self.default_provider,
        })
    }
}

impl<T> fmt::Debug for SymbolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolBuilder").field("id", &self.id).field("kind", &self.kind).finish()
    }
}

// --- HANDLERS AND MODEL BINDERS ---

type SyncHandlerFn =
    dyn Fn(&MappedArgumentProvider, &CancellationToken) -> anyhow::Result<()> + Send + Sync;
type AsyncHandlerFn = dyn Fn(
        Arc<MappedArgumentProvider>,
        CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
    + Send
    + Sync;

/// The logic invoked when a command is matched: one closure per supported
/// shape. The cancellation token is threaded through but has no meaning
/// inside the parsing pipeline itself.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl Handler {
    pub fn sync(
        f: impl Fn(&MappedArgumentProvider, &CancellationToken) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<MappedArgumentProvider>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Async(Arc::new(move |provider, token| Box::pin(f(provider, token))))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Handler::Sync"),
            Self::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// Builds a typed model from bound argument values. Models produced during
/// the pipeline are retrievable from the provider by their type.
#[derive(Clone)]
pub struct ModelBinder {
    type_id: TypeId,
    type_name: &'static str,
    bind: Arc<
        dyn Fn(&MappedArgumentProvider) -> Result<Box<dyn Any + Send + Sync>, CommandLineError>
        + Send
        + Sync,
    >,
}

impl ModelBinder {
    pub fn new<T: Send + Sync + 'static>(
        f: impl Fn(&MappedArgumentProvider) -> Result<T, CommandLineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            bind: Arc::new(move |provider| {
                f(provider).map(|model| Box::new(model) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    pub(crate) fn bind(
        &self,
        provider: &MappedArgumentProvider,
    ) -> Result<(TypeId, Box<dyn Any + Send + Sync>), CommandLineError> {
        (self.bind)(provider).map(|model| (self.type_id, model))
    }
}

impl fmt::Debug for ModelBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelBinder<{}>", self.type_name)
    }
}

// --- COMMANDS ---

/// A node of the command tree: identity, sub-commands, binding symbols,
/// converter/validator services, model binders, and an optional handler.
/// Built once at startup and read-only during binding, so a tree may be
/// shared by concurrent invocations.
#[derive(Debug, Clone)]
pub struct Command {
    id: String,
    aliases: Vec<String>,
    children: Vec<Arc<Command>>,
    bindings: Vec<Arc<BindingSymbol>>,
    converters: Vec<TypedSlot>,
    validators: Vec<TypedSlot>,
    model_binders: Vec<ModelBinder>,
    handler: Option<Handler>,
}

impl Command {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            children: Vec::new(),
            bindings: Vec::new(),
            converters: Vec::new(),
            validators: Vec::new(),
            model_binders: Vec::new(),
            handler: None,
        }
    }

    /// The tree root, with its fixed reserved id.
    pub fn root() -> Self {
        Self::new(ROOT_COMMAND_ID)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn subcommand(mut self, child: Self) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn binding(mut self, symbol: Arc<BindingSymbol>) -> Self {
        self.bindings.push(symbol);
        self
    }

    /// Registers a fallback converter for every symbol of type `T` in scope
    /// of this command, used when the symbol declares none of its own.
    pub fn converter_service<T: 'static>(
        mut self,
        f: impl Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        self.converters.push(TypedSlot::converter(f));
        self
    }

    /// Registers a fallback validator for every symbol of type `T` in scope
    /// of this command.
    pub fn validator_service<T: 'static>(
        mut self,
        f: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(TypedSlot::validator(f));
        self
    }

    pub fn model_binder(mut self, binder: ModelBinder) -> Self {
        self.model_binders.push(binder);
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The id followed by every alias.
    pub fn identifiers(&self) -> Vec<String> {
        std::iter::once(self.id.clone()).chain(self.aliases.iter().cloned()).collect()
    }

    pub fn children(&self) -> &[Arc<Command>] {
        &self.children
    }

    pub fn bindings(&self) -> &[Arc<BindingSymbol>] {
        &self.bindings
    }

    pub(crate) fn converter_services(&self) -> &[TypedSlot] {
        &self.converters
    }

    pub(crate) fn validator_services(&self) -> &[TypedSlot] {
        &self.validators
    }

    pub(crate) fn model_binders(&self) -> &[ModelBinder] {
        &self.model_binders
    }

    pub fn handler_ref(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.id == identifier || self.aliases.iter().any(|alias| alias == identifier)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_allows_many() {
        assert!(Arity::zero_or_many().allows_many());
        assert!(Arity::exactly(3).allows_many());
        assert!(!Arity::one().allows_many());
        assert!(!Arity::zero_or_one().allows_many());
    }

    #[test]
    fn test_symbol_identifiers_include_aliases() {
        let symbol = BindingSymbol::switch("--verbose").alias("-v").build();
        assert_eq!(symbol.identifiers(), vec!["--verbose", "-v"]);
        assert_eq!(symbol.display_name(), "--verbose | -v");
    }

    #[test]
    fn test_switch_declares_bool() {
        let symbol = BindingSymbol::switch("--force").build();
        assert_eq!(symbol.kind(), SymbolKind::Switch);
        assert!(symbol.declares_value_type::<bool>());
        assert!(!symbol.declares_value_type::<i32>());
    }

    #[test]
    fn test_typed_slot_round_trip() {
        let symbol = BindingSymbol::option::<i32>("--count")
            .converter(|raw| raw.trim().parse().map_err(|_| "not a number".to_string()))
            .build();

        let converter = symbol.converter_fn::<i32>().unwrap();
        assert_eq!(converter(" 42 "), Ok(42));
        // The slot serves i32; asking for another type finds nothing.
        assert!(symbol.converter_fn::<u8>().is_none());
    }

    #[test]
    fn test_command_matches_identifier_by_alias() {
        let command = Command::new("delete").alias("del");
        assert!(command.matches_identifier("delete"));
        assert!(command.matches_identifier("del"));
        assert!(!command.matches_identifier("remove"));
    }

    #[test]
    fn test_root_command_has_reserved_id() {
        assert_eq!(Command::root().id(), crate::constants::ROOT_COMMAND_ID);
    }
}
