// src/core/provider.rs

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::is_prefix_char;
use crate::core::naming::{inferred_binding_name, normalized_key};
use crate::errors::CommandLineError;
use crate::models::{BindingSymbol, ConvertFn, TypedSlot, ValidateFn};

/// Conversion from a raw argument string, used when neither the symbol nor
/// the command path supplies a converter.
///
/// Blanket-implemented for every `FromStr` type with a displayable error, so
/// numbers, booleans, paths, network addresses, and any user type that
/// implements `FromStr` convert out of the box.
pub trait FromArgument: Sized + 'static {
    fn from_argument(raw: &str) -> Result<Self, String>;
}

impl<T> FromArgument for T
where
    T: FromStr + 'static,
    T::Err: std::fmt::Display,
{
    fn from_argument(raw: &str) -> Result<Self, String> {
        raw.parse::<T>().map_err(|err| err.to_string())
    }
}

/// The raw string values resolved for one symbol in one invocation.
#[derive(Debug, Clone)]
pub enum BindingValues {
    /// A single-use symbol: at most one value.
    Single(Option<String>),
    /// A multi-use symbol: every value, in input order.
    Many(Vec<String>),
}

/// The result of resolving a symbol against its matched argument values.
/// Created once per staged symbol per invocation; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ValueBinding {
    symbol: Arc<BindingSymbol>,
    values: BindingValues,
}

impl ValueBinding {
    pub(crate) fn new(symbol: Arc<BindingSymbol>, mut values: Vec<String>) -> Self {
        let values = if symbol.arity().allows_many() {
            BindingValues::Many(values)
        } else {
            BindingValues::Single(values.pop())
        };
        Self { symbol, values }
    }

    pub fn symbol(&self) -> &Arc<BindingSymbol> {
        &self.symbol
    }

    pub fn values(&self) -> &BindingValues {
        &self.values
    }
}

/// Converter/validator fallbacks collected from the command path, keyed by
/// the value type they serve. A service registered by a closer command
/// replaces an ancestor's for the same type.
#[derive(Debug, Clone, Default)]
pub(crate) struct ServiceRegistry {
    slots: HashMap<TypeId, TypedSlot>,
}

impl ServiceRegistry {
    pub(crate) fn add(&mut self, slot: TypedSlot) {
        self.slots.insert(slot.type_id(), slot);
    }

    fn slot_for<T: 'static>(&self) -> Option<&TypedSlot> {
        self.slots.get(&TypeId::of::<T>())
    }
}

/// The runtime-queried surface that converts bound raw values to typed
/// values on demand.
///
/// Converter resolution order: symbol-specific, then command-path service,
/// then the [`FromArgument`] fallback. Validators resolve symbol-specific,
/// then command-path service. Lookup accepts the declared id, any alias, or
/// the inferred binding name in any separator/case spelling.
pub struct MappedArgumentProvider {
    bindings: Vec<ValueBinding>,
    exact: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
    converters: ServiceRegistry,
    validators: ServiceRegistry,
    models: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MappedArgumentProvider {
    pub(crate) fn new(
        bindings: Vec<ValueBinding>,
        converters: ServiceRegistry,
        validators: ServiceRegistry,
    ) -> Self {
        let mut exact = HashMap::new();
        let mut normalized = HashMap::new();

        for (index, binding) in bindings.iter().enumerate() {
            for identifier in binding.symbol().identifiers() {
                exact.entry(inferred_binding_name(&identifier)).or_insert(index);
                normalized.entry(normalized_key(&identifier)).or_insert(index);
                exact.entry(identifier).or_insert(index);
            }
        }

        Self { bindings, exact, normalized, converters, validators, models: HashMap::new() }
    }

    pub(crate) fn attach_models(&mut self, models: HashMap<TypeId, Box<dyn Any + Send + Sync>>) {
        self.models = models;
    }

    /// The single typed value bound to `id`. An absent value resolves to the
    /// symbol's default provider, or the type's zero value if none declared.
    pub fn value<T: FromArgument + Default>(&self, id: &str) -> Result<T, CommandLineError> {
        let binding = self.binding(id)?;
        let symbol = Arc::clone(binding.symbol());

        match binding.values() {
            BindingValues::Single(None) => Ok(self.default_value(&symbol)),
            BindingValues::Single(Some(raw)) => self.convert_one(&symbol, raw),
            BindingValues::Many(values) => match values.as_slice() {
                [] => Ok(self.default_value(&symbol)),
                [raw] => self.convert_one(&symbol, raw),
                _ => Err(CommandLineError::MaximumArityExceeded {
                    symbol_kind: symbol.kind(),
                    symbol: symbol.display_name(),
                    allowed: 1,
                    values: values.clone(),
                }),
            },
        }
    }

    /// Every typed value bound to `id`, in input order.
    pub fn values<T: FromArgument>(&self, id: &str) -> Result<Vec<T>, CommandLineError> {
        let binding = self.binding(id)?;
        let symbol = Arc::clone(binding.symbol());

        match binding.values() {
            BindingValues::Single(None) => Ok(Vec::new()),
            BindingValues::Single(Some(raw)) => Ok(vec![self.convert_one(&symbol, raw)?]),
            BindingValues::Many(values) => {
                values.iter().map(|raw| self.convert_one(&symbol, raw)).collect()
            }
        }
    }

    pub fn value_deque<T: FromArgument>(&self, id: &str) -> Result<VecDeque<T>, CommandLineError> {
        self.values(id).map(VecDeque::from)
    }

    pub fn value_linked_list<T: FromArgument>(
        &self,
        id: &str,
    ) -> Result<LinkedList<T>, CommandLineError> {
        Ok(self.values(id)?.into_iter().collect())
    }

    /// Set semantics deduplicate; callers must expect that.
    pub fn value_hash_set<T: FromArgument + Eq + Hash>(
        &self,
        id: &str,
    ) -> Result<HashSet<T>, CommandLineError> {
        Ok(self.values(id)?.into_iter().collect())
    }

    /// Sorted-set semantics reorder and deduplicate; callers must expect that.
    pub fn value_btree_set<T: FromArgument + Ord>(
        &self,
        id: &str,
    ) -> Result<BTreeSet<T>, CommandLineError> {
        Ok(self.values(id)?.into_iter().collect())
    }

    /// A model produced by a command's model binder during the pipeline.
    pub fn model<T: 'static>(&self) -> Option<&T> {
        self.models.get(&TypeId::of::<T>()).and_then(|model| model.downcast_ref::<T>())
    }

    /// The bindings accumulated for this invocation.
    pub fn bindings(&self) -> &[ValueBinding] {
        &self.bindings
    }

    fn binding(&self, id: &str) -> Result<&ValueBinding, CommandLineError> {
        self.exact
            .get(id)
            .or_else(|| self.normalized.get(&normalized_key(id)))
            .map(|&index| &self.bindings[index])
            .ok_or_else(|| CommandLineError::InvalidArgument {
                text: id.to_string(),
                prefixed: id.chars().next().is_some_and(is_prefix_char),
            })
    }

    fn default_value<T: FromArgument + Default>(&self, symbol: &BindingSymbol) -> T {
        match symbol.default_fn::<T>() {
            Some(default) => default(),
            None => T::default(),
        }
    }

    fn convert_one<T: FromArgument>(
        &self,
        symbol: &BindingSymbol,
        raw: &str,
    ) -> Result<T, CommandLineError> {
        let converted = self
            .resolve_converter::<T>(symbol)
            .map_or_else(|| T::from_argument(raw), |convert| convert(raw))
            .map_err(|reason| CommandLineError::ConversionFailed {
                symbol_kind: symbol.kind(),
                symbol: symbol.display_name(),
                value: raw.to_string(),
                reason,
            })?;

        if let Some(validate) = self.resolve_validator::<T>(symbol) {
            validate(&converted).map_err(|message| CommandLineError::ValidationFailed {
                symbol_kind: symbol.kind(),
                symbol: symbol.display_name(),
                value: raw.to_string(),
                message,
            })?;
        }

        Ok(converted)
    }

    fn resolve_converter<T: 'static>(&self, symbol: &BindingSymbol) -> Option<ConvertFn<T>> {
        symbol.converter_fn::<T>().or_else(|| {
            self.converters.slot_for::<T>().and_then(|slot| slot.get::<ConvertFn<T>>()).cloned()
        })
    }

    fn resolve_validator<T: 'static>(&self, symbol: &BindingSymbol) -> Option<ValidateFn<T>> {
        symbol.validator_fn::<T>().or_else(|| {
            self.validators.slot_for::<T>().and_then(|slot| slot.get::<ValidateFn<T>>()).cloned()
        })
    }
}

impl std::fmt::Debug for MappedArgumentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedArgumentProvider")
            .field("bindings", &self.bindings.len())
            .field("models", &self.models.len())
            .finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CommandLineErrorKind;
    use crate::models::BindingSymbol;

    fn provider_with(bindings: Vec<ValueBinding>) -> MappedArgumentProvider {
        MappedArgumentProvider::new(
            bindings,
            ServiceRegistry::default(),
            ServiceRegistry::default(),
        )
    }

    fn bound(symbol: Arc<BindingSymbol>, values: &[&str]) -> ValueBinding {
        ValueBinding::new(symbol, values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_value_converts_with_from_argument_fallback() {
        let symbol = BindingSymbol::option::<i32>("--count").build();
        let provider = provider_with(vec![bound(symbol, &["42"])]);
        assert_eq!(provider.value::<i32>("--count").unwrap(), 42);
    }

    #[test]
    fn test_absent_value_yields_zero_value() {
        let symbol = BindingSymbol::option::<i32>("--count").build();
        let provider = provider_with(vec![bound(symbol, &[])]);
        assert_eq!(provider.value::<i32>("--count").unwrap(), 0);
    }

    #[test]
    fn test_absent_value_prefers_declared_default() {
        let symbol = BindingSymbol::option::<i32>("--count").default_provider(|| 7).build();
        let provider = provider_with(vec![bound(symbol, &[])]);
        assert_eq!(provider.value::<i32>("--count").unwrap(), 7);
    }

    #[test]
    fn test_symbol_converter_takes_precedence() {
        let symbol = BindingSymbol::option::<i32>("--count")
            .converter(|raw| raw.trim_start_matches('#').parse().map_err(|_| "bad".into()))
            .build();
        let provider = provider_with(vec![bound(symbol, &["#9"])]);
        assert_eq!(provider.value::<i32>("--count").unwrap(), 9);
    }

    #[test]
    fn test_service_converter_is_used_as_fallback() {
        let symbol = BindingSymbol::option::<i32>("--count").build();
        let mut converters = ServiceRegistry::default();
        converters.add(TypedSlot::converter::<i32>(|raw| {
            raw.trim().parse().map_err(|_| "bad".into())
        }));
        let provider = MappedArgumentProvider::new(
            vec![bound(symbol, &[" 5 "])],
            converters,
            ServiceRegistry::default(),
        );
        assert_eq!(provider.value::<i32>("--count").unwrap(), 5);
    }

    #[test]
    fn test_conversion_failure_carries_symbol_and_value() {
        let symbol = BindingSymbol::option::<i32>("--count").build();
        let provider = provider_with(vec![bound(symbol, &["many"])]);

        let error = provider.value::<i32>("--count").unwrap_err();
        assert_eq!(error.kind(), CommandLineErrorKind::ConversionFailed);
        match error {
            CommandLineError::ConversionFailed { symbol, value, .. } => {
                assert_eq!(symbol, "--count");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validator_rejection_carries_rule_message() {
        let symbol = BindingSymbol::option::<i32>("--count")
            .validator(|count| {
                if *count > 0 { Ok(()) } else { Err("count must be positive".to_string()) }
            })
            .build();
        let provider = provider_with(vec![bound(symbol, &["-3"])]);

        let error = provider.value::<i32>("--count").unwrap_err();
        match error {
            CommandLineError::ValidationFailed { message, value, .. } => {
                assert_eq!(message, "count must be positive");
                assert_eq!(value, "-3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multi_values_preserve_input_order() {
        let symbol = BindingSymbol::option::<String>("--tag")
            .arity(crate::models::Arity::zero_or_many())
            .build();
        let provider = provider_with(vec![bound(symbol, &["b", "a", "b"])]);

        assert_eq!(provider.values::<String>("--tag").unwrap(), vec!["b", "a", "b"]);
        assert_eq!(provider.value_hash_set::<String>("--tag").unwrap().len(), 2);
        let sorted: Vec<String> =
            provider.value_btree_set::<String>("--tag").unwrap().into_iter().collect();
        assert_eq!(sorted, vec!["a", "b"]);
    }

    #[test]
    fn test_lookup_by_inferred_name_and_spelling_variants() {
        let symbol = BindingSymbol::switch("--skip-duplicates").build();
        let provider = provider_with(vec![bound(symbol, &["true"])]);

        assert!(provider.value::<bool>("--skip-duplicates").unwrap());
        assert!(provider.value::<bool>("skipDuplicates").unwrap());
        assert!(provider.value::<bool>("skip-duplicates").unwrap());
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let provider = provider_with(Vec::new());
        let error = provider.value::<i32>("--missing").unwrap_err();
        assert_eq!(error.kind(), CommandLineErrorKind::InvalidArgument);
    }
}
