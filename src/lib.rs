//! clavis: a declarative command-line parsing and typed argument binding
//! library.
//!
//! A command tree declares options, switches, and positional arguments; raw
//! process arguments are tokenized, classified, and resolved against that
//! tree; handlers read strongly-typed values from a
//! [`MappedArgumentProvider`].
//!
//! ```
//! use clavis::{Arity, BindingSymbol, Command, Handler, invoke};
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! let root = Command::root().subcommand(
//!     Command::new("push")
//!         .binding(BindingSymbol::argument::<String>("root").arity(Arity::one()).build())
//!         .binding(BindingSymbol::switch("--skip-duplicates").build())
//!         .handler(Handler::sync(|provider, _| {
//!             let root: String = provider.value("root")?;
//!             let skip: bool = provider.value("--skip-duplicates")?;
//!             println!("pushing {root} (skip duplicates: {skip})");
//!             Ok(())
//!         })),
//! );
//!
//! let args = vec!["push".to_string(), "pkg.nupkg".to_string()];
//! let context = invoke(&root, args, Arc::new(AtomicBool::new(false)))?;
//! context.call()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
pub type CancellationToken = Arc<AtomicBool>;

pub mod constants;
pub mod core;
pub mod errors;
pub mod invocation;
pub mod models;

pub use crate::core::config_validator::{ConfigError, ensure_valid, validate};
pub use crate::core::provider::{FromArgument, MappedArgumentProvider, ValueBinding};
pub use crate::errors::{CommandLineError, CommandLineErrorKind};
pub use crate::invocation::{InvocationContext, invoke};
pub use crate::models::{
    Arity, BindingScope, BindingSymbol, Command, Handler, ModelBinder, SymbolBuilder, SymbolKind,
};
