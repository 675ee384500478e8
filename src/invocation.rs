// src/invocation.rs

use std::sync::Arc;

use anyhow::anyhow;

use crate::CancellationToken;
use crate::core::pipeline;
use crate::core::provider::MappedArgumentProvider;
use crate::errors::CommandLineError;
use crate::models::{Command, Handler};

/// The result of binding raw arguments against a command tree: the matched
/// command, its handler, the cancellation token, and the typed argument
/// surface the handler reads from.
pub struct InvocationContext {
    command_id: String,
    handler: Handler,
    cancellation_token: CancellationToken,
    provider: Arc<MappedArgumentProvider>,
}

impl InvocationContext {
    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn provider(&self) -> &MappedArgumentProvider {
        &self.provider
    }

    /// Invokes a synchronous handler. Asynchronous handlers must go through
    /// [`Self::call_async`]; the library itself carries no runtime.
    pub fn call(&self) -> anyhow::Result<()> {
        match &self.handler {
            Handler::Sync(handler) => handler(&self.provider, &self.cancellation_token),
            Handler::Async(_) => {
                Err(anyhow!("command '{}' has an asynchronous handler", self.command_id))
            }
        }
    }

    /// Invokes the handler, awaiting the asynchronous shape.
    pub async fn call_async(&self) -> anyhow::Result<()> {
        match &self.handler {
            Handler::Sync(handler) => handler(&self.provider, &self.cancellation_token),
            Handler::Async(handler) => {
                handler(Arc::clone(&self.provider), self.cancellation_token.clone()).await
            }
        }
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("command_id", &self.command_id)
            .field("handler", &self.handler)
            .finish()
    }
}

/// Runs the binding pipeline against `root` and finalizes the result into an
/// [`InvocationContext`]. The first failure at any stage aborts and
/// propagates; a matched command without a handler is an invalid command.
pub fn invoke(
    root: &Command,
    args: Vec<String>,
    cancellation_token: CancellationToken,
) -> Result<InvocationContext, CommandLineError> {
    log::debug!("binding {} raw argument(s)", args.len());

    let context = pipeline::run(root, args)?;
    let subject = context.leaf();

    let Some(handler) = subject.handler_ref().cloned() else {
        let mut expected: Vec<String> = subject
            .children()
            .iter()
            .map(|child| child.identifiers().join(", "))
            .collect();
        expected.sort();

        return Err(CommandLineError::InvalidCommand {
            subject: subject.id().to_string(),
            expected,
        });
    };

    Ok(InvocationContext {
        command_id: subject.id().to_string(),
        handler,
        cancellation_token,
        provider: Arc::new(context.into_provider()),
    })
}

// MARK: --- UNIT TESTS ---
