use crate::hooks::CommandRegistrar;
use crate::{Error, Promise};
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolved with the invoking client and the command arguments.
pub type CommandPromise<C> = Promise<(C, Vec<String>)>;

/// Turns command hooks into a [`CommandPromise`].
#[derive(Debug)]
pub struct CommandListener<R> {
    registrar: Arc<R>,
}

impl<R> Clone for CommandListener<R> {
    fn clone(&self) -> Self {
        Self {
            registrar: self.registrar.clone(),
        }
    }
}

impl<R> CommandListener<R>
where
    R: CommandRegistrar,
    R::Client: Clone + Send + 'static,
{
    pub fn new(registrar: Arc<R>) -> Self {
        Self { registrar }
    }

    /// Fails with [`Error::MissingRegistrar`] when no registrar is given.
    pub fn try_new(registrar: Option<Arc<R>>) -> Result<Self, Error> {
        registrar
            .map(Self::new)
            .ok_or(Error::MissingRegistrar("command registrar"))
    }

    /// Hooks every command in `commands` and returns the one promise they all
    /// resolve.
    ///
    /// The promise is resolved each time any of the commands is typed, with the
    /// client and the arguments. Missing arguments arrive as an empty list.
    pub fn on<I>(&self, commands: I) -> CommandPromise<R::Client>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let promise = CommandPromise::<R::Client>::new();
        for command in commands {
            let command = command.as_ref();
            debug!(command, "hooking command");
            let target = promise.clone();
            self.registrar.hook_command(
                command,
                Box::new(
                    move |client: &R::Client, command: &str, args: Option<&[String]>| {
                        trace!(command, "command fired");
                        let args = args.map(<[String]>::to_vec).unwrap_or_default();
                        target.resolve((client.clone(), args))
                    },
                ),
            );
        }
        promise
    }
}
