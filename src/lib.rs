//! Reusable `then`/`catch` promises for callback-driven proxy hooks.
//!
//! A [`Promise`] holds at most one resolution handler and one rejection
//! handler. It is not a one-shot future: every time the underlying hook fires
//! the promise is resolved again, and each resolution is independent.
//! Registering a handler replaces the previous one.
//!
//! [`CommandListener`] and [`TradeListener`] subscribe to an external event
//! source (see [`hooks`]) and hand back a promise that the source drives.
//!
//! # Examples
//!
//! ```
//! use hook_promise::{BoxError, Promise};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let promise = Promise::<(i32,)>::new()
//!     .then(move |n: i32| -> Result<(), BoxError> {
//!         sink.lock().unwrap().push(n);
//!         Ok(())
//!     })
//!     .catch(|_reason: BoxError| -> Result<(), BoxError> { Ok(()) });
//!
//! promise.resolve((42,)).unwrap();
//! promise.resolve((43,)).unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![42, 43]);
//! ```
pub mod callback;
pub mod command;
pub mod hooks;
pub mod promise;
pub mod trade;

pub use callback::{Callback, Catch};
pub use command::{CommandListener, CommandPromise};
pub use hooks::{CommandHook, CommandRegistrar, PacketHook, PacketRegistrar, PacketType};
pub use promise::{
    Legacy, Promise, Promise0, Promise1, Promise2, Promise3, Settlement, Typed, UntypedPromise,
    Value,
};
pub use trade::{TradeEvent, TradeListener, UnknownTradeEvent};

/// What a failing handler hands back. Any `std::error::Error` converts into it
/// with `?` or `.into()`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rejection reached a promise with no catch handler, or a legacy
    /// promise could not hand a failed resolution to its catch handler.
    #[error("unhandled promise rejection: {reason}")]
    UnhandledRejection {
        #[source]
        reason: BoxError,
    },
    /// A legacy promise was resolved before a then handler was registered.
    #[error("then handler cannot be empty")]
    MissingThen,
    /// The catch handler itself failed.
    #[error(transparent)]
    Handler(BoxError),
    /// A handler resolved or rejected the promise it is running for.
    #[error("{0} handler re-entered its own promise")]
    Reentrant(&'static str),
    #[error("{0} cannot be null")]
    MissingRegistrar(&'static str),
}

impl Error {
    pub fn is_unhandled_rejection(&self) -> bool {
        matches!(self, Error::UnhandledRejection { .. })
    }
}
