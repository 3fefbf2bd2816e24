//! The promise state machine.
//!
//! A promise is a handle to two slots, one resolution handler and one
//! rejection handler. Clones share the slots, so the hook that resolves a
//! promise and the caller that chains `then`/`catch` on it see the same
//! handlers. Nothing is stored between resolutions.
//!
use crate::callback::{Callback, Catch};
use crate::{BoxError, Error};
use parking_lot::{Mutex, ReentrantMutex};
use std::{any::Any, cell::RefCell, fmt, marker::PhantomData, sync::Arc};
use tracing::{debug, error, trace};

/// How a promise settles when its handlers are missing or fail.
///
/// | policy     | `resolve` with no then | then fails                 | catch fails            |
/// |------------|------------------------|----------------------------|------------------------|
/// | [`Typed`]  | no-op                  | [`Promise::reject`]        | [`Error::Handler`]     |
/// | [`Legacy`] | [`Error::MissingThen`] | catch, else unhandled      | unhandled rejection    |
///
/// `reject` behaves the same under both: no catch handler is an unhandled
/// rejection, and a failing catch handler surfaces as [`Error::Handler`].
pub trait Settlement: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    const STRICT: bool;
}

/// Settlement of the typed promises: a missing then handler is ignored.
#[derive(Debug)]
pub enum Typed {}

/// Settlement of the untyped promise handed out by the trade listener.
#[derive(Debug)]
pub enum Legacy {}

impl Settlement for Typed {
    const STRICT: bool = false;
}

impl Settlement for Legacy {
    const STRICT: bool = true;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Typed {}
    impl Sealed for super::Legacy {}
}

/// A type-erased resolved value, downcast by the receiver.
pub type Value = Arc<dyn Any + Send + Sync>;

pub type Promise0<S = Typed> = Promise<(), S>;
pub type Promise1<A, S = Typed> = Promise<(A,), S>;
pub type Promise2<A, B, S = Typed> = Promise<(A, B), S>;
pub type Promise3<A, B, C, S = Typed> = Promise<(A, B, C), S>;

/// A promise resolved with a list of untyped values.
pub type UntypedPromise = Promise<(Vec<Value>,), Legacy>;

// The reentrant lock queues other threads; the `RefCell` catches the owning
// thread coming back into a handler that is still running.
type ThenSlot<Args> = Arc<ReentrantMutex<RefCell<Box<dyn Callback<Args>>>>>;
type CatchSlot = Arc<ReentrantMutex<RefCell<Box<dyn Catch>>>>;

struct Slots<Args> {
    then: Option<ThenSlot<Args>>,
    catch: Option<CatchSlot>,
}

/// A reusable promise over the argument tuple `Args`.
///
/// Handlers are replaced, never accumulated: the last `then` and the last
/// `catch` win. The slot lock is released before a handler runs, so a handler
/// may re-register handlers on its own promise. A then handler resolving its
/// own promise, or a catch handler rejecting it, gets [`Error::Reentrant`]
/// back instead of recursing into itself.
///
/// # Examples
///
/// ```
/// use hook_promise::{BoxError, Error, Promise};
///
/// let promise = Promise::<(String, u8)>::new()
///     .then(|name: String, n: u8| -> Result<(), BoxError> {
///         Err(format!("{} rolled {}", name, n).into())
///     });
///
/// // A failing then handler with no catch handler is an unhandled rejection.
/// let err = promise.resolve(("ana".to_string(), 3)).unwrap_err();
/// assert!(matches!(err, Error::UnhandledRejection { .. }));
/// ```
pub struct Promise<Args, S = Typed> {
    slots: Arc<Mutex<Slots<Args>>>,
    _settlement: PhantomData<fn() -> S>,
}

impl<Args: 'static, S: Settlement> Promise<Args, S> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                then: None,
                catch: None,
            })),
            _settlement: PhantomData,
        }
    }

    /// Sets the handler invoked on every resolution, replacing any previous one.
    pub fn then<H>(self, handler: H) -> Self
    where
        H: Callback<Args>,
    {
        let mut slots = self.slots.lock();
        if slots.then.is_some() {
            trace!("replacing then handler");
        }
        let handler: Box<dyn Callback<Args>> = Box::new(handler);
        slots.then = Some(Arc::new(ReentrantMutex::new(RefCell::new(handler))));
        drop(slots);
        self
    }

    /// Sets the handler invoked on rejection, replacing any previous one.
    pub fn catch<H>(self, handler: H) -> Self
    where
        H: Catch,
    {
        let mut slots = self.slots.lock();
        if slots.catch.is_some() {
            trace!("replacing catch handler");
        }
        let handler: Box<dyn Catch> = Box::new(handler);
        slots.catch = Some(Arc::new(ReentrantMutex::new(RefCell::new(handler))));
        drop(slots);
        self
    }

    /// Whether a then handler is registered. Hosts can check this before
    /// firing a legacy promise, which faults without one.
    pub fn has_then(&self) -> bool {
        self.slots.lock().then.is_some()
    }

    /// Whether a catch handler is registered, i.e. the chain ends in `.catch`
    /// and a rejection will not surface as [`Error::UnhandledRejection`].
    pub fn has_catch(&self) -> bool {
        self.slots.lock().catch.is_some()
    }

    /// Runs the then handler with `args`.
    ///
    /// A failure of the then handler never escapes as is: it becomes a
    /// rejection, and only what the rejection path yields is returned. See
    /// [`Settlement`] for what happens when no then handler is set.
    pub fn resolve(&self, args: Args) -> Result<(), Error> {
        let then = self.slots.lock().then.clone();
        let then = match then {
            Some(then) => then,
            None if S::STRICT => {
                error!("resolved a promise without a then handler");
                return Err(Error::MissingThen);
            }
            None => {
                debug!("resolution dropped, no then handler");
                return Ok(());
            }
        };

        trace!("resolving promise");
        let guard = then.lock();
        let outcome = match guard.try_borrow_mut() {
            Ok(mut callback) => callback.call(args),
            Err(_) => return Err(reentrant("then")),
        };
        drop(guard);
        match outcome {
            Ok(()) => Ok(()),
            Err(reason) if S::STRICT => self.fall_back(reason),
            Err(reason) => self.reject(reason),
        }
    }

    /// Runs the catch handler with `reason`.
    ///
    /// Without a catch handler this is an [`Error::UnhandledRejection`]. An
    /// error from the catch handler is returned unchanged as [`Error::Handler`].
    pub fn reject(&self, reason: impl Into<BoxError>) -> Result<(), Error> {
        let reason = reason.into();
        let catch = self.slots.lock().catch.clone();
        match catch {
            Some(catch) => {
                trace!(%reason, "rejecting promise");
                let outcome = call_catch(&catch, reason)?;
                outcome.map_err(Error::Handler)
            }
            None => Err(unhandled(reason)),
        }
    }

    fn fall_back(&self, reason: BoxError) -> Result<(), Error> {
        let catch = self.slots.lock().catch.clone();
        let Some(catch) = catch else {
            return Err(unhandled(reason));
        };
        let outcome = call_catch(&catch, reason)?;
        outcome.map_err(unhandled)
    }
}

impl<Args: 'static> Promise<Args, Legacy> {
    /// Same as [`Promise::resolve`]; a then handler must be registered.
    pub fn invoke_then(&self, args: Args) -> Result<(), Error> {
        self.resolve(args)
    }

    /// Same as [`Promise::reject`].
    pub fn invoke_catch(&self, reason: impl Into<BoxError>) -> Result<(), Error> {
        self.reject(reason)
    }
}

fn call_catch(catch: &CatchSlot, reason: BoxError) -> Result<Result<(), BoxError>, Error> {
    let guard = catch.lock();
    let mut callback = guard.try_borrow_mut().map_err(|_| reentrant("catch"))?;
    Ok(callback.call(reason))
}

fn reentrant(handler: &'static str) -> Error {
    error!(handler, "handler re-entered its own promise");
    Error::Reentrant(handler)
}

fn unhandled(reason: BoxError) -> Error {
    error!(%reason, "unhandled promise rejection");
    Error::UnhandledRejection { reason }
}

impl<Args: 'static, S: Settlement> Default for Promise<Args, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, S> Clone for Promise<Args, S> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            _settlement: PhantomData,
        }
    }
}

impl<Args, S> fmt::Debug for Promise<Args, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("Promise")
            .field("then", &slots.then.is_some())
            .field("catch", &slots.catch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (hits.clone(), hits)
    }

    #[test]
    fn test_resolve_without_then_is_noop() {
        let promise = Promise1::<i32>::new();
        assert!(promise.resolve((1,)).is_ok());
    }

    #[test]
    fn test_legacy_resolve_without_then_faults() {
        let promise = Promise1::<i32, Legacy>::new();
        assert!(matches!(promise.resolve((1,)), Err(Error::MissingThen)));
        assert!(matches!(promise.invoke_then((1,)), Err(Error::MissingThen)));
    }

    #[test]
    fn test_resolve_repeats() {
        let (hits, seen) = counter();
        let promise = Promise0::<Typed>::new().then(move || -> Result<(), BoxError> {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        for _ in 0..3 {
            promise.resolve(()).unwrap();
        }
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_reject_without_catch_is_unhandled() {
        let promise = Promise0::<Typed>::new();
        let err = promise.reject("nobody listens").unwrap_err();
        assert!(err.is_unhandled_rejection());
        assert_eq!(err.to_string(), "unhandled promise rejection: nobody listens");
    }

    #[test]
    fn test_catch_failure_propagates_unwrapped() {
        let promise = Promise0::<Typed>::new()
            .catch(|_: BoxError| -> Result<(), BoxError> { Err("catch broke".into()) });
        match promise.reject("first") {
            Err(Error::Handler(inner)) => assert_eq!(inner.to_string(), "catch broke"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_typed_then_failure_with_failing_catch() {
        let promise = Promise1::<u8>::new()
            .then(|_: u8| -> Result<(), BoxError> { Err("then broke".into()) })
            .catch(|_: BoxError| -> Result<(), BoxError> { Err("catch broke".into()) });
        assert!(matches!(promise.resolve((0,)), Err(Error::Handler(_))));
    }

    #[test]
    fn test_legacy_then_failure_with_failing_catch() {
        let promise = Promise1::<u8, Legacy>::new()
            .then(|_: u8| -> Result<(), BoxError> { Err("then broke".into()) })
            .catch(|_: BoxError| -> Result<(), BoxError> { Err("catch broke".into()) });
        let err = promise.invoke_then((0,)).unwrap_err();
        assert!(err.is_unhandled_rejection());
    }

    #[test]
    fn test_legacy_then_failure_handled() {
        let (hits, seen) = counter();
        let promise = Promise1::<u8, Legacy>::new()
            .then(|_: u8| -> Result<(), BoxError> { Err("then broke".into()) })
            .catch(move |reason: BoxError| -> Result<(), BoxError> {
                assert_eq!(reason.to_string(), "then broke");
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        promise.invoke_then((0,)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_replace_itself() {
        let (hits, seen) = counter();
        let promise = Promise0::<Typed>::new();
        let handle = promise.clone();
        let promise = promise.then(move || -> Result<(), BoxError> {
            let hits = hits.clone();
            let _ = handle.clone().then(move || -> Result<(), BoxError> {
                hits.fetch_add(10, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        });
        promise.resolve(()).unwrap();
        promise.resolve(()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_resolve_from_own_then_is_reentrant() {
        let inner = Arc::new(Mutex::new(None));
        let slot = inner.clone();
        let promise = Promise1::<u32>::new();
        let handle = promise.clone();
        let promise = promise.then(move |n: u32| -> Result<(), BoxError> {
            *slot.lock() = Some(handle.resolve((n + 1,)));
            Ok(())
        });
        promise.resolve((1,)).unwrap();
        assert!(matches!(inner.lock().take(), Some(Err(Error::Reentrant("then")))));
    }

    #[test]
    fn test_reject_from_own_catch_is_reentrant() {
        let promise = Promise0::<Typed>::new();
        let handle = promise.clone();
        let promise = promise.catch(move |reason: BoxError| -> Result<(), BoxError> {
            handle.reject(reason).map_err(BoxError::from)
        });
        match promise.reject("loop") {
            Err(Error::Handler(inner)) => {
                assert!(matches!(inner.downcast_ref::<Error>(), Some(Error::Reentrant("catch"))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_legacy_then_failure_without_catch() {
        let promise = Promise1::<u8, Legacy>::new()
            .then(|_: u8| -> Result<(), BoxError> { Err("then broke".into()) });
        match promise.invoke_then((0,)) {
            Err(Error::UnhandledRejection { reason }) => assert_eq!(reason.to_string(), "then broke"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_debug_shows_slots() {
        let promise = Promise0::<Typed>::new().then(|| -> Result<(), BoxError> { Ok(()) });
        assert_eq!(format!("{:?}", promise), "Promise { then: true, catch: false }");
    }
}
