//! Positional callbacks over argument tuples.
//!
//! A promise is generic over an ordered tuple of resolved values. This module
//! lets a plain closure taking those values positionally stand in for a
//! callback over the tuple, so `Promise<(A, B)>` accepts `|a: A, b: B| ...`.
//!
use crate::BoxError;

/// A resolution handler for the argument tuple `Args`.
///
/// Implemented for every `FnMut` closure of zero to three arguments that
/// returns `Result<(), BoxError>`. An `Err` is what a "throwing" handler looks
/// like here: the promise turns it into a rejection.
pub trait Callback<Args>: Send + 'static {
    fn call(&mut self, args: Args) -> Result<(), BoxError>;
}

/// A rejection handler. Receives the rejection reason by value.
///
/// A catch handler may fail too; what happens then depends on the promise's
/// settlement policy.
pub trait Catch: Send + 'static {
    fn call(&mut self, reason: BoxError) -> Result<(), BoxError>;
}

impl<F> Catch for F
where
    F: FnMut(BoxError) -> Result<(), BoxError> + Send + 'static,
{
    fn call(&mut self, reason: BoxError) -> Result<(), BoxError> {
        self(reason)
    }
}

macro_rules! impl_callback {
    ($($arg:ident),*) => {
        impl<Func, $($arg,)*> Callback<($($arg,)*)> for Func
        where
            Func: FnMut($($arg),*) -> Result<(), BoxError> + Send + 'static,
        {
            #[allow(non_snake_case)]
            fn call(&mut self, ($($arg,)*): ($($arg,)*)) -> Result<(), BoxError> {
                self($($arg),*)
            }
        }
    };
}

impl_callback!();
impl_callback!(A);
impl_callback!(A, B);
impl_callback!(A, B, C);
