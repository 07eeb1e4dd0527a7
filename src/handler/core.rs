use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::resolve::Resolve;
use super::returns::{IntoReturn, Returned};
use crate::context::Ctx;
use crate::error::DispatchError;

/// Declared shape of a registered handler, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Type names of the parameters, resolved left to right.
    pub params: Vec<&'static str>,
    /// Type name of the return value.
    pub returns: &'static str,
}

/// A callable whose arguments are resolved from the request's container.
///
/// Implemented for every `Fn(A1, .., An) -> R` (up to eight arguments) where
/// each argument implements [`Resolve`] and the return type implements
/// [`IntoReturn`]. `Args` only disambiguates the blanket implementations.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Resolve the arguments and invoke the callable.
    fn call(&self, ctx: &Ctx) -> Result<Returned, DispatchError>;

    fn signature(&self) -> Signature;
}

/// Object-safe form of a handler stored in a chain.
pub trait ErasedHandler: Send + Sync + 'static {
    fn invoke(&self, ctx: &Ctx) -> Result<Returned, DispatchError>;

    fn signature(&self) -> Signature;
}

struct HandlerFn<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedHandler for HandlerFn<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn invoke(&self, ctx: &Ctx) -> Result<Returned, DispatchError> {
        self.handler.call(ctx)
    }

    fn signature(&self) -> Signature {
        self.handler.signature()
    }
}

/// A type-erased, shareable handler.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    /// Erase a typed handler.
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        BoxedHandler(Arc::new(HandlerFn {
            handler,
            _args: PhantomData,
        }))
    }

    /// Wrap a hand-written [`ErasedHandler`].
    pub fn from_erased(handler: Arc<dyn ErasedHandler>) -> Self {
        BoxedHandler(handler)
    }

    pub fn invoke(&self, ctx: &Ctx) -> Result<Returned, DispatchError> {
        self.0.invoke(ctx)
    }

    pub fn signature(&self) -> Signature {
        self.0.signature()
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sig = self.signature();
        write!(f, "fn({}) -> {}", sig.params.join(", "), sig.returns)
    }
}

/// Build an ordered handler chain from heterogeneous callables.
///
/// ```rust,ignore
/// router.get("/users/:id", handlers![require_auth, load_user])?;
/// ```
#[macro_export]
macro_rules! handlers {
    () => {
        ::std::vec::Vec::<$crate::handler::BoxedHandler>::new()
    };
    ($($h:expr),+ $(,)?) => {
        ::std::vec![$($crate::handler::BoxedHandler::new($h)),+]
    };
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: Resolve,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, ctx: &Ctx) -> Result<Returned, DispatchError> {
                $(let $arg = $arg::resolve(ctx)?;)*
                (self)($($arg),*).into_return()
            }

            fn signature(&self) -> Signature {
                Signature {
                    params: vec![$(std::any::type_name::<$arg>()),*],
                    returns: std::any::type_name::<R>(),
                }
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
