//! Context core module - the per-request execution cursor.
//!
//! Both context flavours share the same run loop:
//!
//! 1. resolve the handler at the cursor and invoke it,
//! 2. hand its return values to the context's return-value protocol,
//! 3. advance the cursor,
//! 4. end the loop once the response is written or the context is stopped.
//!
//! A handler may call [`Ctx::next`] to run the rest of the chain before its own
//! post-processing. The loop does not require it: handlers after one that
//! returns without calling `next` still run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::response::Response;
use crate::error::DispatchError;
use crate::handler::BoxedHandler;
use crate::injector::Injector;
use crate::protocol::{MiddlewareReturnHandler, RouteReturnHandler};

/// Chain cursor control shared by the request-level and route-level contexts.
pub trait Context {
    /// Advance past the current handler and run the remainder of the chain.
    fn next(self: Rc<Self>) -> Result<(), DispatchError>;

    /// Skip every handler after the current one.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Whether the shared response has been written.
    fn written(&self) -> bool;

    /// State shared by every context of the request.
    fn scope(&self) -> &Rc<RequestScope>;
}

/// Per-request state shared between the request context and any nested
/// route context: the request container and the response tracker.
pub struct RequestScope {
    injector: RefCell<Injector>,
    response: Response,
}

impl RequestScope {
    /// Create a request container reading through to the server's container.
    #[must_use]
    pub fn new(parent: Arc<Injector>) -> Rc<Self> {
        Rc::new(Self {
            injector: RefCell::new(Injector::with_parent(parent)),
            response: Response::new(),
        })
    }

    /// Map a request-scoped value.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.injector.borrow_mut().insert(value);
    }

    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.injector.borrow().get::<T>()
    }

    #[must_use]
    pub fn response(&self) -> Response {
        self.response.clone()
    }

    fn middleware_protocol(&self) -> MiddlewareReturnHandler {
        self.get::<MiddlewareReturnHandler>().unwrap_or_default()
    }

    fn route_protocol(&self) -> RouteReturnHandler {
        self.get::<RouteReturnHandler>().unwrap_or_default()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("injector", &self.injector.borrow())
            .field("written", &self.response.written())
            .finish()
    }
}

/// Cursor over `slots` runnable positions.
///
/// Positions `0..slots` are runnable, `slots` is the stopped terminal. The
/// cursor starts at `-1` for contexts driven through `next()`.
#[derive(Debug)]
struct Cursor {
    index: Cell<isize>,
    slots: isize,
}

impl Cursor {
    fn new(start: isize, slots: usize) -> Self {
        Self {
            index: Cell::new(start),
            slots: isize::try_from(slots).unwrap_or(isize::MAX),
        }
    }

    fn position(&self) -> isize {
        self.index.get()
    }

    fn advance(&self) {
        let next = self.index.get().saturating_add(1).min(self.slots);
        self.index.set(next);
    }

    fn stop(&self) {
        self.index.set(self.slots);
    }

    fn is_stopped(&self) -> bool {
        self.index.get() >= self.slots
    }
}

/// Top-level context: global middleware followed by the terminal action.
///
/// The cursor ranges over `[-1, len + 1]`; `len` selects the action and
/// `len + 1` is the stopped state.
pub struct RequestContext {
    scope: Rc<RequestScope>,
    handlers: Arc<[BoxedHandler]>,
    action: BoxedHandler,
    cursor: Cursor,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        scope: Rc<RequestScope>,
        handlers: Arc<[BoxedHandler]>,
        action: BoxedHandler,
    ) -> Rc<Self> {
        let slots = handlers.len() + 1;
        Rc::new(Self {
            scope,
            handlers,
            action,
            cursor: Cursor::new(-1, slots),
        })
    }

    fn handler(&self) -> Result<&BoxedHandler, DispatchError> {
        let index = self.cursor.position();
        let len = self.handlers.len();
        match usize::try_from(index) {
            Ok(i) if i < len => Ok(&self.handlers[i]),
            Ok(i) if i == len => Ok(&self.action),
            _ => Err(DispatchError::CursorOutOfRange { index, len }),
        }
    }

    fn run(self: &Rc<Self>) -> Result<(), DispatchError> {
        let ctx = Ctx::new(self);
        while !self.cursor.is_stopped() {
            let values = self.handler()?.invoke(&ctx)?;
            self.scope.middleware_protocol().handle(&ctx, values)?;
            self.cursor.advance();

            if self.written() || self.cursor.is_stopped() {
                break;
            }
        }
        Ok(())
    }
}

impl Context for RequestContext {
    fn next(self: Rc<Self>) -> Result<(), DispatchError> {
        self.cursor.advance();
        self.run()
    }

    fn stop(&self) {
        self.cursor.stop();
    }

    fn is_stopped(&self) -> bool {
        self.cursor.is_stopped()
    }

    fn written(&self) -> bool {
        self.scope.response.written()
    }

    fn scope(&self) -> &Rc<RequestScope> {
        &self.scope
    }
}

/// Route-scoped context over a matched route's chain (or the not-found chain).
///
/// Shares the request scope with the request context but owns its cursor, so
/// stopping it never stops the enclosing middleware chain.
pub struct RouteContext {
    scope: Rc<RequestScope>,
    handlers: Arc<[BoxedHandler]>,
    cursor: Cursor,
}

impl RouteContext {
    #[must_use]
    pub fn new(scope: Rc<RequestScope>, handlers: Arc<[BoxedHandler]>) -> Rc<Self> {
        let slots = handlers.len();
        Rc::new(Self {
            scope,
            handlers,
            cursor: Cursor::new(0, slots),
        })
    }

    /// Run the chain from its first handler.
    pub fn start(self: &Rc<Self>) -> Result<(), DispatchError> {
        self.run()
    }

    fn run(self: &Rc<Self>) -> Result<(), DispatchError> {
        let ctx = Ctx::new(self);
        while !self.cursor.is_stopped() {
            let index = self.cursor.position();
            let handler = usize::try_from(index)
                .ok()
                .and_then(|i| self.handlers.get(i))
                .ok_or(DispatchError::CursorOutOfRange {
                    index,
                    len: self.handlers.len(),
                })?;
            let values = handler.invoke(&ctx)?;
            self.scope.route_protocol().handle(&ctx, values)?;
            self.cursor.advance();

            if self.written() || self.cursor.is_stopped() {
                break;
            }
        }
        Ok(())
    }
}

impl Context for RouteContext {
    fn next(self: Rc<Self>) -> Result<(), DispatchError> {
        self.cursor.advance();
        self.run()
    }

    fn stop(&self) {
        self.cursor.stop();
    }

    fn is_stopped(&self) -> bool {
        self.cursor.is_stopped()
    }

    fn written(&self) -> bool {
        self.scope.response.written()
    }

    fn scope(&self) -> &Rc<RequestScope> {
        &self.scope
    }
}

/// Handle to the context running a handler.
///
/// Resolvable as a handler argument. Cloning is cheap; all clones drive the
/// same cursor.
#[derive(Clone)]
pub struct Ctx(Rc<dyn Context>);

impl Ctx {
    pub(crate) fn new<C: Context + 'static>(context: &Rc<C>) -> Self {
        Ctx(Rc::clone(context) as Rc<dyn Context>)
    }

    /// Run the remainder of the chain now, then return to the caller.
    pub fn next(&self) -> Result<(), DispatchError> {
        Rc::clone(&self.0).next()
    }

    pub fn stop(&self) {
        self.0.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_stopped()
    }

    pub fn written(&self) -> bool {
        self.0.written()
    }

    /// Map a value into the request container for later handlers.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.0.scope().insert(value);
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.0.scope().get::<T>()
    }

    pub fn response(&self) -> Response {
        self.0.scope().response()
    }

    pub fn scope(&self) -> &Rc<RequestScope> {
        self.0.scope()
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("stopped", &self.is_stopped())
            .field("written", &self.written())
            .finish()
    }
}
