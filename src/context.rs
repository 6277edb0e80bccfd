//! # Request Context
//!
//! A `Context` is the explicit carrier that every operation in this crate
//! receives. It holds three kinds of request-scoped state:
//!
//! - **Values**: a typed key/value chain. Deriving a context with
//!   `with_value` shadows earlier bindings of the same key for the derived
//!   context and its descendants, while the parent is left untouched.
//! - **Cancellation**: explicit cancel handles and deadlines. A context is done
//!   as soon as it, or any context it was derived from, is done.
//! - **Cache scope**: the store in which expensive-call caches live. Derived
//!   contexts share their parent's scope unless `with_cache_scope` starts a
//!   fresh one. Two roots created with `Context::background()` never share a
//!   scope.
//!
//! Contexts are immutable. Every `with_*` method returns a new value, and
//! cloning is a handful of reference-count increments.
//!
//! ```
//! use std::time::Duration;
//! use provision_shell::context::Context;
//!
//! let root = Context::background();
//! let (ctx, handle) = root.with_cancel();
//! let bounded = ctx.with_timeout(Duration::from_secs(30));
//!
//! assert!(bounded.err().is_none());
//! handle.cancel();
//! assert!(bounded.is_done());
//! assert!(!root.is_done());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::CacheScope;
use crate::error::CancelReason;

type AnyValue = Arc<dyn Any + Send + Sync>;

struct ValueNode {
    key: &'static str,
    value: AnyValue,
    parent: Option<Arc<ValueNode>>,
}

struct CancelNode {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
    parent: Option<Arc<CancelNode>>,
}

/// Handle that cancels the context returned alongside it by
/// [`Context::with_cancel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the associated context and everything derived from it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel` has been called.
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Immutable, derivable carrier of request-scoped values, cancellation and
/// cache scope.
#[derive(Clone)]
pub struct Context {
    values: Option<Arc<ValueNode>>,
    cancel: Option<Arc<CancelNode>>,
    scope: Arc<CacheScope>,
}

impl Context {
    /// Create a root context with no values, no cancellation and its own
    /// empty cache scope.
    pub fn background() -> Self {
        Self {
            values: None,
            cancel: None,
            scope: Arc::new(CacheScope::default()),
        }
    }

    /// Derive a context carrying `value` under `key`.
    pub fn with_value<T>(&self, key: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            values: Some(Arc::new(ValueNode {
                key,
                value: Arc::new(value),
                parent: self.values.clone(),
            })),
            cancel: self.cancel.clone(),
            scope: Arc::clone(&self.scope),
        }
    }

    /// Look up the nearest value bound to `key`.
    ///
    /// Returns `None` when the key was never bound or when the nearest binding
    /// holds a different type.
    pub fn value<T>(&self, key: &'static str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let mut node = self.values.as_ref();
        while let Some(current) = node {
            if current.key == key {
                return Arc::clone(&current.value).downcast::<T>().ok();
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// Derive a cancelable context.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = self.with_cancel_node(Some(Arc::clone(&flag)), None);
        (ctx, CancelHandle { flag })
    }

    /// Derive a context that is done once `deadline` has passed.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.with_cancel_node(None, Some(deadline))
    }

    /// Derive a context that is done after `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with a fresh, empty cache scope.
    ///
    /// Values and cancellation are inherited; caches are not.
    pub fn with_cache_scope(&self) -> Self {
        Self {
            values: self.values.clone(),
            cancel: self.cancel.clone(),
            scope: Arc::new(CacheScope::default()),
        }
    }

    fn with_cancel_node(&self, flag: Option<Arc<AtomicBool>>, deadline: Option<Instant>) -> Self {
        Self {
            values: self.values.clone(),
            cancel: Some(Arc::new(CancelNode {
                flag,
                deadline,
                parent: self.cancel.clone(),
            })),
            scope: Arc::clone(&self.scope),
        }
    }

    /// Why this context is done, or `None` while it is still live.
    ///
    /// Explicit cancellation anywhere in the chain wins over an expired
    /// deadline.
    pub fn err(&self) -> Option<CancelReason> {
        let now = Instant::now();
        let mut expired = false;
        let mut node = self.cancel.as_ref();
        while let Some(current) = node {
            if current
                .flag
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::SeqCst))
            {
                return Some(CancelReason::Canceled);
            }
            if current.deadline.is_some_and(|deadline| deadline <= now) {
                expired = true;
            }
            node = current.parent.as_ref();
        }
        expired.then_some(CancelReason::DeadlineExceeded)
    }

    /// Whether the context has been canceled or has expired.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Whether this context can ever become done, i.e. it or an ancestor has
    /// a cancel handle or a deadline.
    pub fn is_cancelable(&self) -> bool {
        self.cancel.is_some()
    }

    /// The earliest deadline in the chain, if any.
    pub fn deadline(&self) -> Option<Instant> {
        let mut earliest: Option<Instant> = None;
        let mut node = self.cancel.as_ref();
        while let Some(current) = node {
            if let Some(deadline) = current.deadline {
                earliest = Some(earliest.map_or(deadline, |e| e.min(deadline)));
            }
            node = current.parent.as_ref();
        }
        earliest
    }

    pub(crate) fn cache_scope(&self) -> &CacheScope {
        &self.scope
    }

    /// Whether two contexts share one cache scope.
    pub fn shares_cache_scope(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.scope, &other.scope)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut node = self.values.as_ref();
        while let Some(current) = node {
            keys.push(current.key);
            node = current.parent.as_ref();
        }
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("done", &self.err())
            .field("deadline", &self.deadline())
            .finish()
    }
}
