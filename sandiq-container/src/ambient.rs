//! The ambient container and scopes.
//!
//! Code that resolves "the current container" gets:
//! 1. the container installed by the innermost active scope on this
//!    thread, or by the future being polled, if any;
//! 2. otherwise the process-wide default, [`Container::global`].
//!
//! [`Container::scoped`] and [`Container::scoped_async`] fork the ambient
//! container and install the fork for the duration of some work. Everything
//! that runs *inside* that work sees the fork: nested calls, futures polled
//! as part of it (`.await`, `tokio::join!`), threads handed the fork with
//! [`Container::enter`]. Work that is scheduled independently decides for
//! itself: [`spawn`] shares the spawner's container, [`spawn_detached`]
//! takes a frozen copy.
//!
//! # Examples
//! ```rust
//! use sandiq_container::prelude::*;
//!
//! fn greeting(c: &Container) -> Registration<'_, String> {
//!     Registration::new(c, "greeting", |_| String::from("hello"))
//! }
//!
//! let inside = Container::scoped(|scope| {
//!     greeting(scope).use_factory(|_| String::from("salaam"));
//!     greeting(&Container::current()).resolve()
//! });
//!
//! assert_eq!(inside, "salaam");
//! assert_eq!(greeting(&Container::current()).resolve(), "hello");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use once_cell::sync::Lazy;
use tracing::{debug, instrument};

use crate::container::Container;

static GLOBAL: Lazy<Arc<Container>> = Lazy::new(|| {
    debug!("Created process-wide container");
    Arc::new(Container::new())
});

thread_local! {
    static AMBIENT: RefCell<Option<Arc<Container>>> = const { RefCell::new(None) };
}

/// Installs a container as ambient and puts the previous one back on drop.
struct AmbientGuard {
    previous: Option<Arc<Container>>,
}

impl AmbientGuard {
    fn install(container: Arc<Container>) -> Self {
        let previous = AMBIENT.with(|slot| slot.replace(Some(container)));
        Self { previous }
    }
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot is gone during thread teardown; nothing left to restore.
        let _ = AMBIENT.try_with(|slot| slot.replace(previous));
    }
}

impl Container {
    /// The process-wide default container.
    ///
    /// Created on first access and never dropped.
    pub fn global() -> Arc<Container> {
        Arc::clone(&GLOBAL)
    }

    /// The ambient container: the innermost active scope's container, or
    /// [`Container::global`] outside of any scope.
    pub fn current() -> Arc<Container> {
        AMBIENT
            .with(|slot| slot.borrow().clone())
            .unwrap_or_else(Container::global)
    }

    /// Runs `work` with this container installed as ambient.
    ///
    /// The container is shared, not copied: whatever `work` does through
    /// [`Container::current`] happens to `self`. Use this to carry a scope
    /// into threads that the scope waits for.
    ///
    /// ```rust
    /// use sandiq_container::prelude::*;
    ///
    /// fn name(c: &Container) -> Registration<'_, String> {
    ///     Registration::new(c, "name", |_| String::from("global"))
    /// }
    ///
    /// Container::scoped(|scope| {
    ///     name(scope).use_factory(|_| String::from("scoped"));
    ///     std::thread::scope(|threads| {
    ///         threads.spawn(|| {
    ///             scope.enter(|| assert_eq!(name(&Container::current()).resolve(), "scoped"));
    ///         });
    ///     });
    /// });
    /// ```
    pub fn enter<R>(self: &Arc<Self>, work: impl FnOnce() -> R) -> R {
        let _guard = AmbientGuard::install(Arc::clone(self));
        work()
    }

    /// Runs `work` in a fork of the ambient container.
    ///
    /// The fork starts with the ambient container's factories, cache and
    /// dependency graph. It is ambient while `work` runs and is passed to
    /// it. When `work` returns, or panics, the previous ambient container is
    /// restored untouched.
    #[instrument(level = "debug", skip_all, name = "container_scope")]
    pub fn scoped<R>(work: impl FnOnce(&Arc<Container>) -> R) -> R {
        let forked = Arc::new(Container::current().fork());
        debug!("Entered scope");
        let result = forked.enter(|| work(&forked));
        debug!("Left scope");
        result
    }

    /// Async version of [`Container::scoped`].
    ///
    /// The fork is taken when this is called, from the container that is
    /// ambient at that moment, not when the returned future is first polled.
    /// A scope built outside a [`WithContainer`] and awaited inside it forks
    /// the outer container. Call `scoped_async` inside the async block that
    /// should be its parent.
    ///
    /// The returned future installs the fork around every poll, so futures
    /// awaited or joined inside `work` are part of the scope.
    pub fn scoped_async<F, Fut>(work: F) -> WithContainer<Fut>
    where
        F: FnOnce(Arc<Container>) -> Fut,
        Fut: Future,
    {
        let forked = Arc::new(Container::current().fork());
        debug!("Entered async scope");
        let future = forked.enter(|| work(Arc::clone(&forked)));
        future.with_container(forked)
    }
}

// ═══════════════════════════════════════════
// Futures
// ═══════════════════════════════════════════

/// A future that runs with a container installed as ambient.
///
/// Created by [`ContainerFutureExt`] and [`Container::scoped_async`].
#[must_use = "futures do nothing unless polled"]
pub struct WithContainer<F> {
    container: Arc<Container>,
    inner: Pin<Box<F>>,
}

impl<F> WithContainer<F> {
    /// The container installed while this future is polled.
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }
}

impl<F: Future> Future for WithContainer<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let this = self.get_mut();
        let _guard = AmbientGuard::install(Arc::clone(&this.container));
        this.inner.as_mut().poll(cx)
    }
}

impl<F> fmt::Debug for WithContainer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithContainer")
            .field("container", &self.container)
            .finish()
    }
}

/// Attaches a container to a future.
pub trait ContainerFutureExt: Future + Sized {
    /// Runs this future with `container` as the ambient container.
    fn with_container(self, container: Arc<Container>) -> WithContainer<Self> {
        WithContainer {
            container,
            inner: Box::pin(self),
        }
    }

    /// Runs this future with the container that is ambient *now*, wherever
    /// it is polled later.
    fn in_current_container(self) -> WithContainer<Self> {
        self.with_container(Container::current())
    }
}

impl<F: Future> ContainerFutureExt for F {}

// ═══════════════════════════════════════════
// Spawning
// ═══════════════════════════════════════════

/// Spawns a tokio task that shares the ambient container.
///
/// Overrides made by the task are visible to the spawner and the other way
/// round, for as long as both use the container.
#[cfg(feature = "async")]
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future.in_current_container())
}

/// Spawns a tokio task that runs in a frozen copy of the ambient container.
///
/// The copy is taken here, at spawn time. Later changes made by the spawner
/// are not seen by the task, and the task's changes stay inside it.
///
/// Without tokio, the same effect for a thread is
/// `Arc::new(Container::current().fork())` moved into the thread and entered
/// with [`Container::enter`].
#[cfg(feature = "async")]
pub fn spawn_detached<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let frozen = Arc::new(Container::current().fork());
    debug!("Spawning detached task");
    tokio::spawn(future.with_container(frozen))
}
