//! Core container implementation for Sandiq.

pub mod accessor;
pub mod ambient;
pub mod container;
pub mod error;
pub mod graph;
pub mod key;
pub mod lifetime;
pub mod registration;
pub mod registry;

pub use accessor::{Declaration, Dynamic, Inject, LazyInject, WeakInject};
pub use ambient::{ContainerFutureExt, WithContainer};
pub use container::{Container, ContainerBuilder, prelude};
pub use error::{Result, SandiqError};
pub use key::Key;
pub use lifetime::Lifetime;
pub use registration::Registration;
pub use registry::Factory;

#[cfg(feature = "async")]
pub use ambient::{spawn, spawn_detached};
