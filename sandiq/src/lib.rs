//! # Sandiq: scope-forking dependency container for Rust
//!
//! Registrations are declared once, next to the code that owns them, and
//! resolved lazily through the ambient container. Tests and experiments
//! override them inside [`Container::scoped`] without touching anyone else.
//!
//! ```rust
//! use sandiq::prelude::*;
//! use sandiq::registration;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! struct Arabic;
//! impl Greeter for Arabic {
//!     fn greet(&self) -> String { "marhaba".into() }
//! }
//!
//! trait AppDependencies {
//!     fn greeter(&self) -> Registration<'_, Arc<dyn Greeter>>;
//! }
//!
//! impl AppDependencies for Container {
//!     #[registration]
//!     fn greeter(&self) -> Registration<'_, Arc<dyn Greeter>> {
//!         |_| Arc::new(English) as Arc<dyn Greeter>
//!     }
//! }
//!
//! let scoped = Container::scoped(|c| {
//!     c.greeter().use_factory(|_| Arc::new(Arabic) as Arc<dyn Greeter>);
//!     Container::current().greeter().resolve().greet()
//! });
//!
//! assert_eq!(scoped, "marhaba");
//! assert_eq!(Container::current().greeter().resolve().greet(), "hello");
//! ```

pub use sandiq_container::*;
pub use sandiq_macros::registration;
pub use sandiq_support::*;
