//! Basic example of the Sandiq container.

use sandiq::prelude::*;
use sandiq::registration;
use std::sync::Arc;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct QuietLogger;

impl Logger for QuietLogger {
    fn log(&self, _msg: &str) {}
}

#[derive(Clone)]
struct Config {
    database_url: String,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserService {
    db: Arc<Database>,
    request_id: u64,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        let rows = self.db.query(&format!("SELECT * FROM users WHERE id = {id}"));
        format!("request #{}: {rows}", self.request_id)
    }
}

// === Declare registrations ===

trait AppDependencies {
    fn config(&self) -> Registration<'_, Config>;
    fn logger(&self) -> Registration<'_, Arc<dyn Logger>>;
    fn database(&self) -> Registration<'_, Arc<Database>>;
    fn request_id(&self) -> Registration<'_, u64>;
    fn user_service(&self) -> Registration<'_, Arc<UserService>>;
}

impl AppDependencies for Container {
    #[registration]
    fn config(&self) -> Registration<'_, Config> {
        |_| Config {
            database_url: "postgres://localhost/myapp".to_string(),
        }
    }

    #[registration]
    fn logger(&self) -> Registration<'_, Arc<dyn Logger>> {
        |_| Arc::new(ConsoleLogger) as Arc<dyn Logger>
    }

    #[registration]
    fn database(&self) -> Registration<'_, Arc<Database>> {
        |c| {
            Arc::new(Database {
                url: c.config().resolve().database_url,
                logger: c.logger().resolve(),
            })
        }
    }

    #[registration(unique)]
    fn request_id(&self) -> Registration<'_, u64> {
        |_| {
            use std::sync::atomic::{AtomicU64, Ordering};
            static NEXT: AtomicU64 = AtomicU64::new(1);
            NEXT.fetch_add(1, Ordering::Relaxed)
        }
    }

    #[registration(unique)]
    fn user_service(&self) -> Registration<'_, Arc<UserService>> {
        |c| {
            Arc::new(UserService {
                db: c.database().resolve(),
                request_id: c.request_id().resolve(),
            })
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("sandiq_container=debug")
        .init();

    // === Resolve from the process-wide container ===
    let service = Container::current().user_service().resolve();
    println!("👤 {}", service.get_user(42));

    // === Override inside a scope (e.g., for a test) ===
    Container::scoped(|scope| {
        scope
            .config()
            .use_factory(|_| Config {
                database_url: "sqlite::memory:".to_string(),
            });
        scope
            .logger()
            .use_factory(|_| Arc::new(QuietLogger) as Arc<dyn Logger>);

        // The cached database was built from the old config; it is rebuilt.
        let service = Container::current().user_service().resolve();
        println!("🧪 {}", service.get_user(7));
    });
    // scope left, the override is gone

    let service = Container::current().user_service().resolve();
    println!("👤 {}", service.get_user(7));

    // === Detached work gets a frozen copy ===
    let task = sandiq::spawn_detached(async {
        Container::current()
            .config()
            .use_factory(|_| Config {
                database_url: "postgres://replica/myapp".to_string(),
            });
        Container::current().user_service().resolve().get_user(1)
    });

    match task.await {
        Ok(result) => println!("🛰  {result}"),
        Err(error) => tracing::error!(%error, "Detached task failed"),
    }

    println!("{:?}", Container::current());
    println!("\n🎉 Everything works!");
}
