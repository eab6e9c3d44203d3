//! Basic example of the Sanduq DI container.
//!
//! Run with `RUST_LOG=sanduq_container=debug` to see registration and
//! resolution events.

use sanduq::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

// === Define your traits and types ===

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

#[derive(Clone, Service)]
struct Config {
    greeting_target: String,
    verbose: bool,
}

#[derive(Default)]
struct RequestContext {
    id: AtomicU64,
}

#[derive(Clone, Service)]
struct GreetingHandler {
    greeter: Arc<dyn Greeter>,
    context: Arc<RequestContext>,
    config: Config,
}

impl GreetingHandler {
    fn handle(&self) -> String {
        let id = self.context.id.load(Ordering::SeqCst);
        let message = self.greeter.greet(&self.config.greeting_target);
        if self.config.verbose {
            format!("[request {id}] {message}")
        } else {
            message
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sanduq_container=info")),
        )
        .init();

    let mut services = ServiceCollection::new();
    services
        // Config: value-like, so Transient
        .register_factory::<Config, _>(Lifetime::Transient, |_| {
            Ok(Config {
                greeting_target: "world".to_string(),
                verbose: true,
            })
        })?
        // Greeter: one per application
        .register_coercion::<Arc<dyn Greeter>, Arc<EnglishGreeter>>(|g| g as Arc<dyn Greeter>)
        .register_func::<Arc<dyn Greeter>, Arc<EnglishGreeter>, _>(Lifetime::Singleton, |_| {
            Ok(Arc::new(EnglishGreeter))
        })?
        // RequestContext: one per scope
        .register_type::<Arc<RequestContext>>(Lifetime::Scoped)?
        // GreetingHandler: new each time
        .register_func_with_deps::<GreetingHandler, GreetingHandler, _>(
            Lifetime::Transient,
            vec![
                DependencyKey::of::<Arc<dyn Greeter>>(),
                DependencyKey::of::<Arc<RequestContext>>(),
                DependencyKey::of::<Config>(),
            ],
            |r| {
                Ok(GreetingHandler {
                    greeter: r.resolve()?,
                    context: r.resolve()?,
                    config: r.resolve()?,
                })
            },
        )?;

    let root = services.build()?;
    info!(?root, "Provider ready");

    // === One scope per request ===
    for request_id in 1..=2 {
        let scope = root.new_scope();

        let context: Arc<RequestContext> = scope.resolve()?;
        context.id.store(request_id, Ordering::SeqCst);

        // Both handlers see this scope's RequestContext.
        let first: GreetingHandler = scope.resolve()?;
        let second: GreetingHandler = scope.resolve()?;
        println!("{}", first.handle());
        println!("{}", second.handle());
    }

    Ok(())
}
