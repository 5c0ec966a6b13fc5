use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize structured logging for a filemesh binary (tracker or peer).
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("filemesh=debug")
        } else {
            EnvFilter::new("filemesh=info")
        }
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    info!("filemesh logging initialized");
    Ok(())
}

/// Initialize logging, falling back to stderr if the subscriber is already set.
pub fn init_logging_safe() {
    if let Err(e) = init_logging() {
        eprintln!("Warning: failed to set up logging: {}", e);
    }
}
