use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "marketscan=info,crypto_strat_bot=info";

/// Initialize logging with different levels. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_logger() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?;
    } else {
        let format_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_timer(ChronoUtc::rfc_3339())
            .compact();
        registry.with(format_layer).try_init()?;
    }

    Ok(())
}

/// Logger struct for contextual logging
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn info(&self, message: &str) {
        info!("{}: {}", self.context, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}: {}", self.context, message);
    }

    pub fn debug(&self, message: &str) {
        debug!("{}: {}", self.context, message);
    }
}

/// Step transition logging
pub fn log_step_transition(from: &str, to: &str, reason: &str) {
    let now = chrono::Utc::now();
    info!(
        "➡️ [STEP] [{}] {} → {} ({})",
        now.format("%Y-%m-%d %H:%M:%S UTC"),
        from,
        to,
        reason
    );
}

/// [FETCH] - Data fetch operations
pub fn log_fetch(message: &str) {
    info!("FETCH: {}", message);
}

/// Performance timing helper
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self, context: &str) {
        info!("{}: {} completed in {:.1}ms", context, self.name, self.elapsed_ms());
    }
}

#[macro_export]
macro_rules! log_batch_progress {
    ($context:expr, $current:expr, $total:expr, $item_type:expr) => {
        tracing::info!(
            "{}: Processing batch {}/{}: {}",
            $context,
            $current,
            $total,
            $item_type
        );
    };
}
