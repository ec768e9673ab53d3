use std::time::Instant;

pub fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}] {} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();
}

/// Measures one operation and warns on drop when it ran past `slow_after_ms`.
pub struct Timer {
    name: String,
    start: Instant,
    slow_after_ms: u128,
}

impl Timer {
    pub fn new(name: impl Into<String>, slow_after_ms: u128) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            slow_after_ms,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        if elapsed > self.slow_after_ms {
            log::warn!("{} took {}ms (slow!)", self.name, elapsed);
        } else {
            log::debug!("{} completed in {}ms", self.name, elapsed);
        }
    }
}
