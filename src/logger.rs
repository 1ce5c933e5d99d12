use log::{LevelFilter, Metadata, Record};

#[cfg(target_os = "vexos")]
use vexide::{prelude::*, time::Instant};
#[cfg(not(target_os = "vexos"))]
use std::time::Instant;

pub struct ConsoleLogger {
    start: Instant,
}

impl ConsoleLogger {
    #[cfg(not(target_os = "vexos"))]
    fn uptime(&self) -> humantime::FormattedDuration {
        // whole milliseconds keep the line short
        let elapsed = self.start.elapsed();
        humantime::format_duration(core::time::Duration::from_millis(elapsed.as_millis() as u64))
    }

    #[cfg(target_os = "vexos")]
    fn uptime(&self) -> alloc::string::String {
        alloc::format!("{}ms", self.start.elapsed().as_millis())
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{} [{}] {} - {}",
                record.level(),
                self.uptime(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Installs the logger. A second call keeps the first logger and only changes the level.
pub fn init(level: LevelFilter) {
    let logger = alloc::boxed::Box::new(ConsoleLogger {
        start: Instant::now(),
    });
    let _ = log::set_logger(alloc::boxed::Box::leak(logger));
    log::set_max_level(level);
}
