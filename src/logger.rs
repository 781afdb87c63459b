// `log` backend for the kernel
use core::fmt::{self, Write};

use log::Record;

/// Render one record as `[LEVEL] target: message`.
pub fn format_record<W: Write>(out: &mut W, record: &Record) -> fmt::Result {
    writeln!(out, "[{:5}] {}: {}", record.level(), record.target(), record.args())
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use self::serial::{init, SerialLogger};

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod serial {
    use log::{LevelFilter, Metadata, Record, SetLoggerError};

    /// Logger writing every record to COM1.
    pub struct SerialLogger;

    impl log::Log for SerialLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                crate::serial_print!("{}", Line(record));
            }
        }

        fn flush(&self) {}
    }

    struct Line<'a, 'b>(&'a Record<'b>);

    impl core::fmt::Display for Line<'_, '_> {
        fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
            super::format_record(f, self.0)
        }
    }

    static LOGGER: SerialLogger = SerialLogger;

    /// Install the serial logger.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}
