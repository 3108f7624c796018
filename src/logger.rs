//! # Logger
//!
//! A `log` backend that writes one line per record to any
//! [`core::fmt::Write`] sink. On the board the sink is USART2.
//!
//! The sink lives in an [`IrqCell`] so interrupt handlers may log too. It is
//! taken out of the cell for the duration of a write, which keeps the
//! critical section short however slow the sink is. A record logged while
//! the sink is out (an interrupt landing mid-write) is dropped.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::sync::IrqCell;

/// Line-per-record logger over a character sink.
pub struct SinkLogger<W> {
    level: LevelFilter,
    sink: IrqCell<Option<W>>,
}

impl<W: Write + Send> SinkLogger<W> {
    /// Logger passing records at `level` or more severe, with no sink yet.
    pub const fn new(level: LevelFilter) -> Self {
        Self {
            level,
            sink: IrqCell::new(None),
        }
    }

    /// Install `sink`, returning the previous one.
    pub fn attach(&self, sink: W) -> Option<W> {
        self.sink.lock(|slot| slot.replace(sink))
    }

    /// Remove the sink.
    pub fn detach(&self) -> Option<W> {
        self.sink.lock(|slot| slot.take())
    }

    /// Most verbose level passed through.
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl<W: Write + Send> Log for SinkLogger<W> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(mut sink) = self.sink.lock(|slot| slot.take()) else {
            return;
        };

        // Output errors have nowhere to go
        let _ = write_record(&mut sink, record);

        self.sink.lock(|slot| {
            if slot.is_none() {
                *slot = Some(sink);
            }
        });
    }

    fn flush(&self) {}
}

fn write_record<W: Write>(sink: &mut W, record: &Record) -> fmt::Result {
    write!(sink, "[{}] {}: {}\r\n", record.level(), record.target(), record.args())
}

/// Attach `sink` and make `logger` the global `log` backend.
pub fn init<W: Write + Send + 'static>(
    logger: &'static SinkLogger<W>,
    sink: W,
) -> Result<(), SetLoggerError> {
    logger.attach(sink);
    log::set_logger(logger)?;
    log::set_max_level(logger.level);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use log::Level;
    use std::string::String;
    use std::sync::{Arc, Mutex};

    /// Sink whose output the test can still read after handing it over.
    #[derive(Clone, Default)]
    pub(crate) struct Capture(Arc<Mutex<String>>);

    impl Write for Capture {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.lock().unwrap().push_str(s);
            Ok(())
        }
    }

    impl Capture {
        pub(crate) fn text(&self) -> String {
            self.0.lock().unwrap().clone()
        }
    }

    fn emit(logger: &SinkLogger<Capture>, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("scanhead")
                .args(format_args!("{}", message))
                .build(),
        );
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let logger = SinkLogger::new(LevelFilter::Info);
        let capture = Capture::default();
        logger.attach(capture.clone());

        emit(&logger, Level::Info, "hello");
        emit(&logger, Level::Error, "oops");
        assert_eq!(capture.text(), "[INFO] scanhead: hello\r\n[ERROR] scanhead: oops\r\n");
    }

    #[test]
    fn test_filters_by_level() {
        let logger = SinkLogger::new(LevelFilter::Warn);
        let capture = Capture::default();
        logger.attach(capture.clone());

        emit(&logger, Level::Debug, "quiet");
        emit(&logger, Level::Warn, "loud");
        assert_eq!(capture.text(), "[WARN] scanhead: loud\r\n");
    }

    #[test]
    fn test_no_sink_drops_records() {
        let logger: SinkLogger<Capture> = SinkLogger::new(LevelFilter::Trace);
        emit(&logger, Level::Info, "nobody listening");

        let capture = Capture::default();
        assert!(logger.attach(capture.clone()).is_none());
        assert!(logger.detach().is_some());
        emit(&logger, Level::Info, "after detach");
        assert_eq!(capture.text(), "");
    }
}
