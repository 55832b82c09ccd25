use std::io::{self, Write};

use tracing::Level;

use crate::debug_log::{DebugLogWriter, global_debug_log};

/// Writer handed to the fmt layer: the debug log when one is registered,
/// stderr otherwise.
pub enum DelegatingWriter {
    Debug(DebugLogWriter),
    Stderr(io::Stderr),
}

impl DelegatingWriter {
    fn new() -> Self {
        match global_debug_log() {
            Some(handle) => Self::Debug(handle.writer()),
            None => Self::Stderr(io::stderr()),
        }
    }
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Debug(w) => w.write(buf),
            Self::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Debug(w) => w.flush(),
            Self::Stderr(s) => s.flush(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SubscriberMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DelegatingWriter::new()
    }
}

/// Install the compact subscriber at `level`. Later calls are no-ops.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_max_level(level)
        .with_writer(SubscriberMakeWriter)
        .with_target(false)
        .with_thread_names(false)
        .without_time()
        .with_ansi(false)
        .try_init();
}

pub fn init_default() {
    init(Level::DEBUG);
}
