use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

pub fn emit<S: AsRef<str>>(level: LogLevel, message: S) {
    let message = message.as_ref();
    match level {
        LogLevel::Debug => {
            if DEBUG_ENABLED.load(Ordering::Relaxed) {
                eprintln!("{} {}", "debug:".dimmed(), message.dimmed());
            }
        }
        LogLevel::Info => eprintln!("{message}"),
        LogLevel::Warn => eprintln!("{} {}", "warning:".yellow().bold(), message),
        LogLevel::Error => eprintln!("{} {}", "error:".red().bold(), message),
    }
}
