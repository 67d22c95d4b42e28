//! Structured logging with redaction
//!
//! Entries go to stderr as `[ts] LEVEL [module] message | k=v ...`.
//! Field values are redacted by field name, matched exactly or as a
//! `_`-separated suffix:
//! - private keys, WIFs and signatures are hidden entirely
//! - public keys, transaction ids and digests are shortened

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Field names whose values are never printed
const SECRET_FIELDS: &[&str] = &[
    "private_key",
    "privatekey",
    "wif",
    "secret",
    "password",
    "signature",
    "sig",
];

/// Public keys: keep the type prefix and a few characters
const KEY_FIELDS: &[&str] = &["public_key", "pubkey", "key"];

/// Hex identifiers: keep head and tail
const ID_FIELDS: &[&str] = &["tx_id", "txid", "transaction_id", "chain_id", "digest", "block_id"];

#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, redacted according to its name
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_by_name(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Add a field that is always hidden
    pub fn secret_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_secret(&value.to_string());
        self.fields.push((key, redacted));
        self
    }

    pub fn render(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");

        if fields.is_empty() {
            format!("[{}] {} [{}] {}", timestamp, self.level, self.module, self.message)
        } else {
            format!(
                "[{}] {} [{}] {} | {}",
                timestamp, self.level, self.module, self.message, fields
            )
        }
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }
        eprintln!("{}", self.render());
    }
}

/// Exact name, or a `_`-separated suffix such as `owner_key`
fn names_field(key: &str, name: &str) -> bool {
    key == name
        || key
            .strip_suffix(name)
            .is_some_and(|head| head.ends_with('_'))
}

fn redact_by_name(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();
    let matches = |names: &[&str]| names.iter().any(|n| names_field(&key_lower, n));

    if matches(SECRET_FIELDS) {
        return redact_secret(value);
    }
    if matches(ID_FIELDS) {
        return shorten(value, 10, 6);
    }
    if matches(KEY_FIELDS) {
        return shorten(value, 11, 4);
    }
    value.to_string()
}

fn redact_secret(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }
    if value.len() <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", value.len())
    }
}

/// Keep `head` leading and `tail` trailing characters
fn shorten(value: &str, head: usize, tail: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !trimmed.is_ascii() || trimmed.len() <= head + tail + 3 {
        return trimmed.to_string();
    }
    format!("{}...{}", &trimmed[..head], &trimmed[trimmed.len() - tail..])
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:ident, $module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        ).log()
    };
    ($level:ident, $module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($args:tt)*) => { $crate::log_at!(Debug, $($args)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($args:tt)*) => { $crate::log_at!(Info, $($args)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($args:tt)*) => { $crate::log_at!(Warn, $($args)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($args:tt)*) => { $crate::log_at!(Error, $($args)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_ID: &str = "9b7d1e6fc5f0a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b";

    #[test]
    fn test_secrets_hidden() {
        assert_eq!(redact_secret(""), "[EMPTY]");
        assert_eq!(redact_secret("abc"), "[REDACTED]");
        let wif = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
        assert_eq!(redact_by_name("wif", wif), "[REDACTED:51chars]");
        assert!(redact_by_name("signature", "SIG_K1_abcdef").contains("REDACTED"));
    }

    #[test]
    fn test_ids_shortened() {
        let shown = redact_by_name("tx_id", TX_ID);
        assert_eq!(shown, "9b7d1e6fc5...192a3b");
    }

    #[test]
    fn test_public_key_keeps_prefix() {
        let shown = redact_by_name(
            "public_key",
            "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63",
        );
        assert!(shown.starts_with("PUB_K1_6MRy"));
        assert!(shown.ends_with("Dq63"));
    }

    #[test]
    fn test_plain_fields_untouched() {
        assert_eq!(redact_by_name("actor", "alice"), "alice");
        assert_eq!(redact_by_name("attempt", "2"), "2");
    }

    #[test]
    fn test_counts_are_not_redacted() {
        assert_eq!(redact_by_name("signatures", "2"), "2");
        assert_eq!(redact_by_name("keys", "3"), "3");
        assert_eq!(redact_by_name("digests", "4"), "4");
        assert_eq!(redact_by_name("design", "x"), "x");

        // Suffixed names still redact
        let key = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";
        assert!(redact_by_name("owner_key", key).ends_with("Dq63"));
        assert!(redact_by_name("node_signature", "SIG_K1_abcdef").contains("REDACTED"));
        assert_eq!(redact_by_name("TX_ID", TX_ID), "9b7d1e6fc5...192a3b");
    }

    #[test]
    fn test_render() {
        let entry = LogEntry::new(LogLevel::Info, "tx", "pushed")
            .field("tx_id", TX_ID)
            .secret_field("note", "hidden value");
        let line = entry.render();
        assert!(line.contains("INFO [tx] pushed | tx_id=9b7d1e6fc5...192a3b"));
        assert!(line.contains("note=[REDACTED:12chars]"));
    }
}
