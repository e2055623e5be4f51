//! Leveled logger used by the analytics client to report delivery outcomes.
//!
//! Every [`Logger`] carries a name, a minimum level and a handler. The default handler forwards
//! records to the [`log`] facade so applications pick them up with whatever backend they
//! already install. Applications that want the structured context (request payloads, status
//! codes) can register a user handler through [`set_user_log_handler`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INSTANCES: LazyLock<Mutex<Vec<Weak<LoggerInner>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

type SharedLogHandler = Arc<dyn Fn(&Logger, &LogRecord) + Send + Sync + 'static>;

/// A single log entry: severity, human readable message and optional structured context.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub context: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    fn new(level: LogLevel, message: String, context: Option<Value>) -> Self {
        Self {
            level,
            message,
            context,
            timestamp: Utc::now(),
        }
    }

    /// Message followed by the serialized context, if any.
    pub fn formatted(&self) -> String {
        match &self.context {
            Some(context) => format!("{} {}", self.message, context),
            None => self.message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.log_level())
            .finish()
    }
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        let inner = Arc::new(LoggerInner::new(name.into()));
        track_instance(&inner);
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level<L>(&self, level: L) -> Result<(), LogError>
    where
        L: IntoLogLevel,
    {
        let level = level.into_log_level()?;
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, &LogRecord) + Send + Sync + 'static,
    {
        *write_lock(&self.inner.log_handler) = Arc::new(handler);
    }

    pub fn reset_log_handler(&self) {
        *write_lock(&self.inner.log_handler) = default_log_handler_arc();
    }

    pub fn user_log_handler(&self) -> Option<SharedLogHandler> {
        read_lock(&self.inner.user_log_handler).clone()
    }

    pub fn set_user_log_handler<F>(&self, handler: Option<F>)
    where
        F: Fn(&Logger, &LogRecord) + Send + Sync + 'static,
    {
        *write_lock(&self.inner.user_log_handler) =
            handler.map(|f| Arc::new(f) as SharedLogHandler);
    }

    pub fn clear_user_log_handler(&self) {
        write_lock(&self.inner.user_log_handler).take();
    }

    /// Emits a record at `level` with an optional structured context.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Option<Value>) {
        if level == LogLevel::Silent {
            return;
        }
        let record = LogRecord::new(level, message.into(), context);
        if let Some(handler) = self.user_log_handler() {
            handler(self, &record);
        }
        let handler = read_lock(&self.inner.log_handler).clone();
        handler(self, &record);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn info_with_context(&self, message: impl Into<String>, context: Value) {
        self.log(LogLevel::Info, message, Some(context));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, None);
    }

    pub fn warn_with_context(&self, message: impl Into<String>, context: Value) {
        self.log(LogLevel::Warn, message, Some(context));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None);
    }

    pub fn error_with_context(&self, message: impl Into<String>, context: Value) {
        self.log(LogLevel::Error, message, Some(context));
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message, None);
    }

    pub fn critical_with_context(&self, message: impl Into<String>, context: Value) {
        self.log(LogLevel::Critical, message, Some(context));
    }

    fn from_inner(inner: Arc<LoggerInner>) -> Self {
        Self { inner }
    }
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
    log_handler: RwLock<SharedLogHandler>,
    user_log_handler: RwLock<Option<SharedLogHandler>>,
}

impl LoggerInner {
    fn new(name: String) -> Self {
        let level = GLOBAL_LOG_LEVEL.load(Ordering::SeqCst);
        Self {
            name,
            log_level: AtomicU8::new(level),
            log_handler: RwLock::new(default_log_handler_arc()),
            user_log_handler: RwLock::new(None),
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poison| poison.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poison| poison.into_inner())
}

fn track_instance(inner: &Arc<LoggerInner>) {
    INSTANCES
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .push(Arc::downgrade(inner));
}

fn default_log_handler_arc() -> SharedLogHandler {
    Arc::new(default_log_handler)
}

fn default_log_handler(logger: &Logger, record: &LogRecord) {
    if record.level < logger.log_level() {
        return;
    }
    let Some(level) = record.level.to_log_level() else {
        return;
    };
    let now = record
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    log::log!(
        target: "amplitude",
        level,
        "[{}]  {}: {}",
        now,
        logger.name(),
        record.formatted()
    );
}

fn with_instances<F>(mut f: F)
where
    F: FnMut(Logger),
{
    let mut instances = INSTANCES.lock().unwrap_or_else(|poison| poison.into_inner());
    let mut i = 0;
    while i < instances.len() {
        match instances[i].upgrade() {
            Some(inner) => {
                f(Logger::from_inner(inner));
                i += 1;
            }
            None => {
                instances.swap_remove(i);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
    Silent = 6,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Verbose,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            5 => LogLevel::Critical,
            _ => LogLevel::Silent,
        }
    }

    /// `log` has no critical level; critical records surface as errors there.
    fn to_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Verbose => Some(log::Level::Trace),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Error | LogLevel::Critical => Some(log::Level::Error),
            LogLevel::Silent => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(self)
    }
}

impl IntoLogLevel for String {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(&self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub level: Option<LogLevel>,
}

impl LogOptions {
    pub fn with_level<L>(mut self, level: L) -> Result<Self, LogError>
    where
        L: IntoLogLevel,
    {
        self.level = Some(level.into_log_level()?);
        Ok(self)
    }
}

/// What a user log handler receives for each record that passes its level filter.
#[derive(Debug, Clone)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    pub message: String,
    pub context: Option<Value>,
    pub logger_type: String,
}

impl LogCallbackParams {
    pub fn level_label(&self) -> &'static str {
        self.level.as_str()
    }
}

pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Debug, Clone)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => {
                write!(f, "Invalid value \"{level}\" assigned to `logLevel`")
            }
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the level of every live logger and of loggers created afterwards.
pub fn set_log_level<L>(level: L) -> Result<(), LogError>
where
    L: IntoLogLevel,
{
    let level = level.into_log_level()?;
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    with_instances(|logger| {
        let _ = logger.set_log_level(level);
    });
    Ok(())
}

/// Installs (or with `None`, removes) a user handler on every live logger.
pub fn set_user_log_handler(callback: Option<LogCallback>, options: Option<LogOptions>) {
    let options = options.unwrap_or_default();

    match callback {
        Some(cb) => {
            let custom_level = options.level;
            with_instances(|logger| {
                let handler_cb = Arc::clone(&cb);
                logger.set_user_log_handler(Some(
                    move |instance: &Logger, record: &LogRecord| {
                        let threshold = custom_level.unwrap_or_else(|| instance.log_level());
                        if record.level < threshold {
                            return;
                        }
                        handler_cb(LogCallbackParams {
                            level: record.level,
                            message: record.message.clone(),
                            context: record.context.clone(),
                            logger_type: instance.name().to_owned(),
                        });
                    },
                ));
            });
        }
        None => {
            with_instances(|logger| {
                logger.clear_user_log_handler();
            });
        }
    }
}

pub fn set_user_log_handler_fn<F>(callback: Option<F>, options: Option<LogOptions>)
where
    F: Fn(LogCallbackParams) + Send + Sync + 'static,
{
    let wrapped = callback.map(|cb| Arc::new(cb) as LogCallback);
    set_user_log_handler(wrapped, options);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    static TEST_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn reset_logging() {
        set_log_level(LogLevel::Info).unwrap();
        set_user_log_handler(None, None);
    }

    fn capture(logger: &Logger) -> Arc<Mutex<Vec<LogRecord>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let handler_records = Arc::clone(&records);
        logger.set_log_handler(move |instance, record| {
            if record.level < instance.log_level() {
                return;
            }
            handler_records.lock().unwrap().push(record.clone());
        });
        records
    }

    #[test]
    fn levels_below_threshold_are_dropped() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_logging();
        let logger = Logger::new("@amplitude/logger-level-test");
        logger.set_log_level("warn").unwrap();
        let records = capture(&logger);

        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
        logger.critical("critical message");

        let levels: Vec<_> = records.lock().unwrap().iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            [LogLevel::Warn, LogLevel::Error, LogLevel::Critical]
        );
    }

    #[test]
    fn context_is_carried_on_the_record() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_logging();
        let logger = Logger::new("@amplitude/logger-context-test");
        let records = capture(&logger);

        logger.error_with_context("request rejected", json!({"status": 400}));

        let stored = records.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].context, Some(json!({"status": 400})));
        assert_eq!(stored[0].formatted(), "request rejected {\"status\":400}");
    }

    #[test]
    fn global_level_applies_to_live_loggers() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_logging();
        let logger = Logger::new("@amplitude/logger-global-test");

        set_log_level(LogLevel::Critical).unwrap();
        assert_eq!(logger.log_level(), LogLevel::Critical);

        assert!(matches!(
            set_log_level("loud"),
            Err(LogError::InvalidLogLevel(level)) if level == "loud"
        ));
        reset_logging();
    }

    #[test]
    fn user_handler_respects_custom_level() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_logging();
        let logger = Logger::new("@amplitude/logger-user-test");
        let logger_name = logger.name().to_owned();

        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_cb = Arc::clone(&captured);

        set_user_log_handler_fn(
            Some({
                let logger_name = logger_name.clone();
                move |params: LogCallbackParams| {
                    if params.logger_type == logger_name {
                        captured_cb.lock().unwrap().push(params);
                    }
                }
            }),
            Some(LogOptions {
                level: Some(LogLevel::Error),
            }),
        );

        logger.info("info message");
        logger.error("error message");
        logger.critical_with_context("transport down", json!({"url": "https://x"}));

        let params = captured.lock().unwrap().clone();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].level_label(), "error");
        assert_eq!(params[1].level, LogLevel::Critical);
        assert_eq!(params[1].context, Some(json!({"url": "https://x"})));
        reset_logging();
    }
}
