use dotenvy::dotenv;
use market_desk::bot::dispatch;
use market_desk::bot::janitor::{CleanupTiming, MessageJanitor};
use market_desk::bot::telegram::TelegramTransport;
use market_desk::bot::transport::ChatTransport;
use market_desk::config::Settings;
use market_desk::engine::{Command, ConversationEngine, EngineOptions};
use market_desk::scheduler::{LifecycleScheduler, SchedulerOptions};
use market_desk::session::SessionStore;
use market_desk::store::{RecordStore, SqliteRecordStore};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting the bot token from logs
struct RedactionPatterns {
    token_in_url: Regex,
    bare_token: Regex,
    prefixed_token: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_in_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            prefixed_token: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let output = self
            .token_in_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        let output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        self.prefixed_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was fully consumed even if the redacted text differs in length
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting market desk bot...");

    let settings = init_settings();
    let managers = settings.manager_ids();
    if managers.is_empty() {
        error!("No manager ids configured (MANAGER_ID)");
        std::process::exit(1);
    }

    let records = init_record_store(&settings).await;
    let bot = Bot::new(settings.telegram_token.clone());
    let me = bot.get_me().await?;
    info!(username = me.username(), managers = managers.len(), "Bot authorized");
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let shutdown = CancellationToken::new();
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let sessions = Arc::new(SessionStore::new());
    let janitor = Arc::new(MessageJanitor::new(
        Arc::clone(&transport),
        Arc::clone(&sessions),
        CleanupTiming::default(),
        shutdown.child_token(),
    ));
    let engine = Arc::new(ConversationEngine::new(
        Arc::clone(&transport),
        Arc::clone(&records),
        Arc::clone(&sessions),
        Arc::clone(&janitor),
        EngineOptions {
            managers,
            help_link: settings.manager_help_link.clone(),
            bot_username: me.username().to_string(),
        },
    ));

    let scheduler = LifecycleScheduler::new(
        sessions,
        records,
        transport,
        SchedulerOptions {
            interval: settings.scheduler_interval(),
            session_timeout: settings.session_timeout(),
            help_link: settings.manager_help_link.clone(),
        },
    );
    let scheduler_token = shutdown.child_token();
    let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_token).await });

    info!("Bot is running...");

    Dispatcher::builder(bot, dispatch::schema())
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    shutdown.cancel();
    janitor.shutdown().await;
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {e}");
    }

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

async fn init_record_store(settings: &Settings) -> Arc<dyn RecordStore> {
    match SqliteRecordStore::connect(&settings.database_url).await {
        Ok(store) => {
            info!("Record store connected.");
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to open record store: {}", e);
            std::process::exit(1);
        }
    }
}
