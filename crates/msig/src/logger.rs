use {
    std::str::FromStr,
    tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter, Layer},
};

pub struct LogOpts {
    pub level: String,
    pub file: String,
}

/// initializes logging with file+line of the log source and log-level filtration,
/// optionally appending json formatted logs to `opts.file`
pub fn init_log(opts: LogOpts) {
    let mut layers = Vec::with_capacity(2);
    let level = tracing::Level::from_str(&opts.level).unwrap_or_else(|_| {
        eprintln!("invalid log level '{}', using info", opts.level);
        tracing::Level::INFO
    });
    let level_filter = LevelFilter::from_level(level);

    layers.push(
        tracing_subscriber::fmt::layer()
            .with_level(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env().add_directive(level_filter.into()))
            .boxed(),
    );
    if !opts.file.is_empty() {
        match std::fs::File::options()
            .create(true)
            .append(true)
            .open(&opts.file)
        {
            Ok(log_file) => layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(log_file)
                    .with_filter(EnvFilter::from_default_env().add_directive(level_filter.into()))
                    .boxed(),
            ),
            Err(err) => eprintln!("failed to open log file {}: {err}", opts.file),
        }
    }
    if let Err(err) = tracing_subscriber::registry().with(layers).try_init() {
        log::warn!("global subscriber already registered {err:#?}");
    }
}

/// only preserve the log file of the single most recent execution
pub async fn rotate_log_file(log_file: &str) {
    if log_file.is_empty() {
        return;
    }
    if let Ok(true) = tokio::fs::try_exists(log_file).await {
        if let Err(err) = tokio::fs::rename(log_file, format!("{log_file}.old")).await {
            log::error!("failed to rotate log file {err:#?}");
        }
    }
}
