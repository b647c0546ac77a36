//! yt-dlp engine driven through its command-line interface

use super::logger::{EngineLogger, Stream};
use super::traits::{DownloadEngine, EngineSession};
use crate::config::EngineConfig;
use crate::error::{EngineError, Error};
use crate::options::MergedOptions;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Binary searched for in `PATH` when no explicit engine path is configured
pub const ENGINE_BINARY: &str = "yt-dlp";

/// Engine that runs the external `yt-dlp` binary
///
/// Merged set options are rendered into command-line flags (see
/// [`MergedOptions::to_cli_args`]). Output of every run is streamed line by
/// line into the session's [`EngineLogger`].
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary_path: PathBuf,
    extra_args: Vec<String>,
    dry_run: bool,
}

impl CliEngine {
    /// Create an engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            extra_args: Vec::new(),
            dry_run: false,
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// # Returns
    ///
    /// `Some(CliEngine)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which(ENGINE_BINARY).ok().map(Self::new)
    }

    /// Build the engine described by the `engine` configuration section
    ///
    /// An explicit `path` must point at an existing file. Without one, `PATH`
    /// is searched unless `search_path` is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineNotFound`] when no usable binary exists.
    pub fn from_config(config: &EngineConfig, dry_run: bool) -> crate::Result<Self> {
        let engine = match &config.path {
            Some(path) if path.is_file() => Self::new(path.clone()),
            Some(path) => {
                return Err(Error::EngineNotFound(format!(
                    "configured engine path {} does not exist",
                    path.display()
                )));
            }
            None if config.search_path => Self::from_path().ok_or_else(|| {
                Error::EngineNotFound(format!("{} not found in PATH", ENGINE_BINARY))
            })?,
            None => {
                return Err(Error::EngineNotFound(
                    "no engine.path configured and PATH search is disabled".into(),
                ));
            }
        };

        Ok(engine
            .with_extra_args(config.extra_args.clone())
            .with_dry_run(dry_run))
    }

    /// Flags appended to every invocation after the rendered options
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Simulate downloads instead of writing files
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Path of the binary this engine runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl DownloadEngine for CliEngine {
    async fn open_session(
        &self,
        options: MergedOptions,
    ) -> crate::Result<Box<dyn EngineSession>> {
        let mut args = options.to_cli_args()?;
        args.extend(self.extra_args.iter().cloned());

        Ok(Box::new(CliSession {
            binary_path: self.binary_path.clone(),
            args,
            dry_run: self.dry_run,
            set_name: options.set_name,
            logger: options.logger,
        }))
    }

    fn name(&self) -> &'static str {
        ENGINE_BINARY
    }
}

/// One set's worth of yt-dlp invocations sharing the same flags
struct CliSession {
    binary_path: PathBuf,
    args: Vec<String>,
    dry_run: bool,
    set_name: String,
    logger: EngineLogger,
}

impl CliSession {
    async fn run(&self, extra: &[&str], urls: &[String]) -> crate::Result<ExitStatus> {
        let mut command = Command::new(&self.binary_path);
        command.args(&self.args).args(extra);
        if !urls.is_empty() {
            command.arg("--").args(urls);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        self.logger.debug(&format!("running {:?}", command.as_std()));

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            binary: self.binary_path.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, (), ()) = tokio::join!(
            child.wait(),
            forward_lines(stdout, &self.logger, Stream::Stdout),
            forward_lines(stderr, &self.logger, Stream::Stderr),
        );

        Ok(status?)
    }
}

#[async_trait]
impl EngineSession for CliSession {
    async fn remove_cache(&mut self) -> crate::Result<()> {
        let status = self.run(&["--rm-cache-dir"], &[]).await?;
        if !status.success() {
            return Err(EngineError::CacheClear {
                set: self.set_name.clone(),
                exit_code: status.code(),
            }
            .into());
        }
        Ok(())
    }

    async fn download(&mut self, urls: &[String]) -> crate::Result<()> {
        let extra: &[&str] = if self.dry_run { &["--simulate"] } else { &[] };
        let status = self.run(extra, urls).await?;
        if !status.success() {
            return Err(EngineError::Download {
                set: self.set_name.clone(),
                url: urls.join(" "),
                exit_code: status.code(),
            }
            .into());
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> crate::Result<()> {
        // every child is awaited inside `run`, nothing is left running here
        self.logger.debug("engine session released");
        Ok(())
    }
}

async fn forward_lines<R>(reader: Option<R>, logger: &EngineLogger, stream: Stream)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => logger.log_line(stream, &line),
            Ok(None) => break,
            Err(e) => {
                logger.error(&format!("error reading engine output: {}", e));
                break;
            }
        }
    }
}
