use crate::error::ClipboardError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait ClipboardProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn detect() -> Option<Self> {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
        let x11 = std::env::var_os("DISPLAY").is_some();

        let mut candidates = vec![("pbcopy", vec![]), ("clip.exe", vec![])];
        if wayland {
            candidates.push(("wl-copy", vec![]));
        }
        if x11 {
            candidates.push(("xclip", vec!["-selection", "clipboard"]));
            candidates.push(("xsel", vec!["--clipboard", "--input"]));
        }

        candidates
            .into_iter()
            .find(|(program, _)| on_path(program))
            .map(|(program, args)| Self::new(program, &args))
    }
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_file(&dir.join(program))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|meta| meta.is_file()).unwrap_or(false)
}

#[async_trait]
impl ClipboardProvider for CommandClipboard {
    fn name(&self) -> &str {
        &self.program
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child.stdin.take().ok_or_else(|| ClipboardError::Command {
            program: self.program.clone(),
            reason: "stdin unavailable".to_string(),
        })?;
        stdin.write_all(text.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ClipboardError::Command {
                program: self.program.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

pub struct Osc52Clipboard {
    out: Mutex<Box<dyn Write + Send>>,
    require_terminal: bool,
}

impl Osc52Clipboard {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            require_terminal: false,
        }
    }

    pub fn stdout() -> Self {
        Self {
            out: Mutex::new(Box::new(std::io::stdout())),
            require_terminal: true,
        }
    }

    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

#[async_trait]
impl ClipboardProvider for Osc52Clipboard {
    fn name(&self) -> &str {
        "osc52"
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.require_terminal && !std::io::stdout().is_terminal() {
            return Err(ClipboardError::Unavailable);
        }

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(Self::sequence(text).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

pub struct Clipboard {
    primary: Option<Box<dyn ClipboardProvider>>,
    fallback: Option<Box<dyn ClipboardProvider>>,
}

impl Clipboard {
    pub fn new(
        primary: impl ClipboardProvider + 'static,
        fallback: impl ClipboardProvider + 'static,
    ) -> Self {
        Self {
            primary: Some(Box::new(primary)),
            fallback: Some(Box::new(fallback)),
        }
    }

    pub fn system() -> Self {
        let primary = CommandClipboard::detect();
        match &primary {
            Some(command) => tracing::debug!("Using clipboard program {}", command.program),
            None => tracing::debug!("No clipboard program found, using OSC 52 only"),
        }

        Self {
            primary: primary.map(|command| Box::new(command) as Box<dyn ClipboardProvider>),
            fallback: Some(Box::new(Osc52Clipboard::stdout())),
        }
    }

    pub async fn copy(&self, text: &str) -> bool {
        for provider in [&self.primary, &self.fallback].into_iter().flatten() {
            match provider.write_text(text).await {
                Ok(()) => {
                    tracing::debug!("Copied {} bytes via {}", text.len(), provider.name());
                    return true;
                }
                Err(e) => tracing::warn!("Clipboard provider {} failed: {}", provider.name(), e),
            }
        }

        false
    }
}
