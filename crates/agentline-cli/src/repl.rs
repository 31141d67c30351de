//! Interactive loop: stdin commands on one side, stream updates on the other.

use crate::render::Renderer;
use agentline_core::{
    ApplyOutcome, BannerKind, Result as CoreResult, SessionController, latest_file_reference,
};
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  /new              start a new conversation
  /list             list stored sessions
  /load <id>        switch to a stored session
  /delete <id>      delete a stored session
  /upload <file>    upload a CSV file for the agent
  /download [path]  save a file the agent produced (default: the latest one)
  /clear            clear the screen and redraw the conversation
  /dismiss          hide the current error
  /help             show this help
  /quit             exit
Anything else is sent to the agent.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    List,
    Load(String),
    Delete(String),
    Upload(PathBuf),
    /// Remote path, or the file named by the latest tool output
    Download(Option<String>),
    Clear,
    Dismiss,
    Help,
    Quit,
    Unknown(String),
    Usage(&'static str),
}

impl Command {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Send(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let with_arg = |make: fn(String) -> Command, usage: &'static str| {
            if arg.is_empty() {
                Command::Usage(usage)
            } else {
                make(arg.to_string())
            }
        };

        Some(match name {
            "new" => Command::New,
            "list" => Command::List,
            "load" => with_arg(Command::Load, "/load <session-id>"),
            "delete" => with_arg(Command::Delete, "/delete <session-id>"),
            "upload" => with_arg(|arg| Command::Upload(PathBuf::from(arg)), "/upload <file>"),
            "download" => Command::Download((!arg.is_empty()).then(|| arg.to_string())),
            "clear" => Command::Clear,
            "dismiss" => Command::Dismiss,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// Write downloaded bytes under `dir`, named after the last component of
/// the remote path.
pub async fn save_download(dir: &Path, remote_path: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let name = Path::new(remote_path)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());

    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(name);
    tokio::fs::write(&target, bytes).await?;
    Ok(target)
}

pub struct Repl<W: Write> {
    controller: SessionController,
    renderer: Renderer,
    download_dir: PathBuf,
    out: W,
    shown_banner: Option<(BannerKind, String)>,
}

impl<W: Write> Repl<W> {
    pub fn new(controller: SessionController, download_dir: PathBuf, out: W) -> Self {
        Self {
            controller,
            renderer: Renderer::new(),
            download_dir,
            out,
            shown_banner: None,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Print the loaded conversation, if any, and a hint.
    pub fn greet(&mut self) -> Result<()> {
        if let Some(id) = self.controller.session_id() {
            writeln!(self.out, "Session {}", id)?;
            self.renderer.redraw(self.controller.messages(), &mut self.out)?;
        }
        writeln!(self.out, "Type a message, or /help for commands.")?;
        Ok(())
    }

    /// Run until `/quit` or end of input. At end of input a running turn is
    /// allowed to finish first.
    pub async fn run(&mut self, input: impl AsyncBufRead + Unpin) -> Result<()> {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!(target: "agentline::cli", "End of input");
                        self.drain().await?;
                        break;
                    };
                    let Some(command) = Command::parse(&line) else {
                        continue;
                    };
                    if !self.handle(command).await? {
                        break;
                    }
                }
                Some(outcome) = self.controller.next_update() => {
                    self.after_update(outcome)?;
                }
            }
        }

        self.renderer.finish_turn(&mut self.out)?;
        Ok(())
    }

    /// Execute one command. Returns `false` when the loop should stop.
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Send(text) => {
                if self.controller.send_message(&text).await.is_ok() {
                    self.render()?;
                }
            }
            Command::New => {
                self.controller.clear_session();
                self.renderer.reset();
                writeln!(self.out, "Started a new conversation.")?;
            }
            Command::List => {
                if let Ok(ids) = self.controller.list_sessions().await {
                    if ids.is_empty() {
                        writeln!(self.out, "No stored sessions.")?;
                    }
                    for id in ids {
                        let marker = if self.controller.session_id() == Some(id.as_str()) {
                            "*"
                        } else {
                            " "
                        };
                        writeln!(self.out, "{} {}", marker, id)?;
                    }
                }
            }
            Command::Load(id) => {
                if self.controller.load_session(&id).await.is_ok() {
                    writeln!(self.out, "Session {}", id)?;
                    self.renderer.redraw(self.controller.messages(), &mut self.out)?;
                }
            }
            Command::Delete(id) => {
                if self.controller.delete_session(&id).await.is_ok() {
                    writeln!(self.out, "Deleted {}", id)?;
                }
            }
            Command::Upload(path) => self.upload(&path).await?,
            Command::Download(path) => self.download(path).await?,
            Command::Clear => {
                write!(self.out, "\x1b[2J\x1b[H")?;
                self.renderer.redraw(self.controller.messages(), &mut self.out)?;
            }
            Command::Dismiss => {
                self.controller.dismiss_banner();
                self.shown_banner = None;
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(false),
            Command::Unknown(name) => {
                writeln!(self.out, "Unknown command /{}. Type /help.", name)?;
            }
            Command::Usage(usage) => writeln!(self.out, "Usage: {}", usage)?,
        }

        self.show_banner()?;
        Ok(true)
    }

    async fn upload(&mut self, path: &Path) -> Result<()> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                writeln!(self.out, "! Could not read {}: {}", path.display(), e)?;
                return Ok(());
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Ok(reference) = self.controller.upload_file(&name, bytes).await {
            writeln!(self.out, "Uploaded {} as {}", name, reference)?;
        }
        Ok(())
    }

    async fn download(&mut self, remote_path: Option<String>) -> Result<()> {
        let remote_path = match remote_path {
            Some(path) => path,
            None => match latest_file_reference(self.controller.messages()) {
                Some(path) => path.to_string(),
                None => {
                    writeln!(self.out, "No file to download yet. Usage: /download <path>")?;
                    return Ok(());
                }
            },
        };
        let remote_path = remote_path.as_str();

        let Ok(bytes) = self.controller.download_file(remote_path).await else {
            return Ok(());
        };
        match save_download(&self.download_dir, remote_path, &bytes).await {
            Ok(saved) => writeln!(self.out, "Saved {}", saved.display())?,
            Err(e) => {
                warn!(target: "agentline::cli", "Failed to save {}: {}", remote_path, e);
                writeln!(self.out, "! Could not save {}: {}", remote_path, e)?;
            }
        }
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        while self.controller.is_loading() {
            match self.controller.next_update().await {
                Some(outcome) => self.after_update(outcome)?,
                None => break,
            }
        }
        Ok(())
    }

    fn after_update(&mut self, outcome: CoreResult<ApplyOutcome>) -> Result<()> {
        match outcome {
            Ok(ApplyOutcome::Stale | ApplyOutcome::Ignored) => return Ok(()),
            Ok(_) => self.render()?,
            Err(e) => debug!(target: "agentline::cli", "Update failed: {}", e),
        }
        self.show_banner()
    }

    fn render(&mut self) -> Result<()> {
        self.renderer.render(self.controller.messages(), &mut self.out)?;
        if !self.controller.is_loading() {
            self.renderer.finish_turn(&mut self.out)?;
        }
        Ok(())
    }

    fn show_banner(&mut self) -> Result<()> {
        let current = self
            .controller
            .banner()
            .map(|banner| (banner.kind, banner.text.clone()));
        if current == self.shown_banner {
            return Ok(());
        }

        if let Some((kind, text)) = &current {
            self.renderer.finish_turn(&mut self.out)?;
            let marker = match kind {
                BannerKind::Error => "!",
                BannerKind::Notice => "*",
            };
            writeln!(self.out, "{} {}", marker, text)?;
        }
        self.shown_banner = current;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_messages_and_blank_lines() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(
            Command::parse("  what is up? "),
            Some(Command::Send("what is up?".into()))
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/new"), Some(Command::New));
        assert_eq!(Command::parse("/load  abc-123 "), Some(Command::Load("abc-123".into())));
        assert_eq!(
            Command::parse("/upload data/leads.csv"),
            Some(Command::Upload(PathBuf::from("data/leads.csv")))
        );
        assert_eq!(Command::parse("/exit"), Some(Command::Quit));
        assert_eq!(Command::parse("/?"), Some(Command::Help));
    }

    #[test]
    fn test_parse_missing_argument_and_unknown() {
        assert_eq!(Command::parse("/load"), Some(Command::Usage("/load <session-id>")));
        assert_eq!(Command::parse("/download "), Some(Command::Download(None)));
        assert_eq!(
            Command::parse("/download /srv/out.csv"),
            Some(Command::Download(Some("/srv/out.csv".into())))
        );
        assert_eq!(Command::parse("/frobnicate x"), Some(Command::Unknown("frobnicate".into())));
    }

    #[tokio::test]
    async fn test_save_download_uses_file_name() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested");

        let saved = save_download(&target, "/srv/agent/out/report.csv", b"a,b\n")
            .await
            .unwrap();

        assert_eq!(saved, target.join("report.csv"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"a,b\n");
    }

    #[tokio::test]
    async fn test_save_download_without_file_name() {
        let dir = TempDir::new().unwrap();
        let saved = save_download(dir.path(), "/", b"x").await.unwrap();
        assert_eq!(saved, dir.path().join("download"));
    }
}
