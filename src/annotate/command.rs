//! Runs the annotate tool for one file.
//!
//! The tool is started as `<tool> <absolute file path>` without a shell.
//! Stdout is fed line by line into a `BlameParser`, stderr is collected in
//! memory, and the exit code decides what the file gets:
//! - `0` → the parsed records
//! - `4` → placeholder records (binary or otherwise unblameable file)
//! - anything else → `BlameError::ToolInvocation`

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::annotate::parser::BlameParser;
use crate::error::{BlameError, Result};
use crate::models::{BlameLine, InputFile};

/// Exit code the tool uses for files it refuses to blame.
pub const SKIPPED_FILE_EXIT_CODE: i32 = 4;

/// Command line of one annotate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateCommand {
    program: PathBuf,
    file: PathBuf,
}

impl AnnotateCommand {
    pub fn new(tool: &Path, file: &Path) -> Self {
        Self {
            program: tool.to_path_buf(),
            file: file.to_path_buf(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for AnnotateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program.display(), self.file.display())
    }
}

/// What the tool produced for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Blamed(Vec<BlameLine>),
    /// Exit code 4; `lines` holds one placeholder per source line
    Skipped {
        lines: Vec<BlameLine>,
        command: String,
        stderr: String,
    },
}

impl Annotation {
    pub fn into_lines(self) -> Vec<BlameLine> {
        match self {
            Annotation::Blamed(lines) | Annotation::Skipped { lines, .. } => lines,
        }
    }
}

/// Warning printed when a file is skipped.
pub fn skip_warning(relative_path: &str, command: &str, stderr: &str) -> String {
    format!(
        "WARN: skipping {} because of TFS blame command [{}] failed: {}",
        relative_path, command, stderr
    )
}

pub async fn annotate(tool: &Path, file: &InputFile, timeout: Option<Duration>) -> Result<Annotation> {
    let command = AnnotateCommand::new(tool, file.absolute_path());
    tracing::debug!("Executing: {}", command);

    let mut parser = BlameParser::new();
    let (code, stderr) = match execute(&command, &mut parser, timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return Err(BlameError::ToolInvocation {
                path: file.relative_path().to_string(),
                command: command.to_string(),
                reason: e.to_string(),
                stderr: String::new(),
            });
        }
    };

    match code {
        Some(0) => parser
            .finish(file.lines())
            .map(Annotation::Blamed)
            .map_err(|failure| BlameError::Parse {
                path: file.relative_path().to_string(),
                command: command.to_string(),
                reason: failure.to_string(),
                stderr,
            }),
        Some(SKIPPED_FILE_EXIT_CODE) => Ok(Annotation::Skipped {
            lines: BlameLine::placeholders(file.lines()),
            command: command.to_string(),
            stderr,
        }),
        other => Err(BlameError::ToolInvocation {
            path: file.relative_path().to_string(),
            command: command.to_string(),
            reason: match other {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            },
            stderr,
        }),
    }
}

async fn execute(
    command: &AnnotateCommand,
    parser: &mut BlameParser,
    timeout: Option<Duration>,
) -> io::Result<(Option<i32>, String)> {
    match timeout {
        None => run(command, parser, false).await,
        Some(limit) => tokio::time::timeout(limit, run(command, parser, true))
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, format!("no exit after {:?}", limit))
            })?,
    }
}

async fn run(
    command: &AnnotateCommand,
    parser: &mut BlameParser,
    kill_on_drop: bool,
) -> io::Result<(Option<i32>, String)> {
    let mut child = Command::new(&command.program)
        .arg(&command.file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(kill_on_drop)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("Failed to capture annotate stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("Failed to capture annotate stderr"))?;

    let (consumed, captured) = tokio::join!(consume_stdout(stdout, parser), read_stderr(stderr));
    consumed?;
    let captured = captured?;

    let status = child.wait().await?;
    Ok((status.code(), captured))
}

async fn consume_stdout<R: AsyncRead + Unpin>(stdout: R, parser: &mut BlameParser) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        parser.consume_line(line.strip_suffix('\n').unwrap_or(&line));
    }
}

async fn read_stderr<R: AsyncRead + Unpin>(stderr: R) -> io::Result<String> {
    let mut buf = Vec::new();
    BufReader::new(stderr).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
}
