//! HTML-to-Markdown conversion through an external program.

use crate::config::ConverterConfig;
use crate::error::{ConversionError, Error, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Flags that select GitHub-flavoured Markdown without hard wrapping.
pub const FORMAT_ARGS: [&str; 3] = ["--from=html", "--to=gfm", "--wrap=none"];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Converts one HTML document to Markdown.
pub trait Converter: Sync {
    fn convert(&self, html: &str) -> std::result::Result<String, ConversionError>;
}

/// Runs a converter binary (pandoc by default) once per document, feeding
/// HTML on stdin and reading Markdown from stdout.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalConverter {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    /// Make sure the program can be started at all, before any work begins.
    pub fn check_available(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                Error::ConverterUnavailable(format!("{}: {}", self.program.display(), e))
            })?;

        if !output.success() {
            return Err(Error::ConverterUnavailable(format!(
                "{} --version exited with {}",
                self.program.display(),
                output
            )));
        }
        Ok(())
    }

    fn spawn(&self) -> std::result::Result<Child, ConversionError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(FORMAT_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout also reaches helpers started by a
        // wrapper script.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn().map_err(ConversionError::Spawn)
    }
}

impl Converter for ExternalConverter {
    fn convert(&self, html: &str) -> std::result::Result<String, ConversionError> {
        let mut child = self.spawn()?;

        // Feed stdin and drain both pipes on their own threads so a large
        // document cannot deadlock against a full pipe buffer.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = html.to_string();
            thread::spawn(move || {
                // A converter that exits early closes the pipe; its exit
                // status carries the real error.
                let _ = stdin.write_all(input.as_bytes());
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                terminate(&mut child);
                // A descendant that left the group may still hold the pipes;
                // leave the reader threads detached.
                return Err(ConversionError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(ConversionError::NonZeroExit {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        String::from_utf8(stdout).map_err(|_| ConversionError::InvalidOutput)
    }
}

/// Kill the converter and everything in its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = -(child.id() as libc::pid_t);
        unsafe {
            libc::kill(group, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> std::result::Result<Vec<u8>, ConversionError> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConversionError::Io(std::io::Error::other("pipe reader panicked"))),
        },
        None => Ok(Vec::new()),
    }
}
