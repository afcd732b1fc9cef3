//! Collaborator process execution with deadlines
//!
//! Toolchain and installer invocations are bounded by a caller-supplied
//! timeout. Output is drained on background threads so a chatty child can
//! never block on a full pipe while we poll for its exit.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for output pipes after killing a timed-out child.
/// Grandchildren may keep the pipes open; we stop waiting on them.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Captured result of a collaborator process
#[derive(Debug)]
pub struct ProcessOutput {
  /// `None` when the deadline expired and the child was killed
  pub status: Option<ExitStatus>,
  pub stdout: String,
  pub stderr: String,
  pub elapsed: Duration,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.status.is_some_and(|s| s.success())
  }

  pub fn timed_out(&self) -> bool {
    self.status.is_none()
  }

  /// Human-readable failure detail: exit reason plus the tail of stderr
  pub fn failure_detail(&self, timeout: Duration, tail: usize) -> String {
    let reason = match self.status {
      None => format!("timed out after {}s", timeout.as_secs()),
      Some(status) => match status.code() {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
      },
    };
    let stderr = tail_lines(&self.stderr, tail);
    if stderr.is_empty() {
      reason
    } else {
      format!("{}\n{}", reason, stderr)
    }
  }
}

/// Spawn `cmd`, capture its output, and kill it if it outlives `timeout`.
///
/// Spawn errors (missing program, permissions) are returned as `Err`;
/// non-zero exits and timeouts are reported through [`ProcessOutput`].
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> io::Result<ProcessOutput> {
  cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

  let started = Instant::now();
  let mut child = cmd.spawn()?;
  let stdout = child.stdout.take().map(drain);
  let stderr = child.stderr.take().map(drain);

  let deadline = started + timeout;
  let status = loop {
    if let Some(status) = child.try_wait()? {
      break Some(status);
    }
    let now = Instant::now();
    if now >= deadline {
      tracing::debug!(?cmd, "deadline expired, killing child");
      let _ = child.kill();
      let _ = child.wait();
      break None;
    }
    thread::sleep(POLL_INTERVAL.min(deadline - now));
  };

  let grace = if status.is_some() { None } else { Some(KILL_GRACE) };
  Ok(ProcessOutput {
    status,
    stdout: collect(stdout, grace),
    stderr: collect(stderr, grace),
    elapsed: started.elapsed(),
  })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
  let (tx, rx) = mpsc::channel();
  thread::spawn(move || {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    let _ = tx.send(buf);
  });
  rx
}

fn collect(rx: Option<Receiver<Vec<u8>>>, grace: Option<Duration>) -> String {
  let Some(rx) = rx else {
    return String::new();
  };
  let bytes = match grace {
    Some(grace) => rx.recv_timeout(grace).unwrap_or_default(),
    None => rx.recv().unwrap_or_default(),
  };
  String::from_utf8_lossy(&bytes).into_owned()
}

/// Last `n` non-empty lines of `text`
pub fn tail_lines(text: &str, n: usize) -> String {
  let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
  let start = lines.len().saturating_sub(n);
  lines[start..].join("\n")
}

/// Render a command line for logs and dry-run output
pub fn display_command(cmd: &Command) -> String {
  let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
  parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
  parts.join(" ")
}
