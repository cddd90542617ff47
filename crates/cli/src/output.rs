//! Terminal output for the `distpipe` binary.
//!
//! Human-readable status goes to stdout and failures to stderr, so `--output json` can
//! print a single document on stdout while logs stay on stderr.

use std::fmt::Display;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use distpipe_lib::pipeline::Stage;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Leading marker of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Note,
}

impl Status {
  fn marker(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Note => "•",
    }
  }
}

/// Print a one-line status message. Failures go to stderr.
pub fn status(kind: Status, message: impl Display) {
  let marker = kind.marker();
  match kind {
    Status::Done => println!("{} {}", marker.if_supports_color(Stream::Stdout, |m| m.green()), message),
    Status::Note => println!("{} {}", marker.if_supports_color(Stream::Stdout, |m| m.blue()), message),
    Status::Failed => {
      let message = message.to_string();
      eprintln!(
        "{} {}",
        marker.if_supports_color(Stream::Stderr, |m| m.red()),
        message.if_supports_color(Stream::Stderr, |m| m.red())
      );
    }
  }
}

/// Report a pipeline failure, naming the stage it came from when there is one.
pub fn stage_failed(stage: Option<Stage>, err: impl Display) {
  match stage {
    Some(stage) => status(Status::Failed, format_args!("{} stage failed: {}", stage, err)),
    None => status(Status::Failed, err),
  }
}

/// Start a titled block of fields or items.
pub fn heading(title: &str) {
  println!();
  println!("{}:", title.if_supports_color(Stream::Stdout, |t| t.bold()));
}

/// An indented `label: value` line.
pub fn field(label: &str, value: impl Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()), value);
}

/// An indented list item.
pub fn item(value: impl Display) {
  println!("  • {}", value);
}

/// An indented `from → to` line.
pub fn mapping(from: impl Display, to: impl Display) {
  println!("  {} → {}", from, to);
}

/// Artifact sizes in binary units, e.g. `12.4 MiB`.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

/// Elapsed time at millisecond precision in humantime form, e.g. `1m 5s 20ms`.
pub fn format_elapsed(elapsed: Duration) -> String {
  let millis = Duration::from_millis(elapsed.as_millis() as u64);
  humantime::format_duration(millis).to_string()
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
