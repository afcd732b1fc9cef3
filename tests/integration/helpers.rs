//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Environment variables the binary reads; cleared so the host CI cannot leak in
const AMBIENT_ENV: &[&str] = &[
  "GITHUB_REF",
  "GITHUB_REPOSITORY",
  "GITHUB_TOKEN",
  "GH_TOKEN",
  "SHIP_LOG",
];

/// A throwaway source checkout: git repo plus a single binary package
pub struct TestCheckout {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestCheckout {
  /// Empty directory with an initialized git repo (no Cargo.toml)
  pub fn empty() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    Ok(Self { _root: root, path })
  }

  /// Checkout of a package named `name` with one `[[bin]]` of the same name
  pub fn with_package(name: &str) -> Result<Self> {
    let checkout = Self::empty()?;

    std::fs::write(
      checkout.path.join("Cargo.toml"),
      format!(
        r#"[package]
name = "{}"
version = "0.1.0"
edition = "2021"

[dependencies]
"#,
        name
      ),
    )?;
    std::fs::create_dir_all(checkout.path.join("src"))?;
    std::fs::write(
      checkout.path.join("src/main.rs"),
      "fn main() {\n    println!(\"hello\");\n}\n",
    )?;

    git(&checkout.path, &["add", "."])?;
    git(&checkout.path, &["commit", "-m", "Initial commit"])?;

    Ok(checkout)
  }

  /// Write ship.toml at the checkout root
  pub fn write_config(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("ship.toml"), content)?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Command for the cargo-ship binary with a clean environment
pub fn ship_command(cwd: &Path, args: &[&str]) -> Command {
  let mut cmd = Command::new(env!("CARGO_BIN_EXE_cargo-ship"));
  cmd.current_dir(cwd).args(args);
  for var in AMBIENT_ENV {
    cmd.env_remove(var);
  }
  cmd
}

/// Run cargo-ship and return its output whatever the exit status
pub fn run_cargo_ship_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  ship_command(cwd, args).output().context("Failed to run cargo-ship")
}

/// Run cargo-ship, failing unless it exits successfully
pub fn run_cargo_ship(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_cargo_ship_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cargo-ship command failed: cargo {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
