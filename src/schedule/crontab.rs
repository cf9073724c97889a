// src/schedule/crontab.rs

//! Once-a-minute crontab entry that drives `schedule run`.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::exec::CommandLine;

/// `* * * * * <exe> --config <config> schedule run >/dev/null 2>&1`.
pub fn crontab_line(exe: &Path, config: &Path) -> String {
    let cmd = CommandLine::new(exe.to_string_lossy())
        .arg("--config")
        .arg(config.to_string_lossy())
        .args(["schedule", "run"]);
    format!("* * * * * {cmd} >/dev/null 2>&1")
}

/// Replace the existing `schedule run` entry for `exe`, or append `line`.
///
/// Duplicated entries for the same binary collapse into one. Every other
/// line is kept as is.
pub fn merge_crontab(existing: &str, exe: &Path, line: &str) -> String {
    let exe = exe.to_string_lossy();
    let mut out: Vec<&str> = Vec::new();
    let mut replaced = false;

    for current in existing.lines() {
        let ours = !current.trim_start().starts_with('#')
            && current.contains(exe.as_ref())
            && current.contains(" schedule run");
        if ours {
            if !replaced {
                out.push(line);
                replaced = true;
            }
        } else {
            out.push(current);
        }
    }

    if !replaced {
        out.push(line);
    }

    let mut merged = out.join("\n");
    merged.push('\n');
    merged
}

/// Current user's crontab; empty if they have none yet.
pub async fn read_crontab() -> Result<String> {
    let output = Command::new("crontab")
        .arg("-l")
        .stdin(Stdio::null())
        .output()
        .await
        .context("running `crontab -l`")?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("no crontab for") {
        Ok(String::new())
    } else {
        bail!("`crontab -l` failed ({}): {}", output.status, stderr.trim());
    }
}

pub async fn write_crontab(contents: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning `crontab -`")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(contents.as_bytes())
            .await
            .context("writing new crontab")?;
    }

    let output = child.wait_with_output().await.context("waiting for `crontab -`")?;
    if !output.status.success() {
        bail!(
            "`crontab -` failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Install the entry for this binary and `config_path`. With `print_only`
/// the line is printed and the crontab is left alone.
pub async fn install(config_path: &Path, print_only: bool) -> Result<()> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let config = std::path::absolute(config_path)
        .with_context(|| format!("resolving config path {:?}", config_path))?;
    let line = crontab_line(&exe, &config);

    if print_only {
        println!("{line}");
        return Ok(());
    }

    let existing = read_crontab().await?;
    let merged = merge_crontab(&existing, &exe, &line);
    if merged == existing {
        info!(target: "cronfan::schedule", "crontab already up to date");
        return Ok(());
    }

    write_crontab(&merged).await?;
    info!(target: "cronfan::schedule", %line, "crontab entry installed");
    Ok(())
}
