use std::io::Write;
use std::process::{Command, Stdio};

/// Destination for the copy affordance on code blocks.
pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), String>;
}

/// Copies through whichever platform clipboard command is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), String> {
        for (cmd, args) in COMMANDS {
            if pipe_to(cmd, args, text).is_ok() {
                return Ok(());
            }
        }
        Err("no clipboard command available".to_string())
    }
}

type CommandLine = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const COMMANDS: &[CommandLine] = &[("pbcopy", &[])];
#[cfg(target_os = "windows")]
const COMMANDS: &[CommandLine] = &[("cmd", &["/C", "clip"])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const COMMANDS: &[CommandLine] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

fn pipe_to(cmd: &str, args: &[&str], input: &str) -> Result<(), String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| format!("`{cmd}` not available"))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| format!("`{cmd}`: {e}"))?;
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(format!("`{cmd}` failed")),
    }
}
