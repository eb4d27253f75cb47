// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe-based spawner over `tokio::process`

use super::{ChildControl, OutputChunk, ProcessSpawner, Signal, SpawnError, SpawnOptions, SpawnedChild};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 8192;
const OUTPUT_CHANNEL_DEPTH: usize = 64;

/// Spawns children with piped stdio. The priority hint is applied by
/// wrapping the command in `nice -n <hint>`; the workspace forbids
/// `unsafe`, which rules out a pre-exec setpriority call.
#[derive(Clone, Default)]
pub struct PipeSpawner;

impl PipeSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessSpawner for PipeSpawner {
    async fn spawn(
        &self,
        command: &Path,
        argv: &[String],
        options: SpawnOptions,
    ) -> Result<SpawnedChild, SpawnError> {
        let mut cmd = if cfg!(unix) && options.nice != 0 {
            let mut c = Command::new("nice");
            c.arg("-n").arg(options.nice.to_string()).arg(command);
            c
        } else {
            Command::new(command)
        };
        cmd.args(argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, val) in &options.env {
            cmd.env(key, val);
        }
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_DEPTH);
        if let Some(stdout) = stdout {
            tokio::spawn(pump(stdout, tx.clone(), OutputChunk::Stdout));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(pump(stderr, tx, OutputChunk::Stderr));
        }

        Ok(SpawnedChild::new(
            rx,
            stdin.map(|s| Box::new(s) as Box<dyn tokio::io::AsyncWrite + Send + Unpin>),
            Box::new(PipeChildControl { child }),
        ))
    }
}

/// Copy one child stream into the shared output channel.
async fn pump<R>(
    mut reader: R,
    tx: mpsc::Sender<OutputChunk>,
    wrap: fn(Vec<u8>) -> OutputChunk,
) where
    R: AsyncReadExt + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(wrap(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    }
}

struct PipeChildControl {
    child: tokio::process::Child,
}

#[async_trait]
impl ChildControl for PipeChildControl {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn kill(&mut self, signal: Signal) -> std::io::Result<()> {
        match signal {
            Signal::Kill => self.child.start_kill(),
            Signal::Term => {
                #[cfg(unix)]
                {
                    let Some(pid) = self.child.id() else {
                        return Ok(()); // already exited
                    };
                    nix::sys::signal::kill(
                        nix::unistd::Pid::from_raw(pid as i32),
                        nix::sys::signal::Signal::SIGTERM,
                    )
                    .map_err(|e| std::io::Error::other(e.to_string()))
                }
                #[cfg(not(unix))]
                {
                    self.child.start_kill()
                }
            }
        }
    }

    async fn wait(&mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
#[path = "pipe_tests.rs"]
mod tests;
