// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Infrastructure adapter that runs external programs as OS processes.

use crate::domain::errors::{BackupError, Result};
use crate::ports::command_port::{CommandInvocation, CommandOutput, CommandRunner};
use log::{debug, info};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

/// Concrete implementation of `CommandRunner` on top of `std::process::Command`.
///
/// The child inherits the parent's environment plus the invocation's extra
/// variables, reads the invocation's stdin (or nothing), and the call blocks
/// until the process exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        info!("Executing: {}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| BackupError::ProcessError {
            program: invocation.program.clone(),
            status: "failed to start".to_string(),
            output: e.to_string(),
        })?;

        // Written from another thread so a child that fills its stdout pipe
        // before draining stdin cannot stall us.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(input)) => {
                Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit without reading everything; its status decides.
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(BackupError::IoError(e)),
                Err(_) => {
                    return Err(BackupError::ProcessError {
                        program: invocation.program.clone(),
                        status: "stdin writer panicked".to_string(),
                        output: String::new(),
                    })
                }
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}{}", stdout, stderr);

        if !output.status.success() {
            return Err(BackupError::ProcessError {
                program: invocation.program.clone(),
                status: output.status.to_string(),
                output: combined,
            });
        }

        debug!("{} finished: {}", invocation.program, combined.trim());
        Ok(CommandOutput { stdout, combined })
    }
}
