//! # Ejecución del Compilador
//! src/tasks/runner.rs
//!
//! Lanza el compilador externo para una tarea:
//!
//! ```text
//! <program> <args...> <output-dir-flag>=<dir> <entry>   (cwd = dir)
//! ```
//!
//! stdout y stderr se leen línea por línea en threads auxiliares y se
//! registran mientras el proceso corre (stdout en `info`, stderr en `warn`).
//! Sólo el exit code 0 es éxito.
//!
//! En unix el compilador corre en su propio grupo de procesos: al vencer el
//! timeout se mata el grupo entero, incluidos los procesos que lance
//! (`latexmk` → `xelatex`).

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, dispatcher, info, warn, Span};

/// Intervalo de sondeo mientras hay timeout configurado
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Salida capturada de una compilación exitosa
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compiler exited with {}: {}", exit_label(.code), last_lines(.stderr))]
    Exit { code: Option<i32>, stderr: String },

    #[error("compile timed out after {0:?}")]
    TimedOut(Duration),

    #[error("entry file not found: {0}")]
    MissingEntry(PathBuf),

    #[error("failed waiting for compiler: {0}")]
    Wait(#[source] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Últimas líneas no vacías, para que el log no explote
fn last_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

/// Algo capaz de compilar un documento dentro de un directorio
pub trait Compile: Send + Sync {
    fn compile(&self, entry: &Path, working_dir: &Path) -> Result<RunOutput, RunError>;
}

/// Línea de comando del compilador
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommand {
    pub program: String,
    pub args: Vec<String>,

    /// Flag para fijar el directorio de salida; `None` no lo agrega
    pub output_dir_flag: Option<String>,

    /// `None` espera indefinidamente
    pub timeout: Option<Duration>,
}

impl Default for CompilerCommand {
    fn default() -> Self {
        Self {
            program: "latexmk".to_string(),
            args: vec!["-pdf".to_string(), "-xelatex".to_string()],
            output_dir_flag: Some("-output-directory".to_string()),
            timeout: None,
        }
    }
}

impl CompilerCommand {
    /// Argumentos completos para una compilación
    pub fn build_args(&self, entry: &Path, working_dir: &Path) -> Vec<String> {
        let mut args = self.args.clone();

        if let Some(flag) = &self.output_dir_flag {
            args.push(format!("{}={}", flag, working_dir.display()));
        }

        args.push(entry.display().to_string());
        args
    }
}

/// Ejecuta el compilador como proceso hijo
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    command: CompilerCommand,
}

impl ProcessRunner {
    pub fn new(command: CompilerCommand) -> Self {
        Self { command }
    }

    /// Lee un stream línea por línea dentro del span de la tarea
    ///
    /// El thread lector usa el mismo subscriber que quien compila.
    fn drain<R>(stream: R, label: &'static str) -> JoinHandle<String>
    where
        R: Read + Send + 'static,
    {
        let span = Span::current();
        let dispatch = dispatcher::get_default(|current| current.clone());

        thread::spawn(move || {
            let _guard = dispatcher::set_default(&dispatch);
            let _entered = span.enter();
            let mut reader = BufReader::new(stream);
            let mut collected = String::new();
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        match label {
                            "stderr" => warn!(stream = label, "{}", text.trim_end()),
                            _ => info!(stream = label, "{}", text.trim_end()),
                        }
                        collected.push_str(&text);
                    }
                }
            }

            collected
        })
    }

    /// Espera al hijo; con timeout lo mata al vencer el plazo
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, RunError> {
        let Some(timeout) = self.command.timeout else {
            return child.wait().map_err(RunError::Wait);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(RunError::Wait)? {
                return Ok(status);
            }

            if start.elapsed() >= timeout {
                kill_tree(child);
                let _ = child.wait();
                return Err(RunError::TimedOut(timeout));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Mata al hijo junto con todo su grupo de procesos
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };

    // SAFETY: `kill` sólo envía una señal; el grupo lo creó `spawn`
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// El compilador lidera un grupo de procesos nuevo
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

impl Compile for ProcessRunner {
    fn compile(&self, entry: &Path, working_dir: &Path) -> Result<RunOutput, RunError> {
        if !entry.is_file() {
            return Err(RunError::MissingEntry(entry.to_path_buf()));
        }

        let args = self.command.build_args(entry, working_dir);
        debug!(program = %self.command.program, ?args, "Spawning compiler");

        let start = Instant::now();
        let mut command = Command::new(&self.command.program);
        command
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);

        let mut child = command
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(|s| Self::drain(s, "stdout"));
        let stderr = child.stderr.take().map(|s| Self::drain(s, "stderr"));

        // Tras un timeout los lectores quedan sueltos y terminan con el EOF
        let status = self.wait(&mut child)?;

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();

        if !status.success() {
            return Err(RunError::Exit {
                code: status.code(),
                stderr,
            });
        }

        Ok(RunOutput {
            stdout,
            stderr,
            elapsed: start.elapsed(),
        })
    }
}
