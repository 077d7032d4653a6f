//! Backends that delegate to an external program.
//!
//! Each call stages the input image in a fresh temporary directory, runs the
//! configured program with its argument template expanded, and reads the
//! result back. The directory is removed when the call returns, on success or
//! failure.
//!
//! A call never outlives its deadline: a program still running when the
//! deadline passes is killed and reaped before the staging directory goes.
//!
//! # Template Placeholders
//! - `{input}` / `{output}`: staged PNG paths
//! - `{model}`: model file path (super-resolution)
//! - `{model_home}`: directory of the located model (segmentation)
//! - `{algorithm}` / `{scale}`: super-resolution model settings

use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageFormat};

use crate::backends::{
    BackendError, SegmentationBackend, SegmentationSettings, SuperResolutionBackend,
    SuperResolutionModel,
};
use crate::config::CommandBackendConfig;
use crate::operation::ScaleFactor;

const INPUT_FILE: &str = "input.png";
const OUTPUT_FILE: &str = "output.png";
const STDERR_FILE: &str = "stderr.log";

/// Deadline used when none is configured; matches the default request timeout.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Segmentation through an external program such as `rembg`.
#[derive(Debug, Clone)]
pub struct CommandSegmentationBackend {
    config: CommandBackendConfig,
    deadline: Duration,
}

impl CommandSegmentationBackend {
    pub fn new(config: CommandBackendConfig) -> Self {
        Self {
            config,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Kill the program if it runs longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

impl SegmentationBackend for CommandSegmentationBackend {
    fn segment(
        &self,
        image: &DynamicImage,
        settings: &SegmentationSettings,
    ) -> Result<DynamicImage, BackendError> {
        let model_home = settings
            .model_home
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let mut env = Vec::new();
        if let (Some(var), Some(home)) = (&self.config.model_home_env, &settings.model_home) {
            env.push((var.clone(), home.clone()));
        }

        run_staged(
            &self.config,
            self.deadline,
            image,
            &[("model_home", model_home)],
            &env,
        )
    }
}

/// Super-resolution through an external program.
#[derive(Debug, Clone)]
pub struct CommandSuperResolutionBackend {
    config: CommandBackendConfig,
    deadline: Duration,
}

impl CommandSuperResolutionBackend {
    pub fn new(config: CommandBackendConfig) -> Self {
        Self {
            config,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Kill the program if it runs longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

impl SuperResolutionBackend for CommandSuperResolutionBackend {
    fn load_model(
        &self,
        path: &Path,
        algorithm: &str,
        scale: ScaleFactor,
    ) -> Result<Box<dyn SuperResolutionModel>, BackendError> {
        if !path.is_file() {
            return Err(BackendError::Output(format!(
                "model file {} is not readable",
                path.display()
            )));
        }

        tracing::debug!(
            model = %path.display(),
            algorithm,
            scale = %scale,
            "Super-resolution model loaded"
        );

        Ok(Box::new(CommandSuperResolutionModel {
            config: self.config.clone(),
            deadline: self.deadline,
            model_path: path.to_path_buf(),
            algorithm: algorithm.to_string(),
            scale,
        }))
    }
}

/// A model bound to the program that runs it.
#[derive(Debug)]
struct CommandSuperResolutionModel {
    config: CommandBackendConfig,
    deadline: Duration,
    model_path: PathBuf,
    algorithm: String,
    scale: ScaleFactor,
}

impl SuperResolutionModel for CommandSuperResolutionModel {
    fn upsample(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        let mut env = Vec::new();
        if let (Some(var), Some(home)) = (&self.config.model_home_env, self.model_path.parent()) {
            env.push((var.clone(), home.to_path_buf()));
        }

        run_staged(
            &self.config,
            self.deadline,
            image,
            &[
                ("model", self.model_path.display().to_string()),
                ("algorithm", self.algorithm.clone()),
                ("scale", self.scale.to_string()),
            ],
            &env,
        )
    }
}

/// Replace `{name}` placeholders in a single argument.
fn expand(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |arg, (name, value)| {
        arg.replace(&format!("{{{}}}", name), value)
    })
}

fn run_staged(
    config: &CommandBackendConfig,
    deadline: Duration,
    image: &DynamicImage,
    vars: &[(&str, String)],
    env: &[(String, PathBuf)],
) -> Result<DynamicImage, BackendError> {
    let staging = tempfile::Builder::new().prefix("imgops-").tempdir()?;
    let input = staging.path().join(INPUT_FILE);
    let output = staging.path().join(OUTPUT_FILE);
    let stderr_path = staging.path().join(STDERR_FILE);

    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(std::io::Error::other)?;
    fs::write(&input, &encoded)?;

    let mut all_vars = vec![
        ("input", input.display().to_string()),
        ("output", output.display().to_string()),
    ];
    all_vars.extend(vars.iter().map(|(k, v)| (*k, v.clone())));

    let args: Vec<String> = config.args.iter().map(|a| expand(a, &all_vars)).collect();

    tracing::debug!(program = %config.program, args = ?args, "Running backend program");

    // Nothing drains a pipe while polling, so stderr goes to a file.
    let mut command = Command::new(&config.program);
    command
        .args(&args)
        .current_dir(staging.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(File::create(&stderr_path)?);
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(|source| BackendError::Spawn {
        program: config.program.clone(),
        source,
    })?;

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= deadline {
            tracing::warn!(
                program = %config.program,
                deadline_ms = deadline.as_millis() as u64,
                "Backend program exceeded its deadline, killing it"
            );
            // The program may exit between the poll and the kill.
            let _ = child.kill();
            child.wait()?;
            return Err(BackendError::TimedOut {
                program: config.program.clone(),
                deadline,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
        return Err(BackendError::ExitStatus {
            program: config.program.clone(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    let bytes = fs::read(&output).map_err(|e| {
        BackendError::Output(format!(
            "expected {} from '{}': {}",
            OUTPUT_FILE, config.program, e
        ))
    })?;

    image::load_from_memory(&bytes).map_err(|e| BackendError::Output(e.to_string()))
}
