//! Image builder that drives `oz-install` and `qemu-img` as subprocesses.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::domain::AppError;
use crate::domain::descriptor::descriptor_name;
use crate::ports::ImageBuilder;

/// Builds disk images by running an installer, then converting its output to qcow2.
#[derive(Debug, Clone)]
pub struct CommandImageBuilder {
    build_command: String,
    convert_command: String,
    image_dir: PathBuf,
}

impl CommandImageBuilder {
    pub fn new(
        build_command: impl Into<String>,
        convert_command: impl Into<String>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            build_command: build_command.into(),
            convert_command: convert_command.into(),
            image_dir: image_dir.into(),
        }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<(), AppError> {
        let rendered = format!("{} {}", program, args.join(" "));
        debug!("Running {}", rendered);

        let output = Command::new(program).args(args).output().map_err(|e| {
            AppError::BuildFailed { command: rendered.clone(), details: e.to_string() }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AppError::BuildFailed {
                command: rendered,
                details: if stderr.is_empty() { output.status.to_string() } else { stderr },
            });
        }

        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<&str, AppError> {
    path.to_str().ok_or_else(|| AppError::BuildFailed {
        command: "build".into(),
        details: format!("path is not valid UTF-8: {}", path.display()),
    })
}

/// Remove output left behind by an earlier build of the same descriptor.
fn remove_stale(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ImageBuilder for CommandImageBuilder {
    fn build(&self, descriptor: &str) -> Result<PathBuf, AppError> {
        let name = descriptor_name(descriptor)?;

        let mut descriptor_file =
            tempfile::Builder::new().prefix("prebake-").suffix(".tdl").tempfile()?;
        descriptor_file.write_all(descriptor.as_bytes())?;
        descriptor_file.flush()?;

        let disk = self.image_dir.join(format!("{}.dsk", name));
        let qcow2 = self.image_dir.join(format!("{}.qcow2", name));
        remove_stale(&disk)?;
        remove_stale(&qcow2)?;

        info!("Building image {} with {}", name, self.build_command);
        self.run(&self.build_command, &["-u", "-d", "3", path_arg(descriptor_file.path())?])?;

        if !disk.is_file() {
            return Err(AppError::BuildFailed {
                command: self.build_command.clone(),
                details: format!("expected disk image at {}", disk.display()),
            });
        }

        info!("Converting {} to qcow2", disk.display());
        self.run(
            &self.convert_command,
            &["convert", "-c", "-O", "qcow2", path_arg(&disk)?, path_arg(&qcow2)?],
        )?;

        Ok(qcow2)
    }
}
