//! `trivium compile`: build IR, assembly, an object file or an executable.

use super::{load_config, read_program};
use anyhow::{bail, Context};
use std::io::Write;
use std::path::{Path, PathBuf};
use trivium_compiler::{Machine, Pipeline, Stage};

pub struct CompileArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub machine: Option<Machine>,
    pub emit: Option<Stage>,
    pub keep_intermediates: bool,
    pub config: Option<PathBuf>,
}

pub fn execute(args: CompileArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;

    let machine = args.machine.unwrap_or(config.compiler.machine);
    let mut toolchain = config.toolchain;
    if args.keep_intermediates {
        toolchain.keep_intermediates = true;
    }

    let requested = args.emit.or(config.compiler.emit);
    let (stage, output) = match (requested, args.output) {
        (Some(stage), Some(output)) => (stage, output),
        (Some(stage), None) => (stage, default_output(&args.file, stage)),
        (None, Some(output)) => (Stage::from_path(&output), output),
        (None, None) => (Stage::Exe, default_output(&args.file, Stage::Exe)),
    };

    let expr = read_program(&args.file)?;
    let pipeline = Pipeline::new(machine, toolchain);
    tracing::info!(%machine, %stage, output = %output.display(), "compiling");

    if is_stdout(&output) {
        if !stage.is_text() {
            bail!(
                "stage {} cannot be written to stdout; use --emit ir or --emit asm",
                stage
            );
        }
        let text = pipeline.render(&expr, stage)?;
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(text.as_bytes())
            .context("cannot write to stdout")?;
        return Ok(());
    }

    pipeline
        .run(&expr, stage, &output)
        .with_context(|| format!("cannot build {}", output.display()))?;
    Ok(())
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Source name with the stage's extension; no extension for executables.
fn default_output(file: &Path, stage: Stage) -> PathBuf {
    let output = match stage {
        Stage::Ir => file.with_extension("ir"),
        Stage::Asm => file.with_extension("s"),
        Stage::Obj => file.with_extension("o"),
        Stage::Exe => file.with_extension(""),
    };
    if output == file {
        file.with_extension("out")
    } else {
        output
    }
}
