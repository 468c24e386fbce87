//! Colored diagnostics on stderr.
//!
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use crate::ColorArg;
use std::io::{IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Priority: `NO_COLOR` env > `--color` flag > whether stderr is a terminal.
pub fn resolve_color_choice(flag: ColorArg) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        ColorArg::Always => ColorChoice::Always,
        ColorArg::Never => ColorChoice::Never,
        ColorArg::Auto if std::io::stderr().is_terminal() => ColorChoice::Auto,
        ColorArg::Auto => ColorChoice::Never,
    }
}

/// `error: <message>: <cause>...` with the prefix in bold red.
pub fn report_error(error: &anyhow::Error, choice: ColorChoice) {
    let mut stderr = StandardStream::stderr(choice);
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    let _ = stderr.set_color(&spec);
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {:#}", error);
}
