//! Punto de entrada ("driver").
//!
//! Este módulo resuelve las rutas de entrada, elige el canal de salida
//! de cada archivo y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg, Command};
use jackc::driver::{self, Options};
use log::info;

use std::{
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parsing de CLI
    let args = Command::new("Jack compiler")
        .version(crate_version!())
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .takes_value(true)
                .multiple_values(true)
                .required(true)
                .help("Jack source file or directory of source files"),
        )
        .arg(
            Arg::new("print")
                .short('p')
                .long("print")
                .help("Write VM code to stdout instead of .vm files"),
        )
        .arg(
            Arg::new("tokens")
                .short('T')
                .long("tokens")
                .help("Also write a token listing to <Name>T.xml"),
        )
        .arg(
            Arg::new("keep-going")
                .short('k')
                .long("keep-going")
                .help("Continue with other files after a failure"),
        )
        .get_matches();

    let mut options = Options::empty();
    if args.is_present("tokens") {
        options |= Options::DUMP_TOKENS;
    }

    if args.is_present("keep-going") {
        options |= Options::KEEP_GOING;
    }

    let print = args.is_present("print");

    let mut sources = Vec::new();
    for path in args.values_of("path").into_iter().flatten() {
        let found = driver::collect_sources(Path::new(path))
            .map_err(|error| anyhow::anyhow!("{}", error))
            .with_context(|| format!("Bad input path: {}", path))?;

        sources.extend(found);
    }

    if sources.is_empty() {
        bail!("No Jack source files were found");
    }

    let mut failed = 0;
    for source in &sources {
        if !compile(source, options, print)? {
            failed += 1;
            if !options.contains(Options::KEEP_GOING) {
                break;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to compile", failed, sources.len());
    }

    Ok(())
}

/// Compila un archivo, reportando sus errores en stderr.
///
/// Solo falla ante errores que impiden siquiera intentar compilar.
fn compile(source: &Path, options: Options, print: bool) -> anyhow::Result<bool> {
    let result = if print {
        let stdout = io::stdout();
        driver::compile_file(source, options, stdout.lock())
    } else {
        let output = driver::output_path(source, "", "vm");
        let file = File::create(&output)
            .with_context(|| format!("Failed to open for writing: {}", output.display()))?;

        info!("{} -> {}", source.display(), output.display());
        driver::compile_file(source, options, BufWriter::new(file))
    };

    match result {
        Ok(()) => Ok(true),
        Err(error) => {
            eprintln!("{}", error.to_string().trim_end());
            Ok(false)
        }
    }
}
