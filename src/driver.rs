//! Manejo de archivos de entrada y salida.
//!
//! Cada archivo `Foo.jack` es una unidad de compilación independiente
//! que produce `Foo.vm`. Ningún estado se comparte entre archivos, por
//! lo cual el fallo de uno no afecta a los demás.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use bitflags::bitflags;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    engine,
    error::Diagnostics,
    lex::{self, Lexer, Token},
    source::{self, Located, Location},
};

/// Extensión de archivos fuente.
pub const SOURCE_EXTENSION: &str = "jack";

bitflags! {
    /// Opciones del driver.
    pub struct Options: u32 {
        /// Escribir también el listado XML de tokens, `FooT.xml`.
        const DUMP_TOKENS = 0x01;

        /// Ante un archivo con errores, continuar con los demás.
        ///
        /// El resultado global sigue siendo un fallo.
        const KEEP_GOING = 0x02;
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I/O error on {}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Not a Jack source file: {}", .0.display())]
    NotJack(PathBuf),

    #[error("{0}")]
    Compile(#[from] Diagnostics),
}

/// Determina los archivos fuente que corresponden a una ruta.
///
/// Un directorio aporta todos sus archivos `.jack` (sin recursión),
/// ordenados por nombre. Un archivo debe tener extensión `.jack`.
pub fn collect_sources(path: &Path) -> Result<Vec<PathBuf>, DriverError> {
    let io_error = |source| DriverError::Io {
        path: path.to_owned(),
        source,
    };

    if !path.is_dir() {
        if !is_jack(path) {
            return Err(DriverError::NotJack(path.to_owned()));
        }

        fs::metadata(path).map_err(io_error)?;
        return Ok(vec![path.to_owned()]);
    }

    let mut sources = Vec::new();
    for entry in fs::read_dir(path).map_err(io_error)? {
        let entry = entry.map_err(io_error)?.path();
        if entry.is_file() && is_jack(&entry) {
            sources.push(entry);
        }
    }

    sources.sort();
    trace!("{} sources found in {}", sources.len(), path.display());

    Ok(sources)
}

/// Ruta de un archivo derivado, junto al archivo fuente.
///
/// `output_path("dir/Foo.jack", "T", "xml")` es `dir/FooT.xml`.
pub fn output_path(source: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    source.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

/// Análisis léxico completo de una unidad de compilación.
pub fn tokenize<R, S>(reader: R, name: S) -> Result<(Location, Vec<Located<Token>>), Diagnostics>
where
    R: BufRead,
    S: Into<String>,
{
    let (start, stream) = source::consume(reader, name);
    let tokens = Lexer::new(start.clone(), stream)
        .try_exhaustive()
        .map_err(|errors| Diagnostics::from(errors).kind("Lexical error"))?;

    Ok((start, tokens))
}

/// Compila una unidad desde cualquier lector hacia cualquier escritor.
pub fn compile_source<R, S, W>(reader: R, name: S, output: W) -> Result<(), Diagnostics>
where
    R: BufRead,
    S: Into<String>,
    W: Write,
{
    let (start, tokens) = tokenize(reader, name)?;
    translate(tokens, start, output)
}

/// Compila un archivo `.jack`, escribiendo el código resultante en `output`.
pub fn compile_file<W: Write>(path: &Path, options: Options, output: W) -> Result<(), DriverError> {
    debug!("Compiling {}", path.display());

    let file = File::open(path).map_err(|source| DriverError::Io {
        path: path.to_owned(),
        source,
    })?;

    let (start, tokens) = tokenize(BufReader::new(file), path.display().to_string())?;

    if options.contains(Options::DUMP_TOKENS) {
        let listing = output_path(path, "T", "xml");
        trace!("Writing token listing to {}", listing.display());

        write_listing(&listing, &tokens).map_err(|source| DriverError::Io {
            path: listing,
            source,
        })?;
    }

    translate(tokens, start, output)?;
    Ok(())
}

fn translate<W: Write>(
    tokens: Vec<Located<Token>>,
    start: Location,
    mut output: W,
) -> Result<(), Diagnostics> {
    engine::compile(tokens, start.clone(), &mut output)
        .map_err(|error| Diagnostics::from(error).kind("Compile error"))?;

    output.flush().map_err(|error| {
        let error = engine::CompileError::from(error);
        Diagnostics::from(Located::at(error, start)).kind("Compile error")
    })
}

fn write_listing(path: &Path, tokens: &[Located<Token>]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    lex::write_xml(tokens, &mut writer)?;
    writer.flush()
}

fn is_jack(path: &Path) -> bool {
    path.extension().map_or(false, |extension| extension == SOURCE_EXTENSION)
}
