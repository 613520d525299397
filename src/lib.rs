//! Compilador de Jack a código de máquina virtual.
//!
//! # Front end
//! Cada clase deriva de un único archivo de código fuente. Este archivo
//! se somete primero a análisis léxico en [`lex`], de lo cual se obtiene
//! un flujo de tokens. Los nombres declarados se registran en la tabla de
//! [`symbols`], la cual distingue entre el ámbito de clase y el ámbito
//! de subrutina.
//!
//! # Back end
//! No existe una representación intermedia. El motor de [`engine`]
//! reconoce la gramática con descenso recursivo y emite instrucciones
//! por medio de [`vm`] conforme avanza. Los errores de todas las fases se
//! ubican en el código fuente con [`source`] y se presentan por medio de
//! [`error`]. El manejo de archivos y opciones se encuentra en [`driver`].

#[macro_use]
mod macros;

pub mod driver;
pub mod engine;
pub mod error;
pub mod lex;
pub mod source;
pub mod symbols;
pub mod vm;
