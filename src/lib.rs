//! Compilador de IFJ25 a IFJcode25.
//!
//! # Estructura
//! Cada programa deriva de un único flujo de código fuente, el cual se
//! somete a análisis léxico en [`lex`]. A diferencia de un compilador de
//! varias fases, no se construye un árbol sintáctico: el parser en
//! [`parse`] consume tokens uno a la vez y, conforme reconoce cada
//! producción, consulta y actualiza las tablas de [`symtable`] a través
//! del contexto de [`semantic`] y emite de inmediato instrucciones
//! descritas en [`ir`] por medio de [`codegen`].
//!
//! # Errores
//! El primer error detectado determina el código de salida del proceso,
//! pero todos los errores quedan registrados en un único
//! [`error::Diagnostics`]. La salida generada después del primer error
//! no es necesariamente un programa válido.

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod source;
pub mod symtable;

use error::Outcome;
use std::io::{BufRead, Write};

/// Compila un programa completo de `input` hacia `output`.
///
/// `name` identifica al origen en los diagnósticos.
pub fn compile<R, W>(input: R, name: &str, output: W) -> Outcome
where
    R: BufRead,
    W: Write,
{
    let (start, stream) = source::consume(input, name);
    parse::Parser::new(start, stream, output).run()
}
