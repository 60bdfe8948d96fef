//! Errores de compilación, códigos de salida y diagnósticos.
//!
//! Cada fase define su propio tipo de error. Todos ellos se unifican en
//! [`CompileError`], que además asigna a cada error su código de salida.
//! Únicamente el primer error reportado determina el código final del
//! proceso, pero todos los errores quedan registrados en [`Diagnostics`].

use crate::{lex::LexerError, parse::ParserError, semantic::SemanticError, source::Located};
use std::{
    fmt::{self, Display},
    io,
};

use thiserror::Error;

/// Código de salida del compilador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    Lexical = 1,
    Syntax = 2,
    Undefined = 3,
    Redefinition = 4,
    ArgumentCount = 5,
    TypeCompatibility = 6,
    Other = 10,
    Internal = 99,
}

impl ErrorCode {
    /// Valor numérico para `exit()`.
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl Display for ErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorCode::*;

        let category = match self {
            Success => "success",
            Lexical => "lexical error",
            Syntax => "syntax error",
            Undefined => "undefined symbol",
            Redefinition => "redefinition",
            ArgumentCount => "wrong argument count",
            TypeCompatibility => "type error",
            Other => "semantic error",
            Internal => "internal error",
        };

        fmt.write_str(category)
    }
}

/// Cualquier error que el compilador puede reportar.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// Fallo al escribir el programa generado.
    #[error("Failed to write output: {0}")]
    Output(io::Error),

    /// Anidamiento más profundo de lo que el compilador admite.
    #[error("Expressions and blocks cannot be nested more than {0} levels deep")]
    TooDeep(u32),
}

impl CompileError {
    /// Código de salida asociado.
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Lexer(LexerError::Input(_)) => ErrorCode::Internal,
            CompileError::Lexer(_) => ErrorCode::Lexical,
            CompileError::Parser(_) => ErrorCode::Syntax,
            CompileError::Semantic(error) => error.code(),
            CompileError::Output(_) | CompileError::TooDeep(_) => ErrorCode::Internal,
        }
    }
}

/// Retiene el código del primer error reportado.
#[derive(Copy, Clone, Debug, Default)]
pub struct Latch(Option<ErrorCode>);

impl Latch {
    /// Registra un código. Retorna `true` si este fue el primero.
    pub fn set(&mut self, code: ErrorCode) -> bool {
        match self.0 {
            Some(_) => false,
            None => {
                self.0 = Some(code);
                true
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Código final: el primero registrado, o éxito.
    pub fn code(&self) -> ErrorCode {
        self.0.unwrap_or(ErrorCode::Success)
    }
}

/// Motivo por el cual una regla del parser se detiene.
#[derive(Debug)]
pub enum Halt {
    /// El error ya fue reportado a los diagnósticos.
    Reported,

    /// Falló la escritura de salida.
    Output(io::Error),
}

impl From<io::Error> for Halt {
    fn from(error: io::Error) -> Self {
        Halt::Output(error)
    }
}

/// Resultado de una regla del parser.
pub type Parse<T> = Result<T, Halt>;

/// Colección de errores con ubicación, lista para mostrarse.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Located<CompileError>>,
}

impl Diagnostics {
    pub fn push(&mut self, error: Located<CompileError>) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Located<CompileError>> {
        self.errors.iter()
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = &self.errors;
        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            let code = error.val().code();
            writeln!(fmt, "{} [{}]: {}", code, code.value(), error.val())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            let (from, to) = (location.start().column(), location.end().column().saturating_sub(1));
            let min = from.min(to).max(1);
            let max = from.max(to).max(1);

            let skip = (min - 1) as usize;
            let highlight = (max - min + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

/// Resultado de una compilación completa.
#[derive(Debug)]
pub struct Outcome {
    pub code: ErrorCode,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{self, Position};

    #[test]
    fn first_code_wins() {
        let mut latch = Latch::default();
        assert_eq!(latch.code(), ErrorCode::Success);

        assert!(latch.set(ErrorCode::Syntax));
        assert!(!latch.set(ErrorCode::Undefined));
        assert!(latch.is_set());
        assert_eq!(latch.code().value(), 2);
    }

    #[test]
    fn codes_by_phase() {
        let lexical = CompileError::from(LexerError::BadChar('@'));
        let input = CompileError::from(LexerError::Input(io::Error::new(io::ErrorKind::Other, "x")));
        let semantic = CompileError::from(SemanticError::BareCall("f".into()));

        assert_eq!(lexical.code(), ErrorCode::Lexical);
        assert_eq!(input.code(), ErrorCode::Internal);
        assert_eq!(semantic.code(), ErrorCode::Other);

        assert_eq!(CompileError::from(LexerError::BadEncoding(0xFF)).code(), ErrorCode::Lexical);
        assert_eq!(CompileError::TooDeep(8).code(), ErrorCode::Internal);
    }

    #[test]
    fn caret_underline() {
        let (start, stream) = source::consume("var @x\n".as_bytes(), "main.ifj");
        assert_eq!(stream.count(), 7);

        let mut diagnostics = Diagnostics::default();
        let location = start.rebase(Position::new(1, 5), Position::new(1, 6));
        diagnostics.push(Located::at(LexerError::BadChar('@').into(), location));

        let text = diagnostics.to_string();
        assert!(text.starts_with("lexical error [1]: Bad character '@' in input stream\n --> main.ifj:1:5\n"));
        assert!(text.contains("1 | var @x\n  |     ^\n"));
        assert!(text.ends_with("Build failed with 1 error\n"));
    }

    #[test]
    fn empty_diagnostics() {
        assert_eq!(Diagnostics::default().to_string(), "No errors were reported\n");
    }
}
