//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco horizontales y los comentarios se descartan durante esta
//! operación, pero los saltos de línea son significativos: la gramática está
//! orientada a líneas, por lo cual cada salto se emite como [`Token::Eol`].
//! Cada token emitido está asociado a una ubicación en el código fuente
//! original.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de lo
//! que son y no incluyen lexemas. Identificadores y literales sí incluyen su
//! texto. Los literales numéricos conservan su lexema original; su conversión
//! a valores ocurre durante generación de código.
//!
//! # Reglas importantes del lenguaje
//! - Un identificador que comienza con `__` es global ([`Token::GlobalId`]).
//! - El lenguaje es sensible a mayúsculas: `Num` es palabra clave, `num` no.
//! - `"""` abre una cadena multilínea cruda, que termina solo con `"""`.
//! - Los comentarios de bloque `/* */` se pueden anidar.
//! - Un comentario de línea que ocupa una línea completa la elimina por
//!   completo, incluyendo su salto de línea.
//!
//! # Errores
//! Un carácter desconocido produce [`Token::Error`] y un byte que no es UTF-8
//! válido produce [`Token::InvalidByte`]. En ambos casos el lexer avanza más
//! allá del problema, por lo cual siempre es posible continuar. El único
//! error fatal en esta fase es un fallo de E/S en el flujo de entrada.

use crate::source::{InputStream, Located, Location, Position, Unit};
use log::trace;
use std::{
    collections::VecDeque,
    fmt::{self, Display},
    io,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error while reading source: {0}")]
    Input(#[from] io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Byte que no forma parte de una secuencia UTF-8 válida.
    #[error("Byte 0x{0:02X} is not valid UTF-8")]
    BadEncoding(u8),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal `{0}` is malformed or out of range")]
    IntOverflow(String),

    /// Una constante de punto flotante no es representable.
    #[error("Float literal `{0}` is malformed or out of range")]
    BadFloat(String),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(Rc::from(name))
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Fin del flujo de entrada. Se repite indefinidamente.
    Eof,

    /// Salto de línea.
    Eol,

    /// Carácter que no corresponde a ninguna regla léxica.
    Error(char),

    /// Byte inválido en la codificación de la entrada.
    InvalidByte(u8),

    /// Identificador local.
    Id(Identifier),

    /// Identificador global, de la forma `__nombre`.
    GlobalId(Identifier),

    /// Literal entero, decimal o hexadecimal.
    IntLiteral(String),

    /// Literal con parte fraccionaria y/o exponente.
    FloatLiteral(String),

    /// Cadena con secuencias de escape ya resueltas, como bytes.
    StrLiteral(Vec<u8>),

    /// Cadena multilínea, sin procesamiento de escapes.
    MultilineStrLiteral(Vec<u8>),

    /// `null`
    Null,

    /// Palabra clave.
    Keyword(Keyword),

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `=`
    Assign,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `<=`
    LessEqual,

    /// `>=`
    GreaterEqual,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `,`
    Comma,

    /// `.`
    Period,

    /// `:`
    Colon,

    /// `?`
    Question,

    /// `..`
    Range,

    /// `...`
    RangeInclusive,

    /// `&&`
    And,

    /// `||`
    Or,

    /// `!`
    Not,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Eof => fmt.write_str("end of file"),
            Eol => fmt.write_str("end of line"),
            Error(c) => write!(fmt, "bad character {:?}", c),
            InvalidByte(byte) => write!(fmt, "invalid byte 0x{:02X}", byte),
            Id(id) => write!(fmt, "identifier `{}`", id),
            GlobalId(id) => write!(fmt, "global identifier `{}`", id),
            IntLiteral(text) | FloatLiteral(text) => write!(fmt, "literal `{}`", text),
            StrLiteral(text) | MultilineStrLiteral(text) => {
                write!(fmt, "string {:?}", String::from_utf8_lossy(text))
            }

            Null => fmt.write_str("`null`"),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Assign => fmt.write_str("`=`"),
            Less => fmt.write_str("`<`"),
            Greater => fmt.write_str("`>`"),
            LessEqual => fmt.write_str("`<=`"),
            GreaterEqual => fmt.write_str("`>=`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            Comma => fmt.write_str("`,`"),
            Period => fmt.write_str("`.`"),
            Colon => fmt.write_str("`:`"),
            Question => fmt.write_str("`?`"),
            Range => fmt.write_str("`..`"),
            RangeInclusive => fmt.write_str("`...`"),
            And => fmt.write_str("`&&`"),
            Or => fmt.write_str("`||`"),
            Not => fmt.write_str("`!`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Class,
    If,
    Else,
    Is,
    Return,
    Var,
    While,
    Static,
    Import,
    For,
    Ifj,
    Num,
    String,
    NullType,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Class    => "class",
            If       => "if",
            Else     => "else",
            Is       => "is",
            Return   => "return",
            Var      => "var",
            While    => "while",
            Static   => "static",
            Import   => "import",
            For      => "for",
            Ifj      => "Ifj",
            Num      => "Num",
            String   => "String",
            NullType => "Null",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("class",  Class),
            ("if",     If),
            ("else",   Else),
            ("is",     Is),
            ("return", Return),
            ("var",    Var),
            ("while",  While),
            ("static", Static),
            ("import", Import),
            ("for",    For),
            ("Ifj",    Ifj),
            ("Num",    Num),
            ("String", String),
            ("Null",   NullType),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Escáner de un solo uso sobre un flujo de caracteres.
///
/// Mantiene una ventana de lookahead de hasta tres caracteres, suficiente
/// para distinguir `"""` de `""` y `...` de `..`.
pub struct Scanner<S: InputStream> {
    source: S,
    lookahead: VecDeque<(Unit, Position)>,
    origin: Location,
    previous: Position,
    next: Position,
    failure: Option<io::Error>,
    line_has_token: bool,
    finished: bool,
}

impl<S: InputStream> Scanner<S> {
    /// Crea un escáner a partir de un flujo y la ubicación de su inicio.
    pub fn new(start: Location, source: S) -> Self {
        let next = start.start();
        Scanner {
            source,
            lookahead: VecDeque::with_capacity(3),
            origin: start,
            previous: next,
            next,
            failure: None,
            line_has_token: false,
            finished: false,
        }
    }

    /// Obtiene el siguiente token.
    ///
    /// Una vez agotada la entrada, todas las llamadas subsecuentes
    /// producen [`Token::Eof`].
    pub fn next_token(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        self.skip_trivia();

        let start = self.here();
        let token = match self.bump_unit() {
            Some(Ok(c)) => self.lex(c),
            Some(Err(byte)) => Token::InvalidByte(byte),
            None => Token::Eof,
        };

        let end = match token {
            Token::Eof => start.advance(),
            _ => self.previous.advance(),
        };

        let location = self.origin.rebase(start, end);
        if let Some(error) = self.failure.take() {
            return Err(Located::at(LexerError::Input(error), location));
        }

        self.line_has_token = token != Token::Eol;

        trace!("{} at {}", token, location);
        Ok(Located::at(token, location))
    }

    /// Descarta espacios en blanco horizontales y comentarios.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('\n'), _) => break,
                (Some(c), _) if c.is_ascii_whitespace() => {
                    self.bump();
                }

                (Some('/'), Some('/')) => self.line_comment(),
                (Some('/'), Some('*')) => self.block_comment(),
                _ => break,
            }
        }
    }

    fn line_comment(&mut self) {
        while !matches!(self.peek(0), None | Some('\n')) {
            self.bump();
        }

        // Una línea que solo contiene un comentario desaparece por completo
        if !self.line_has_token {
            self.bump();
        }
    }

    fn block_comment(&mut self) {
        self.bump();
        self.bump();

        let mut depth = 1u32;
        while depth > 0 {
            match (self.peek(0), self.peek(1)) {
                (None, _) => break,
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }

                (Some('*'), Some('/')) => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                }

                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Construye el token que inicia con `c`, ya consumido.
    fn lex(&mut self, c: char) -> Token {
        use Token::*;

        match c {
            c if c.is_ascii_alphabetic() || c == '_' => self.word(c),
            c if c.is_ascii_digit() => self.number(c),
            '"' => self.string(),

            '\n' => Eol,
            '+' => Plus,
            '-' => Minus,
            '*' => Times,
            '/' => Slash,
            '(' => OpenParen,
            ')' => CloseParen,
            '{' => OpenCurly,
            '}' => CloseCurly,
            ',' => Comma,
            ':' => Colon,
            '?' => Question,

            '=' if self.eat('=') => Equal,
            '=' => Assign,
            '<' if self.eat('=') => LessEqual,
            '<' => Less,
            '>' if self.eat('=') => GreaterEqual,
            '>' => Greater,
            '!' if self.eat('=') => NotEqual,
            '!' => Not,
            '&' if self.eat('&') => And,
            '|' if self.eat('|') => Or,

            '.' => match (self.peek(0), self.peek(1)) {
                (Some('.'), Some('.')) => {
                    self.bump();
                    self.bump();
                    RangeInclusive
                }

                (Some('.'), _) => {
                    self.bump();
                    Range
                }

                _ => Period,
            },

            other => Error(other),
        }
    }

    /// Término que puede ser un identificador o una palabra clave.
    fn word(&mut self, first: char) -> Token {
        let global = first == '_' && self.peek(0) == Some('_');

        let mut word = first.to_string();
        while let Some(c) = self.peek(0).filter(|&c| is_word_char(c)) {
            word.push(c);
            self.bump();
        }

        if global {
            Token::GlobalId(Identifier::from(word))
        } else if word == "null" {
            Token::Null
        } else if let Ok(keyword) = Keyword::from_str(&word) {
            Token::Keyword(keyword)
        } else {
            Token::Id(Identifier::from(word))
        }
    }

    /// Constante numérica. El signo no forma parte del literal.
    fn number(&mut self, first: char) -> Token {
        let mut text = first.to_string();

        if first == '0' && matches!(self.peek(0), Some('x') | Some('X')) {
            self.take_into(&mut text);
            self.take_while(&mut text, |c| c.is_ascii_hexdigit());
            return Token::IntLiteral(text);
        }

        self.take_while(&mut text, |c| c.is_ascii_digit());

        let mut float = false;
        if self.peek(0) == Some('.') && self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
            float = true;
            self.take_into(&mut text);
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }

        if matches!(self.peek(0), Some('e') | Some('E')) {
            float = true;
            self.take_into(&mut text);

            if matches!(self.peek(0), Some('+') | Some('-')) {
                self.take_into(&mut text);
            }

            self.take_while(&mut text, |c| c.is_ascii_digit());
        }

        if float {
            Token::FloatLiteral(text)
        } else {
            Token::IntLiteral(text)
        }
    }

    /// Cadena literal; la comilla de apertura ya se consumió.
    ///
    /// El contenido se conserva como bytes, ya que `\xHH` puede producir
    /// cualquier byte. Si la cadena contiene un byte inválido de la entrada,
    /// se consume completa y se reemplaza por [`Token::InvalidByte`].
    fn string(&mut self) -> Token {
        let mut text = Vec::new();
        let mut invalid = None;

        if self.peek(0) == Some('"') && self.peek(1) == Some('"') {
            self.bump();
            self.bump();

            loop {
                match (self.peek(0), self.peek(1), self.peek(2)) {
                    (None, _, _) => break,
                    (Some('"'), Some('"'), Some('"')) => {
                        self.bump();
                        self.bump();
                        self.bump();
                        break;
                    }

                    _ => self.take_unit(&mut text, &mut invalid),
                }
            }

            return match invalid {
                Some(byte) => Token::InvalidByte(byte),
                None => Token::MultilineStrLiteral(text),
            };
        }

        // Un salto de línea sin escapar termina la cadena sin consumirse
        loop {
            match self.peek(0) {
                None | Some('\n') => break,
                Some('"') => {
                    self.bump();
                    break;
                }

                Some('\\') => {
                    self.bump();
                    if let Err(byte) = self.escape(&mut text) {
                        invalid.get_or_insert(byte);
                    }
                }

                Some(_) => self.take_unit(&mut text, &mut invalid),
            }
        }

        match invalid {
            Some(byte) => Token::InvalidByte(byte),
            None => Token::StrLiteral(text),
        }
    }

    /// Secuencia de escape; la barra invertida ya se consumió.
    ///
    /// `\xHH` agrega exactamente el byte indicado.
    fn escape(&mut self, text: &mut Vec<u8>) -> Result<(), u8> {
        let escaped = match self.bump_unit() {
            Some(Ok(c)) => c,
            Some(Err(byte)) => return Err(byte),
            None => return Ok(()),
        };

        match escaped {
            'n' => text.push(b'\n'),
            'r' => text.push(b'\r'),
            't' => text.push(b'\t'),
            'x' => {
                let mut digits = String::new();
                for _ in 0..2 {
                    match self.peek(0).filter(char::is_ascii_hexdigit) {
                        Some(_) => self.take_into(&mut digits),
                        None => break,
                    }
                }

                text.push(u8::from_str_radix(&digits, 16).unwrap_or(0));
            }

            // Incluye `\\` y `\"`; escapes desconocidos se toman literalmente
            other => push_char(text, other),
        }

        Ok(())
    }

    /// Posición del siguiente carácter, o del fin de archivo.
    fn here(&mut self) -> Position {
        self.fill(0);
        self.lookahead
            .front()
            .map_or(self.next, |&(_, position)| position)
    }

    /// Observa un carácter adelante sin consumirlo.
    ///
    /// Un byte inválido se observa como U+FFFD.
    fn peek(&mut self, offset: usize) -> Option<char> {
        self.fill(offset);
        self.lookahead
            .get(offset)
            .map(|&(unit, _)| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn bump(&mut self) -> Option<char> {
        self.bump_unit()
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn bump_unit(&mut self) -> Option<Unit> {
        self.fill(0);

        let (unit, position) = self.lookahead.pop_front()?;
        self.previous = position;
        self.next = position.after(unit);

        Some(unit)
    }

    fn eat(&mut self, expected: char) -> bool {
        let matches = self.peek(0) == Some(expected);
        if matches {
            self.bump();
        }

        matches
    }

    fn take_into(&mut self, text: &mut String) {
        if let Some(c) = self.bump() {
            text.push(c);
        }
    }

    /// Agrega la siguiente unidad a una cadena, recordando el primer byte inválido.
    fn take_unit(&mut self, text: &mut Vec<u8>, invalid: &mut Option<u8>) {
        match self.bump_unit() {
            Some(Ok(c)) => push_char(text, c),
            Some(Err(byte)) => {
                invalid.get_or_insert(byte);
            }

            None => (),
        }
    }

    fn take_while<F>(&mut self, text: &mut String, accept: F)
    where
        F: Fn(char) -> bool,
    {
        while self.peek(0).map_or(false, &accept) {
            self.take_into(text);
        }
    }

    /// Extiende el lookahead hasta incluir `offset`, si la entrada lo permite.
    ///
    /// Un error de E/S se retiene hasta que [`Scanner::next_token`] lo
    /// reporte, y a partir de ese punto la entrada se considera agotada.
    fn fill(&mut self, offset: usize) {
        while self.lookahead.len() <= offset && self.failure.is_none() {
            match self.source.next() {
                Some(Ok(item)) => self.lookahead.push_back(item),
                Some(Err(error)) => self.failure = Some(error),
                None => break,
            }
        }
    }
}

impl<S: InputStream> Iterator for Scanner<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    /// Recorre todos los tokens, incluyendo un único [`Token::Eof`] final.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        self.finished = matches!(result, Ok(ref token) if *token.val() == Token::Eof) || result.is_err();

        Some(result)
    }
}

fn push_char(text: &mut Vec<u8>, c: char) {
    text.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    fn scan(input: &[u8]) -> Vec<Token> {
        let (start, stream) = source::consume(input, "test");
        Scanner::new(start, stream)
            .map(|token| token.unwrap().into_inner())
            .collect()
    }

    fn tokens(input: &str) -> Vec<Token> {
        scan(input.as_bytes())
    }

    fn id(name: &str) -> Token {
        Token::Id(Identifier::from(name))
    }

    #[test]
    fn comment_line_float_and_global() {
        assert_eq!(
            tokens("// c\n123.5e+2\nvar __x\n"),
            vec![
                Token::FloatLiteral("123.5e+2".into()),
                Token::Eol,
                Token::Keyword(Keyword::Var),
                Token::GlobalId(Identifier::from("__x")),
                Token::Eol,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn trailing_comment_keeps_line_break() {
        assert_eq!(
            tokens("x // note\ny"),
            vec![id("x"), Token::Eol, id("y"), Token::Eof]
        );
    }

    #[test]
    fn nested_block_comment() {
        assert_eq!(tokens("/* a /* b */ c */"), vec![Token::Eof]);
        assert_eq!(tokens("a /* x /* y */ */ b"), vec![id("a"), id("b"), Token::Eof]);
    }

    #[test]
    fn escapes_are_resolved() {
        assert_eq!(
            tokens("\"a\\nb\""),
            vec![Token::StrLiteral("a\nb".into()), Token::Eof]
        );

        assert_eq!(
            tokens(r#""\x41\t\"\\q\q""#),
            vec![Token::StrLiteral("A\t\"\\qq".into()), Token::Eof]
        );
    }

    #[test]
    fn hex_escapes_are_single_bytes() {
        assert_eq!(
            tokens(r#""\xff\x7F\xC3""#),
            vec![Token::StrLiteral(vec![0xFF, 0x7F, 0xC3]), Token::Eof]
        );

        assert_eq!(
            tokens("\"é\""),
            vec![Token::StrLiteral(vec![0xC3, 0xA9]), Token::Eof]
        );
    }

    #[test]
    fn invalid_bytes_are_recoverable() {
        assert_eq!(
            scan(b"a \xFF b"),
            vec![id("a"), Token::InvalidByte(0xFF), id("b"), Token::Eof]
        );

        assert_eq!(
            scan(b"\"x\xFEy\" z"),
            vec![Token::InvalidByte(0xFE), id("z"), Token::Eof]
        );

        assert_eq!(scan(b"// \xFF\nz"), vec![id("z"), Token::Eof]);
    }

    #[test]
    fn multiline_string_is_raw() {
        assert_eq!(
            tokens("\"\"\"raw\ntext\"\"\""),
            vec![Token::MultilineStrLiteral("raw\ntext".into()), Token::Eof]
        );

        assert_eq!(
            tokens(r#""""a\nb""""#),
            vec![Token::MultilineStrLiteral("a\\nb".into()), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_stops_at_line_break() {
        assert_eq!(
            tokens("\"abc\nx"),
            vec![Token::StrLiteral("abc".into()), Token::Eol, id("x"), Token::Eof]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("0x1F 42 3.25 7e3 1.5E-2 5"),
            vec![
                Token::IntLiteral("0x1F".into()),
                Token::IntLiteral("42".into()),
                Token::FloatLiteral("3.25".into()),
                Token::FloatLiteral("7e3".into()),
                Token::FloatLiteral("1.5E-2".into()),
                Token::IntLiteral("5".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn sign_is_not_part_of_number() {
        assert_eq!(
            tokens("-1"),
            vec![Token::Minus, Token::IntLiteral("1".into()), Token::Eof]
        );
    }

    #[test]
    fn operators() {
        use Token::*;

        assert_eq!(
            tokens("== != <= >= < > = && || ! .. ... . : ? + - * /"),
            vec![
                Equal, NotEqual, LessEqual, GreaterEqual, Less, Greater, Assign, And, Or, Not,
                Range, RangeInclusive, Period, Colon, Question, Plus, Minus, Times, Slash, Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(
            tokens("Num num null Null Ifj ifj class"),
            vec![
                Token::Keyword(Keyword::Num),
                id("num"),
                Token::Null,
                Token::Keyword(Keyword::NullType),
                Token::Keyword(Keyword::Ifj),
                id("ifj"),
                Token::Keyword(Keyword::Class),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn single_underscore_is_local() {
        assert_eq!(
            tokens("_a __b"),
            vec![id("_a"), Token::GlobalId(Identifier::from("__b")), Token::Eof]
        );
    }

    #[test]
    fn bad_characters_are_recoverable() {
        assert_eq!(
            tokens("a @ & b"),
            vec![id("a"), Token::Error('@'), Token::Error('&'), id("b"), Token::Eof]
        );
    }

    #[test]
    fn token_positions() {
        let (start, stream) = source::consume("var x\n  y".as_bytes(), "test");
        let located: Vec<_> = Scanner::new(start, stream).map(Result::unwrap).collect();

        let starts: Vec<_> = located
            .iter()
            .map(|token| (token.location().start().line(), token.location().start().column()))
            .collect();

        assert_eq!(starts, vec![(1, 1), (1, 5), (1, 6), (2, 3), (2, 4)]);
        assert_eq!(located[0].location().end().column(), 4);
    }

    #[test]
    fn end_of_file_repeats() {
        let (start, stream) = source::consume("x".as_bytes(), "test");
        let mut scanner = Scanner::new(start, stream);

        assert_eq!(*scanner.next_token().unwrap().val(), id("x"));
        for _ in 0..3 {
            assert_eq!(*scanner.next_token().unwrap().val(), Token::Eof);
        }
    }
}
