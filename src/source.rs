//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error. Como no existe un
//! árbol sintáctico, esto aplica principalmente a tokens y a los
//! diagnósticos que se derivan de ellos.

use std::{
    cell::RefCell,
    fmt::{self, Debug, Display, Formatter},
    io::{self, BufRead},
    iter,
    ops::Range,
    rc::Rc,
    str,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Unidad mínima de entrada.
///
/// Es un carácter, o bien un byte que no forma parte de ninguna secuencia
/// UTF-8 válida.
pub type Unit = Result<char, u8>;

/// Un flujo de entrada, unidad por unidad.
///
/// Cada unidad viene acompañada de su propia posición.
pub trait InputStream: Iterator<Item = io::Result<(Unit, Position)>> {}

impl<I: Iterator<Item = io::Result<(Unit, Position)>>> InputStream for I {}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
///
/// El final del rango es exclusivo.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Construye otra ubicación en el mismo origen.
    pub fn rebase(&self, start: Position, end: Position) -> Self {
        Location {
            from: Rc::clone(&self.from),
            position: start..end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() || end == start {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Construye una posición. Tanto líneas como columnas inician en 1.
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }

    /// Posición que sigue a una unidad ubicada en esta posición.
    pub fn after(self, unit: Unit) -> Position {
        match unit {
            Ok('\n') => self.newline(),
            Ok('\t') => self.tab(),
            _ => self.advance(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Transforma un flujo de entrada estándar en uno que itera por unidad.
///
/// La entrada se decodifica como UTF-8. Los bytes inválidos no detienen
/// la lectura, sino que se entregan como unidades propias. Los saltos de línea se preservan tal cual aparecen en la entrada, ya
/// que el lenguaje fuente los trata como tokens. La ubicación de retorno
/// corresponde al inicio del archivo y sirve como base para construir
/// las ubicaciones de los tokens.
pub fn consume<R, S>(reader: R, name: S) -> (Location, impl InputStream)
where
    R: BufRead,
    S: Into<String>,
{
    let source = Rc::new(Source {
        name: name.into(),
        lines: Default::default(),
    });

    let start = Location {
        from: Rc::clone(&source),
        position: Position::default()..Position::default().advance(),
    };

    let chars = Lines {
        reader,
        done: false,
    }
    .enumerate()
    .flat_map(move |(line_index, line)| {
        let source = Rc::clone(&source);

        Fallible::new(line.map(move |line| {
            let text = String::from_utf8_lossy(&line);
            source
                .lines
                .borrow_mut()
                .push(text.trim_end_matches(&['\n', '\r'][..]).to_owned());

            let mut here = Position {
                line: line_index as u32 + 1,
                column: 1,
            };

            decode(&line).into_iter().map(move |unit| {
                let position = here;
                here = here.after(unit);
                (unit, position)
            })
        }))
    })
    .fuse();

    (start, chars)
}

/// Descompone una línea en caracteres y bytes inválidos.
fn decode(mut bytes: &[u8]) -> Vec<Unit> {
    let mut units = Vec::with_capacity(bytes.len());

    loop {
        match str::from_utf8(bytes) {
            Ok(valid) => {
                units.extend(valid.chars().map(Ok));
                break units;
            }

            Err(error) => {
                let (valid, rest) = bytes.split_at(error.valid_up_to());
                if let Ok(valid) = str::from_utf8(valid) {
                    units.extend(valid.chars().map(Ok));
                }

                // Una secuencia truncada al final abarca el resto de la línea
                let invalid = error.error_len().unwrap_or(rest.len());
                units.extend(rest[..invalid].iter().copied().map(Err));
                bytes = &rest[invalid..];
            }
        }
    }
}

/// Nombre de origen e histórico interior de líneas.
pub struct Source {
    name: String,
    lines: RefCell<Vec<String>>,
}

impl Source {
    /// Invoca a `with` con el contenido de una línea ya leída.
    ///
    /// Las líneas que aún no se han leído se observan como vacías.
    pub fn with_line<F, R>(&self, line: u32, with: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let lines = self.lines.borrow();
        let index = (line as usize).saturating_sub(1);
        with(lines.get(index).map_or("", String::as_str))
    }
}

/// Lee líneas completas como bytes, conservando su terminador.
struct Lines<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }

            Ok(_) => Some(Ok(line)),

            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// Un iterador que emite un solo error o encapsula las salidas de
/// otro iterador en `Ok`, pero nunca ambas.
struct Fallible<I, E>(Result<I, iter::Once<E>>);

impl<I, E> Fallible<I, E> {
    /// Crea un iterador a partir de un `Result`.
    pub fn new(result: Result<I, E>) -> Self {
        Fallible(result.map_err(iter::once))
    }
}

impl<I: Iterator, E> Iterator for Fallible<I, E> {
    type Item = Result<I::Item, E>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            Ok(ok) => ok.next().map(Ok),
            Err(error) => error.next().map(Err),
        }
    }
}
