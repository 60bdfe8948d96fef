//! Contexto de compilación y verificaciones semánticas.
//!
//! No existe una fase semántica separada: el parser consulta a este
//! módulo conforme reconoce cada construcción. El [`Context`] es el único
//! estado mutable de la compilación. Contiene al escáner, la tabla global,
//! la tabla local del invocable actual, el latch de errores y los
//! contadores de etiquetas y temporales.
//!
//! # Alcances
//! Existe a lo sumo una tabla local activa. Entrar a un nuevo invocable
//! descarta la tabla anterior por completo; no hay alcances por bloque.

use crate::{
    error::{CompileError, Diagnostics, ErrorCode, Halt, Latch, Outcome, Parse},
    ir::{Label, Var},
    lex::{Identifier, LexerError, Scanner, Token},
    source::{InputStream, Located, Location},
    symtable::{self, callable_key, global_key, Callable, CallableKind, Symbol, SymbolTable, Type},
};

use log::debug;
use std::fmt::{self, Display};
use thiserror::Error;

/// Profundidad máxima de anidamiento de expresiones y bloques.
pub const MAX_DEPTH: u32 = 128;

/// Funciones integradas del módulo `Ifj` y su aridad.
const BUILTINS: &[(&str, usize)] = &[
    ("read_str", 0),
    ("read_num", 0),
    ("write", 1),
    ("floor", 1),
    ("str", 1),
    ("length", 1),
    ("substring", 3),
    ("strcmp", 2),
    ("ord", 2),
    ("chr", 1),
];

/// Aridad de una función integrada, si existe.
pub fn builtin_arity(name: &str) -> Option<usize> {
    BUILTINS
        .iter()
        .find(|&&(builtin, _)| builtin == name)
        .map(|&(_, arity)| arity)
}

/// Error semántico.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Undefined variable `{0}`")]
    UndefinedVariable(Identifier),

    #[error("No callable `{0}` takes {1} argument(s)")]
    UndefinedCallable(Identifier, usize),

    #[error("`Ifj.{0}` is not a built-in function")]
    UndefinedBuiltin(Identifier),

    #[error("Function `main` with no parameters is not defined")]
    NoMain,

    #[error("`Ifj.{name}` expects {expected} argument(s), found {found}")]
    BuiltinArity {
        name: Identifier,
        expected: usize,
        found: usize,
    },

    #[error("Variable `{0}` is already defined in this scope")]
    VariableRedefined(Identifier),

    #[error("The {0} `{1}` with {2} parameter(s) is already defined")]
    CallableRedefined(CallableKind, Identifier, usize),

    #[error("Result of call to `{0}` must be assigned")]
    BareCall(Identifier),

    #[error("Operator `{op}` cannot be applied to {left} and {right}")]
    TypeMismatch { op: BinOp, left: Type, right: Type },
}

impl SemanticError {
    /// Código de salida asociado.
    pub fn code(&self) -> ErrorCode {
        use SemanticError::*;

        match self {
            UndefinedVariable(_) | UndefinedCallable(..) | UndefinedBuiltin(_) | NoMain => {
                ErrorCode::Undefined
            }

            BuiltinArity { .. } => ErrorCode::ArgumentCount,
            VariableRedefined(_) | CallableRedefined(..) => ErrorCode::Redefinition,
            BareCall(_) => ErrorCode::Other,
            TypeMismatch { .. } => ErrorCode::TypeCompatibility,
        }
    }
}

/// Operador binario.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl BinOp {
    /// Tipo estático del resultado de aplicar el operador.
    ///
    /// Un operando de tipo [`Type::Undefined`] se acepta siempre, ya que
    /// su tipo real solo se conoce en tiempo de ejecución.
    pub fn result(self, left: Type, right: Type) -> Result<Type, SemanticError> {
        use BinOp::*;
        use Type::{Bool, Num, String, Undefined};

        let known = left != Undefined && right != Undefined;
        let result = match (self, left, right) {
            (Equal, _, _) | (NotEqual, _, _) => Some(Bool),

            (Add, Num, Num) | (Sub, Num, Num) | (Mul, Num, Num) | (Div, Num, Num) => Some(Num),
            (Add, String, String) | (Mul, String, Num) => Some(String),
            (Less, Num, Num) | (Greater, Num, Num) | (LessOrEqual, Num, Num) | (GreaterOrEqual, Num, Num) => {
                Some(Bool)
            }

            _ if known => None,

            (Sub, _, _) | (Div, _, _) => Some(Num),
            (Less, _, _) | (Greater, _, _) | (LessOrEqual, _, _) | (GreaterOrEqual, _, _) => Some(Bool),
            _ => Some(Undefined),
        };

        result.ok_or(SemanticError::TypeMismatch {
            op: self,
            left,
            right,
        })
    }
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinOp::*;

        let symbol = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            Greater => ">",
            LessOrEqual => "<=",
            GreaterOrEqual => ">=",
        };

        fmt.write_str(symbol)
    }
}

/// Alcance del invocable en compilación.
struct Scope {
    key: String,
    locals: SymbolTable,
}

/// Estado compartido por todas las reglas del parser.
pub struct Context<S: InputStream> {
    scanner: Scanner<S>,
    token: Located<Token>,
    globals: SymbolTable,
    scope: Option<Scope>,
    latch: Latch,
    diagnostics: Diagnostics,
    labels: u32,
    temps: u32,
    depth: u32,
}

impl<S: InputStream> Context<S> {
    /// Construye el contexto. Aún no se ha leído ningún token.
    pub fn new(start: Location, stream: S) -> Self {
        Context {
            token: Located::at(Token::Eol, start.clone()),
            scanner: Scanner::new(start, stream),
            globals: SymbolTable::new(),
            scope: None,
            latch: Latch::default(),
            diagnostics: Diagnostics::default(),
            labels: 0,
            temps: 0,
            depth: 0,
        }
    }

    /// Token actual.
    pub fn token(&self) -> &Located<Token> {
        &self.token
    }

    /// Reemplaza el token actual por el siguiente.
    ///
    /// Los caracteres y bytes inválidos se reportan como errores léxicos y
    /// se descartan. Un fallo de lectura detiene la compilación.
    pub fn advance(&mut self) -> Parse<()> {
        loop {
            match self.scanner.next_token() {
                Ok(token) => {
                    let error = match *token.val() {
                        Token::Error(c) => Some(LexerError::BadChar(c)),
                        Token::InvalidByte(byte) => Some(LexerError::BadEncoding(byte)),
                        _ => None,
                    };

                    match error {
                        Some(error) => self.report_at(error, token.location().clone()),
                        None => {
                            self.token = token;
                            return Ok(());
                        }
                    }
                }

                Err(error) => {
                    let (location, error) = error.split();
                    return Err(self.fail_at(error, location));
                }
            }
        }
    }

    /// Reporta un error en la ubicación del token actual.
    pub fn report<E: Into<CompileError>>(&mut self, error: E) {
        let location = self.token.location().clone();
        self.report_at(error, location);
    }

    /// Reporta un error en una ubicación arbitraria.
    pub fn report_at<E: Into<CompileError>>(&mut self, error: E, location: Location) {
        let error = error.into();
        debug!("{}: {}", location, error);

        self.latch.set(error.code());
        self.diagnostics.push(Located::at(error, location));
    }

    /// Reporta un error y produce el motivo de detención correspondiente.
    pub fn fail<E: Into<CompileError>>(&mut self, error: E) -> Halt {
        self.report(error);
        Halt::Reported
    }

    pub fn fail_at<E: Into<CompileError>>(&mut self, error: E, location: Location) -> Halt {
        self.report_at(error, location);
        Halt::Reported
    }

    pub fn latch(&self) -> &Latch {
        &self.latch
    }

    /// Ingresa a un nivel más de anidamiento.
    ///
    /// Cada llamada exitosa debe equilibrarse con [`Context::unnest`].
    pub fn nest(&mut self) -> Parse<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.fail(CompileError::TooDeep(MAX_DEPTH)));
        }

        self.depth += 1;
        Ok(())
    }

    pub fn unnest(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Genera una etiqueta de control de flujo única.
    pub fn next_label(&mut self) -> Label {
        let label = Label::Local(self.labels);
        self.labels += 1;
        label
    }

    /// Genera una variable temporal global única.
    pub fn next_temp(&mut self) -> Var {
        let temp = temp(self.temps);
        self.temps += 1;
        temp
    }

    /// Todas las temporales generadas hasta el momento.
    pub fn temporaries(&self) -> impl Iterator<Item = Var> {
        (0..self.temps).map(temp)
    }

    /// Registra un invocable e inicia su alcance.
    ///
    /// Los parámetros se registran como variables locales.
    pub fn enter(
        &mut self,
        name: &Located<Identifier>,
        kind: CallableKind,
        params: &[Located<Identifier>],
    ) -> Parse<Label> {
        let arity = params.len();
        let key = callable_key(name.val().as_ref(), arity);

        if self.globals.contains(&key) {
            let error = SemanticError::CallableRedefined(kind, name.val().clone(), arity);
            return Err(self.fail_at(error, name.location().clone()));
        }

        self.globals.insert(key.clone(), Symbol::Callable(Callable::new(kind)));

        debug!("entering {} `{}`", kind, key);
        self.scope = Some(Scope {
            key: key.clone(),
            locals: SymbolTable::new(),
        });

        for param in params {
            self.declare_variable(param)?;
        }

        Ok(Label::Callable(key))
    }

    /// Finaliza el alcance actual.
    pub fn leave(&mut self) {
        if let Some(scope) = self.scope.take() {
            debug!("leaving `{}` with {} local(s)", scope.key, scope.locals.len());
        }
    }

    /// Declara una variable en el alcance actual.
    pub fn declare_variable(&mut self, name: &Located<Identifier>) -> Parse<()> {
        let locals = match &mut self.scope {
            Some(scope) => &mut scope.locals,
            None => return Ok(()),
        };

        let key = name.val().as_ref();
        if locals.contains(key) {
            let error = SemanticError::VariableRedefined(name.val().clone());
            return Err(self.fail_at(error, name.location().clone()));
        }

        locals.insert(key, Symbol::Variable);
        Ok(())
    }

    /// Determina si una variable local existe en el alcance actual.
    pub fn resolve_variable(&self, name: &Identifier) -> bool {
        self.scope
            .as_ref()
            .and_then(|scope| scope.locals.find(name.as_ref()))
            .map_or(false, Symbol::is_variable)
    }

    /// Registra una variable global en su primera referencia.
    pub fn global_variable(&mut self, name: &Identifier) -> Var {
        let key = global_key(name.as_ref());
        if !self.globals.contains(&key) {
            debug!("new global `{}`", name);
            self.globals.insert(key, Symbol::Variable);
        }

        Var::global(name.as_ref())
    }

    /// Busca un invocable por nombre y aridad.
    pub fn resolve_callable(&self, name: &Identifier, arity: usize) -> Option<&Callable> {
        self.globals
            .find(&callable_key(name.as_ref(), arity))
            .and_then(Symbol::as_callable)
    }

    /// Variables globales registradas, en orden de llave.
    pub fn global_variables(&self) -> impl Iterator<Item = Var> + '_ {
        self.globals
            .iter()
            .filter(|(_, symbol)| symbol.is_variable())
            .filter_map(|(key, _)| symtable::global_name(key))
            .map(Var::global)
    }

    /// Verifica que exista la función `main` sin parámetros.
    pub fn entry_point(&self) -> bool {
        let main = self.resolve_callable(&Identifier::from("main"), 0);
        main.map_or(false, |main| main.kind() == CallableKind::Function)
    }

    /// Consume el contexto y produce el resultado final.
    pub fn finish(self) -> Outcome {
        Outcome {
            code: self.latch.code(),
            diagnostics: self.diagnostics,
        }
    }
}

fn temp(number: u32) -> Var {
    Var::global(&format!("%temp_{}", number))
}
