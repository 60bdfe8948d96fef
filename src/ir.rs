//! Representación de instrucciones IFJcode25.
//!
//! El compilador no construye un programa intermedio completo: cada
//! [`Instruction`] se escribe en la salida tan pronto como se genera. Este
//! módulo únicamente define la forma tipada de las instrucciones y su
//! representación textual.

use crate::codegen::literal;
use bitflags::bitflags;
use std::fmt::{self, Display};

/// Marco de memoria de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Global,
    Local,
}

impl Display for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Global => fmt.write_str("GF"),
            Frame::Local => fmt.write_str("LF"),
        }
    }
}

/// Una variable de la máquina destino.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Var {
    pub frame: Frame,
    pub name: String,
}

impl Var {
    pub fn local(name: &str) -> Self {
        Var {
            frame: Frame::Local,
            name: name.to_owned(),
        }
    }

    pub fn global(name: &str) -> Self {
        Var {
            frame: Frame::Global,
            name: name.to_owned(),
        }
    }
}

impl Display for Var {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}@{}", self.frame, self.name)
    }
}

/// Una etiqueta de salto.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    /// Punto de entrada de un invocable, por llave `nombre_aridad`.
    Callable(String),

    /// Etiqueta interna de control de flujo.
    Local(u32),

    /// Código de arranque que se coloca al final del programa.
    Entry,
}

impl Label {
    pub fn callable(name: &str, arity: usize) -> Self {
        Label::Callable(crate::symtable::callable_key(name, arity))
    }
}

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Callable(key) => write!(fmt, "${}", key),
            Label::Local(number) => write!(fmt, "label_{}", number),
            Label::Entry => fmt.write_str("$$main"),
        }
    }
}

/// Operando de una instrucción: variable o constante.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Var(Var),
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Bool(bool),
    Nil,
}

impl From<Var> for Operand {
    fn from(var: Var) -> Self {
        Operand::Var(var)
    }
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(var) => write!(fmt, "{}", var),
            Operand::Int(int) => write!(fmt, "int@{}", int),
            Operand::Float(float) => write!(fmt, "float@{}", literal::hex_float(*float)),
            Operand::Str(string) => write!(fmt, "string@{}", literal::escape(string)),
            Operand::Bool(boolean) => write!(fmt, "bool@{}", boolean),
            Operand::Nil => fmt.write_str("nil@nil"),
        }
    }
}

/// Una instrucción IFJcode25.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Header,
    CreateFrame,
    PushFrame,
    PopFrame,
    DefVar(Var),
    Move(Var, Operand),
    Pushs(Operand),
    Pops(Var),
    Adds,
    Subs,
    Muls,
    Divs,
    Lts,
    Eqs,
    Ors,
    Nots,
    Type(Var, Operand),
    Label(Label),
    Jump(Label),
    JumpIfEqs(Label),
    Call(Label),

    /// Llamada a una función integrada del módulo `Ifj`.
    ///
    /// La máquina destino no define una instrucción para esto, por lo cual
    /// se emite como comentario.
    CallBuiltin(String),

    Return,
    Exit(Operand),
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Header => fmt.write_str(".IFJcode25"),
            CreateFrame => fmt.write_str("CREATEFRAME"),
            PushFrame => fmt.write_str("PUSHFRAME"),
            PopFrame => fmt.write_str("POPFRAME"),
            DefVar(var) => write!(fmt, "DEFVAR {}", var),
            Move(var, symbol) => write!(fmt, "MOVE {} {}", var, symbol),
            Pushs(symbol) => write!(fmt, "PUSHS {}", symbol),
            Pops(var) => write!(fmt, "POPS {}", var),
            Adds => fmt.write_str("ADDS"),
            Subs => fmt.write_str("SUBS"),
            Muls => fmt.write_str("MULS"),
            Divs => fmt.write_str("DIVS"),
            Lts => fmt.write_str("LTS"),
            Eqs => fmt.write_str("EQS"),
            Ors => fmt.write_str("ORS"),
            Nots => fmt.write_str("NOTS"),
            Type(var, symbol) => write!(fmt, "TYPE {} {}", var, symbol),
            Label(label) => write!(fmt, "LABEL {}", label),
            Jump(label) => write!(fmt, "JUMP {}", label),
            JumpIfEqs(label) => write!(fmt, "JUMPIFEQS {}", label),
            Call(label) => write!(fmt, "CALL {}", label),
            CallBuiltin(name) => write!(fmt, "# CALL Ifj.{}", name),
            Return => fmt.write_str("RETURN"),
            Exit(symbol) => write!(fmt, "EXIT {}", symbol),
        }
    }
}

bitflags! {
    /// Conjunto de nombres de tipo que reporta la instrucción `TYPE`.
    ///
    /// Un tipo del lenguaje fuente puede corresponder a varios tipos de
    /// la máquina destino, como `Num`, que abarca enteros y flotantes.
    pub struct TypeTags: u8 {
        const INT    = 0x01;
        const FLOAT  = 0x02;
        const STRING = 0x04;
        const NIL    = 0x08;
        const BOOL   = 0x10;

        const NUM = Self::INT.bits | Self::FLOAT.bits;
    }
}

impl TypeTags {
    /// Nombres de tipo en la máquina destino, en orden fijo.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        const NAMES: &[(TypeTags, &str)] = &[
            (TypeTags::INT, "int"),
            (TypeTags::FLOAT, "float"),
            (TypeTags::STRING, "string"),
            (TypeTags::NIL, "nil"),
            (TypeTags::BOOL, "bool"),
        ];

        NAMES
            .iter()
            .filter(move |(tag, _)| self.contains(*tag))
            .map(|&(_, name)| name)
    }
}
