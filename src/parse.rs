//! Análisis sintáctico y generación de código.
//!
//! El parser es descendente recursivo con un solo token de lookahead. No
//! existe un árbol sintáctico: cada regla valida su construcción y emite
//! de inmediato las instrucciones correspondientes. Las expresiones se
//! evalúan sobre la pila de datos de la máquina destino, por lo cual el
//! orden de emisión queda completamente determinado por el orden de las
//! llamadas recursivas.
//!
//! # Convención de llamadas
//! El invocador empuja los argumentos de izquierda a derecha y ejecuta
//! `CALL`. El invocado crea y empuja su propio marco, extrae los
//! parámetros en orden inverso y deja su valor de retorno en la pila.

use crate::{
    codegen::{literal, Emitter},
    error::{CompileError, Halt, Outcome, Parse},
    ir::{Instruction, Label, Operand, TypeTags, Var},
    lex::{Identifier, Keyword, LexerError, Token},
    semantic::{self, BinOp, Context, SemanticError},
    source::{InputStream, Located, Location},
    symtable::{Callable, CallableKind, Type},
};

use std::io::Write;
use thiserror::Error;

/// Nombre del único módulo que se puede importar.
const MODULE: &str = "ifj25";

/// Nombre de la única clase del programa.
const CLASS: &str = "Program";

/// Error de sintaxis.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected identifier, found {0} instead")]
    ExpectedId(Token),

    #[error("Expected module name string, found {0} instead")]
    ExpectedString(Token),

    #[error("Only module \"ifj25\" can be imported, not {0:?}")]
    WrongModule(String),

    #[error("Main class must be named `Program`, not `{0}`")]
    WrongClass(Identifier),

    #[error("Expected `static` definition or `}}`, found {0} instead")]
    ExpectedDefinition(Token),

    #[error("Expected any of `var`, `if`, `while`, `return` or assignment, found {0} instead")]
    ExpectedStatement(Token),

    #[error("Expected an expression, found {0} instead")]
    ExpectedExpr(Token),

    #[error("Expected any of `Num`, `String`, `Null`, found {0} instead")]
    ExpectedType(Token),
}

/// Compilador de un solo paso.
pub struct Parser<S: InputStream, W: Write> {
    cx: Context<S>,
    output: Emitter<W>,
}

impl<S: InputStream, W: Write> Parser<S, W> {
    pub fn new(start: Location, stream: S, output: W) -> Self {
        Parser {
            cx: Context::new(start, stream),
            output: Emitter::new(output),
        }
    }

    /// Compila el programa completo.
    pub fn run(mut self) -> Outcome {
        let result = self
            .program()
            .and_then(|()| self.output.flush().map_err(Halt::from));

        if let Err(Halt::Output(error)) = result {
            self.cx.report(CompileError::Output(error));
        }

        self.cx.finish()
    }

    fn program(&mut self) -> Parse<()> {
        emit!(
            self,
            Instruction::Header,
            Instruction::CreateFrame,
            Instruction::PushFrame,
            Instruction::Jump(Label::Entry),
        );

        self.cx.advance()?;
        self.prolog()?;
        self.class()?;
        self.definitions()?;

        if self.cx.latch().is_set() {
            return Err(Halt::Reported);
        }

        self.epilog()
    }

    /// `import "ifj25" for Ifj`
    fn prolog(&mut self) -> Parse<()> {
        self.skip_eols()?;
        self.keyword(Keyword::Import)?;

        match self.token() {
            Token::StrLiteral(module) if module == MODULE.as_bytes() => (),
            Token::StrLiteral(module) => {
                let module = String::from_utf8_lossy(module).into_owned();
                return self.fail(ParserError::WrongModule(module));
            }

            other => {
                let other = other.clone();
                return self.fail(ParserError::ExpectedString(other));
            }
        }

        self.cx.advance()?;
        self.keyword(Keyword::For)?;
        self.keyword(Keyword::Ifj)?;
        self.expect(Token::Eol)
    }

    /// `class Program {`
    fn class(&mut self) -> Parse<()> {
        self.skip_eols()?;
        self.keyword(Keyword::Class)?;

        let (location, name) = self.id()?.split();
        if name.as_ref() != CLASS {
            return Err(self.cx.fail_at(ParserError::WrongClass(name), location));
        }

        self.expect(Token::OpenCurly)?;
        self.expect(Token::Eol)
    }

    /// Secuencia de definiciones hasta el `}` que cierra la clase.
    fn definitions(&mut self) -> Parse<()> {
        loop {
            self.skip_eols()?;
            if self.cx.latch().is_set() {
                return Err(Halt::Reported);
            }

            match self.token() {
                Token::Keyword(Keyword::Static) => self.definition()?,
                Token::CloseCurly => break,
                other => {
                    let other = other.clone();
                    return self.fail(ParserError::ExpectedDefinition(other));
                }
            }
        }

        self.cx.advance()?;
        self.skip_eols()?;
        self.expect(Token::Eof)
    }

    /// Función, getter o setter.
    fn definition(&mut self) -> Parse<()> {
        self.keyword(Keyword::Static)?;
        let name = self.id()?;

        let (kind, params) = match self.token() {
            Token::OpenParen => {
                self.cx.advance()?;
                let params = self.parameters()?;
                self.expect(Token::CloseParen)?;

                (CallableKind::Function, params)
            }

            Token::OpenCurly => (CallableKind::Getter, Vec::new()),

            Token::Assign => {
                self.cx.advance()?;
                self.expect(Token::OpenParen)?;
                let param = self.id()?;
                self.expect(Token::CloseParen)?;

                (CallableKind::Setter, vec![param])
            }

            other => {
                let other = other.clone();
                return self.fail(ParserError::UnexpectedToken(Token::OpenParen, other));
            }
        };

        self.callable(&name, kind, &params)
    }

    fn parameters(&mut self) -> Parse<Vec<Located<Identifier>>> {
        let mut params = Vec::new();
        if *self.token() == Token::CloseParen {
            return Ok(params);
        }

        loop {
            params.push(self.id()?);
            if *self.token() != Token::Comma {
                break Ok(params);
            }

            self.cx.advance()?;
        }
    }

    /// Cuerpo de un invocable, precedido por su etiqueta y su marco.
    fn callable(
        &mut self,
        name: &Located<Identifier>,
        kind: CallableKind,
        params: &[Located<Identifier>],
    ) -> Parse<()> {
        let label = self.cx.enter(name, kind, params)?;
        emit!(
            self,
            Instruction::Label(label),
            Instruction::CreateFrame,
            Instruction::PushFrame,
        );

        for param in params.iter().rev() {
            let var = Var::local(param.val().as_ref());
            emit!(self, Instruction::DefVar(var.clone()), Instruction::Pops(var));
        }

        self.block()?;

        // Retorno implícito
        emit!(
            self,
            Instruction::Pushs(Operand::Nil),
            Instruction::PopFrame,
            Instruction::Return,
        );

        self.cx.leave();
        Ok(())
    }

    /// `{` EOL sentencias `}`
    fn block(&mut self) -> Parse<()> {
        self.expect(Token::OpenCurly)?;

        self.cx.nest()?;
        let result = self.statements();
        self.cx.unnest();

        result
    }

    /// Sentencias hasta el `}` que cierra el bloque, inclusive.
    fn statements(&mut self) -> Parse<()> {
        loop {
            self.skip_eols()?;
            if self.cx.latch().is_set() {
                return Err(Halt::Reported);
            }

            if *self.token() == Token::CloseCurly {
                break self.cx.advance();
            }

            self.statement()?;
            match self.token() {
                Token::Eol | Token::CloseCurly => (),
                other => {
                    let other = other.clone();
                    return self.fail(ParserError::UnexpectedToken(Token::Eol, other));
                }
            }
        }
    }

    fn statement(&mut self) -> Parse<()> {
        match self.token() {
            Token::Keyword(Keyword::Var) => self.var_declaration(),
            Token::Keyword(Keyword::If) => self.if_statement(),
            Token::Keyword(Keyword::While) => self.while_statement(),
            Token::Keyword(Keyword::Return) => self.return_statement(),
            Token::Id(_) | Token::GlobalId(_) => self.assignment(),

            Token::Keyword(Keyword::Ifj) => {
                let name = Identifier::from(Keyword::Ifj.to_string());
                self.fail(SemanticError::BareCall(name))
            }

            other => {
                let other = other.clone();
                self.fail(ParserError::ExpectedStatement(other))
            }
        }
    }

    /// `var` IDENT
    fn var_declaration(&mut self) -> Parse<()> {
        self.keyword(Keyword::Var)?;

        let name = self.id()?;
        self.cx.declare_variable(&name)?;

        let var = Var::local(name.val().as_ref());
        emit!(
            self,
            Instruction::DefVar(var.clone()),
            Instruction::Move(var, Operand::Nil),
        );

        Ok(())
    }

    /// Asignación a variable local, global o setter.
    fn assignment(&mut self) -> Parse<()> {
        let (location, target) = self.next()?.split();

        match self.token() {
            Token::Assign => self.cx.advance()?,

            Token::OpenParen => {
                let name = match target {
                    Token::Id(name) | Token::GlobalId(name) => name,
                    other => Identifier::from(other.to_string()),
                };

                return Err(self.cx.fail_at(SemanticError::BareCall(name), location));
            }

            other => {
                let other = other.clone();
                return self.fail(ParserError::UnexpectedToken(Token::Assign, other));
            }
        }

        match target {
            Token::GlobalId(name) => {
                let var = self.cx.global_variable(&name);
                self.expression()?;
                emit!(self, Instruction::Pops(var));
            }

            Token::Id(name) if self.cx.resolve_variable(&name) => {
                self.expression()?;
                emit!(self, Instruction::Pops(Var::local(name.as_ref())));
            }

            Token::Id(name) => {
                let setter = self.cx.resolve_callable(&name, 1).map(Callable::kind);
                if setter != Some(CallableKind::Setter) {
                    return Err(self.cx.fail_at(SemanticError::UndefinedVariable(name), location));
                }

                self.expression()?;

                // El valor de retorno de un setter se descarta
                let discard = self.cx.next_temp();
                emit!(
                    self,
                    Instruction::Call(Label::callable(name.as_ref(), 1)),
                    Instruction::Pops(discard),
                );
            }

            other => {
                return Err(self.cx.fail_at(ParserError::ExpectedStatement(other), location));
            }
        }

        Ok(())
    }

    /// `if (` expr `)` block `else` block
    fn if_statement(&mut self) -> Parse<()> {
        self.keyword(Keyword::If)?;
        self.condition()?;

        let otherwise = self.cx.next_label();
        let end = self.cx.next_label();

        emit!(
            self,
            Instruction::Pushs(Operand::Bool(false)),
            Instruction::JumpIfEqs(otherwise.clone()),
        );

        self.block()?;
        emit!(
            self,
            Instruction::Jump(end.clone()),
            Instruction::Label(otherwise),
        );

        self.skip_eols()?;
        self.keyword(Keyword::Else)?;
        self.block()?;

        emit!(self, Instruction::Label(end));
        Ok(())
    }

    /// `while (` expr `)` block
    fn while_statement(&mut self) -> Parse<()> {
        self.keyword(Keyword::While)?;

        let start = self.cx.next_label();
        let end = self.cx.next_label();

        emit!(self, Instruction::Label(start.clone()));
        self.condition()?;
        emit!(
            self,
            Instruction::Pushs(Operand::Bool(false)),
            Instruction::JumpIfEqs(end.clone()),
        );

        self.block()?;
        emit!(
            self,
            Instruction::Jump(start),
            Instruction::Label(end),
        );

        Ok(())
    }

    fn condition(&mut self) -> Parse<Type> {
        self.expect(Token::OpenParen)?;
        let typ = self.expression()?;
        self.expect(Token::CloseParen)?;

        Ok(typ)
    }

    /// `return` [expr]
    fn return_statement(&mut self) -> Parse<()> {
        self.keyword(Keyword::Return)?;

        match self.token() {
            Token::Eol | Token::CloseCurly => emit!(self, Instruction::Pushs(Operand::Nil)),
            _ => {
                self.expression()?;
            }
        }

        emit!(self, Instruction::PopFrame, Instruction::Return);
        Ok(())
    }

    /// Expresión completa. Deja exactamente un valor en la pila.
    fn expression(&mut self) -> Parse<Type> {
        self.cx.nest()?;
        let typ = self.is_expression();
        self.cx.unnest();

        typ
    }

    /// relation [`is` TYPE]
    fn is_expression(&mut self) -> Parse<Type> {
        let typ = self.relation()?;
        if *self.token() != Token::Keyword(Keyword::Is) {
            return Ok(typ);
        }

        self.cx.advance()?;
        let tags = match self.token() {
            Token::Keyword(Keyword::Num) => TypeTags::NUM,
            Token::Keyword(Keyword::String) => TypeTags::STRING,
            Token::Keyword(Keyword::NullType) => TypeTags::NIL,
            other => {
                let other = other.clone();
                return self.fail(ParserError::ExpectedType(other));
            }
        };

        self.cx.advance()?;

        let value = self.cx.next_temp();
        let tag = self.cx.next_temp();
        emit!(
            self,
            Instruction::Pops(value.clone()),
            Instruction::Type(tag.clone(), value.into()),
        );

        for (index, name) in tags.names().enumerate() {
            emit!(
                self,
                Instruction::Pushs(tag.clone().into()),
                Instruction::Pushs(Operand::Str(name.into())),
                Instruction::Eqs,
            );

            if index > 0 {
                emit!(self, Instruction::Ors);
            }
        }

        Ok(Type::Bool)
    }

    /// simple (REL-OP simple)*
    fn relation(&mut self) -> Parse<Type> {
        let mut left = self.simple()?;

        loop {
            let op = match self.token() {
                Token::Equal => BinOp::Equal,
                Token::NotEqual => BinOp::NotEqual,
                Token::Less => BinOp::Less,
                Token::Greater => BinOp::Greater,
                Token::LessEqual => BinOp::LessOrEqual,
                Token::GreaterEqual => BinOp::GreaterOrEqual,
                _ => break Ok(left),
            };

            let location = self.operator()?;
            let right = self.simple()?;
            left = self.binary(op, left, right, location)?;
        }
    }

    /// term (('+' | '-') term)*
    fn simple(&mut self) -> Parse<Type> {
        let mut left = self.term()?;

        loop {
            let op = match self.token() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break Ok(left),
            };

            let location = self.operator()?;
            let right = self.term()?;
            left = self.binary(op, left, right, location)?;
        }
    }

    /// factor (('*' | '/') factor)*
    fn term(&mut self) -> Parse<Type> {
        let mut left = self.factor()?;

        loop {
            let op = match self.token() {
                Token::Times => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break Ok(left),
            };

            let location = self.operator()?;
            let right = self.factor()?;
            left = self.binary(op, left, right, location)?;
        }
    }

    /// Consume un operador y retorna su ubicación.
    fn operator(&mut self) -> Parse<Location> {
        self.next().map(|token| token.location().clone())
    }

    /// Verifica tipos y emite la operación sobre los dos valores en la cima.
    fn binary(&mut self, op: BinOp, left: Type, right: Type, location: Location) -> Parse<Type> {
        let typ = match op.result(left, right) {
            Ok(typ) => typ,
            Err(error) => return Err(self.cx.fail_at(error, location)),
        };

        match op {
            BinOp::Add => emit!(self, Instruction::Adds),
            BinOp::Sub => emit!(self, Instruction::Subs),
            BinOp::Mul => emit!(self, Instruction::Muls),
            BinOp::Div => emit!(self, Instruction::Divs),
            BinOp::Equal => emit!(self, Instruction::Eqs),
            BinOp::NotEqual => emit!(self, Instruction::Eqs, Instruction::Nots),
            BinOp::Less => emit!(self, Instruction::Lts),
            BinOp::GreaterOrEqual => emit!(self, Instruction::Lts, Instruction::Nots),

            BinOp::Greater => {
                self.swap()?;
                emit!(self, Instruction::Lts);
            }

            BinOp::LessOrEqual => {
                self.swap()?;
                emit!(self, Instruction::Lts, Instruction::Nots);
            }
        }

        Ok(typ)
    }

    /// Intercambia los dos valores en la cima de la pila.
    fn swap(&mut self) -> Parse<()> {
        let top = self.cx.next_temp();
        let below = self.cx.next_temp();

        emit!(
            self,
            Instruction::Pops(top.clone()),
            Instruction::Pops(below.clone()),
            Instruction::Pushs(top.into()),
            Instruction::Pushs(below.into()),
        );

        Ok(())
    }

    fn factor(&mut self) -> Parse<Type> {
        let (location, token) = self.next()?.split();

        let typ = match token {
            Token::IntLiteral(text) => match literal::parse_int(&text) {
                Some(int) => {
                    emit!(self, Instruction::Pushs(Operand::Int(int)));
                    Type::Num
                }

                None => return Err(self.cx.fail_at(LexerError::IntOverflow(text), location)),
            },

            Token::FloatLiteral(text) => match literal::parse_float(&text) {
                Some(float) => {
                    emit!(self, Instruction::Pushs(Operand::Float(float)));
                    Type::Num
                }

                None => return Err(self.cx.fail_at(LexerError::BadFloat(text), location)),
            },

            Token::StrLiteral(string) | Token::MultilineStrLiteral(string) => {
                emit!(self, Instruction::Pushs(Operand::Str(string)));
                Type::String
            }

            Token::Null => {
                emit!(self, Instruction::Pushs(Operand::Nil));
                Type::Null
            }

            Token::GlobalId(name) => {
                let var = self.cx.global_variable(&name);
                emit!(self, Instruction::Pushs(var.into()));
                Type::Undefined
            }

            Token::Id(name) => self.identifier(name, location)?,

            Token::Keyword(Keyword::Ifj) => self.builtin_call()?,

            Token::OpenParen => {
                let typ = self.expression()?;
                self.expect(Token::CloseParen)?;
                typ
            }

            other => return Err(self.cx.fail_at(ParserError::ExpectedExpr(other), location)),
        };

        Ok(typ)
    }

    /// Lectura de variable local, llamada a función o lectura de getter.
    fn identifier(&mut self, name: Identifier, location: Location) -> Parse<Type> {
        if *self.token() == Token::OpenParen {
            self.call(name, location)
        } else if self.cx.resolve_variable(&name) {
            emit!(self, Instruction::Pushs(Var::local(name.as_ref()).into()));
            Ok(Type::Undefined)
        } else {
            let getter = self.cx.resolve_callable(&name, 0).map(Callable::kind);
            if getter != Some(CallableKind::Getter) {
                return Err(self.cx.fail_at(SemanticError::UndefinedVariable(name), location));
            }

            emit!(self, Instruction::Call(Label::callable(name.as_ref(), 0)));
            Ok(Type::Undefined)
        }
    }

    /// IDENT `(` args `)`
    fn call(&mut self, name: Identifier, location: Location) -> Parse<Type> {
        let arity = self.arguments()?;

        let function = self.cx.resolve_callable(&name, arity).map(Callable::kind);
        if function != Some(CallableKind::Function) {
            let error = SemanticError::UndefinedCallable(name, arity);
            return Err(self.cx.fail_at(error, location));
        }

        emit!(self, Instruction::Call(Label::callable(name.as_ref(), arity)));
        Ok(Type::Undefined)
    }

    /// `Ifj` `.` IDENT `(` args `)`; el `Ifj` ya se consumió.
    fn builtin_call(&mut self) -> Parse<Type> {
        self.expect(Token::Period)?;

        let (location, name) = self.id()?.split();
        let found = self.arguments()?;

        match semantic::builtin_arity(name.as_ref()) {
            None => Err(self.cx.fail_at(SemanticError::UndefinedBuiltin(name), location)),

            Some(expected) if expected != found => {
                let error = SemanticError::BuiltinArity {
                    name,
                    expected,
                    found,
                };

                Err(self.cx.fail_at(error, location))
            }

            Some(_) => {
                emit!(self, Instruction::CallBuiltin(name.to_string()));
                Ok(Type::Undefined)
            }
        }
    }

    /// `(` [expr (`,` expr)*] `)`, retornando la cantidad de argumentos.
    fn arguments(&mut self) -> Parse<usize> {
        self.expect(Token::OpenParen)?;

        let mut count = 0;
        if *self.token() != Token::CloseParen {
            loop {
                self.expression()?;
                count += 1;

                if *self.token() != Token::Comma {
                    break;
                }

                self.cx.advance()?;
            }
        }

        self.expect(Token::CloseParen)?;
        Ok(count)
    }

    /// Define globales y temporales, e invoca a `main`.
    fn epilog(&mut self) -> Parse<()> {
        if !self.cx.entry_point() {
            return self.fail(SemanticError::NoMain);
        }

        emit!(self, Instruction::Label(Label::Entry));

        let globals: Vec<_> = self.cx.global_variables().collect();
        for var in globals {
            emit!(
                self,
                Instruction::DefVar(var.clone()),
                Instruction::Move(var, Operand::Nil),
            );
        }

        let temps: Vec<_> = self.cx.temporaries().collect();
        for temp in temps {
            emit!(self, Instruction::DefVar(temp));
        }

        emit!(
            self,
            Instruction::Call(Label::callable("main", 0)),
            Instruction::Exit(Operand::Int(0)),
        );

        Ok(())
    }

    fn token(&self) -> &Token {
        self.cx.token().val()
    }

    /// Consume el token actual.
    fn next(&mut self) -> Parse<Located<Token>> {
        let token = self.cx.token().clone();
        self.cx.advance()?;

        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Parse<()> {
        if *self.token() == expected {
            return self.cx.advance();
        }

        let found = self.token().clone();
        self.fail(ParserError::UnexpectedToken(expected, found))
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        match self.token() {
            Token::Id(_) => (),
            other => {
                let other = other.clone();
                return self.fail(ParserError::ExpectedId(other));
            }
        }

        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            other => Err(self.cx.fail_at(ParserError::ExpectedId(other), location)),
        }
    }

    fn skip_eols(&mut self) -> Parse<()> {
        while *self.token() == Token::Eol {
            self.cx.advance()?;
        }

        Ok(())
    }

    fn fail<T, E: Into<CompileError>>(&mut self, error: E) -> Parse<T> {
        Err(self.cx.fail(error))
    }
}
