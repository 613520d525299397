//! Análisis sintáctico y generación de código en una sola pasada.
//!
//! Cada producción de la gramática corresponde a un método de
//! [`Engine`]. Los métodos consumen tokens conforme reconocen su
//! producción y emiten instrucciones de máquina virtual en ese mismo
//! momento, sin construir un árbol sintáctico ni retroceder. Basta
//! con un token de lookahead para decidir entre alternativas.
//!
//! ```text
//! class          'class' className '{' classVarDec* subroutineDec* '}'
//! classVarDec    ('static' | 'field') type varName (',' varName)* ';'
//! type           'int' | 'char' | 'boolean' | className
//! subroutineDec  ('constructor' | 'function' | 'method') ('void' | type)
//!                subroutineName '(' parameterList ')' subroutineBody
//! parameterList  ((type varName) (',' type varName)*)?
//! subroutineBody '{' varDec* statements '}'
//! varDec         'var' type varName (',' varName)* ';'
//! statements     (let | if | while | do | return)*
//! expression     term (op term)*
//! term           integer | string | keywordConstant | varName
//!                | varName '[' expression ']' | subroutineCall
//!                | '(' expression ')' | unaryOp term
//! ```

use std::io::{self, Write};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    lex::{Identifier, Keyword, Symbol, Token, Tokens},
    source::{Located, Location},
    symbols::{Entry, Kind, SymbolError, SymbolTable, Type},
    vm::{Command, Segment, VmWriter},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Expected, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Expected),

    #[error("Unexpected {0} after the end of the class")]
    TrailingInput(Token),

    #[error("Abrupt end of class")]
    UnexpectedEof,
}

/// Aquello que una producción esperaba encontrar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    Token(Token),
    Id,
    Type,
    ClassMember,
    Term,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Token(token) => write!(fmt, "{}", token),
            Expected::Id => fmt.write_str("identifier"),
            Expected::Type => fmt.write_str("any of `int`, `char`, `boolean` or a class name"),
            Expected::ClassMember => {
                fmt.write_str("`static`, `field`, `constructor`, `function`, `method` or `}`")
            }
            Expected::Term => fmt.write_str("an expression"),
        }
    }
}

/// Error de compilación de una clase.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] ParserError),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("Failed to write VM output")]
    Output(#[from] io::Error),
}

pub type Compile<T> = Result<T, Located<CompileError>>;

/// Compila una clase completa a partir de sus tokens.
///
/// `start` es la ubicación del inicio del archivo, la cual se utiliza
/// para reportar errores de fin de archivo en un archivo vacío. Las
/// instrucciones se escriben en `output` conforme se reconocen, por lo
/// cual un error deja en la salida todo lo emitido hasta ese punto.
pub fn compile<W: Write>(tokens: Vec<Located<Token>>, start: Location, output: W) -> Compile<()> {
    let mut engine = Engine {
        tokens: Tokens::new(tokens),
        symbols: SymbolTable::new(),
        vm: VmWriter::new(output),
        class: Identifier::new(""),
        labels: 0,
        last_known: start,
    };

    engine.class()?;
    match engine.tokens.advance() {
        None => Ok(()),
        Some(token) => {
            let (location, token) = token.clone().split();
            let error = ParserError::TrailingInput(token);
            Err(Located::at(error.into(), location))
        }
    }
}

/// Tipo de subrutina.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Subroutine {
    Constructor,
    Function,
    Method,
}

struct Engine<W> {
    tokens: Tokens,
    symbols: SymbolTable,
    vm: VmWriter<W>,
    class: Identifier,
    labels: u32,
    last_known: Location,
}

impl<W: Write> Engine<W> {
    fn class(&mut self) -> Compile<()> {
        self.keyword(Keyword::Class)?;
        self.class = self.id()?.into_inner();
        self.expect(Symbol::OpenCurly)?;

        debug!("Compiling class {}", self.class);

        while let Some(kind) = self.peek_keyword().and_then(class_var_kind) {
            self.next()?;
            self.class_var_dec(kind)?;
        }

        loop {
            let subroutine = match self.peek_keyword() {
                Some(Keyword::Constructor) => Subroutine::Constructor,
                Some(Keyword::Function) => Subroutine::Function,
                Some(Keyword::Method) => Subroutine::Method,
                _ => break,
            };

            self.next()?;
            self.subroutine_dec(subroutine)?;
        }

        match self.next()?.into_inner() {
            Token::Symbol(Symbol::CloseCurly) => Ok(()),
            found => self.fail(ParserError::UnexpectedToken(Expected::ClassMember, found)),
        }
    }

    fn class_var_dec(&mut self, kind: Kind) -> Compile<()> {
        let typ = self.typ()?;
        self.var_names(typ, kind)
    }

    fn subroutine_dec(&mut self, subroutine: Subroutine) -> Compile<()> {
        self.symbols.start_subroutine();
        if subroutine == Subroutine::Method {
            let this = Type::Class(self.class.clone());
            self.define(Identifier::new("this"), this, Kind::Argument)?;
        }

        if self.peek_keyword() == Some(Keyword::Void) {
            self.next()?;
        } else {
            self.typ()?;
        }

        let name = self.id()?.into_inner();
        let name = format!("{}.{}", self.class, name);

        self.expect(Symbol::OpenParen)?;
        self.parameter_list()?;
        self.expect(Symbol::CloseParen)?;

        self.expect(Symbol::OpenCurly)?;
        while self.peek_keyword() == Some(Keyword::Var) {
            self.next()?;

            let typ = self.typ()?;
            self.var_names(typ, Kind::Local)?;
        }

        let locals = self.symbols.var_count(Kind::Local);
        debug!("Compiling subroutine {} with {} locals", name, locals);

        self.emit(|vm| vm.function(&name, locals))?;
        match subroutine {
            Subroutine::Function => (),

            Subroutine::Method => {
                self.emit(|vm| vm.push(Segment::Argument, 0))?;
                self.emit(|vm| vm.pop(Segment::Pointer, 0))?;
            }

            Subroutine::Constructor => {
                let fields = self.symbols.var_count(Kind::Field);
                self.emit(|vm| vm.push(Segment::Constant, fields))?;
                self.emit(|vm| vm.call("Memory.alloc", 1))?;
                self.emit(|vm| vm.pop(Segment::Pointer, 0))?;
            }
        }

        self.statements()?;
        self.expect(Symbol::CloseCurly)?;

        trace!("{} instructions emitted after {}", self.vm.emitted(), name);
        Ok(())
    }

    fn parameter_list(&mut self) -> Compile<()> {
        if self.peek_symbol() == Some(Symbol::CloseParen) {
            return Ok(());
        }

        loop {
            let typ = self.typ()?;
            let name = self.id()?;
            self.define_located(name, typ, Kind::Argument)?;

            if !self.eat(Symbol::Comma)? {
                break Ok(());
            }
        }
    }

    /// `varName (',' varName)* ';'`, todas con un mismo tipo y categoría.
    fn var_names(&mut self, typ: Type, kind: Kind) -> Compile<()> {
        loop {
            let name = self.id()?;
            self.define_located(name, typ.clone(), kind)?;

            if !self.eat(Symbol::Comma)? {
                break self.expect(Symbol::Semicolon);
            }
        }
    }

    fn statements(&mut self) -> Compile<()> {
        loop {
            match self.peek_keyword() {
                Some(Keyword::Let) => self.let_statement()?,
                Some(Keyword::If) => self.if_statement()?,
                Some(Keyword::While) => self.while_statement()?,
                Some(Keyword::Do) => self.do_statement()?,
                Some(Keyword::Return) => self.return_statement()?,
                _ => break Ok(()),
            }
        }
    }

    fn let_statement(&mut self) -> Compile<()> {
        self.keyword(Keyword::Let)?;
        let name = self.id()?;
        let target = self.resolve(&name)?;

        if self.eat(Symbol::OpenSquare)? {
            // La dirección se calcula antes que el valor, pero solo se
            // fija en `pointer 1` después, ya que la expresión del valor
            // también puede utilizar `that`
            self.push_var(&target)?;
            self.expression()?;
            self.expect(Symbol::CloseSquare)?;
            self.emit(|vm| vm.command(Command::Add))?;

            self.expect(Symbol::Equal)?;
            self.expression()?;
            self.expect(Symbol::Semicolon)?;

            self.emit(|vm| vm.pop(Segment::Temp, 0))?;
            self.emit(|vm| vm.pop(Segment::Pointer, 1))?;
            self.emit(|vm| vm.push(Segment::Temp, 0))?;
            self.emit(|vm| vm.pop(Segment::That, 0))
        } else {
            self.expect(Symbol::Equal)?;
            self.expression()?;
            self.expect(Symbol::Semicolon)?;

            self.emit(|vm| vm.pop(target.kind.segment(), target.index))
        }
    }

    fn if_statement(&mut self) -> Compile<()> {
        self.keyword(Keyword::If)?;
        let label = self.next_label();
        let (otherwise, end) = (format!("IF_ELSE{}", label), format!("IF_END{}", label));

        self.condition()?;
        self.emit(|vm| vm.command(Command::Not))?;
        self.emit(|vm| vm.if_goto(&otherwise))?;

        self.block()?;
        self.emit(|vm| vm.goto(&end))?;
        self.emit(|vm| vm.label(&otherwise))?;

        if self.peek_keyword() == Some(Keyword::Else) {
            self.next()?;
            self.block()?;
        }

        self.emit(|vm| vm.label(&end))
    }

    fn while_statement(&mut self) -> Compile<()> {
        self.keyword(Keyword::While)?;
        let label = self.next_label();
        let (top, end) = (format!("WHILE_START{}", label), format!("WHILE_END{}", label));

        self.emit(|vm| vm.label(&top))?;
        self.condition()?;
        self.emit(|vm| vm.command(Command::Not))?;
        self.emit(|vm| vm.if_goto(&end))?;

        self.block()?;
        self.emit(|vm| vm.goto(&top))?;
        self.emit(|vm| vm.label(&end))
    }

    fn do_statement(&mut self) -> Compile<()> {
        self.keyword(Keyword::Do)?;
        let name = self.id()?;
        self.subroutine_call(name)?;
        self.expect(Symbol::Semicolon)?;

        // Se descarta el valor de retorno
        self.emit(|vm| vm.pop(Segment::Temp, 0))
    }

    fn return_statement(&mut self) -> Compile<()> {
        self.keyword(Keyword::Return)?;

        if self.peek_symbol() == Some(Symbol::Semicolon) {
            self.emit(|vm| vm.push(Segment::Constant, 0))?;
        } else {
            self.expression()?;
        }

        self.expect(Symbol::Semicolon)?;
        self.emit(|vm| vm.ret())
    }

    /// `'(' expression ')'`
    fn condition(&mut self) -> Compile<()> {
        self.expect(Symbol::OpenParen)?;
        self.expression()?;
        self.expect(Symbol::CloseParen)
    }

    /// `'{' statements '}'`
    fn block(&mut self) -> Compile<()> {
        self.expect(Symbol::OpenCurly)?;
        self.statements()?;
        self.expect(Symbol::CloseCurly)
    }

    fn expression(&mut self) -> Compile<()> {
        self.term()?;

        while let Some(op) = self.peek_symbol().and_then(binary_op) {
            self.next()?;
            self.term()?;

            match op {
                BinaryOp::Command(command) => self.emit(|vm| vm.command(command))?,
                BinaryOp::Call(function) => self.emit(|vm| vm.call(function, 2))?,
            }
        }

        Ok(())
    }

    fn term(&mut self) -> Compile<()> {
        match self.next()?.into_inner() {
            Token::IntConst(integer) => self.emit(|vm| vm.push(Segment::Constant, integer)),

            Token::StringConst(string) => {
                let length = string.chars().count() as u16;
                self.emit(|vm| vm.push(Segment::Constant, length))?;
                self.emit(|vm| vm.call("String.new", 1))?;

                for c in string.chars() {
                    self.emit(|vm| vm.push(Segment::Constant, c as u16))?;
                    self.emit(|vm| vm.call("String.appendChar", 2))?;
                }

                Ok(())
            }

            // `true` es el patrón de bits con todos los bits encendidos
            Token::Keyword(Keyword::True) => {
                self.emit(|vm| vm.push(Segment::Constant, 1))?;
                self.emit(|vm| vm.command(Command::Neg))
            }

            Token::Keyword(Keyword::False) | Token::Keyword(Keyword::Null) => {
                self.emit(|vm| vm.push(Segment::Constant, 0))
            }

            Token::Keyword(Keyword::This) => self.emit(|vm| vm.push(Segment::Pointer, 0)),

            Token::Symbol(Symbol::OpenParen) => {
                self.expression()?;
                self.expect(Symbol::CloseParen)
            }

            Token::Symbol(symbol) => match unary_op(symbol) {
                Some(command) => {
                    self.term()?;
                    self.emit(|vm| vm.command(command))
                }

                None => {
                    let found = Token::Symbol(symbol);
                    self.fail(ParserError::UnexpectedToken(Expected::Term, found))
                }
            },

            Token::Id(id) => {
                let name = Located::at(id, self.last_known.clone());

                match self.peek_symbol() {
                    Some(Symbol::OpenSquare) => {
                        let array = self.resolve(&name)?;
                        self.next()?;

                        self.push_var(&array)?;
                        self.expression()?;
                        self.expect(Symbol::CloseSquare)?;

                        self.emit(|vm| vm.command(Command::Add))?;
                        self.emit(|vm| vm.pop(Segment::Pointer, 1))?;
                        self.emit(|vm| vm.push(Segment::That, 0))
                    }

                    Some(Symbol::OpenParen) | Some(Symbol::Period) => self.subroutine_call(name),

                    _ => {
                        let var = self.resolve(&name)?;
                        self.push_var(&var)
                    }
                }
            }

            found => self.fail(ParserError::UnexpectedToken(Expected::Term, found)),
        }
    }

    /// Llamada a subrutina, habiendo ya consumido el primer identificador.
    ///
    /// Sin calificador se trata de un método sobre el objeto actual.
    /// Con calificador, este es una variable (método sobre esa variable)
    /// o el nombre de una clase (función o constructor).
    fn subroutine_call(&mut self, name: Located<Identifier>) -> Compile<()> {
        let (callee, receivers) = if self.eat(Symbol::Period)? {
            let method = self.id()?.into_inner();

            match self.symbols.lookup(name.val().as_ref()).cloned() {
                Some(receiver) => {
                    self.push_var(&receiver)?;
                    (format!("{}.{}", receiver.typ, method), 1)
                }

                None => (format!("{}.{}", name.val(), method), 0),
            }
        } else {
            self.emit(|vm| vm.push(Segment::Pointer, 0))?;
            (format!("{}.{}", self.class, name.val()), 1)
        };

        self.expect(Symbol::OpenParen)?;
        let arguments = self.expression_list()?;
        self.expect(Symbol::CloseParen)?;

        self.emit(|vm| vm.call(&callee, arguments + receivers))
    }

    fn expression_list(&mut self) -> Compile<u16> {
        if self.peek_symbol() == Some(Symbol::CloseParen) {
            return Ok(0);
        }

        let mut count = 0;
        loop {
            self.expression()?;
            count += 1;

            if !self.eat(Symbol::Comma)? {
                break Ok(count);
            }
        }
    }

    fn typ(&mut self) -> Compile<Type> {
        match self.next()?.into_inner() {
            Token::Keyword(Keyword::Int) => Ok(Type::Int),
            Token::Keyword(Keyword::Char) => Ok(Type::Char),
            Token::Keyword(Keyword::Boolean) => Ok(Type::Boolean),
            Token::Id(class) => Ok(Type::Class(class)),
            found => self.fail(ParserError::UnexpectedToken(Expected::Type, found)),
        }
    }

    fn push_var(&mut self, var: &Entry) -> Compile<()> {
        self.emit(|vm| vm.push(var.kind.segment(), var.index))
    }

    fn resolve(&self, name: &Located<Identifier>) -> Compile<Entry> {
        self.symbols.lookup(name.val().as_ref()).cloned().ok_or_else(|| {
            let error = SymbolError::Undefined(name.val().clone());
            Located::at(error.into(), name.location().clone())
        })
    }

    fn define_located(&mut self, name: Located<Identifier>, typ: Type, kind: Kind) -> Compile<()> {
        let (location, name) = name.split();
        self.symbols
            .define(name, typ, kind)
            .map(drop)
            .map_err(|error| Located::at(error.into(), location))
    }

    fn define(&mut self, name: Identifier, typ: Type, kind: Kind) -> Compile<()> {
        let location = self.last_known.clone();
        self.define_located(Located::at(name, location), typ, kind)
    }

    /// Genera un sufijo de etiqueta nuevo, único dentro de la clase.
    fn next_label(&mut self) -> u32 {
        let label = self.labels;
        self.labels += 1;
        label
    }

    fn emit<F>(&mut self, instruction: F) -> Compile<()>
    where
        F: FnOnce(&mut VmWriter<W>) -> io::Result<()>,
    {
        instruction(&mut self.vm).map_err(|error| {
            Located::at(CompileError::from(error), self.last_known.clone())
        })
    }

    fn id(&mut self) -> Compile<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            found => self.fail(ParserError::UnexpectedToken(Expected::Id, found)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Compile<()> {
        self.expect_token(Token::Keyword(keyword))
    }

    fn expect(&mut self, symbol: Symbol) -> Compile<()> {
        self.expect_token(Token::Symbol(symbol))
    }

    fn expect_token(&mut self, token: Token) -> Compile<()> {
        match self.tokens.advance().map(|found| found.clone().split()) {
            Some((location, found)) => {
                self.last_known = location;
                if found == token {
                    Ok(())
                } else {
                    self.fail(ParserError::UnexpectedToken(Expected::Token(token), found))
                }
            }

            None => self.fail(ParserError::MissingToken(Expected::Token(token))),
        }
    }

    /// Consume el siguiente token solo si es el símbolo indicado.
    fn eat(&mut self, symbol: Symbol) -> Compile<bool> {
        if self.peek_symbol() == Some(symbol) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.tokens.peek().map(Located::val) {
            Some(Token::Keyword(keyword)) => Some(*keyword),
            _ => None,
        }
    }

    fn peek_symbol(&self) -> Option<Symbol> {
        match self.tokens.peek().map(Located::val) {
            Some(Token::Symbol(symbol)) => Some(*symbol),
            _ => None,
        }
    }

    fn next(&mut self) -> Compile<Located<Token>> {
        match self.tokens.advance() {
            Some(token) => {
                let token = token.clone();
                self.last_known = token.location().clone();
                Ok(token)
            }

            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn fail<T, E: Into<CompileError>>(&self, error: E) -> Compile<T> {
        Err(Located::at(error.into(), self.last_known.clone()))
    }
}

enum BinaryOp {
    Command(Command),
    Call(&'static str),
}

fn binary_op(symbol: Symbol) -> Option<BinaryOp> {
    let op = match symbol {
        Symbol::Plus => BinaryOp::Command(Command::Add),
        Symbol::Minus => BinaryOp::Command(Command::Sub),
        Symbol::Ampersand => BinaryOp::Command(Command::And),
        Symbol::Pipe => BinaryOp::Command(Command::Or),
        Symbol::Less => BinaryOp::Command(Command::Lt),
        Symbol::Greater => BinaryOp::Command(Command::Gt),
        Symbol::Equal => BinaryOp::Command(Command::Eq),

        // La máquina virtual no multiplica ni divide por sí misma
        Symbol::Times => BinaryOp::Call("Math.multiply"),
        Symbol::Slash => BinaryOp::Call("Math.divide"),

        _ => return None,
    };

    Some(op)
}

fn unary_op(symbol: Symbol) -> Option<Command> {
    match symbol {
        Symbol::Minus => Some(Command::Neg),
        Symbol::Tilde => Some(Command::Not),
        Symbol::Caret => Some(Command::ShiftLeft),
        Symbol::Hash => Some(Command::ShiftRight),
        _ => None,
    }
}

fn class_var_kind(keyword: Keyword) -> Option<Kind> {
    match keyword {
        Keyword::Static => Some(Kind::Static),
        Keyword::Field => Some(Kind::Field),
        _ => None,
    }
}
