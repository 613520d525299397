//! Emisión de instrucciones de máquina virtual.
//!
//! Cada instrucción ocupa exactamente una línea de texto. Este módulo no
//! decide qué emitir; solo da formato al vocabulario de la máquina de pila.

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

/// Segmento de memoria de la máquina virtual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Display for Segment {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };

        fmt.write_str(string)
    }
}

/// Operación aritmética o lógica sobre la pila.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl Display for Command {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Command::Add => "add",
            Command::Sub => "sub",
            Command::Neg => "neg",
            Command::Eq => "eq",
            Command::Gt => "gt",
            Command::Lt => "lt",
            Command::And => "and",
            Command::Or => "or",
            Command::Not => "not",
            Command::ShiftLeft => "shiftleft",
            Command::ShiftRight => "shiftright",
        };

        fmt.write_str(string)
    }
}

/// Fachada de formato sobre el canal de salida.
///
/// El canal pertenece a quien invoca; el escritor solo lo toma prestado
/// y nunca lo cierra.
pub struct VmWriter<W> {
    output: W,
    emitted: usize,
}

impl<W: Write> VmWriter<W> {
    pub fn new(output: W) -> Self {
        VmWriter { output, emitted: 0 }
    }

    /// Cantidad de instrucciones emitidas hasta el momento.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        emit!(self, "push {} {}", segment, index)
    }

    pub fn pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        emit!(self, "pop {} {}", segment, index)
    }

    pub fn command(&mut self, command: Command) -> io::Result<()> {
        emit!(self, "{}", command)
    }

    pub fn label(&mut self, label: &str) -> io::Result<()> {
        emit!(self, "label {}", label)
    }

    pub fn goto(&mut self, label: &str) -> io::Result<()> {
        emit!(self, "goto {}", label)
    }

    pub fn if_goto(&mut self, label: &str) -> io::Result<()> {
        emit!(self, "if-goto {}", label)
    }

    pub fn function(&mut self, name: &str, locals: u16) -> io::Result<()> {
        emit!(self, "function {} {}", name, locals)
    }

    pub fn call(&mut self, name: &str, arguments: u16) -> io::Result<()> {
        emit!(self, "call {} {}", name, arguments)
    }

    pub fn ret(&mut self) -> io::Result<()> {
        emit!(self, "return")
    }

    /// Recupera el canal de salida.
    pub fn into_inner(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_vocabulary() -> io::Result<()> {
        let mut writer = VmWriter::new(Vec::new());

        writer.function("Main.main", 2)?;
        writer.push(Segment::Constant, 7)?;
        writer.pop(Segment::Pointer, 1)?;
        writer.command(Command::ShiftRight)?;
        writer.label("WHILE_START0")?;
        writer.if_goto("WHILE_END0")?;
        writer.goto("WHILE_START0")?;
        writer.call("Math.multiply", 2)?;
        writer.ret()?;

        assert_eq!(writer.emitted(), 9);
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "function Main.main 2\n\
             push constant 7\n\
             pop pointer 1\n\
             shiftright\n\
             label WHILE_START0\n\
             if-goto WHILE_END0\n\
             goto WHILE_START0\n\
             call Math.multiply 2\n\
             return\n"
        );

        Ok(())
    }

    #[test]
    fn writes_through_borrowed_output() -> io::Result<()> {
        let mut output = Vec::new();

        let mut writer = VmWriter::new(&mut output);
        writer.push(Segment::That, 0)?;
        drop(writer);

        assert_eq!(output, b"push that 0\n");
        Ok(())
    }
}
