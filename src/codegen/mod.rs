//! Escritura de código IFJcode25.
//!
//! El parser produce instrucciones conforme avanza sobre la entrada; este
//! módulo las serializa de inmediato, una por línea.

use crate::ir::Instruction;
use log::trace;
use std::io::{self, Write};

pub mod literal;

/// Sumidero de instrucciones.
pub struct Emitter<W: Write> {
    output: W,
}

impl<W: Write> Emitter<W> {
    pub fn new(output: W) -> Self {
        Emitter { output }
    }

    /// Escribe una instrucción en su propia línea.
    pub fn emit(&mut self, instruction: Instruction) -> io::Result<()> {
        trace!("emit: {}", instruction);

        writeln!(self.output, "{}", instruction)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Label, Operand};

    #[test]
    fn one_instruction_per_line() {
        let mut emitter = Emitter::new(Vec::new());
        emitter.emit(Instruction::Header).unwrap();
        emitter.emit(Instruction::Pushs(Operand::Nil)).unwrap();
        emitter.emit(Instruction::Jump(Label::Entry)).unwrap();

        assert_eq!(
            String::from_utf8(emitter.output).unwrap(),
            ".IFJcode25\nPUSHS nil@nil\nJUMP $$main\n"
        );
    }
}
