//! Structures and functions for the Universal Virtual Machine, the execution
//! engine that owns the registers, the program counter, and the segment store,
//! and drives the fetch-decode-dispatch loop.

use std::io::{Read, Write};
use std::path::Path;

#[cfg(feature = "trace_execution")]
use prettytable::{format as TableFormat, Table};

use crate::bytecode::*;
use crate::loader::{self, LoadError};
use crate::operations::{self, RegisterFile};
use crate::segments::SegmentStore;

#[cfg(feature = "trace_execution")]
lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', '─', '─')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', '─', '─')
      )
      .padding(1, 2)
      .build();
}

/**
  The machine. An instance owns every piece of execution state, so independent
  machines can coexist without interference. The host byte streams are the only
  shared resources, and they are supplied by the caller: `main` hands in stdin
  and stdout, the test suite hands in byte buffers.
*/
pub struct UVM<R: Read, W: Write> {

  // Flags
  halted : bool, // Set by the halt instruction.

  // Memory Stores
  segments : SegmentStore, // Segment 0 holds the active program.

  // Registers //
  registers      : RegisterFile, // Eight general purpose registers
  pc             : Word,         // Program counter, an index into segment 0
  program_length : Word,         // Number of words in segment 0

  // Host streams
  input  : R,
  output : W,

}

impl<R: Read, W: Write> UVM<R, W> {

  pub fn new(input: R, output: W) -> UVM<R, W> {
    UVM {
      halted         :  false,

      segments       :  SegmentStore::new(),

      registers      :  [0; REGISTER_COUNT],
      pc             :  0,
      program_length :  0,

      input,
      output,
    }
  }

  // region Machine control

  /**
    Loads the program file at `program_path` into segment 0 and executes it to
    completion. Execution ends when the program executes a halt instruction or
    when the program counter runs off the end of segment 0; either way the
    segment store is released before returning. A file that cannot be loaded is
    reported to the caller and leaves the machine idle.
  */
  pub fn run<P: AsRef<Path>>(&mut self, program_path: P) -> Result<(), LoadError> {
    self.reset();
    self.program_length = loader::read_program(program_path.as_ref(), &mut self.segments)?;
    self.execute();
    self.segments = SegmentStore::new(); // Releases every remaining segment.
    Ok(())
  }

  /// Returns the machine to its power-on state, with every register and the
  /// program counter zeroed and the segment store empty.
  fn reset(&mut self) {
    self.halted = false;
    self.segments = SegmentStore::new();
    self.registers = [0; REGISTER_COUNT];
    self.pc = 0;
    self.program_length = 0;
  }

  /**
    The dispatch loop. Each iteration fetches the word at the program counter,
    advances the counter, and applies the instruction. The fetch happens before
    the instruction executes, so a load program that replaces segment 0 never
    invalidates the word already in flight, and a store into segment 0 is seen
    by the very next fetch.
  */
  fn execute(&mut self) {
    while !self.halted && self.pc < self.program_length {
      let word = self.segments.get(0, self.pc);
      self.pc += 1;
      self.execute_instruction(word);
    }
    if let Err(error) = self.output.flush() {
      panic!("Error: Failed to flush the output stream: {}", error);
    }
  }

  // endregion

  // region Instruction dispatch

  fn execute_instruction(&mut self, word: Word) {
    let instruction = decode_instruction(word);

    #[cfg(feature = "trace_execution")]
    self.print_step(&instruction);

    match instruction {

      Instruction::Immediate { a, value } => {
        operations::load_value(&mut self.registers, a, value);
      }

      Instruction::Triple { opcode, a, b, c } => {
        match opcode {

          Opcode::ConditionalMove => {
            operations::conditional_move(&mut self.registers, a, b, c);
          }

          Opcode::SegmentedLoad => {
            self.registers[a] = self.segments.get(self.registers[b], self.registers[c]);
          }

          Opcode::SegmentedStore => {
            self.segments.set(self.registers[a], self.registers[b], self.registers[c]);
          }

          Opcode::Add => {
            operations::add(&mut self.registers, a, b, c);
          }

          Opcode::Multiply => {
            operations::multiply(&mut self.registers, a, b, c);
          }

          Opcode::Divide => {
            operations::divide(&mut self.registers, a, b, c);
          }

          Opcode::Nand => {
            operations::nand(&mut self.registers, a, b, c);
          }

          Opcode::Halt => {
            self.halted = true;
          }

          Opcode::MapSegment => {
            self.registers[b] = self.segments.map(self.registers[c]);
          }

          Opcode::UnmapSegment => {
            self.segments.unmap(self.registers[c]);
          }

          Opcode::Output => {
            operations::output(&mut self.output, self.registers[c]);
          }

          Opcode::Input => {
            self.registers[c] = operations::input(&mut self.input);
          }

          Opcode::LoadProgram => {
            // Both effects belong to the one instruction: the duplicate becomes
            // the program and the counter moves into it.
            self.program_length = self.segments.duplicate_to_zero(self.registers[b]);
            self.pc = self.registers[c];
          }

          Opcode::LoadValue => {
            unreachable!("Error: Load value decoded into the three-register form.");
          }

        } // end match on opcode
      }

    } // end match on instruction form
  }

  // endregion

  // region Display methods

  #[cfg(feature = "trace_execution")]
  fn print_step(&self, instruction: &Instruction) {
    // The counter has already moved past the instruction being printed.
    println!("{:>6}:  {}", self.pc - 1, instruction);
    self.make_register_table().printstd();
  }

  #[cfg(feature = "trace_execution")]
  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for (i, value) in self.registers.iter().enumerate() {
      table.add_row(row![r->format!("r[{}] =", i), format!("{:#010X}", value)]);
    }
    table
  }

  // endregion

}
