/*!

  The machine uses a 32 bit word size, and every instruction occupies exactly one
  word. Bit 31 is the most significant. The opcode lives in the top four bits,
  bits 28-31. The layout of the remaining 28 bits depends on the opcode:

    Three-register form (opcodes 0-12):
      [OpCode:4][Unused:19][A:3][B:3][C:3]
    Immediate form (opcode 13, load value):
      [OpCode:4][A:3][Value:25]

  The unused bits of the three-register form are ignored on decode and zero on
  encode. All field extractions are unsigned.

  One design decision that needed to be made is whether decoded instructions are
  ever stored. They are not: the program lives in memory as raw words, an
  instruction is decoded immediately before it is applied, and the decoded form
  is discarded afterward. Consequently `Instruction` does not try to be compact.
  It is a transient value that trades space for named fields, which keeps the
  dispatch loop readable and lets a decoded instruction display itself in
  diagnostics.

*/
#![allow(dead_code)]

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};
use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

// If you change this you must also change `encode_instruction` and `decode_instruction`.
pub type Word = u32;

/// How many general purpose registers the machine has.
pub const REGISTER_COUNT: usize = 8;

pub const OPCODE_SHIFT   : Word = 28;
pub const REGISTER_MASK  : Word = 0b111;
pub const A_SHIFT        : Word = 6;
pub const B_SHIFT        : Word = 3;
pub const C_SHIFT        : Word = 0;
/// Register A of the immediate form sits directly below the opcode.
pub const IMMEDIATE_SHIFT: Word = 25;
/// The immediate form carries a 25 bit literal in the low bits.
pub const LITERAL_MASK   : Word = (1 << IMMEDIATE_SHIFT) - 1;

/**
  Opcodes of the virtual machine.

  The numeric value of each variant is its opcode, so the order the opcodes are
  listed below is significant: `LoadValue` must be opcode 13, and everything
  before it takes the three-register form. The top four bits of an instruction
  word are converted to an `Opcode` through `TryFromPrimitive`; the two bit
  patterns with no variant, 14 and 15, fail the conversion and are reported as
  undefined instructions.
*/
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,               PartialEq,      Debug, Hash
)]
#[repr(u8)]
pub enum Opcode {
  ConditionalMove,
  SegmentedLoad,
  SegmentedStore,
  Add,
  Multiply,
  Divide,
  Nand,
  Halt,
  MapSegment,
  UnmapSegment,
  Output,
  Input,
  LoadProgram,    // Opcode 12
  LoadValue,      // Opcode 13, the only immediate-form opcode
}

impl Opcode {

  /// Gives the numeric value of the opcode, padded with zeros to make a `Word`.
  pub fn code(&self) -> Word {
    let value: u8 = (*self).into();
    value as Word
  }

}

/// Holds the unencoded components of an instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Instruction {
  /// [OpCode:4][Unused:19][A:3][B:3][C:3]
  Triple { opcode: Opcode, a: usize, b: usize, c: usize },
  /// [OpCode:4][A:3][Value:25]
  Immediate { a: usize, value: Word },
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Triple { opcode, a, b, c } => {
        write!(f, "{}({}, {}, {})", opcode, a, b, c)
      }

      Instruction::Immediate { a, value } => {
        write!(f, "{}({}, {})", Opcode::LoadValue, a, value)
      }

    }
  }
}

/**
  Decodes one instruction word.

  A word whose top four bits are 14 or 15 encodes no instruction. That is a bug
  in the program being run, not a condition it could recover from, so decoding
  such a word terminates the machine with a diagnostic.
*/
pub fn decode_instruction(word: Word) -> Instruction {
  let opcode: Opcode =
    match Opcode::try_from((word >> OPCODE_SHIFT) as u8) {
      Ok(v)  => v,
      Err(_) => {
        panic!(
          "Error: The word {:#010X} has undefined opcode {}.",
          word,
          word >> OPCODE_SHIFT
        );
      }
    };

  match opcode {

    Opcode::LoadValue => {
      // [OpCode:4][A:3][Value:25]
      Instruction::Immediate {
        a:     ((word >> IMMEDIATE_SHIFT) & REGISTER_MASK) as usize,
        value: word & LITERAL_MASK,
      }
    }

    _ => {
      // [OpCode:4][Unused:19][A:3][B:3][C:3]
      Instruction::Triple {
        opcode,
        a: ((word >> A_SHIFT) & REGISTER_MASK) as usize,
        b: ((word >> B_SHIFT) & REGISTER_MASK) as usize,
        c: ((word >> C_SHIFT) & REGISTER_MASK) as usize,
      }
    }

  }
}

/**
  Encodes the instruction into a word, the exact inverse of `decode_instruction`.
  It is the caller's responsibility to use the correct `Instruction` variant for
  the given opcode and to keep register indices below `REGISTER_COUNT`; an
  immediate value wider than 25 bits is truncated.
*/
pub fn encode_instruction(instruction: Instruction) -> Word {
  match instruction {

    Instruction::Triple { opcode, a, b, c } => {
      (opcode.code() << OPCODE_SHIFT)
        | ((a as Word) << A_SHIFT)
        | ((b as Word) << B_SHIFT)
        | ((c as Word) << C_SHIFT)
    }

    Instruction::Immediate { a, value } => {
      (Opcode::LoadValue.code() << OPCODE_SHIFT)
        | ((a as Word) << IMMEDIATE_SHIFT)
        | (value & LITERAL_MASK)
    }

  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_three_register_form() {
    // Add with a = 1, b = 2, c = 3.
    let word = (3 << OPCODE_SHIFT) | (1 << A_SHIFT) | (2 << B_SHIFT) | 3;
    assert_eq!(
      decode_instruction(word),
      Instruction::Triple { opcode: Opcode::Add, a: 1, b: 2, c: 3 }
    );
  }

  #[test]
  fn decodes_immediate_form() {
    let word = (13 << OPCODE_SHIFT) | (6 << IMMEDIATE_SHIFT) | 0x1ABCDE;
    assert_eq!(
      decode_instruction(word),
      Instruction::Immediate { a: 6, value: 0x1ABCDE }
    );
  }

  #[test]
  fn unused_bits_are_ignored() {
    let clean = (0 << OPCODE_SHIFT) | (7 << A_SHIFT) | (7 << B_SHIFT) | 7;
    let noisy = clean | (0x7FFFF << 9); // Garbage in bits 9-27.
    assert_eq!(decode_instruction(noisy), decode_instruction(clean));
  }

  #[test]
  fn encode_inverts_decode() {
    let instructions = [
      Instruction::Triple { opcode: Opcode::ConditionalMove, a: 0, b: 0, c: 0 },
      Instruction::Triple { opcode: Opcode::Halt,            a: 7, b: 6, c: 5 },
      Instruction::Triple { opcode: Opcode::LoadProgram,     a: 0, b: 3, c: 4 },
      Instruction::Immediate { a: 0, value: 0 },
      Instruction::Immediate { a: 7, value: LITERAL_MASK },
    ];
    for instruction in instructions.iter() {
      assert_eq!(decode_instruction(encode_instruction(*instruction)), *instruction);
    }
  }

  #[test]
  fn literal_occupies_the_low_25_bits() {
    let word = encode_instruction(Instruction::Immediate { a: 0, value: LITERAL_MASK });
    assert_eq!(word & LITERAL_MASK, LITERAL_MASK);
    assert_eq!(word >> OPCODE_SHIFT, 13);
  }

  #[test]
  #[should_panic(expected = "undefined opcode 14")]
  fn opcode_fourteen_is_undefined() {
    decode_instruction(14 << OPCODE_SHIFT);
  }

  #[test]
  #[should_panic(expected = "undefined opcode 15")]
  fn opcode_fifteen_is_undefined() {
    decode_instruction(Word::max_value());
  }
}
