/*!

  Materializes a program file as segment 0. The on-disk format is a tightly
  packed sequence of 32 bit big-endian words, one instruction per word, loaded
  in order starting at offset 0. The file's byte length therefore must be a
  multiple of four; a zero-length file is a legal, empty program.

  Failures here are host problems rather than guest bugs, so unlike the rest of
  the machine they are reported as values: the caller prints the diagnostic and
  exits nonzero instead of panicking.

*/

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use thiserror::Error;

use crate::bytecode::Word;
use crate::segments::SegmentStore;

pub const BYTES_PER_WORD: u64 = 4;

#[derive(Debug, Error)]
pub enum LoadError {
  /// The file is missing or could not be opened or read.
  #[error("cannot read program file: {0}")]
  Unreadable(#[from] std::io::Error),

  /// The file is not a whole number of 32 bit words.
  #[error("program file is {0} bytes, which is not a whole number of instructions")]
  NotWordAligned(u64),

  /// The file shrank between being measured and being read.
  #[error("program file ended early: expected {expected} words, read {read}")]
  Truncated { expected: Word, read: Word },
}

/**
  Reads the program at `path` into segment 0 of an empty store and returns the
  instruction count, which the machine records as its program length.
*/
pub fn read_program(path: &Path, segments: &mut SegmentStore) -> Result<Word, LoadError> {
  let file_length = fs::metadata(path)?.len();
  if file_length % BYTES_PER_WORD != 0 {
    return Err(LoadError::NotWordAligned(file_length));
  }
  let word_count = (file_length / BYTES_PER_WORD) as Word;

  let mut reader = BufReader::new(File::open(path)?);
  let id = segments.map(word_count);
  assert!(id == 0, "Error: The program was loaded into a store that was not empty.");

  let mut buffer = [0u8; BYTES_PER_WORD as usize];
  for offset in 0..word_count {
    match reader.read_exact(&mut buffer) {

      Ok(()) => {
        segments.set(0, offset, Word::from_be_bytes(buffer));
      }

      Err(ref error) if error.kind() == ErrorKind::UnexpectedEof => {
        return Err(LoadError::Truncated { expected: word_count, read: offset });
      }

      Err(error) => {
        return Err(LoadError::Unreadable(error));
      }

    }
  }

  Ok(word_count)
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::env;
  use std::path::PathBuf;

  /// Writes `bytes` to a fresh file under the system temp directory.
  fn program_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = env::temp_dir().join(format!("uvm-loader-{}-{}", std::process::id(), name));
    fs::write(&path, bytes).unwrap();
    path
  }

  #[test]
  fn loads_big_endian_words_in_order() {
    let path = program_file("words", &[
      0x00, 0x00, 0x00, 0x2A, // 42
      0xD0, 0x00, 0x00, 0x07, // Load value into register 0.
    ]);
    let mut store = SegmentStore::new();

    let length = read_program(&path, &mut store).unwrap();
    assert_eq!(length, 2);
    assert_eq!(store.get(0, 0), 42);
    assert_eq!(store.get(0, 1), 0xD000_0007);

    fs::remove_file(path).unwrap();
  }

  #[test]
  fn an_empty_file_is_an_empty_program() {
    let path = program_file("empty", &[]);
    let mut store = SegmentStore::new();

    assert_eq!(read_program(&path, &mut store).unwrap(), 0);
    // Segment 0 exists even though there is nothing in it.
    assert_eq!(store.duplicate_to_zero(0), 0);

    fs::remove_file(path).unwrap();
  }

  #[test]
  fn a_ragged_file_is_rejected() {
    let path = program_file("ragged", &[1, 2, 3, 4, 5, 6]);
    let mut store = SegmentStore::new();

    match read_program(&path, &mut store) {
      Err(LoadError::NotWordAligned(6)) => {}
      other => panic!("expected NotWordAligned, got {:?}", other),
    }

    fs::remove_file(path).unwrap();
  }

  #[test]
  fn a_missing_file_is_reported() {
    let path = env::temp_dir().join("uvm-loader-no-such-file");
    let mut store = SegmentStore::new();

    match read_program(&path, &mut store) {
      Err(LoadError::Unreadable(_)) => {}
      other => panic!("expected Unreadable, got {:?}", other),
    }
  }
}
