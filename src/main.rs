#![allow(dead_code)]

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
#[macro_use] extern crate strum_macros;

mod bytecode;
mod operations;
mod segments;
mod loader;
mod uvm;

use std::env;
use std::io;
use std::process;

use crate::uvm::UVM;

fn main() {

  #[cfg(feature = "trace_execution")]
  println!("Execution Tracing ENABLED");

  let mut args = env::args();
  let name = args.next().unwrap_or_else(|| String::from("uvm"));
  let program_path = match (args.next(), args.next()) {

    (Some(path), None) => path,

    _ => {
      eprintln!("Usage: {} <program>", name);
      process::exit(1);
    }

  };

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut machine = UVM::new(stdin.lock(), stdout.lock());

  if let Err(error) = machine.run(&program_path) {
    eprintln!("{}: {}", program_path, error);
    process::exit(1);
  }

}
