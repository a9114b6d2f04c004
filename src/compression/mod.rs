//! Bytecode (opcode) case compression (spec.md §4.4).

pub mod bytecode;
