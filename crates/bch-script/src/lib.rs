/// Bitcoin Cash script: opcode table, the `Script` type, chunk parsing and
/// the script interpreter.
///
/// Execution errors are reported as [`interpreter::InterpreterError`];
/// parsing and building errors as [`ScriptError`].

pub mod chunk;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
