pub mod animation;
pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod disasm;
pub mod engine;
pub mod error;
mod handlers;
pub mod host;
pub mod lexer;
pub mod loader;
pub mod math;
pub mod opcode;
pub mod parser;
pub mod scene;
pub mod token;
pub mod variables;
pub mod vm;

pub use engine::Engine;
pub use error::{CompileError, EngineError, LoadError, RuntimeError};
pub use host::{Host, NullHost, TracingHost};
