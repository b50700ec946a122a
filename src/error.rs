use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("script code store exhausted")]
    CodeExhausted,
    #[error("jump table exhausted")]
    JumpTableExhausted,
    #[error("function table exhausted")]
    FunctionsExhausted,
    #[error("object type table exhausted")]
    ObjectTypesExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("OPCODE NOT FOUND: {0}")]
    OpcodeNotFound(String),
    #[error("OPERAND NOT FOUND: {0}")]
    OperandNotFound(String),
    #[error("malformed integer: {0}")]
    MalformedInteger(String),
    #[error("case {value} falls outside the switch range {min}..={max}")]
    CaseOutOfRange { value: i32, min: i32, max: i32 },
    #[error("unknown array index: {0}")]
    UnknownArrayIndex(String),
    #[error("'{name}' expects {expected} operand(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("'{0}' has no matching opening block")]
    UnmatchedKeyword(String),
    #[error("'{0}' block is never closed")]
    UnclosedBlock(String),
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("jump table slot {0} left unresolved")]
    UnresolvedSlot(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CompileError: {}\n  --> {}:{}", .kind, .path.display(), .line)]
pub struct CompileError {
    pub path: PathBuf,
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(path: PathBuf, line: usize, kind: CompileErrorKind) -> Self {
        Self { path, line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("invalid opcode {id} at offset {offset}")]
    InvalidOpcode { offset: usize, id: i32 },
    #[error("invalid operand tag {tag} at offset {offset}")]
    InvalidOperandTag { offset: usize, tag: i32 },
    #[error("invalid addressing mode {mode} at offset {offset}")]
    InvalidAddressingMode { offset: usize, mode: i32 },
    #[error("invalid index register {register} at offset {offset}")]
    InvalidIndexRegister { offset: usize, register: i32 },
    #[error("unknown variable id {id} at offset {offset}")]
    UnknownVariable { offset: usize, id: i32 },
    #[error("code pointer {0} out of range")]
    CodeOutOfRange(usize),
    #[error("jump table slot {0} out of range")]
    JumpSlotOutOfRange(i64),
    #[error("jump table slot {0} is unresolved")]
    UnresolvedJump(usize),
    #[error("branch stack underflow")]
    BranchStackUnderflow,
    #[error("branch stack overflow")]
    BranchStackOverflow,
    #[error("call stack underflow")]
    CallStackUnderflow,
    #[error("call stack overflow")]
    CallStackOverflow,
    #[error("function {0} is not defined")]
    UndefinedFunction(i32),
    #[error("index {index} out of range for {variable}")]
    IndexOutOfRange { variable: String, index: i32 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IOError: {0}")]
    Io(#[from] io::Error),
    #[error("bytecode truncated at byte {0}")]
    Truncated(usize),
    #[error("{section} count {count} exceeds capacity {capacity}")]
    Capacity {
        section: &'static str,
        count: usize,
        capacity: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IOError: {0}")]
    Io(#[from] io::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("LoadError: {0}")]
    Load(#[from] LoadError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("FileNotFoundError: {}: {source}", .path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_points_at_source_line() {
        let err = CompileError::new(
            PathBuf::from("Scripts/Ring.txt"),
            12,
            CompileErrorKind::OperandNotFound("Object.Bogus".into()),
        );
        assert_eq!(
            err.to_string(),
            "CompileError: OPERAND NOT FOUND: Object.Bogus\n  --> Scripts/Ring.txt:12"
        );
    }

    #[test]
    fn store_errors_convert_into_compile_kinds() {
        let kind: CompileErrorKind = StoreError::JumpTableExhausted.into();
        assert_eq!(kind.to_string(), "jump table exhausted");
    }
}
