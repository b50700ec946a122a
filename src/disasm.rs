use std::fmt;

use crate::bytecode::{
    packed_words, unpack_string, AddressMode, ScriptStore, SubKind, SOURCE_LITERAL,
    SOURCE_REGISTER, TAG_INTCONST, TAG_STRCONST, TAG_VAR,
};
use crate::compiler::index_register_name;
use crate::error::RuntimeError;
use crate::opcode::Opcode;
use crate::variables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode word.
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<String>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:6}: {}", self.offset, self.opcode.name())?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

struct Walker<'a> {
    code: &'a [i32],
    ptr: usize,
}

impl Walker<'_> {
    fn next(&mut self) -> Result<i32, RuntimeError> {
        let word = *self.code.get(self.ptr).ok_or(RuntimeError::CodeOutOfRange(self.ptr))?;
        self.ptr += 1;
        Ok(word)
    }

    fn operand(&mut self) -> Result<String, RuntimeError> {
        let offset = self.ptr;
        match self.next()? {
            TAG_INTCONST => Ok(self.next()?.to_string()),
            TAG_STRCONST => {
                let len = usize::try_from(self.next()?)
                    .map_err(|_| RuntimeError::InvalidOperandTag { offset, tag: TAG_STRCONST })?;
                let end = self.ptr + packed_words(len);
                let words = self.code.get(self.ptr..end).ok_or(RuntimeError::CodeOutOfRange(end))?;
                self.ptr = end;
                Ok(format!("\"{}\"", unpack_string(words, len)))
            }
            TAG_VAR => {
                let word = self.next()?;
                let mode = AddressMode::from_word(word).ok_or(RuntimeError::InvalidAddressingMode { offset, mode: word })?;
                let index = if mode == AddressMode::None {
                    None
                } else {
                    Some(self.index(offset)?)
                };
                let id = self.next()?;
                let name = variables::get(id)
                    .ok_or(RuntimeError::UnknownVariable { offset, id })?
                    .name();
                Ok(match (mode, index) {
                    (AddressMode::EntityPlus, Some(index)) => format!("{name}[+{index}]"),
                    (AddressMode::EntityMinus, Some(index)) => format!("{name}[-{index}]"),
                    (_, Some(index)) => format!("{name}[{index}]"),
                    (_, None) => name.to_string(),
                })
            }
            tag => Err(RuntimeError::InvalidOperandTag { offset, tag }),
        }
    }

    fn index(&mut self, offset: usize) -> Result<String, RuntimeError> {
        let source = self.next()?;
        let value = self.next()?;
        match source {
            SOURCE_LITERAL => Ok(value.to_string()),
            SOURCE_REGISTER => index_register_name(value)
                .map(str::to_string)
                .ok_or(RuntimeError::InvalidIndexRegister { offset, register: value }),
            _ => Err(RuntimeError::InvalidAddressingMode { offset, mode: source }),
        }
    }
}

/// Decodes the instruction at `offset`, returning it with the offset of the
/// next one.
pub fn decode_at(code: &[i32], offset: usize) -> Result<(Instruction, usize), RuntimeError> {
    let mut walker = Walker { code, ptr: offset };
    let id = walker.next()?;
    let opcode = Opcode::from_id(id).ok_or(RuntimeError::InvalidOpcode { offset, id })?;
    let operands = (0..opcode.arity())
        .map(|_| walker.operand())
        .collect::<Result<Vec<_>, _>>()?;
    let instruction = Instruction {
        offset,
        opcode,
        operands,
    };
    Ok((instruction, walker.ptr))
}

/// Decodes a body from its entry up to and including its `End` or
/// `EndFunction`.
pub fn body(code: &[i32], entry: usize) -> Result<Vec<Instruction>, RuntimeError> {
    let mut out = Vec::new();
    let mut offset = entry;
    loop {
        let (instruction, next) = decode_at(code, offset)?;
        let last = matches!(instruction.opcode, Opcode::End | Opcode::EndFunction);
        out.push(instruction);
        if last {
            return Ok(out);
        }
        offset = next;
    }
}

/// Listing of every sub-script and function in `store`.
pub fn dump(store: &ScriptStore) -> Result<String, RuntimeError> {
    let mut out = String::new();
    for (type_id, script) in store.objects.iter().enumerate() {
        for sub in SubKind::ALL {
            let Some(entry) = script.entry(sub) else {
                continue;
            };
            let name = store
                .type_names
                .get(type_id)
                .cloned()
                .unwrap_or_else(|| format!("Type{type_id}"));
            out.push_str(&format!("{name}.{} (jump base {}):\n", sub.marker(), entry.jump));
            for instruction in body(&store.code, entry.code)? {
                out.push_str(&format!("{instruction}\n"));
            }
            out.push('\n');
        }
    }
    for function in &store.functions {
        let Some(entry) = function.entry else {
            continue;
        };
        out.push_str(&format!("function {} (jump base {}):\n", function.name, entry.jump));
        for instruction in body(&store.code, entry.code)? {
            out.push_str(&format!("{instruction}\n"));
        }
        out.push('\n');
    }
    Ok(out)
}
