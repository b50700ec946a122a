//! Binary bytecode files.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! u32 code word count,  run blocks
//! u32 jump word count,  run blocks
//! u16 script count,     per object: 4 code pointers, then per object: 4 jump pointers
//! u16 function count,   function code pointers, then function jump pointers
//! ```
//!
//! A run block starts with a byte whose low 7 bits are the run length. With
//! the top bit set the run holds 32-bit words, otherwise single bytes.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::bytecode::{
    EntryPoint, ObjectScript, ScriptFunction, ScriptStore, SubKind, CODE_CAPACITY, FUNCTION_CAPACITY,
    JUMP_TABLE_CAPACITY, NO_ENTRY, OBJECT_TYPE_CAPACITY,
};
use crate::error::LoadError;

const WIDE_RUN: u8 = 0x80;
const MAX_RUN: usize = 0x7F;

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or(LoadError::Truncated(self.pos))?;
        self.pos += N;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, LoadError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn count(&mut self, section: &'static str, capacity: usize) -> Result<usize, LoadError> {
        let count = self.i32()?;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        check(section, count, capacity)?;
        Ok(count)
    }

    fn words(&mut self, count: usize) -> Result<Vec<i32>, LoadError> {
        let mut words = Vec::with_capacity(count);
        while words.len() < count {
            let header = self.u8()?;
            let run = (header as usize & MAX_RUN).min(count - words.len());
            for _ in 0..run {
                let word = if header & WIDE_RUN != 0 {
                    self.i32()?
                } else {
                    self.u8()? as i32
                };
                words.push(word);
            }
        }
        Ok(words)
    }
}

fn check(section: &'static str, count: usize, capacity: usize) -> Result<(), LoadError> {
    if count > capacity {
        return Err(LoadError::Capacity {
            section,
            count,
            capacity,
        });
    }
    Ok(())
}

fn entry(code: i32, jump: i32) -> Option<EntryPoint> {
    if code == NO_ENTRY {
        return None;
    }
    Some(EntryPoint {
        code: usize::try_from(code).ok()?,
        jump: usize::try_from(jump).ok()?,
    })
}

/// Replaces the compiled contents of `store` with the bytecode in `data`.
/// Registered type names are left alone.
pub fn decode(data: &[u8], store: &mut ScriptStore) -> Result<(), LoadError> {
    let mut cursor = Cursor::new(data);

    let code_count = cursor.count("code", CODE_CAPACITY)?;
    let code = cursor.words(code_count)?;
    let jump_count = cursor.count("jump table", JUMP_TABLE_CAPACITY)?;
    let jump_table = cursor.words(jump_count)?;

    let script_count = cursor.u16()? as usize;
    check("script", script_count, OBJECT_TYPE_CAPACITY)?;
    let mut code_ptrs = Vec::with_capacity(script_count * 4);
    for _ in 0..script_count * 4 {
        code_ptrs.push(cursor.i32()?);
    }
    let mut objects = vec![ObjectScript::default(); OBJECT_TYPE_CAPACITY];
    for (object, script) in objects.iter_mut().enumerate().take(script_count) {
        for sub in SubKind::ALL {
            let slot = object * 4 + sub.index();
            let jump = cursor.i32()?;
            script.entries[sub.index()] = entry(code_ptrs[slot], jump);
        }
    }

    let function_count = cursor.u16()? as usize;
    check("function", function_count, FUNCTION_CAPACITY)?;
    let mut function_ptrs = Vec::with_capacity(function_count);
    for _ in 0..function_count {
        function_ptrs.push(cursor.i32()?);
    }
    let mut functions = Vec::with_capacity(function_count);
    for (index, code) in function_ptrs.into_iter().enumerate() {
        let jump = cursor.i32()?;
        functions.push(ScriptFunction {
            name: format!("Function{index}"),
            entry: entry(code, jump),
        });
    }

    debug!(
        code_words = code.len(),
        jump_words = jump_table.len(),
        scripts = script_count,
        functions = functions.len(),
        "loaded bytecode"
    );
    store.code = code;
    store.jump_table = jump_table;
    store.objects = objects;
    store.functions = functions;
    Ok(())
}

fn push_words(out: &mut Vec<u8>, words: &[i32]) {
    out.extend_from_slice(&(words.len() as i32).to_le_bytes());
    let mut rest = words;
    while !rest.is_empty() {
        let narrow = |w: &i32| (0..=0xFF).contains(w);
        let wide = !narrow(&rest[0]);
        let run = rest
            .iter()
            .take(MAX_RUN)
            .take_while(|w| narrow(*w) != wide)
            .count();
        let (block, tail) = rest.split_at(run);
        if wide {
            out.push(WIDE_RUN | run as u8);
            for word in block {
                out.extend_from_slice(&word.to_le_bytes());
            }
        } else {
            out.push(run as u8);
            out.extend(block.iter().map(|&w| w as u8));
        }
        rest = tail;
    }
}

fn pointers(entry: Option<EntryPoint>) -> (i32, i32) {
    match entry {
        Some(e) => (e.code as i32, e.jump as i32),
        None => (NO_ENTRY, NO_ENTRY),
    }
}

/// Encodes every registered object type and every function of `store`.
pub fn encode(store: &ScriptStore) -> Vec<u8> {
    let mut out = Vec::new();
    push_words(&mut out, &store.code);
    push_words(&mut out, &store.jump_table);

    let scripts = &store.objects[..store.type_names.len().min(store.objects.len())];
    out.extend_from_slice(&(scripts.len() as u16).to_le_bytes());
    for script in scripts {
        for entry in script.entries {
            out.extend_from_slice(&pointers(entry).0.to_le_bytes());
        }
    }
    for script in scripts {
        for entry in script.entries {
            out.extend_from_slice(&pointers(entry).1.to_le_bytes());
        }
    }

    out.extend_from_slice(&(store.functions.len() as u16).to_le_bytes());
    for function in &store.functions {
        out.extend_from_slice(&pointers(function.entry).0.to_le_bytes());
    }
    for function in &store.functions {
        out.extend_from_slice(&pointers(function.entry).1.to_le_bytes());
    }
    out
}

pub fn read_file(path: &Path, store: &mut ScriptStore) -> Result<(), LoadError> {
    let data = fs::read(path)?;
    decode(&data, store)
}

pub fn write_file(path: &Path, store: &ScriptStore) -> Result<(), LoadError> {
    fs::write(path, encode(store))?;
    Ok(())
}
