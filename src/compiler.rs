use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bytecode::{
    pack_string, AddressMode, EntryPoint, ScriptStore, SubKind, OBJECT_TYPE_CAPACITY,
    SOURCE_LITERAL, SOURCE_REGISTER, TAG_INTCONST, TAG_STRCONST, TAG_VAR,
};
use crate::config::PlatformTags;
use crate::error::{CompileError, CompileErrorKind, StoreError};
use crate::lexer::{LineReader, Mark};
use crate::opcode::Opcode;
use crate::parser::{
    alias_directive, case_label, function_directive, is_default_label, parse_integer,
    platform_directive, rewrite_assignment, rewrite_condition, rewrite_switch, split_call,
    split_indexed, starts_switch, ConditionKind, FunctionDirective, Operand,
};
use crate::token::{KW_ENDFUNCTION, KW_ENDPLATFORM, KW_ENDSUB, KW_ENDSWITCH};
use crate::variables;

const SWITCH_MIN_SEED: i32 = 0x10000;
const SWITCH_MAX_SEED: i32 = -0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub value: String,
}

impl Alias {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Aliases every file starts with.
pub fn default_aliases() -> Vec<Alias> {
    [
        ("true", "1"),
        ("false", "0"),
        ("FX_SCALE", "0"),
        ("FX_ROTATE", "1"),
        ("FX_ROTOZOOM", "2"),
        ("FX_INK", "3"),
        ("FX_FLIP", "5"),
        ("PRESENTATION_STAGE", "0"),
        ("REGULAR_STAGE", "1"),
        ("BONUS_STAGE", "2"),
        ("SPECIAL_STAGE", "3"),
        ("MENU_1", "0"),
        ("MENU_2", "1"),
        ("C_TOUCH", "0"),
        ("C_BOX", "1"),
        ("C_BOX2", "2"),
        ("C_PLATFORM", "3"),
        ("MAT_WORLD", "0"),
        ("MAT_VIEW", "1"),
        ("MAT_TEMP", "2"),
        ("FACING_LEFT", "1"),
        ("FACING_RIGHT", "0"),
        ("STAGE_PAUSED", "2"),
        ("STAGE_RUNNING", "1"),
        ("RESET_GAME", "2"),
        ("RETRO_WIN", "0"),
        ("RETRO_OSX", "1"),
        ("RETRO_XBOX_360", "2"),
        ("RETRO_PS3", "3"),
        ("RETRO_iOS", "4"),
        ("RETRO_ANDROID", "5"),
        ("RETRO_WP7", "6"),
    ]
    .iter()
    .map(|(name, value)| Alias::new(name, value))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Scopeless,
    Function,
    PlatformSkip,
    SwitchRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    While,
    Switch,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::While => "while",
            BlockKind::Switch => "switch",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    kind: BlockKind,
    /// Absolute jump table index of the block's first slot.
    slot: usize,
}

#[derive(Debug, Clone, Copy)]
struct SwitchScan {
    resume: Mark,
    depth: usize,
    header: usize,
}

/// Compiles script files into a shared [`ScriptStore`].
pub struct Compiler<'a> {
    store: &'a mut ScriptStore,
    globals: &'a [String],
    platform: &'a PlatformTags,
    path: PathBuf,
    object_type: usize,
    line: usize,
    aliases: Vec<Alias>,
    mode: ParseMode,
    blocks: Vec<Block>,
    switch_headers: Vec<usize>,
    scan: Option<SwitchScan>,
    code_offset: usize,
    jump_offset: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a mut ScriptStore, globals: &'a [String], platform: &'a PlatformTags) -> Self {
        Self {
            store,
            globals,
            platform,
            path: PathBuf::new(),
            object_type: 0,
            line: 0,
            aliases: default_aliases(),
            mode: ParseMode::Scopeless,
            blocks: Vec::new(),
            switch_headers: Vec::new(),
            scan: None,
            code_offset: 0,
            jump_offset: 0,
        }
    }

    /// Compiles one file whose sub-scripts belong to `object_type`.
    pub fn compile_file(&mut self, path: &Path, source: &str, object_type: usize) -> Result<(), CompileError> {
        self.path = path.to_path_buf();
        self.object_type = object_type;
        self.line = 0;
        self.aliases = default_aliases();
        self.mode = ParseMode::Scopeless;
        self.blocks.clear();
        self.scan = None;

        if object_type >= OBJECT_TYPE_CAPACITY {
            return Err(self.error(StoreError::ObjectTypesExhausted.into()));
        }

        debug!(path = %path.display(), object_type, "compiling script");
        let mut reader = LineReader::new(source);
        while let Some(line) = reader.next_line() {
            self.line = line.number;
            if line.text.is_empty() {
                continue;
            }
            self.parse_line(&line.text, &mut reader)
                .map_err(|kind| self.error(kind))?;
        }

        if self.mode != ParseMode::Scopeless {
            return Err(self.error(CompileErrorKind::UnexpectedEof));
        }
        debug!(
            path = %path.display(),
            code_words = self.store.code.len(),
            jump_words = self.store.jump_table.len(),
            "compiled script"
        );
        Ok(())
    }

    fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.path.clone(), self.line, kind)
    }

    fn parse_line(&mut self, text: &str, reader: &mut LineReader) -> Result<(), CompileErrorKind> {
        match self.mode {
            ParseMode::Scopeless => self.parse_scopeless(text),
            ParseMode::PlatformSkip => {
                if text.starts_with(KW_ENDPLATFORM) {
                    self.mode = ParseMode::Function;
                }
                Ok(())
            }
            ParseMode::SwitchRead => self.scan_switch(text, reader),
            ParseMode::Function => self.parse_body(text, reader),
        }
    }

    fn parse_scopeless(&mut self, text: &str) -> Result<(), CompileErrorKind> {
        if let Some((name, value)) = alias_directive(text) {
            self.aliases.push(Alias::new(name, value));
            return Ok(());
        }

        for sub in SubKind::ALL {
            if text.eq_ignore_ascii_case(sub.marker()) {
                let entry = self.open_body();
                self.store.objects[self.object_type].entries[sub.index()] = Some(entry);
                debug!(object_type = self.object_type, ?sub, code = entry.code, "sub-script start");
                return Ok(());
            }
        }

        match function_directive(text) {
            Some(FunctionDirective::Declare(name)) => {
                self.store.declare_function(name)?;
            }
            Some(FunctionDirective::Define(name)) => {
                let index = self.store.declare_function(name)?;
                let entry = self.open_body();
                self.store.functions[index].entry = Some(entry);
                debug!(function = name, index, code = entry.code, "function start");
            }
            None => {}
        }
        Ok(())
    }

    fn open_body(&mut self) -> EntryPoint {
        self.code_offset = self.store.code.len();
        self.jump_offset = self.store.jump_table.len();
        self.blocks.clear();
        self.switch_headers.clear();
        self.mode = ParseMode::Function;
        EntryPoint {
            code: self.code_offset,
            jump: self.jump_offset,
        }
    }

    fn close_body(&mut self, opcode: Opcode) -> Result<(), CompileErrorKind> {
        if let Some(block) = self.blocks.last() {
            return Err(CompileErrorKind::UnclosedBlock(block.kind.keyword().to_string()));
        }
        self.store.push_code(opcode.id())?;

        for index in self.jump_offset..self.store.jump_table.len() {
            let header = self
                .switch_headers
                .iter()
                .any(|&h| index == h || index == h + 1);
            if !header && self.store.jump_table[index] == -1 {
                return Err(CompileErrorKind::UnresolvedSlot(index - self.jump_offset));
            }
        }
        self.mode = ParseMode::Scopeless;
        Ok(())
    }

    fn code_rel(&self) -> i32 {
        (self.store.code.len() - self.code_offset) as i32
    }

    fn jump_rel(&self) -> i32 {
        (self.store.jump_table.len() - self.jump_offset) as i32
    }

    fn parse_body(&mut self, text: &str, reader: &mut LineReader) -> Result<(), CompileErrorKind> {
        if text.eq_ignore_ascii_case(KW_ENDSUB) {
            return self.close_body(Opcode::End);
        }
        if text.eq_ignore_ascii_case(KW_ENDFUNCTION) {
            return self.close_body(Opcode::EndFunction);
        }
        if let Some(tags) = platform_directive(text) {
            if !tags.iter().any(|tag| self.platform.matches(tag)) {
                self.mode = ParseMode::PlatformSkip;
            }
            return Ok(());
        }
        if text.starts_with(KW_ENDPLATFORM) {
            return Ok(());
        }

        let mut line = text.to_string();

        if let Some(condition) = rewrite_condition(&line, self.jump_rel()) {
            let slot = self.store.jump_table.len();
            let kind = match condition.kind {
                ConditionKind::If => {
                    self.store.push_jump(-1)?;
                    BlockKind::If
                }
                ConditionKind::While => {
                    let top = self.code_rel();
                    self.store.push_jump(top)?;
                    BlockKind::While
                }
            };
            self.store.push_jump(0)?;
            self.blocks.push(Block { kind, slot });
            line = condition.text;
        }

        if let Some(switched) = rewrite_switch(&line, self.jump_rel()) {
            let header = self.store.jump_table.len();
            for seed in [SWITCH_MIN_SEED, SWITCH_MAX_SEED, -1, 0] {
                self.store.push_jump(seed)?;
            }
            self.blocks.push(Block {
                kind: BlockKind::Switch,
                slot: header,
            });
            self.switch_headers.push(header);
            self.scan = Some(SwitchScan {
                resume: reader.mark(),
                depth: 0,
                header,
            });
            self.mode = ParseMode::SwitchRead;
            line = switched;
        }

        if let Some(assigned) = rewrite_assignment(&line) {
            line = assigned;
        }

        if self.switch_label(&line)? {
            return Ok(());
        }
        self.emit_call(&line)
    }

    /// Priming pass over a switch body: records the case range, then
    /// reserves the case slots and rewinds to the first body line.
    fn scan_switch(&mut self, text: &str, reader: &mut LineReader) -> Result<(), CompileErrorKind> {
        let Some(mut scan) = self.scan else {
            self.mode = ParseMode::Function;
            return Ok(());
        };

        if starts_switch(text) {
            scan.depth += 1;
        } else if text.eq_ignore_ascii_case(KW_ENDSWITCH) {
            if scan.depth == 0 {
                return self.finish_scan(scan, reader);
            }
            scan.depth -= 1;
        } else if scan.depth == 0 {
            if let Some(label) = case_label(text) {
                let value = self.case_value(label)?;
                let h = scan.header;
                self.store.jump_table[h] = self.store.jump_table[h].min(value);
                self.store.jump_table[h + 1] = self.store.jump_table[h + 1].max(value);
            }
        }
        self.scan = Some(scan);
        Ok(())
    }

    fn finish_scan(&mut self, scan: SwitchScan, reader: &mut LineReader) -> Result<(), CompileErrorKind> {
        let h = scan.header;
        if self.store.jump_table[h] > self.store.jump_table[h + 1] {
            self.store.jump_table[h] = 0;
            self.store.jump_table[h + 1] = 0;
        }
        let count = (self.store.jump_table[h + 1] as i64 - self.store.jump_table[h] as i64).abs() + 1;
        for _ in 0..count {
            self.store.push_jump(-1)?;
        }
        self.scan = None;
        self.mode = ParseMode::Function;
        reader.seek(scan.resume);
        Ok(())
    }

    fn resolve_alias(&self, text: &str) -> String {
        let mut text = text.to_string();
        for alias in &self.aliases {
            if text.eq_ignore_ascii_case(&alias.name) {
                text = alias.value.clone();
            }
        }
        text
    }

    fn case_value(&self, label: &str) -> Result<i32, CompileErrorKind> {
        let resolved = self.resolve_alias(label);
        parse_integer(&resolved).ok_or(CompileErrorKind::MalformedInteger(resolved))
    }

    fn innermost(&self, kind: BlockKind, keyword: &str) -> Result<Block, CompileErrorKind> {
        match self.blocks.last() {
            Some(block) if block.kind == kind => Ok(*block),
            _ => Err(CompileErrorKind::UnmatchedKeyword(keyword.to_string())),
        }
    }

    /// Handles `caseX:` and `default:`. Returns whether the line was one.
    fn switch_label(&mut self, text: &str) -> Result<bool, CompileErrorKind> {
        if let Some(label) = case_label(text) {
            let block = self.innermost(BlockKind::Switch, "case")?;
            let value = self.case_value(label)?;
            let h = block.slot;
            let (min, max) = (self.store.jump_table[h], self.store.jump_table[h + 1]);
            let offset = value as i64 - min as i64;
            let cases = (max as i64 - min as i64).abs() + 1;
            if !(0..cases).contains(&offset) {
                return Err(CompileErrorKind::CaseOutOfRange { value, min, max });
            }
            let target = self.code_rel();
            self.store.jump_table[h + 4 + offset as usize] = target;
            return Ok(true);
        }

        if is_default_label(text) {
            let block = self.innermost(BlockKind::Switch, "default")?;
            let target = self.code_rel();
            self.store.jump_table[block.slot + 2] = target;
            self.backfill_cases(block.slot, target);
            return Ok(true);
        }
        Ok(false)
    }

    fn backfill_cases(&mut self, header: usize, target: i32) {
        let cases = (self.store.jump_table[header + 1] as i64 - self.store.jump_table[header] as i64).abs() as usize + 1;
        for slot in &mut self.store.jump_table[header + 4..header + 4 + cases] {
            if *slot < 0 {
                *slot = target;
            }
        }
    }

    fn emit_call(&mut self, text: &str) -> Result<(), CompileErrorKind> {
        let call = split_call(text);
        let opcode = Opcode::lookup(call.name)
            .ok_or_else(|| CompileErrorKind::OpcodeNotFound(call.name.to_string()))?;
        if call.args.len() != opcode.arity() {
            return Err(CompileErrorKind::ArityMismatch {
                name: opcode.name().to_string(),
                expected: opcode.arity(),
                found: call.args.len(),
            });
        }

        let block = match opcode {
            Opcode::Else | Opcode::EndIf => Some(self.innermost(BlockKind::If, opcode.name())?),
            Opcode::Loop => Some(self.innermost(BlockKind::While, opcode.name())?),
            Opcode::Break | Opcode::EndSwitch => Some(self.innermost(BlockKind::Switch, opcode.name())?),
            _ => None,
        };

        self.store.push_code(opcode.id())?;
        let here = self.code_rel();

        if let Some(block) = block {
            let s = block.slot;
            let jt = &mut self.store.jump_table;
            match opcode {
                Opcode::Else => jt[s] = here,
                Opcode::EndIf => {
                    jt[s + 1] = here;
                    if jt[s] == -1 {
                        jt[s] = here - 1;
                    }
                    self.blocks.pop();
                }
                Opcode::EndSwitch => {
                    jt[s + 3] = here;
                    if jt[s + 2] == -1 {
                        jt[s + 2] = here - 1;
                        self.backfill_cases(s, here - 1);
                    }
                    self.blocks.pop();
                }
                Opcode::Loop => {
                    jt[s + 1] = here;
                    self.blocks.pop();
                }
                _ => {}
            }
        }

        for operand in call.args {
            self.emit_operand(operand)?;
        }
        Ok(())
    }

    fn emit_operand(&mut self, operand: Operand) -> Result<(), CompileErrorKind> {
        let Operand { mut base, mut index } = operand;

        for alias in &self.aliases {
            if base.eq_ignore_ascii_case(&alias.name) {
                let value = split_indexed(&alias.value);
                base = value.base;
                if alias.value.contains('[') {
                    index = value.index;
                }
            }
        }

        if let Some(slot) = self.globals.iter().position(|g| g.eq_ignore_ascii_case(&base)) {
            base = "Global".to_string();
            index = Some(slot.to_string());
        }

        if let Some(function) = self.store.function_index(&base) {
            base = function.to_string();
        }

        if base.eq_ignore_ascii_case("TypeName") {
            let label = index.as_deref().unwrap_or("");
            base = self.store.type_index(label).unwrap_or(0).to_string();
        }

        if let Some(value) = parse_integer(&base) {
            self.store.push_code(TAG_INTCONST)?;
            self.store.push_code(value)?;
            return Ok(());
        }

        if let Some(quoted) = base.strip_prefix('"') {
            let text = quoted.strip_suffix('"').unwrap_or(quoted);
            self.store.push_code(TAG_STRCONST)?;
            self.store.push_code(text.len() as i32)?;
            for word in pack_string(text) {
                self.store.push_code(word)?;
            }
            return Ok(());
        }

        self.store.push_code(TAG_VAR)?;
        match index {
            None => {
                self.store.push_code(AddressMode::None as i32)?;
            }
            Some(index) => {
                let (mode, rest) = if let Some(rest) = index.strip_prefix('+') {
                    (AddressMode::EntityPlus, rest)
                } else if let Some(rest) = index.strip_prefix('-') {
                    (AddressMode::EntityMinus, rest)
                } else {
                    (AddressMode::Array, index.as_str())
                };
                self.store.push_code(mode as i32)?;
                match parse_integer(rest) {
                    Some(value) => {
                        self.store.push_code(SOURCE_LITERAL)?;
                        self.store.push_code(value)?;
                    }
                    None => {
                        let register = index_register(rest)
                            .ok_or_else(|| CompileErrorKind::UnknownArrayIndex(rest.to_string()))?;
                        self.store.push_code(SOURCE_REGISTER)?;
                        self.store.push_code(register)?;
                    }
                }
            }
        }

        let id = variables::id_of(&base).ok_or(CompileErrorKind::OperandNotFound(base))?;
        self.store.push_code(id as i32)?;
        Ok(())
    }
}

/// Index registers usable inside `[...]`.
pub fn index_register(name: &str) -> Option<i32> {
    ["ArrayPos0", "ArrayPos1", "TempObjectPos"]
        .iter()
        .position(|r| r.eq_ignore_ascii_case(name))
        .map(|r| r as i32)
}

pub fn index_register_name(register: i32) -> Option<&'static str> {
    match register {
        0 => Some("ArrayPos0"),
        1 => Some("ArrayPos1"),
        2 => Some("TempObjectPos"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<ScriptStore, CompileError> {
        let mut store = ScriptStore::new();
        store.register_type("Ring").unwrap();
        let globals = vec!["LampPostID".to_string()];
        let platform = PlatformTags::default();
        Compiler::new(&mut store, &globals, &platform).compile_file(Path::new("Ring.txt"), source, 1)?;
        Ok(store)
    }

    fn kind(source: &str) -> CompileErrorKind {
        compile(source).unwrap_err().kind
    }

    #[test]
    fn sub_markers_set_entry_points() {
        let store = compile("subObjectMain\nTempValue0=1\nendsub\nsubobjectdraw\nendsub\n").unwrap();
        let main = store.objects[1].entry(SubKind::Main).unwrap();
        assert_eq!(main.code, 0);
        let draw = store.objects[1].entry(SubKind::Draw).unwrap();
        assert_eq!(draw.code, store.code.len() - 1);
        assert!(store.objects[1].entry(SubKind::Startup).is_none());
    }

    #[test]
    fn assignment_emits_operands() {
        let store = compile("subObjectMain\nTempValue0=5\nendsub").unwrap();
        let temp0 = variables::id_of("TempValue0").unwrap() as i32;
        assert_eq!(
            store.code,
            vec![Opcode::Equal.id(), TAG_VAR, 0, temp0, TAG_INTCONST, 5, Opcode::End.id()]
        );
    }

    #[test]
    fn globals_and_aliases_resolve() {
        let store = compile("#aliasSpeed:Object[+1].Value1\nsubObjectMain\nSpeed=LampPostID\nendsub").unwrap();
        let value1 = variables::id_of("Object.Value1").unwrap() as i32;
        let global = variables::id_of("Global").unwrap() as i32;
        assert_eq!(
            store.code,
            vec![
                Opcode::Equal.id(),
                TAG_VAR, AddressMode::EntityPlus as i32, SOURCE_LITERAL, 1, value1,
                TAG_VAR, AddressMode::Array as i32, SOURCE_LITERAL, 0, global,
                Opcode::End.id(),
            ]
        );
    }

    #[test]
    fn typename_resolves_to_type_index() {
        let store = compile("subObjectMain\nTempValue0=TypeName[Ring]\nTempValue1=TypeName[Nope]\nendsub").unwrap();
        assert_eq!(&store.code[4..6], &[TAG_INTCONST, 1]);
        assert_eq!(&store.code[10..12], &[TAG_INTCONST, 0]);
    }

    #[test]
    fn functions_resolve_forward_declarations() {
        let store = compile(
            "#functionLater\nsubObjectMain\nCallFunction(Later)\nendsub\nfunctionLater\nendfunction",
        )
        .unwrap();
        assert_eq!(&store.code[0..3], &[Opcode::CallFunction.id(), TAG_INTCONST, 0]);
        let later = store.functions[0].entry.unwrap();
        assert_eq!(store.code[later.code], Opcode::EndFunction.id());
    }

    #[test]
    fn if_without_else_targets_endif() {
        let store = compile("subObjectMain\nifTempValue0==1\nTempValue1=2\nendif\nendsub").unwrap();
        assert_eq!(store.jump_table, vec![14, 15]);
        assert_eq!(store.code[14], Opcode::EndIf.id());
    }

    #[test]
    fn while_records_its_own_offset() {
        let store = compile("subObjectMain\nTempValue0=0\nwhileTempValue0<3\nTempValue0++\nloop\nendsub").unwrap();
        assert_eq!(store.jump_table[0], 6);
        assert_eq!(store.code[6], Opcode::WLower.id());
        assert_eq!(store.code[store.jump_table[1] as usize - 1], Opcode::Loop.id());
    }

    #[test]
    fn switch_reserves_case_range() {
        let store = compile(
            "subObjectMain\nswitchTempValue0\ncase1:\nTempValue1=1\nbreak\ncase3:\ndefault:\nTempValue1=3\nendswitch\nendsub",
        )
        .unwrap();
        let jt = &store.jump_table;
        assert_eq!(jt.len(), 4 + 3);
        assert_eq!((jt[0], jt[1]), (1, 3));
        assert_eq!(jt[4 + 1], jt[2]);
        assert_eq!(jt[4 + 2], jt[2]);
        assert_ne!(jt[4], jt[2]);
    }

    #[test]
    fn empty_switch_gets_one_slot() {
        let store = compile("subObjectMain\nswitchTempValue0\nendswitch\nendsub").unwrap();
        assert_eq!(store.jump_table.len(), 5);
        assert_eq!((store.jump_table[0], store.jump_table[1]), (0, 0));
        assert_eq!(store.jump_table[4], store.jump_table[2]);
    }

    #[test]
    fn platform_blocks_skip_unmatched_tags() {
        let store = compile(
            "subObjectMain\n#platform:Mobile\nTempValue0=1\n#endplatform\n#platform:Standard\nTempValue1=1\n#endplatform\nendsub",
        )
        .unwrap();
        let temp1 = variables::id_of("TempValue1").unwrap() as i32;
        assert_eq!(store.code.len(), 7);
        assert_eq!(store.code[3], temp1);
    }

    #[test]
    fn unknown_names_are_fatal() {
        assert_eq!(
            kind("subObjectMain\nFrobnicate(1)\nendsub"),
            CompileErrorKind::OpcodeNotFound("Frobnicate".into())
        );
        assert_eq!(
            kind("subObjectMain\nObject.Bogus=1\nendsub"),
            CompileErrorKind::OperandNotFound("Object.Bogus".into())
        );
        assert_eq!(
            kind("subObjectMain\nObject[Nope].Value0=1\nendsub"),
            CompileErrorKind::UnknownArrayIndex("Nope".into())
        );
        assert_eq!(compile("subObjectMain\nbroken(\nendsub").unwrap_err().line, 2);
    }

    #[test]
    fn nesting_is_checked() {
        assert_eq!(kind("subObjectMain\nendif\nendsub"), CompileErrorKind::UnmatchedKeyword("endif".into()));
        assert_eq!(kind("subObjectMain\nloop\nendsub"), CompileErrorKind::UnmatchedKeyword("loop".into()));
        assert_eq!(
            kind("subObjectMain\nifTempValue0==1\nendsub"),
            CompileErrorKind::UnclosedBlock("if".into())
        );
        assert_eq!(kind("subObjectMain\nTempValue0=1\n"), CompileErrorKind::UnexpectedEof);
        assert_eq!(
            kind("subObjectMain\nswitchTempValue0\ncaseNOPE:\nendswitch\nendsub"),
            CompileErrorKind::MalformedInteger("NOPE".into())
        );
    }

    #[test]
    fn cases_missed_by_the_range_scan_are_rejected() {
        // the range scan stops at the endswitch inside the skipped platform block
        let err = compile(
            "subObjectMain\nswitchTempValue0\ncase1:\n#platform:Mobile\nendswitch\n#endplatform\ncase5:\nendswitch\nendsub",
        )
        .unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::CaseOutOfRange { value: 5, min: 1, max: 1 });
        assert_eq!(err.line, 7);
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            kind("subObjectMain\nDrawSprite(0,1)\nendsub"),
            CompileErrorKind::ArityMismatch {
                name: "DrawSprite".into(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn index_registers_round_trip() {
        for r in 0..3 {
            assert_eq!(index_register(index_register_name(r).unwrap()), Some(r));
        }
        assert_eq!(index_register("arraypos1"), Some(1));
        assert_eq!(index_register_name(3), None);
    }
}
