use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

use crate::bytecode::{
    packed_words, unpack_string, AddressMode, EntryPoint, ScriptStore, SubKind, SOURCE_LITERAL,
    SOURCE_REGISTER, TAG_INTCONST, TAG_STRCONST, TAG_VAR,
};
use crate::error::RuntimeError;
use crate::handlers;
use crate::host::Host;
use crate::opcode::Opcode;
use crate::scene::{Scene, TEMP_ENTITY_START};
use crate::variables::{self, VarContext};

pub const OPERAND_COUNT: usize = 10;
pub const BRANCH_STACK_LIMIT: usize = 0x400;
pub const CALL_STACK_LIMIT: usize = 0x400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    pub operands: [i32; OPERAND_COUNT],
    pub temp_values: [i32; 8],
    pub check_result: i32,
    /// `ArrayPos0`, `ArrayPos1` and `TempObjectPos`.
    pub array_pos: [i32; 3],
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            operands: [0; OPERAND_COUNT],
            temp_values: [0; 8],
            check_result: 0,
            array_pos: [0, 0, TEMP_ENTITY_START as i32],
        }
    }
}

/// Where execution resumes after `EndFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub ptr: usize,
    pub jump_base: usize,
    pub code_base: usize,
}

/// Register file, stacks and the current string constant. Registers
/// survive between invocations, the stacks do not.
pub struct VmState {
    pub regs: Registers,
    branch_stack: Vec<i32>,
    call_stack: Vec<Frame>,
    pub script_text: String,
    pub rng: StdRng,
    pub strict: bool,
    pub step_limit: Option<u64>,
    pub steps: u64,
}

impl VmState {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            regs: Registers::default(),
            branch_stack: Vec::new(),
            call_stack: Vec::new(),
            script_text: String::new(),
            rng,
            strict: false,
            step_limit: None,
            steps: 0,
        }
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn branch_depth(&self) -> usize {
        self.branch_stack.len()
    }
}

impl Default for VmState {
    fn default() -> Self {
        Self::new(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Operands were inputs only, skip the write phase.
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Next,
    /// Absolute code offset.
    Jump(usize),
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub access: Access,
    pub control: Control,
}

impl Outcome {
    pub const READ_ONLY: Outcome = Outcome {
        access: Access::ReadOnly,
        control: Control::Next,
    };
    pub const READ_WRITE: Outcome = Outcome {
        access: Access::ReadWrite,
        control: Control::Next,
    };
    pub const HALT: Outcome = Outcome {
        access: Access::ReadOnly,
        control: Control::Halt,
    };

    pub fn jump(target: usize) -> Outcome {
        Outcome {
            access: Access::ReadOnly,
            control: Control::Jump(target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, Default)]
struct Position {
    code_base: usize,
    jump_base: usize,
    ptr: usize,
}

/// Runs sub-scripts against one object.
pub struct Interpreter<'a> {
    pub store: &'a mut ScriptStore,
    pub scene: &'a mut Scene,
    pub vm: &'a mut VmState,
    pub host: &'a mut dyn Host,
    pub object: usize,
    pub sub: SubKind,
    pos: Position,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        store: &'a mut ScriptStore,
        scene: &'a mut Scene,
        vm: &'a mut VmState,
        host: &'a mut dyn Host,
        object: usize,
        sub: SubKind,
    ) -> Self {
        Self {
            store,
            scene,
            vm,
            host,
            object,
            sub,
            pos: Position::default(),
        }
    }

    /// Executes from `entry` until `End`.
    pub fn run(&mut self, entry: EntryPoint) -> Result<(), RuntimeError> {
        self.vm.branch_stack.clear();
        self.vm.call_stack.clear();
        self.pos = Position {
            code_base: entry.code,
            jump_base: entry.jump,
            ptr: entry.code,
        };

        loop {
            self.vm.steps += 1;
            if let Some(limit) = self.vm.step_limit {
                if self.vm.steps > limit {
                    return Err(RuntimeError::StepLimitExceeded(limit));
                }
            }

            let offset = self.pos.ptr;
            let id = self.next_word()?;
            let opcode = Opcode::from_id(id).ok_or(RuntimeError::InvalidOpcode { offset, id })?;
            let operands = self.pos.ptr;
            self.walk_operands(opcode.arity(), Direction::Read)?;

            let outcome = handlers::execute(self, opcode)?;
            if outcome.access == Access::ReadWrite {
                self.pos.ptr = operands;
                self.walk_operands(opcode.arity(), Direction::Write)?;
            }
            match outcome.control {
                Control::Next => {}
                Control::Jump(target) => self.pos.ptr = target,
                Control::Halt => return Ok(()),
            }
        }
    }

    fn next_word(&mut self) -> Result<i32, RuntimeError> {
        let word = *self
            .store
            .code
            .get(self.pos.ptr)
            .ok_or(RuntimeError::CodeOutOfRange(self.pos.ptr))?;
        self.pos.ptr += 1;
        Ok(word)
    }

    /// Decodes `count` operands starting at the code pointer, either
    /// loading them into the operand registers or storing the registers
    /// back to the variables they came from.
    fn walk_operands(&mut self, count: usize, direction: Direction) -> Result<(), RuntimeError> {
        for i in 0..count {
            let offset = self.pos.ptr;
            match self.next_word()? {
                TAG_INTCONST => {
                    let value = self.next_word()?;
                    if direction == Direction::Read {
                        self.vm.regs.operands[i] = value;
                    }
                }
                TAG_STRCONST => {
                    let len = usize::try_from(self.next_word()?)
                        .map_err(|_| RuntimeError::InvalidOperandTag { offset, tag: TAG_STRCONST })?;
                    let start = self.pos.ptr;
                    let end = start + packed_words(len);
                    let words = self
                        .store
                        .code
                        .get(start..end)
                        .ok_or(RuntimeError::CodeOutOfRange(end))?;
                    if direction == Direction::Read {
                        self.vm.script_text = unpack_string(words, len);
                        self.vm.regs.operands[i] = 0;
                    }
                    self.pos.ptr = end;
                }
                TAG_VAR => {
                    let index = self.operand_index(offset)?;
                    let id = self.next_word()?;
                    let variable = variables::get(id).ok_or(RuntimeError::UnknownVariable { offset, id })?;
                    match direction {
                        Direction::Read => {
                            let value = variable.read(&self.var_context(), index)?;
                            self.vm.regs.operands[i] = value;
                        }
                        Direction::Write => {
                            let value = self.vm.regs.operands[i];
                            variable.write(&mut self.var_context(), index, value)?;
                        }
                    }
                }
                tag => return Err(RuntimeError::InvalidOperandTag { offset, tag }),
            }
        }
        Ok(())
    }

    fn operand_index(&mut self, offset: usize) -> Result<i32, RuntimeError> {
        let word = self.next_word()?;
        let mode = AddressMode::from_word(word).ok_or(RuntimeError::InvalidAddressingMode { offset, mode: word })?;
        let object = self.object as i32;
        if mode == AddressMode::None {
            return Ok(object);
        }

        let source = self.next_word()?;
        let value = self.next_word()?;
        let index = match source {
            SOURCE_LITERAL => value,
            SOURCE_REGISTER => *usize::try_from(value)
                .ok()
                .and_then(|r| self.vm.regs.array_pos.get(r))
                .ok_or(RuntimeError::InvalidIndexRegister { offset, register: value })?,
            _ => return Err(RuntimeError::InvalidAddressingMode { offset, mode: source }),
        };
        Ok(match mode {
            AddressMode::EntityPlus => object.wrapping_add(index),
            AddressMode::EntityMinus => object.wrapping_sub(index),
            _ => index,
        })
    }

    fn var_context(&mut self) -> VarContext<'_> {
        VarContext {
            scene: &mut *self.scene,
            regs: &mut self.vm.regs,
            objects: &mut self.store.objects,
            host: &mut *self.host,
            object: self.object,
            strict: self.vm.strict,
        }
    }

    pub(crate) fn op(&self, i: usize) -> i32 {
        self.vm.regs.operands[i]
    }

    pub(crate) fn set_op(&mut self, i: usize, value: i32) {
        self.vm.regs.operands[i] = value;
    }

    /// Absolute code offset held in jump table slot `slot + k` of the
    /// running body.
    pub(crate) fn jump_target(&self, slot: i32, k: i64) -> Result<usize, RuntimeError> {
        let index = self.pos.jump_base as i64 + slot as i64 + k;
        let value = usize::try_from(index)
            .ok()
            .and_then(|i| self.store.jump_table.get(i))
            .ok_or(RuntimeError::JumpSlotOutOfRange(index))?;
        let relative = usize::try_from(*value).map_err(|_| RuntimeError::UnresolvedJump(index as usize))?;
        Ok(self.pos.code_base + relative)
    }

    pub(crate) fn jump_word(&self, slot: i32, k: i64) -> Result<i32, RuntimeError> {
        let index = self.pos.jump_base as i64 + slot as i64 + k;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.store.jump_table.get(i))
            .copied()
            .ok_or(RuntimeError::JumpSlotOutOfRange(index))
    }

    pub(crate) fn push_branch(&mut self, slot: i32) -> Result<(), RuntimeError> {
        if self.vm.branch_stack.len() >= BRANCH_STACK_LIMIT {
            return Err(RuntimeError::BranchStackOverflow);
        }
        self.vm.branch_stack.push(slot);
        Ok(())
    }

    pub(crate) fn pop_branch(&mut self) -> Result<i32, RuntimeError> {
        self.vm.branch_stack.pop().ok_or(RuntimeError::BranchStackUnderflow)
    }

    /// Enters function `index`, remembering the current position.
    pub(crate) fn call(&mut self, index: i32) -> Result<(), RuntimeError> {
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| self.store.functions.get(i))
            .and_then(|f| f.entry)
            .ok_or(RuntimeError::UndefinedFunction(index))?;
        if self.vm.call_stack.len() >= CALL_STACK_LIMIT {
            return Err(RuntimeError::CallStackOverflow);
        }
        self.vm.call_stack.push(Frame {
            ptr: self.pos.ptr,
            jump_base: self.pos.jump_base,
            code_base: self.pos.code_base,
        });
        self.pos = Position {
            code_base: entry.code,
            jump_base: entry.jump,
            ptr: entry.code,
        };
        Ok(())
    }

    pub(crate) fn ret(&mut self) -> Result<(), RuntimeError> {
        let frame = self.vm.call_stack.pop().ok_or(RuntimeError::CallStackUnderflow)?;
        self.pos = Position {
            code_base: frame.code_base,
            jump_base: frame.jump_base,
            ptr: frame.ptr,
        };
        Ok(())
    }

    /// Degrades a bad index to a no-op, or fails in strict mode.
    pub(crate) fn out_of_range(&self, what: &str, index: i32) -> Result<(), RuntimeError> {
        if self.vm.strict {
            return Err(RuntimeError::IndexOutOfRange {
                variable: what.to_string(),
                index,
            });
        }
        warn!(what, index, object = self.object, "index out of range, skipped");
        Ok(())
    }

    /// Type id of the running object.
    pub(crate) fn object_type(&self) -> usize {
        self.scene
            .entities
            .get(self.object)
            .map_or(0, |e| e.type_id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{pack_string, ScriptFunction};
    use crate::host::NullHost;

    fn var(name: &str) -> i32 {
        variables::id_of(name).unwrap() as i32
    }

    fn run(code: Vec<i32>, jump_table: Vec<i32>, object: usize) -> (Scene, VmState, Result<(), RuntimeError>) {
        let mut store = ScriptStore::new();
        store.code = code;
        store.jump_table = jump_table;
        let mut scene = Scene::new(320, 240);
        let mut vm = VmState::new(Some(1));
        let mut host = NullHost;
        let result = Interpreter::new(&mut store, &mut scene, &mut vm, &mut host, object, SubKind::Main)
            .run(EntryPoint::default());
        (scene, vm, result)
    }

    #[test]
    fn write_phase_stores_the_destination() {
        let code = vec![
            Opcode::Equal.id(), TAG_VAR, 0, var("Object.Value2"), TAG_INTCONST, 9,
            Opcode::Add.id(), TAG_VAR, 2, SOURCE_LITERAL, 1, var("Object.Value2"), TAG_INTCONST, 1,
            Opcode::End.id(),
        ];
        let (scene, _, result) = run(code, vec![], 4);
        result.unwrap();
        assert_eq!(scene.entities[4].values[2], 9);
        assert_eq!(scene.entities[5].values[2], 1);
    }

    #[test]
    fn string_constants_land_in_script_text() {
        let mut code = vec![Opcode::LoadVideo.id(), TAG_STRCONST, 9];
        code.extend(pack_string("Intro.ogv"));
        code.push(Opcode::End.id());
        let (_, vm, result) = run(code, vec![], 0);
        result.unwrap();
        assert_eq!(vm.script_text, "Intro.ogv");
    }

    #[test]
    fn corrupt_code_is_reported() {
        let (_, _, result) = run(vec![200], vec![], 0);
        assert_eq!(result, Err(RuntimeError::InvalidOpcode { offset: 0, id: 200 }));

        let (_, _, result) = run(vec![Opcode::Inc.id(), 7, 0], vec![], 0);
        assert_eq!(result, Err(RuntimeError::InvalidOperandTag { offset: 1, tag: 7 }));

        let (_, _, result) = run(vec![Opcode::Inc.id(), TAG_VAR, 0, 9999], vec![], 0);
        assert_eq!(result, Err(RuntimeError::UnknownVariable { offset: 1, id: 9999 }));

        let (_, _, result) = run(vec![Opcode::Inc.id(), TAG_VAR, 1, 1, 5, var("Global")], vec![], 0);
        assert_eq!(result, Err(RuntimeError::InvalidIndexRegister { offset: 1, register: 5 }));

        let (_, _, result) = run(vec![Opcode::StopMusic.id()], vec![], 0);
        assert_eq!(result, Err(RuntimeError::CodeOutOfRange(1)));
    }

    #[test]
    fn unbalanced_stacks_fail() {
        let (_, _, result) = run(vec![Opcode::EndIf.id(), Opcode::End.id()], vec![], 0);
        assert_eq!(result, Err(RuntimeError::BranchStackUnderflow));
        let (_, _, result) = run(vec![Opcode::EndFunction.id()], vec![], 0);
        assert_eq!(result, Err(RuntimeError::CallStackUnderflow));
    }

    #[test]
    fn unresolved_jump_slots_fail() {
        let code = vec![
            Opcode::IfEqual.id(), TAG_INTCONST, 0, TAG_INTCONST, 1, TAG_INTCONST, 2,
            Opcode::End.id(),
        ];
        let (_, _, result) = run(code, vec![-1, 0], 0);
        assert_eq!(result, Err(RuntimeError::UnresolvedJump(0)));
    }

    #[test]
    fn runaway_loops_hit_the_step_limit() {
        let code = vec![
            Opcode::WEqual.id(), TAG_INTCONST, 0, TAG_INTCONST, 1, TAG_INTCONST, 1,
            Opcode::Loop.id(),
            Opcode::End.id(),
        ];
        let mut store = ScriptStore::new();
        store.code = code;
        store.jump_table = vec![0, 8];
        let mut scene = Scene::new(320, 240);
        let mut vm = VmState::new(Some(1));
        vm.step_limit = Some(100);
        let mut host = NullHost;
        let result = Interpreter::new(&mut store, &mut scene, &mut vm, &mut host, 0, SubKind::Main)
            .run(EntryPoint::default());
        assert_eq!(result, Err(RuntimeError::StepLimitExceeded(100)));
    }

    #[test]
    fn calls_return_to_the_caller() {
        let mut store = ScriptStore::new();
        store.code = vec![
            Opcode::CallFunction.id(), TAG_INTCONST, 0,
            Opcode::Inc.id(), TAG_VAR, 0, var("TempValue1"),
            Opcode::End.id(),
            Opcode::Inc.id(), TAG_VAR, 0, var("TempValue0"),
            Opcode::EndFunction.id(),
        ];
        store.functions.push(ScriptFunction {
            name: "Bump".into(),
            entry: Some(EntryPoint { code: 8, jump: 0 }),
        });
        let mut scene = Scene::new(320, 240);
        let mut vm = VmState::new(Some(1));
        let mut host = NullHost;
        Interpreter::new(&mut store, &mut scene, &mut vm, &mut host, 0, SubKind::Main)
            .run(EntryPoint::default())
            .unwrap();
        assert_eq!(vm.regs.temp_values[0], 1);
        assert_eq!(vm.regs.temp_values[1], 1);
        assert_eq!(vm.call_depth(), 0);
    }

    #[test]
    fn temp_object_pos_starts_in_the_temporary_range() {
        assert_eq!(Registers::default().array_pos[2], TEMP_ENTITY_START as i32);
    }
}
