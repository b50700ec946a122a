#![allow(dead_code)]

use std::path::Path;

use retro_script::animation::AnimationFile;
use retro_script::bytecode::{ScriptStore, SubKind};
use retro_script::compiler::Compiler;
use retro_script::config::PlatformTags;
use retro_script::host::{AudioCommand, DrawCommand, Host, ObjectCollision, PaletteCommand, PlatformCommand};
use retro_script::scene::{Entity, Scene, PRIORITY_ACTIVE};
use retro_script::vm::{Interpreter, VmState};
use retro_script::{CompileError, RuntimeError};

pub const TEST_TYPE: usize = 1;
pub const SLOT: usize = 16;

/// Host that keeps everything scripts ask of it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub draws: Vec<DrawCommand>,
    pub palettes: Vec<PaletteCommand>,
    pub audio: Vec<AudioCommand>,
    pub platform: Vec<PlatformCommand>,
    pub collisions: Vec<ObjectCollision>,
    pub collision_result: i32,
    pub sheets: Vec<String>,
    pub animation: Option<AnimationFile>,
    pub text: Vec<String>,
    pub saved: Option<Vec<i32>>,
}

impl Host for RecordingHost {
    fn draw(&mut self, command: DrawCommand) {
        self.draws.push(command);
    }

    fn palette(&mut self, command: PaletteCommand) {
        self.palettes.push(command);
    }

    fn audio(&mut self, command: AudioCommand) {
        self.audio.push(command);
    }

    fn platform(&mut self, command: PlatformCommand) {
        self.platform.push(command);
    }

    fn load_sprite_sheet(&mut self, path: &str) -> i32 {
        match self.sheets.iter().position(|s| s == path) {
            Some(id) => id as i32,
            None => {
                self.sheets.push(path.to_string());
                self.sheets.len() as i32 - 1
            }
        }
    }

    fn load_animation(&mut self, path: &str) -> Option<AnimationFile> {
        let mut file = self.animation.clone()?;
        file.path = path.to_string();
        Some(file)
    }

    fn load_text_file(&mut self, _path: &str, _map_code: bool) -> Option<Vec<String>> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text.clone())
        }
    }

    fn player_object_collision(&mut self, _scene: &mut Scene, query: ObjectCollision) -> i32 {
        self.collisions.push(query);
        self.collision_result
    }

    fn write_save_ram(&mut self, save_ram: &[i32]) -> bool {
        self.saved = Some(save_ram.to_vec());
        true
    }
}

pub fn try_compile(source: &str) -> Result<ScriptStore, CompileError> {
    let mut store = ScriptStore::new();
    store.register_type("Test Object").unwrap();
    let globals = vec!["Counter".to_string(), "Flags".to_string()];
    let platform = PlatformTags::default();
    Compiler::new(&mut store, &globals, &platform).compile_file(Path::new("Test.txt"), source, TEST_TYPE)?;
    Ok(store)
}

pub fn compile(source: &str) -> ScriptStore {
    match try_compile(source) {
        Ok(store) => store,
        Err(err) => panic!("{err}"),
    }
}

/// One compiled script and an active entity of its type in [`SLOT`].
pub struct Harness {
    pub store: ScriptStore,
    pub scene: Scene,
    pub vm: VmState,
    pub host: RecordingHost,
    pub object: usize,
}

impl Harness {
    pub fn new(source: &str) -> Self {
        Self::with_store(compile(source))
    }

    pub fn with_store(store: ScriptStore) -> Self {
        let mut scene = Scene::new(424, 240);
        scene.globals = vec![0; 2];
        scene.entities[SLOT].type_id = TEST_TYPE as u8;
        scene.entities[SLOT].priority = PRIORITY_ACTIVE;
        let mut vm = VmState::new(Some(7));
        vm.step_limit = Some(100_000);
        Harness {
            store,
            scene,
            vm,
            host: RecordingHost::default(),
            object: SLOT,
        }
    }

    pub fn run(&mut self, sub: SubKind) -> Result<(), RuntimeError> {
        let entry = self.store.objects[TEST_TYPE].entry(sub).expect("sub-script compiled");
        self.vm.steps = 0;
        Interpreter::new(
            &mut self.store,
            &mut self.scene,
            &mut self.vm,
            &mut self.host,
            self.object,
            sub,
        )
        .run(entry)
    }

    pub fn main(&mut self) {
        self.run(SubKind::Main).unwrap();
    }

    pub fn temp(&self, index: usize) -> i32 {
        self.vm.regs.temp_values[index]
    }

    pub fn set_temp(&mut self, index: usize, value: i32) {
        self.vm.regs.temp_values[index] = value;
    }

    pub fn entity(&self) -> &Entity {
        &self.scene.entities[self.object]
    }
}
