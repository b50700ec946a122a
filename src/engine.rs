use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::bytecode::{ScriptStore, SubKind};
use crate::compiler::Compiler;
use crate::config::Config;
use crate::error::{CompileError, CompileErrorKind, EngineError};
use crate::host::Host;
use crate::loader;
use crate::scene::{
    Scene, DRAW_LAYER_COUNT, ENTITY_COUNT, PRIORITY_ACTIVE, PRIORITY_ACTIVE_BOUNDS,
    PRIORITY_ACTIVE_BOUNDS_REMOVE, PRIORITY_ACTIVE_PAUSED, PRIORITY_ACTIVE_XBOUNDS,
};
use crate::vm::{Interpreter, VmState};

/// Entity slot borrowed while Startup sub-scripts run.
const SCRATCH_ENTITY: usize = ENTITY_COUNT - 1;

/// Compiled scripts, scene state and the VM that runs one against the other.
pub struct Engine<H: Host> {
    pub config: Config,
    pub store: ScriptStore,
    pub scene: Scene,
    pub vm: VmState,
    pub host: H,
    error: Option<String>,
}

impl<H: Host> Engine<H> {
    pub fn new(config: Config, host: H) -> Self {
        let mut scene = Scene::new(config.screen_width, config.screen_height);
        scene.engine.version = config.engine_version.clone();
        scene.globals = config.globals.iter().map(|g| g.value).collect();

        let mut vm = VmState::new(config.rng_seed);
        vm.strict = config.strict_bounds;

        Self {
            config,
            store: ScriptStore::new(),
            scene,
            vm,
            host,
            error: None,
        }
    }

    /// The first error since the last [`Engine::reset_error`], if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn reset_error(&mut self) {
        self.error = None;
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        error!(%err, "engine entered the error state");
        if self.error.is_none() {
            self.error = Some(err.to_string());
        }
        err
    }

    /// ClearScriptData: forgets compiled code, sprite frames and animations.
    pub fn clear_script_data(&mut self) {
        self.store.clear();
        self.scene.sprite_frames.clear();
        self.scene.animations.clear();
    }

    /// Registers the configured object names as types 1.. in order.
    pub fn register_object_types(&mut self) -> Result<(), EngineError> {
        let objects = self.config.objects.clone();
        for object in objects {
            if let Err(err) = self.store.register_type(&object.name) {
                let err = CompileError::new(object.script, 0, CompileErrorKind::from(err));
                return Err(self.fail(err.into()));
            }
        }
        Ok(())
    }

    /// Compiles `source` into the store, its sub-scripts belonging to
    /// `object_type`.
    pub fn compile_source(&mut self, path: &Path, source: &str, object_type: usize) -> Result<(), EngineError> {
        let globals = self.config.global_names();
        let result = Compiler::new(&mut self.store, &globals, &self.config.platform)
            .compile_file(path, source, object_type);
        result.map_err(|err| self.fail(err.into()))
    }

    /// Clears the store, registers the configured types and compiles each
    /// type's script from the scripts directory.
    pub fn load_scripts(&mut self) -> Result<(), EngineError> {
        self.clear_script_data();
        self.register_object_types()?;

        let objects = self.config.objects.clone();
        for (index, object) in objects.iter().enumerate() {
            let path = self.config.script_path(&object.script);
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(source) => {
                    let err = EngineError::FileNotFound { path, source };
                    return Err(self.fail(err));
                }
            };
            self.compile_source(&object.script, &source, index + 1)?;
        }
        debug!(
            objects = objects.len(),
            code_words = self.store.code.len(),
            jump_words = self.store.jump_table.len(),
            "loaded scripts"
        );
        Ok(())
    }

    /// Replaces the compiled scripts with a bytecode file and registers the
    /// configured type names alongside it.
    pub fn load_bytecode(&mut self, path: &Path) -> Result<(), EngineError> {
        self.clear_script_data();
        self.register_object_types()?;
        loader::read_file(path, &mut self.store).map_err(|err| self.fail(err.into()))
    }

    /// Assigns every type its slice of the sprite frame list and runs its
    /// Startup sub-script on a scratch entity.
    pub fn setup_objects(&mut self) -> Result<(), EngineError> {
        self.scene.sprite_frames.clear();
        let saved = self.scene.entities[SCRATCH_ENTITY].clone();

        for type_id in 1..self.store.type_names.len() {
            let script = &mut self.store.objects[type_id];
            script.frame_list_offset = self.scene.sprite_frames.len();
            script.frame_count = 0;
            if script.entry(SubKind::Startup).is_none() {
                continue;
            }
            self.scene.entities[SCRATCH_ENTITY].type_id = type_id as u8;
            let result = self.process_script(SCRATCH_ENTITY, SubKind::Startup);
            if result.is_err() {
                self.scene.entities[SCRATCH_ENTITY] = saved;
                return result;
            }
        }

        self.scene.entities[SCRATCH_ENTITY] = saved;
        Ok(())
    }

    /// Runs one sub-script of the entity in slot `object`. A type without
    /// that sub-script does nothing.
    pub fn process_script(&mut self, object: usize, sub: SubKind) -> Result<(), EngineError> {
        let Some(type_id) = self.scene.entities.get(object).map(|e| e.type_id as usize) else {
            return Ok(());
        };
        let Some(entry) = self.store.object(type_id).and_then(|o| o.entry(sub)) else {
            return Ok(());
        };
        self.vm.steps = 0;
        let result = Interpreter::new(
            &mut self.store,
            &mut self.scene,
            &mut self.vm,
            &mut self.host,
            object,
            sub,
        )
        .run(entry);
        result.map_err(|err| {
            debug!(object, type_id, ?sub, "script aborted");
            self.fail(err.into())
        })
    }

    /// One frame of Main sub-scripts for every active entity, rebuilding the
    /// draw lists from each entity's draw order as it goes.
    pub fn process_objects(&mut self) -> Result<(), EngineError> {
        for list in self.scene.draw_lists.iter_mut() {
            list.clear();
        }

        for object in 0..ENTITY_COUNT {
            let entity = &self.scene.entities[object];
            let priority = entity.priority;
            let active = match priority {
                PRIORITY_ACTIVE_BOUNDS | PRIORITY_ACTIVE_BOUNDS_REMOVE => self.scene.in_bounds(entity, true),
                PRIORITY_ACTIVE | PRIORITY_ACTIVE_PAUSED => true,
                PRIORITY_ACTIVE_XBOUNDS => self.scene.in_bounds(entity, false),
                _ => false,
            };
            if !active && priority == PRIORITY_ACTIVE_BOUNDS_REMOVE {
                self.scene.entities[object].type_id = 0;
            }
            if !active || self.scene.entities[object].type_id == 0 {
                continue;
            }

            self.process_script(object, SubKind::Main)?;

            let layer = self.scene.entities[object].draw_order as usize;
            if layer < DRAW_LAYER_COUNT {
                self.scene.draw_lists[layer].push(object);
            }
        }
        Ok(())
    }

    /// Runs the Draw sub-script of every entity on draw list `layer`.
    pub fn draw_layer(&mut self, layer: usize) -> Result<(), EngineError> {
        let Some(list) = self.scene.draw_lists.get(layer).cloned() else {
            return Ok(());
        };
        for object in list {
            if self.scene.entities.get(object).is_some_and(|e| e.type_id > 0) {
                self.process_script(object, SubKind::Draw)?;
            }
        }
        Ok(())
    }

    pub fn process_player_interaction(&mut self, object: usize) -> Result<(), EngineError> {
        self.process_script(object, SubKind::PlayerInteraction)
    }

    /// Main for every active entity, then each draw layer in order.
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        self.process_objects()?;
        for layer in 0..DRAW_LAYER_COUNT {
            self.draw_layer(layer)?;
        }
        Ok(())
    }
}
