mod common;
use common::*;

use std::fs;
use std::path::{Path, PathBuf};

use retro_script::config::{Config, GlobalVariable, ObjectEntry};
use retro_script::host::DrawCommand;
use retro_script::scene::PRIORITY_ACTIVE;
use retro_script::{loader, Engine, EngineError};

const RING: &str = "
sub ObjectStartup
    LoadSpriteSheet(\"Global/Items.gif\")
    SpriteFrame(-8, -8, 16, 16, 1, 1)
    SpriteFrame(-8, -8, 16, 16, 18, 1)
end sub

sub ObjectMain
    Object.Value0++
    RingsCollected++
    Object.Frame = Object.Value0
    Object.Frame &= 1
end sub

sub ObjectDraw
    DrawSprite(Object.Frame)
end sub
";

const SPRING: &str = "
sub ObjectStartup
    LoadSpriteSheet(\"Global/Springs.gif\")
    SpriteFrame(-16, -8, 32, 16, 0, 64)
end sub

sub ObjectMain
    Object.DrawOrder = 4
end sub

sub ObjectPlayerInteraction
    Object.State = 1
end sub

sub ObjectDraw
    DrawSprite(0)
end sub
";

fn write_game(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir.join("Scripts")).unwrap();
    fs::write(dir.join("Scripts/Ring.txt"), RING).unwrap();
    fs::write(dir.join("Scripts/Spring.txt"), SPRING).unwrap();

    let config = Config {
        scripts_dir: PathBuf::from("Scripts"),
        globals: vec![GlobalVariable {
            name: "RingsCollected".into(),
            value: 10,
        }],
        objects: vec![
            ObjectEntry {
                name: "Ring".into(),
                script: PathBuf::from("Ring.txt"),
            },
            ObjectEntry {
                name: "Spring".into(),
                script: PathBuf::from("Spring.txt"),
            },
        ],
        rng_seed: Some(1),
        ..Config::default()
    };
    let path = dir.join("Game.json");
    config.save(&path).unwrap();
    path
}

fn engine(config_path: &Path) -> Engine<RecordingHost> {
    Engine::new(Config::load(config_path).unwrap(), RecordingHost::default())
}

/// Spring in slot 0 and Ring in slot 1, both always active.
fn spawn(engine: &mut Engine<RecordingHost>) {
    for (slot, type_id, x) in [(0, 2, 100), (1, 1, 50)] {
        let entity = &mut engine.scene.entities[slot];
        entity.type_id = type_id;
        entity.priority = PRIORITY_ACTIVE;
        entity.x_pos = x << 16;
        entity.y_pos = 20 << 16;
    }
}

fn sprite_positions(draws: &[DrawCommand]) -> Vec<(i32, i32, i32)> {
    draws
        .iter()
        .filter_map(|d| match d {
            DrawCommand::Sprite { sprite, .. } => Some((sprite.x, sprite.sprite_x, sprite.sheet)),
            _ => None,
        })
        .collect()
}

#[test]
fn startup_assigns_each_type_its_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine(&write_game(dir.path()));
    engine.load_scripts().unwrap();
    engine.setup_objects().unwrap();

    assert_eq!(engine.store.type_names[1..], ["Ring".to_string(), "Spring".to_string()]);
    assert_eq!(engine.scene.sprite_frames.len(), 3);
    assert_eq!((engine.store.objects[1].frame_list_offset, engine.store.objects[1].frame_count), (0, 2));
    assert_eq!((engine.store.objects[2].frame_list_offset, engine.store.objects[2].frame_count), (2, 1));
    assert_eq!(engine.store.objects[2].sprite_sheet, 1);
    assert_eq!(engine.scene.entities.last().unwrap().type_id, 0);
}

#[test]
fn frames_run_main_then_draw_by_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine(&write_game(dir.path()));
    engine.load_scripts().unwrap();
    engine.setup_objects().unwrap();
    spawn(&mut engine);

    engine.run_frame().unwrap();
    // Ring draws on layer 3 before the spring on layer 4.
    assert_eq!(sprite_positions(&engine.host.draws), vec![(42, 18, 0), (84, 0, 1)]);
    assert_eq!(engine.scene.draw_lists[3], vec![1]);
    assert_eq!(engine.scene.draw_lists[4], vec![0]);

    engine.host.draws.clear();
    engine.run_frame().unwrap();
    assert_eq!(sprite_positions(&engine.host.draws), vec![(42, 1, 0), (84, 0, 1)]);
    assert_eq!(engine.scene.entities[1].values[0], 2);
    assert_eq!(engine.scene.globals, vec![12]);
    assert!(engine.error().is_none());
}

#[test]
fn player_interaction_runs_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine(&write_game(dir.path()));
    engine.load_scripts().unwrap();
    spawn(&mut engine);

    engine.process_player_interaction(0).unwrap();
    engine.process_player_interaction(1).unwrap();
    assert_eq!(engine.scene.entities[0].state, 1);
    assert_eq!(engine.scene.entities[1].state, 0);
}

#[test]
fn missing_scripts_put_the_engine_in_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_game(dir.path());
    fs::remove_file(dir.path().join("Scripts/Spring.txt")).unwrap();

    let mut engine = engine(&config_path);
    let err = engine.load_scripts().unwrap_err();
    assert!(matches!(err, EngineError::FileNotFound { .. }));
    assert!(engine.error().unwrap().contains("Spring.txt"));
}

#[test]
fn compile_errors_name_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_game(dir.path());
    fs::write(dir.path().join("Scripts/Ring.txt"), "sub ObjectMain\nObject.Bogus = 1\nend sub\n").unwrap();

    let mut engine = engine(&config_path);
    match engine.load_scripts() {
        Err(EngineError::Compile(err)) => {
            assert_eq!(err.path, Path::new("Ring.txt"));
            assert_eq!(err.line, 2);
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(engine.error().is_some());
}

#[test]
fn bytecode_files_replace_compilation() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_game(dir.path());
    let bytecode = dir.path().join("Scripts.bin");

    let mut compiled = engine(&config_path);
    compiled.load_scripts().unwrap();
    loader::write_file(&bytecode, &compiled.store).unwrap();

    let mut loaded = engine(&config_path);
    loaded.load_bytecode(&bytecode).unwrap();
    assert_eq!(loaded.store.code, compiled.store.code);
    assert_eq!(loaded.store.jump_table, compiled.store.jump_table);
    assert_eq!(loaded.store.type_names, compiled.store.type_names);

    for engine in [&mut compiled, &mut loaded] {
        engine.setup_objects().unwrap();
        spawn(engine);
        engine.run_frame().unwrap();
    }
    assert_eq!(loaded.host.draws, compiled.host.draws);
    assert_eq!(loaded.scene.entities[1], compiled.scene.entities[1]);
}
