//! The engine side of the interpreter.
//!
//! Rendering, audio, palettes, collision, save data and platform services
//! live outside the VM. Scripts reach them through [`Host`], whose methods
//! all default to doing nothing so an embedder only implements what it has.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::animation::AnimationFile;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteDraw {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub sprite_x: i32,
    pub sprite_y: i32,
    pub sheet: i32,
}

/// Effect applied by `DrawSpriteFX` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFx {
    Scale {
        direction: i32,
        pivot_x: i32,
        pivot_y: i32,
        scale_x: i32,
        scale_y: i32,
    },
    Rotate {
        direction: i32,
        pivot_x: i32,
        pivot_y: i32,
        rotation: i32,
    },
    RotoZoom {
        direction: i32,
        pivot_x: i32,
        pivot_y: i32,
        rotation: i32,
        scale: i32,
    },
    Ink {
        effect: i32,
        alpha: i32,
    },
    Flip {
        direction: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Sprite {
        fx: Option<SpriteFx>,
        sprite: SpriteDraw,
    },
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        r: i32,
        g: i32,
        b: i32,
        alpha: i32,
    },
    TintRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    LifeIcon {
        x: i32,
        y: i32,
        player: i32,
    },
    Text {
        x: i32,
        y: i32,
        scale: i32,
        spacing: i32,
        rows: Vec<String>,
    },
    Scene3D {
        vertex_count: i32,
        face_count: i32,
    },
    ClearScreen {
        color: i32,
    },
    ScreenFade {
        r: i32,
        g: i32,
        b: i32,
        alpha: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteCommand {
    Load {
        path: String,
        bank: i32,
        dest: i32,
        start: i32,
        end: i32,
    },
    Rotate {
        start: i32,
        end: i32,
        right: bool,
    },
    SetActive {
        bank: i32,
        start_line: i32,
        end_line: i32,
    },
    Fade {
        dest: i32,
        src_a: i32,
        src_b: i32,
        blend: i32,
        start: i32,
        end: i32,
    },
    Copy {
        src: i32,
        dest: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCommand {
    SetMusicTrack {
        path: String,
        track: i32,
        loop_point: i32,
    },
    PlayMusic(i32),
    StopMusic,
    PauseMusic,
    ResumeMusic,
    PlaySfx {
        sfx: i32,
        looped: bool,
    },
    StopSfx(i32),
    SetSfxAttributes {
        sfx: i32,
        loop_count: i32,
        pan: i32,
    },
    PlayStageSfx {
        sfx: i32,
        looped: bool,
    },
    StopStageSfx(i32),
    MusicVolume(i32),
    SfxVolume(i32),
    BgmVolume(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCommand {
    LoadStage,
    LoadVideo(String),
    NextVideoFrame,
    LoadFontFile(String),
    SetAchievement { id: i32, status: i32 },
    SetLeaderboard { id: i32, score: i32 },
    LoadOnlineMenu(i32),
    EngineCallback(i32),
    HapticEffect { id: i32, a: i32, b: i32, c: i32 },
    RemoveSpriteSheet(String),
    Copy16x16Tile { dest: i32, src: i32 },
    Set16x16TileInfo { tile: i32, info: i32, value: i32, extra: i32 },
}

/// `PlayerObjectCollision` arguments, relative to the object's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectCollision {
    pub kind: i32,
    pub object: usize,
    pub player: usize,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// `ObjectTileCollision` / `ObjectTileGrip` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCollision {
    pub object: usize,
    pub side: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub plane: i32,
}

pub trait Host {
    fn draw(&mut self, _command: DrawCommand) {}

    fn palette(&mut self, _command: PaletteCommand) {}

    fn audio(&mut self, _command: AudioCommand) {}

    fn platform(&mut self, _command: PlatformCommand) {}

    /// Returns the sheet id for `path`.
    fn load_sprite_sheet(&mut self, _path: &str) -> i32 {
        0
    }

    fn load_animation(&mut self, _path: &str) -> Option<AnimationFile> {
        None
    }

    fn load_text_file(&mut self, _path: &str, _map_code: bool) -> Option<Vec<String>> {
        None
    }

    /// Returns the value stored in `CheckResult`.
    fn player_object_collision(&mut self, _scene: &mut Scene, _query: ObjectCollision) -> i32 {
        0
    }

    fn player_tile_collision(&mut self, _scene: &mut Scene, _player: usize) {}

    fn process_player_control(&mut self, _scene: &mut Scene, _player: usize) {}

    fn object_tile_collision(&mut self, _scene: &mut Scene, _query: TileCollision) -> i32 {
        0
    }

    fn object_tile_grip(&mut self, _scene: &mut Scene, _query: TileCollision) -> i32 {
        0
    }

    fn tile_info(&mut self, _tile_x: i32, _tile_y: i32, _info: i32) -> i32 {
        0
    }

    fn read_save_ram(&mut self, _save_ram: &mut [i32]) -> bool {
        false
    }

    fn write_save_ram(&mut self, _save_ram: &[i32]) -> bool {
        false
    }
}

/// A host with no engine behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {}

/// Logs every call at debug level. Animation and text files are read from
/// `data_dir` when present, animations as JSON.
#[derive(Debug, Clone, Default)]
pub struct TracingHost {
    data_dir: Option<PathBuf>,
    sheets: Vec<String>,
}

impl TracingHost {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            sheets: Vec::new(),
        }
    }

    fn read(&self, path: &str) -> Option<String> {
        let dir = self.data_dir.as_ref()?;
        fs::read_to_string(dir.join(path)).ok()
    }
}

impl Host for TracingHost {
    fn draw(&mut self, command: DrawCommand) {
        debug!(?command, "draw");
    }

    fn palette(&mut self, command: PaletteCommand) {
        debug!(?command, "palette");
    }

    fn audio(&mut self, command: AudioCommand) {
        debug!(?command, "audio");
    }

    fn platform(&mut self, command: PlatformCommand) {
        debug!(?command, "platform");
    }

    fn load_sprite_sheet(&mut self, path: &str) -> i32 {
        let id = match self.sheets.iter().position(|s| s == path) {
            Some(id) => id,
            None => {
                self.sheets.push(path.to_string());
                self.sheets.len() - 1
            }
        };
        debug!(path, id, "load sprite sheet");
        id as i32
    }

    fn load_animation(&mut self, path: &str) -> Option<AnimationFile> {
        let text = self.read(path)?;
        match serde_json::from_str::<AnimationFile>(&text) {
            Ok(mut file) => {
                file.path = path.to_string();
                debug!(path, animations = file.animations.len(), "load animation");
                Some(file)
            }
            Err(err) => {
                debug!(path, %err, "animation file is not valid json");
                None
            }
        }
    }

    fn load_text_file(&mut self, path: &str, _map_code: bool) -> Option<Vec<String>> {
        let text = self.read(path)?;
        Some(text.lines().map(str::to_string).collect())
    }

    fn player_object_collision(&mut self, _scene: &mut Scene, query: ObjectCollision) -> i32 {
        debug!(?query, "player object collision");
        0
    }

    fn object_tile_collision(&mut self, _scene: &mut Scene, query: TileCollision) -> i32 {
        debug!(?query, "object tile collision");
        0
    }

    fn object_tile_grip(&mut self, _scene: &mut Scene, query: TileCollision) -> i32 {
        debug!(?query, "object tile grip");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_host_reuses_sheet_ids() {
        let mut host = TracingHost::new(None);
        assert_eq!(host.load_sprite_sheet("Global/Items.gif"), 0);
        assert_eq!(host.load_sprite_sheet("Global/Display.gif"), 1);
        assert_eq!(host.load_sprite_sheet("Global/Items.gif"), 0);
    }

    #[test]
    fn tracing_host_reads_json_animations() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Ring.ani"),
            r#"{ "animations": [{ "name": "Spin", "speed": 32, "frames": [{}, {}] }] }"#,
        )
        .unwrap();
        let mut host = TracingHost::new(Some(dir.path().to_path_buf()));
        let file = host.load_animation("Ring.ani").unwrap();
        assert_eq!(file.path, "Ring.ani");
        assert_eq!(file.animation_index("spin"), Some(0));
        assert!(host.load_animation("Missing.ani").is_none());
    }

    #[test]
    fn null_host_answers_zero() {
        let mut host = NullHost;
        let mut scene = Scene::new(320, 240);
        let query = TileCollision {
            object: 0,
            side: 0,
            x_offset: 0,
            y_offset: 0,
            plane: 0,
        };
        assert_eq!(host.object_tile_collision(&mut scene, query), 0);
        assert!(!host.read_save_ram(&mut scene.save_ram));
    }
}
