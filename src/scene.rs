use serde::Serialize;

use crate::animation::AnimationFile;
use crate::math::Matrix;

pub const ENTITY_COUNT: usize = 0x4A0;
pub const TEMP_ENTITY_COUNT: usize = 0x80;
pub const TEMP_ENTITY_START: usize = ENTITY_COUNT - TEMP_ENTITY_COUNT;
pub const PLAYER_COUNT: usize = 2;
pub const DRAW_LAYER_COUNT: usize = 7;
pub const SPRITE_FRAME_CAPACITY: usize = 0x1000;
pub const SAVE_RAM_SIZE: usize = 0x2000;
pub const TILE_LAYER_COUNT: usize = 9;
pub const TILE_LAYER_SIZE: usize = 0x100;
pub const PARALLAX_COUNT: usize = 0x100;
/// Length of one deformation wave; the rest of a buffer repeats it.
pub const DEFORM_STORE: usize = 0x100;
pub const DEFORM_COUNT: usize = 0x240;
pub const VERTEX_CAPACITY: usize = 4096;
pub const FACE_CAPACITY: usize = 1024;
pub const MATRIX_COUNT: usize = 3;
pub const MENU_COUNT: usize = 2;
pub const TOUCH_COUNT: usize = 4;

pub const OBJECT_BORDER_X1: i32 = 0x80;
pub const OBJECT_BORDER_Y1: i32 = 0x100;

/// Processing priorities.
pub const PRIORITY_ACTIVE_BOUNDS: u8 = 0;
pub const PRIORITY_ACTIVE: u8 = 1;
pub const PRIORITY_ACTIVE_PAUSED: u8 = 2;
pub const PRIORITY_ACTIVE_XBOUNDS: u8 = 3;
pub const PRIORITY_ACTIVE_BOUNDS_REMOVE: u8 = 4;
pub const PRIORITY_INACTIVE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub x_pos: i32,
    pub y_pos: i32,
    pub values: [i32; 8],
    pub scale: i32,
    pub rotation: i32,
    pub animation_timer: i32,
    pub animation_speed: i32,
    pub type_id: u8,
    pub property_value: u8,
    pub state: u8,
    pub priority: u8,
    pub draw_order: u8,
    pub direction: u8,
    pub ink_effect: u8,
    pub alpha: u8,
    pub animation: u8,
    pub prev_animation: u8,
    pub frame: u8,
}

impl Default for Entity {
    fn default() -> Self {
        Entity {
            x_pos: 0,
            y_pos: 0,
            values: [0; 8],
            scale: 512,
            rotation: 0,
            animation_timer: 0,
            animation_speed: 0,
            type_id: 0,
            property_value: 0,
            state: 0,
            priority: PRIORITY_ACTIVE_BOUNDS,
            draw_order: 3,
            direction: 0,
            ink_effect: 0,
            alpha: 0,
            animation: 0,
            prev_animation: 0,
            frame: 0,
        }
    }
}

impl Entity {
    /// ResetObjectEntity: a freshly placed object of `type_id`.
    pub fn reset(&mut self, type_id: i32, property_value: i32, x_pos: i32, y_pos: i32) {
        *self = Entity {
            type_id: type_id as u8,
            property_value: property_value as u8,
            x_pos,
            y_pos,
            direction: 0,
            frame: 0,
            priority: PRIORITY_ACTIVE_BOUNDS,
            rotation: 0,
            state: 0,
            draw_order: 3,
            scale: 512,
            ink_effect: 0,
            values: [0; 8],
            ..self.clone()
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub top_speed: i32,
    pub acceleration: i32,
    pub deceleration: i32,
    pub air_acceleration: i32,
    pub air_deceleration: i32,
    pub gravity_strength: i32,
    pub jump_strength: i32,
    pub jump_cap: i32,
    pub rolling_acceleration: i32,
    pub rolling_deceleration: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Player {
    pub entity: usize,
    pub x_pos: i32,
    pub y_pos: i32,
    pub screen_x_pos: i32,
    pub screen_y_pos: i32,
    pub speed: i32,
    pub x_velocity: i32,
    pub y_velocity: i32,
    pub gravity: i32,
    pub angle: i32,
    pub timer: i32,
    pub look_pos: i32,
    pub values: [i32; 8],
    pub control_mode: i32,
    pub control_lock: i32,
    pub collision_mode: u8,
    pub collision_plane: u8,
    pub skidding: i32,
    pub pushing: i32,
    pub track_scroll: i32,
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
    pub jump_press: u8,
    pub jump_hold: u8,
    pub follow_player1: u8,
    pub water: u8,
    pub flailing: [u8; 3],
    pub tile_collisions: u8,
    pub object_interaction: u8,
    pub visible: u8,
    pub stats: PlayerStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub state: i32,
    pub active_list: i32,
    pub list_pos: i32,
    pub time_enabled: i32,
    pub milliseconds: i32,
    pub seconds: i32,
    pub minutes: i32,
    pub act_no: i32,
    pub pause_enabled: i32,
    pub list_size: i32,
    pub new_x_boundary1: i32,
    pub new_x_boundary2: i32,
    pub new_y_boundary1: i32,
    pub new_y_boundary2: i32,
    pub x_boundary1: i32,
    pub x_boundary2: i32,
    pub y_boundary1: i32,
    pub y_boundary2: i32,
    #[serde(skip)]
    pub deformation: [Vec<i32>; 4],
    pub water_level: i32,
    pub active_layer: i32,
    pub mid_point: i32,
    pub player_list_pos: i32,
    pub active_player: usize,
    pub debug_mode: i32,
    pub title_card: String,
    pub load_requested: bool,
}

impl Default for Stage {
    fn default() -> Self {
        Stage {
            state: 0,
            active_list: 0,
            list_pos: 0,
            time_enabled: 0,
            milliseconds: 0,
            seconds: 0,
            minutes: 0,
            act_no: 0,
            pause_enabled: 0,
            list_size: 0,
            new_x_boundary1: 0,
            new_x_boundary2: 0,
            new_y_boundary1: 0,
            new_y_boundary2: 0,
            x_boundary1: 0,
            x_boundary2: 0,
            y_boundary1: 0,
            y_boundary2: 0,
            deformation: std::array::from_fn(|_| vec![0; DEFORM_COUNT]),
            water_level: 0,
            active_layer: 0,
            mid_point: 0,
            player_list_pos: 0,
            active_player: 0,
            debug_mode: 0,
            title_card: String::new(),
            load_requested: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub camera_enabled: i32,
    pub camera_target: i32,
    pub camera_style: i32,
    pub center_x: i32,
    pub center_y: i32,
    pub x_size: i32,
    pub y_size: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub shake_x: i32,
    pub shake_y: i32,
    pub adjust_camera_y: i32,
}

impl Screen {
    pub fn new(width: i32, height: i32) -> Self {
        Screen {
            x_size: width,
            y_size: height,
            center_x: width / 2,
            center_y: height / 2,
            ..Screen::default()
        }
    }

    pub fn border_x2(&self) -> i32 {
        self.x_size + 0x80
    }

    pub fn border_y2(&self) -> i32 {
        self.y_size + 0x100
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Buttons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub button_a: bool,
    pub button_b: bool,
    pub button_c: bool,
    pub start: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Input {
    pub down: Buttons,
    pub press: Buttons,
    pub any_start: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TouchPoint {
    pub down: bool,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Music {
    pub volume: i32,
    pub current_track: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MenuRow {
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextMenu {
    pub rows: Vec<MenuRow>,
    pub visible_rows: i32,
    pub selection_count: i32,
    pub alignment: i32,
    pub selection1: i32,
    pub selection2: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub x_size: i32,
    pub y_size: i32,
    pub layout_type: u8,
    pub angle: i32,
    pub x_pos: i32,
    pub y_pos: i32,
    pub z_pos: i32,
    pub parallax_factor: i32,
    pub scroll_speed: i32,
    pub scroll_pos: i32,
    pub deformation_offset: i32,
    pub deformation_offset_w: i32,
    pub tiles: Vec<u16>,
}

impl Default for TileLayer {
    fn default() -> Self {
        TileLayer {
            x_size: 0,
            y_size: 0,
            layout_type: 0,
            angle: 0,
            x_pos: 0,
            y_pos: 0,
            z_pos: 0,
            parallax_factor: 0,
            scroll_speed: 0,
            scroll_pos: 0,
            deformation_offset: 0,
            deformation_offset_w: 0,
            tiles: vec![0; TILE_LAYER_SIZE * TILE_LAYER_SIZE],
        }
    }
}

impl TileLayer {
    pub fn tile_index(x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < TILE_LAYER_SIZE)?;
        let y = usize::try_from(y).ok().filter(|&y| y < TILE_LAYER_SIZE)?;
        Some(x + (y << 8))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Parallax {
    pub parallax_factor: i32,
    pub scroll_speed: i32,
    pub scroll_pos: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub u: i32,
    pub v: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Face {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
    pub flag: u8,
    pub color: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene3D {
    pub vertex_count: i32,
    pub face_count: i32,
    pub projection_x: i32,
    pub projection_y: i32,
    #[serde(skip)]
    pub vertices: Vec<Vertex>,
    #[serde(skip)]
    pub transformed: Vec<Vertex>,
    #[serde(skip)]
    pub faces: Vec<Face>,
    pub matrices: [Matrix; MATRIX_COUNT],
}

impl Default for Scene3D {
    fn default() -> Self {
        Scene3D {
            vertex_count: 0,
            face_count: 0,
            projection_x: 136,
            projection_y: 160,
            vertices: vec![Vertex::default(); VERTEX_CAPACITY],
            transformed: vec![Vertex::default(); VERTEX_CAPACITY],
            faces: vec![Face::default(); FACE_CAPACITY],
            matrices: [Matrix::identity(); MATRIX_COUNT],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineFlags {
    pub state: i32,
    pub message: i32,
    pub language: i32,
    pub online_active: i32,
    pub frame_skip_timer: i32,
    pub frame_skip_setting: i32,
    pub sfx_volume: i32,
    pub bgm_volume: i32,
    pub platform_id: i32,
    pub trial_mode: i32,
    pub haptics_enabled: i32,
    pub version: String,
}

/// A sprite frame registered by `SpriteFrame` during Startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpriteFrame {
    pub pivot_x: i32,
    pub pivot_y: i32,
    pub width: i32,
    pub height: i32,
    pub sprite_x: i32,
    pub sprite_y: i32,
}

/// Everything scripts can read and write between frames.
#[derive(Debug, Clone)]
pub struct Scene {
    pub entities: Vec<Entity>,
    pub players: [Player; PLAYER_COUNT],
    pub player_count: usize,
    pub stage: Stage,
    pub screen: Screen,
    pub input: Input,
    pub touches: [TouchPoint; TOUCH_COUNT],
    pub music: Music,
    pub menus: [TextMenu; MENU_COUNT],
    pub tile_layers: Vec<TileLayer>,
    pub hparallax: Vec<Parallax>,
    pub vparallax: Vec<Parallax>,
    pub scene3d: Scene3D,
    pub engine: EngineFlags,
    pub globals: Vec<i32>,
    pub save_ram: Vec<i32>,
    pub draw_lists: [Vec<usize>; DRAW_LAYER_COUNT],
    pub sprite_frames: Vec<SpriteFrame>,
    pub animations: Vec<AnimationFile>,
}

impl Scene {
    pub fn new(screen_width: i32, screen_height: i32) -> Self {
        let mut players: [Player; PLAYER_COUNT] = Default::default();
        for player in players.iter_mut() {
            player.visible = 1;
            player.object_interaction = 1;
            player.tile_collisions = 1;
        }
        Scene {
            entities: vec![Entity::default(); ENTITY_COUNT],
            players,
            player_count: 1,
            stage: Stage::default(),
            screen: Screen::new(screen_width, screen_height),
            input: Input::default(),
            touches: [TouchPoint::default(); TOUCH_COUNT],
            music: Music::default(),
            menus: Default::default(),
            tile_layers: vec![TileLayer::default(); TILE_LAYER_COUNT],
            hparallax: vec![Parallax::default(); PARALLAX_COUNT],
            vparallax: vec![Parallax::default(); PARALLAX_COUNT],
            scene3d: Scene3D::default(),
            engine: EngineFlags::default(),
            globals: Vec::new(),
            save_ram: vec![0; SAVE_RAM_SIZE],
            draw_lists: Default::default(),
            sprite_frames: Vec::new(),
            animations: Vec::new(),
        }
    }

    pub fn active_player(&self) -> Option<&Player> {
        self.players.get(self.stage.active_player)
    }

    pub fn active_player_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.stage.active_player)
    }

    /// The entity the active player is bound to.
    pub fn player_entity(&self) -> Option<&Entity> {
        self.active_player().and_then(|p| self.entities.get(p.entity))
    }

    pub fn player_entity_mut(&mut self) -> Option<&mut Entity> {
        let index = self.active_player()?.entity;
        self.entities.get_mut(index)
    }

    pub fn in_bounds(&self, entity: &Entity, check_y: bool) -> bool {
        let x = entity.x_pos >> 16;
        let y = entity.y_pos >> 16;
        let screen = &self.screen;
        let x_ok = x > screen.x_offset - OBJECT_BORDER_X1 && x < screen.x_offset + screen.border_x2();
        let y_ok = y > screen.y_offset - OBJECT_BORDER_Y1 && y < screen.y_offset + screen.border_y2();
        x_ok && (!check_y || y_ok)
    }
}
