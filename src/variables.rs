//! Every name a script operand can refer to, with its accessors.
//!
//! A variable id is its position in [`table`]. Both the compiler and the
//! interpreter go through this one table so the ids always agree.

use std::sync::OnceLock;

use tracing::trace;

use crate::animation::Hitbox;
use crate::bytecode::ObjectScript;
use crate::error::RuntimeError;
use crate::host::{AudioCommand, Host};
use crate::scene::{
    Buttons, EngineFlags, Entity, Face, Parallax, Player, Scene, Screen, Stage, TileLayer, Vertex,
    PLAYER_COUNT,
};
use crate::vm::Registers;

/// What an accessor can see while one operand is read or written.
pub struct VarContext<'a> {
    pub scene: &'a mut Scene,
    pub regs: &'a mut Registers,
    pub objects: &'a mut [ObjectScript],
    pub host: &'a mut dyn Host,
    /// Index of the object whose script is running.
    pub object: usize,
    pub strict: bool,
}

type Reader = Box<dyn Fn(&VarContext, i32) -> Option<i32> + Send + Sync>;
type Writer = Box<dyn Fn(&mut VarContext, i32, i32) -> Option<()> + Send + Sync>;

pub struct Variable {
    name: String,
    read: Reader,
    write: Option<Writer>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.write.is_none()
    }

    /// Reads element `index`. Out of range reads give 0 unless the context
    /// is strict.
    pub fn read(&self, ctx: &VarContext, index: i32) -> Result<i32, RuntimeError> {
        match (self.read)(ctx, index) {
            Some(value) => Ok(value),
            None => self.out_of_range(index, ctx.strict).map(|_| 0),
        }
    }

    /// Writes element `index`. Writes to read-only variables are dropped.
    pub fn write(&self, ctx: &mut VarContext, index: i32, value: i32) -> Result<(), RuntimeError> {
        let Some(write) = &self.write else {
            return Ok(());
        };
        match write(ctx, index, value) {
            Some(()) => Ok(()),
            None => self.out_of_range(index, ctx.strict),
        }
    }

    fn out_of_range(&self, index: i32, strict: bool) -> Result<(), RuntimeError> {
        if strict {
            return Err(RuntimeError::IndexOutOfRange {
                variable: self.name.clone(),
                index,
            });
        }
        trace!(variable = %self.name, index, "out of range access");
        Ok(())
    }
}

pub fn table() -> &'static [Variable] {
    static TABLE: OnceLock<Vec<Variable>> = OnceLock::new();
    TABLE.get_or_init(build)
}

pub fn get(id: i32) -> Option<&'static Variable> {
    usize::try_from(id).ok().and_then(|id| table().get(id))
}

pub fn id_of(name: &str) -> Option<usize> {
    table()
        .iter()
        .position(|v| v.name.eq_ignore_ascii_case(name))
}

fn slot(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

fn entity_at<'c>(ctx: &'c VarContext, index: i32) -> Option<&'c Entity> {
    ctx.scene.entities.get(slot(index)?)
}

fn entity_at_mut<'c>(ctx: &'c mut VarContext, index: i32) -> Option<&'c mut Entity> {
    ctx.scene.entities.get_mut(slot(index)?)
}

fn player_hitbox(ctx: &VarContext) -> Option<Hitbox> {
    let entity = ctx.scene.player_entity()?;
    let script = ctx.objects.get(entity.type_id as usize)?;
    let file = ctx.scene.animations.get(script.animation?)?;
    file.hitbox(entity.animation as usize, entity.frame as usize).copied()
}

struct Builder(Vec<Variable>);

impl Builder {
    fn rw(
        &mut self,
        name: &str,
        read: impl Fn(&VarContext, i32) -> Option<i32> + Send + Sync + 'static,
        write: impl Fn(&mut VarContext, i32, i32) -> Option<()> + Send + Sync + 'static,
    ) {
        self.0.push(Variable {
            name: name.to_string(),
            read: Box::new(read),
            write: Some(Box::new(write)),
        });
    }

    fn ro(&mut self, name: &str, read: impl Fn(&VarContext, i32) -> Option<i32> + Send + Sync + 'static) {
        self.0.push(Variable {
            name: name.to_string(),
            read: Box::new(read),
            write: None,
        });
    }

    fn entity(&mut self, name: &str, get: fn(&Entity) -> i32, set: fn(&mut Entity, i32)) {
        self.rw(
            name,
            move |ctx, i| entity_at(ctx, i).map(get),
            move |ctx, i, v| entity_at_mut(ctx, i).map(|e| set(e, v)),
        );
    }

    fn player(&mut self, name: &str, get: fn(&Player) -> i32, set: fn(&mut Player, i32)) {
        self.rw(
            name,
            move |ctx, _| ctx.scene.active_player().map(get),
            move |ctx, _, v| ctx.scene.active_player_mut().map(|p| set(p, v)),
        );
    }

    /// A field of the entity the active player is bound to.
    fn player_entity(&mut self, name: &str, get: fn(&Entity) -> i32, set: fn(&mut Entity, i32)) {
        self.rw(
            name,
            move |ctx, _| ctx.scene.player_entity().map(get),
            move |ctx, _, v| ctx.scene.player_entity_mut().map(|e| set(e, v)),
        );
    }

    fn stage(&mut self, name: &str, get: fn(&Stage) -> i32, set: fn(&mut Stage, i32)) {
        self.rw(
            name,
            move |ctx, _| Some(get(&ctx.scene.stage)),
            move |ctx, _, v| {
                set(&mut ctx.scene.stage, v);
                Some(())
            },
        );
    }

    fn screen(&mut self, name: &str, get: fn(&Screen) -> i32, set: fn(&mut Screen, i32)) {
        self.rw(
            name,
            move |ctx, _| Some(get(&ctx.scene.screen)),
            move |ctx, _, v| {
                set(&mut ctx.scene.screen, v);
                Some(())
            },
        );
    }

    fn keys(&mut self, prefix: &str, press: bool) {
        let buttons: [(&str, fn(&mut Buttons) -> &mut bool); 8] = [
            ("Up", |b| &mut b.up),
            ("Down", |b| &mut b.down),
            ("Left", |b| &mut b.left),
            ("Right", |b| &mut b.right),
            ("ButtonA", |b| &mut b.button_a),
            ("ButtonB", |b| &mut b.button_b),
            ("ButtonC", |b| &mut b.button_c),
            ("Start", |b| &mut b.start),
        ];
        for (field, access) in buttons {
            self.rw(
                &format!("{prefix}.{field}"),
                move |ctx, _| {
                    let mut buttons = if press { ctx.scene.input.press } else { ctx.scene.input.down };
                    Some(*access(&mut buttons) as i32)
                },
                move |ctx, _, v| {
                    let input = &mut ctx.scene.input;
                    let buttons = if press { &mut input.press } else { &mut input.down };
                    *access(buttons) = v != 0;
                    Some(())
                },
            );
        }
    }

    fn tile_layer(&mut self, name: &str, get: fn(&TileLayer) -> i32, set: fn(&mut TileLayer, i32)) {
        self.rw(
            name,
            move |ctx, i| ctx.scene.tile_layers.get(slot(i)?).map(get),
            move |ctx, i, v| ctx.scene.tile_layers.get_mut(slot(i)?).map(|l| set(l, v)),
        );
    }

    fn parallax(&mut self, prefix: &str, vertical: bool) {
        let fields: [(&str, fn(&mut Parallax) -> &mut i32); 3] = [
            ("ParallaxFactor", |p| &mut p.parallax_factor),
            ("ScrollSpeed", |p| &mut p.scroll_speed),
            ("ScrollPos", |p| &mut p.scroll_pos),
        ];
        for (field, access) in fields {
            self.rw(
                &format!("{prefix}.{field}"),
                move |ctx, i| {
                    let list = if vertical { &ctx.scene.vparallax } else { &ctx.scene.hparallax };
                    let mut entry = *list.get(slot(i)?)?;
                    Some(*access(&mut entry))
                },
                move |ctx, i, v| {
                    let scene = &mut *ctx.scene;
                    let list = if vertical { &mut scene.vparallax } else { &mut scene.hparallax };
                    *access(list.get_mut(slot(i)?)?) = v;
                    Some(())
                },
            );
        }
    }

    fn vertex(&mut self, name: &str, access: fn(&mut Vertex) -> &mut i32) {
        self.rw(
            name,
            move |ctx, i| {
                let mut vertex = *ctx.scene.scene3d.vertices.get(slot(i)?)?;
                Some(*access(&mut vertex))
            },
            move |ctx, i, v| {
                *access(ctx.scene.scene3d.vertices.get_mut(slot(i)?)?) = v;
                Some(())
            },
        );
    }

    fn face(&mut self, name: &str, get: fn(&Face) -> i32, set: fn(&mut Face, i32)) {
        self.rw(
            name,
            move |ctx, i| ctx.scene.scene3d.faces.get(slot(i)?).map(get),
            move |ctx, i, v| ctx.scene.scene3d.faces.get_mut(slot(i)?).map(|f| set(f, v)),
        );
    }

    fn engine(&mut self, name: &str, get: fn(&EngineFlags) -> i32, set: fn(&mut EngineFlags, i32)) {
        self.rw(
            name,
            move |ctx, _| Some(get(&ctx.scene.engine)),
            move |ctx, _, v| {
                set(&mut ctx.scene.engine, v);
                Some(())
            },
        );
    }
}

fn build() -> Vec<Variable> {
    let mut b = Builder(Vec::new());

    for k in 0..8 {
        b.rw(
            &format!("TempValue{k}"),
            move |ctx, _| Some(ctx.regs.temp_values[k]),
            move |ctx, _, v| {
                ctx.regs.temp_values[k] = v;
                Some(())
            },
        );
    }
    b.rw(
        "CheckResult",
        |ctx, _| Some(ctx.regs.check_result),
        |ctx, _, v| {
            ctx.regs.check_result = v;
            Some(())
        },
    );
    for (k, name) in ["ArrayPos0", "ArrayPos1", "TempObjectPos"].iter().enumerate() {
        b.rw(
            name,
            move |ctx, _| Some(ctx.regs.array_pos[k]),
            move |ctx, _, v| {
                ctx.regs.array_pos[k] = v;
                Some(())
            },
        );
    }
    b.rw(
        "Global",
        |ctx, i| ctx.scene.globals.get(slot(i)?).copied(),
        |ctx, i, v| {
            *ctx.scene.globals.get_mut(slot(i)?)? = v;
            Some(())
        },
    );

    // Object.*
    b.ro("Object.EntityNo", |ctx, i| entity_at(ctx, i).map(|_| i));
    b.entity("Object.Type", |e| e.type_id as i32, |e, v| e.type_id = v as u8);
    b.entity("Object.PropertyValue", |e| e.property_value as i32, |e, v| e.property_value = v as u8);
    b.entity("Object.XPos", |e| e.x_pos, |e, v| e.x_pos = v);
    b.entity("Object.YPos", |e| e.y_pos, |e, v| e.y_pos = v);
    b.entity("Object.iXPos", |e| e.x_pos >> 16, |e, v| e.x_pos = v << 16);
    b.entity("Object.iYPos", |e| e.y_pos >> 16, |e, v| e.y_pos = v << 16);
    b.entity("Object.State", |e| e.state as i32, |e, v| e.state = v as u8);
    b.entity("Object.Rotation", |e| e.rotation, |e, v| e.rotation = v);
    b.entity("Object.Scale", |e| e.scale, |e, v| e.scale = v);
    b.entity("Object.Priority", |e| e.priority as i32, |e, v| e.priority = v as u8);
    b.entity("Object.DrawOrder", |e| e.draw_order as i32, |e, v| e.draw_order = v as u8);
    b.entity("Object.Direction", |e| e.direction as i32, |e, v| e.direction = v as u8);
    b.entity("Object.InkEffect", |e| e.ink_effect as i32, |e, v| e.ink_effect = v as u8);
    b.entity("Object.Alpha", |e| e.alpha as i32, |e, v| e.alpha = v as u8);
    b.entity("Object.Frame", |e| e.frame as i32, |e, v| e.frame = v as u8);
    b.entity("Object.Animation", |e| e.animation as i32, |e, v| e.animation = v as u8);
    b.entity("Object.PrevAnimation", |e| e.prev_animation as i32, |e, v| e.prev_animation = v as u8);
    b.entity("Object.AnimationSpeed", |e| e.animation_speed, |e, v| e.animation_speed = v);
    b.entity("Object.AnimationTimer", |e| e.animation_timer, |e, v| e.animation_timer = v);
    for k in 0..8 {
        b.rw(
            &format!("Object.Value{k}"),
            move |ctx, i| entity_at(ctx, i).map(|e| e.values[k]),
            move |ctx, i, v| entity_at_mut(ctx, i).map(|e| e.values[k] = v),
        );
    }
    b.ro("Object.OutOfBounds", |ctx, i| {
        let entity = entity_at(ctx, i)?;
        Some(!ctx.scene.in_bounds(entity, true) as i32)
    });
    b.rw(
        "Object.SpriteSheet",
        |ctx, i| {
            let entity = entity_at(ctx, i)?;
            ctx.objects.get(entity.type_id as usize).map(|o| o.sprite_sheet)
        },
        |ctx, i, v| {
            let type_id = entity_at(ctx, i)?.type_id as usize;
            ctx.objects.get_mut(type_id)?.sprite_sheet = v;
            Some(())
        },
    );

    // Player.*, always the active player
    b.player_entity("Player.State", |e| e.state as i32, |e, v| e.state = v as u8);
    b.player("Player.ControlMode", |p| p.control_mode, |p, v| p.control_mode = v);
    b.player("Player.ControlLock", |p| p.control_lock, |p, v| p.control_lock = v);
    b.player("Player.CollisionMode", |p| p.collision_mode as i32, |p, v| p.collision_mode = v as u8);
    b.player("Player.CollisionPlane", |p| p.collision_plane as i32, |p, v| p.collision_plane = v as u8);
    b.player("Player.XPos", |p| p.x_pos, |p, v| p.x_pos = v);
    b.player("Player.YPos", |p| p.y_pos, |p, v| p.y_pos = v);
    b.player("Player.iXPos", |p| p.x_pos >> 16, |p, v| p.x_pos = v << 16);
    b.player("Player.iYPos", |p| p.y_pos >> 16, |p, v| p.y_pos = v << 16);
    b.player("Player.ScreenXPos", |p| p.screen_x_pos, |p, v| p.screen_x_pos = v);
    b.player("Player.ScreenYPos", |p| p.screen_y_pos, |p, v| p.screen_y_pos = v);
    b.player("Player.Speed", |p| p.speed, |p, v| p.speed = v);
    b.player("Player.XVelocity", |p| p.x_velocity, |p, v| p.x_velocity = v);
    b.player("Player.YVelocity", |p| p.y_velocity, |p, v| p.y_velocity = v);
    b.player("Player.Gravity", |p| p.gravity, |p, v| p.gravity = v);
    b.player("Player.Angle", |p| p.angle, |p, v| p.angle = v);
    b.player("Player.Skidding", |p| p.skidding, |p, v| p.skidding = v);
    b.player("Player.Pushing", |p| p.pushing, |p, v| p.pushing = v);
    b.player("Player.TrackScroll", |p| p.track_scroll, |p, v| p.track_scroll = v);
    b.player("Player.Up", |p| p.up as i32, |p, v| p.up = v as u8);
    b.player("Player.Down", |p| p.down as i32, |p, v| p.down = v as u8);
    b.player("Player.Left", |p| p.left as i32, |p, v| p.left = v as u8);
    b.player("Player.Right", |p| p.right as i32, |p, v| p.right = v as u8);
    b.player("Player.JumpPress", |p| p.jump_press as i32, |p, v| p.jump_press = v as u8);
    b.player("Player.JumpHold", |p| p.jump_hold as i32, |p, v| p.jump_hold = v as u8);
    b.player("Player.FollowPlayer1", |p| p.follow_player1 as i32, |p, v| p.follow_player1 = v as u8);
    b.player("Player.LookPos", |p| p.look_pos, |p, v| p.look_pos = v);
    b.player("Player.Water", |p| p.water as i32, |p, v| p.water = v as u8);
    b.player("Player.TopSpeed", |p| p.stats.top_speed, |p, v| p.stats.top_speed = v);
    b.player("Player.Acceleration", |p| p.stats.acceleration, |p, v| p.stats.acceleration = v);
    b.player("Player.Deceleration", |p| p.stats.deceleration, |p, v| p.stats.deceleration = v);
    b.player("Player.AirAcceleration", |p| p.stats.air_acceleration, |p, v| p.stats.air_acceleration = v);
    b.player("Player.AirDeceleration", |p| p.stats.air_deceleration, |p, v| p.stats.air_deceleration = v);
    b.player("Player.GravityStrength", |p| p.stats.gravity_strength, |p, v| p.stats.gravity_strength = v);
    b.player("Player.JumpStrength", |p| p.stats.jump_strength, |p, v| p.stats.jump_strength = v);
    b.player("Player.JumpCap", |p| p.stats.jump_cap, |p, v| p.stats.jump_cap = v);
    b.player(
        "Player.RollingAcceleration",
        |p| p.stats.rolling_acceleration,
        |p, v| p.stats.rolling_acceleration = v,
    );
    b.player(
        "Player.RollingDeceleration",
        |p| p.stats.rolling_deceleration,
        |p, v| p.stats.rolling_deceleration = v,
    );
    b.rw(
        "Player.EntityNo",
        |ctx, _| ctx.scene.active_player().map(|p| p.entity as i32),
        |ctx, _, v| {
            let entity = slot(v).filter(|&e| e < ctx.scene.entities.len())?;
            ctx.scene.active_player_mut()?.entity = entity;
            Some(())
        },
    );
    b.ro("Player.CollisionLeft", |ctx, _| Some(player_hitbox(ctx).map_or(0, |h| h.left)));
    b.ro("Player.CollisionTop", |ctx, _| Some(player_hitbox(ctx).map_or(0, |h| h.top)));
    b.ro("Player.CollisionRight", |ctx, _| Some(player_hitbox(ctx).map_or(0, |h| h.right)));
    b.ro("Player.CollisionBottom", |ctx, _| Some(player_hitbox(ctx).map_or(0, |h| h.bottom)));
    b.rw(
        "Player.Flailing",
        |ctx, i| ctx.scene.active_player()?.flailing.get(slot(i)?).map(|&f| f as i32),
        |ctx, i, v| {
            *ctx.scene.active_player_mut()?.flailing.get_mut(slot(i)?)? = v as u8;
            Some(())
        },
    );
    b.player("Player.Timer", |p| p.timer, |p, v| p.timer = v);
    b.player("Player.TileCollisions", |p| p.tile_collisions as i32, |p, v| p.tile_collisions = v as u8);
    b.player(
        "Player.ObjectInteraction",
        |p| p.object_interaction as i32,
        |p, v| p.object_interaction = v as u8,
    );
    b.player("Player.Visible", |p| p.visible as i32, |p, v| p.visible = v as u8);
    b.player_entity("Player.Rotation", |e| e.rotation, |e, v| e.rotation = v);
    b.player_entity("Player.Direction", |e| e.direction as i32, |e, v| e.direction = v as u8);
    b.player_entity("Player.Frame", |e| e.frame as i32, |e, v| e.frame = v as u8);
    b.player_entity("Player.Animation", |e| e.animation as i32, |e, v| e.animation = v as u8);
    b.player_entity("Player.PrevAnimation", |e| e.prev_animation as i32, |e, v| e.prev_animation = v as u8);
    b.player_entity("Player.AnimationSpeed", |e| e.animation_speed, |e, v| e.animation_speed = v);
    b.player_entity("Player.AnimationTimer", |e| e.animation_timer, |e, v| e.animation_timer = v);
    b.player_entity("Player.Type", |e| e.type_id as i32, |e, v| e.type_id = v as u8);
    for k in 0..8 {
        b.rw(
            &format!("Player.Value{k}"),
            move |ctx, _| ctx.scene.active_player().map(|p| p.values[k]),
            move |ctx, _, v| ctx.scene.active_player_mut().map(|p| p.values[k] = v),
        );
    }

    // Stage.*
    b.stage("Stage.State", |s| s.state, |s, v| s.state = v);
    b.stage("Stage.ActiveList", |s| s.active_list, |s, v| s.active_list = v);
    b.stage("Stage.ListPos", |s| s.list_pos, |s, v| s.list_pos = v);
    b.stage("Stage.TimeEnabled", |s| s.time_enabled, |s, v| s.time_enabled = v);
    b.stage("Stage.MilliSeconds", |s| s.milliseconds, |s, v| s.milliseconds = v);
    b.stage("Stage.Seconds", |s| s.seconds, |s, v| s.seconds = v);
    b.stage("Stage.Minutes", |s| s.minutes, |s, v| s.minutes = v);
    b.stage("Stage.ActNo", |s| s.act_no, |s, v| s.act_no = v);
    b.stage("Stage.PauseEnabled", |s| s.pause_enabled, |s, v| s.pause_enabled = v);
    b.stage("Stage.ListSize", |s| s.list_size, |s, v| s.list_size = v);
    b.stage("Stage.NewXBoundary1", |s| s.new_x_boundary1, |s, v| s.new_x_boundary1 = v);
    b.stage("Stage.NewXBoundary2", |s| s.new_x_boundary2, |s, v| s.new_x_boundary2 = v);
    b.stage("Stage.NewYBoundary1", |s| s.new_y_boundary1, |s, v| s.new_y_boundary1 = v);
    b.stage("Stage.NewYBoundary2", |s| s.new_y_boundary2, |s, v| s.new_y_boundary2 = v);
    b.stage("Stage.XBoundary1", |s| s.x_boundary1, |s, v| s.x_boundary1 = v);
    b.stage("Stage.XBoundary2", |s| s.x_boundary2, |s, v| s.x_boundary2 = v);
    b.stage("Stage.YBoundary1", |s| s.y_boundary1, |s, v| s.y_boundary1 = v);
    b.stage("Stage.YBoundary2", |s| s.y_boundary2, |s, v| s.y_boundary2 = v);
    for k in 0..4 {
        b.rw(
            &format!("Stage.DeformationData{k}"),
            move |ctx, i| ctx.scene.stage.deformation[k].get(slot(i)?).copied(),
            move |ctx, i, v| {
                *ctx.scene.stage.deformation[k].get_mut(slot(i)?)? = v;
                Some(())
            },
        );
    }
    b.stage("Stage.WaterLevel", |s| s.water_level, |s, v| s.water_level = v);
    b.stage("Stage.ActiveLayer", |s| s.active_layer, |s, v| s.active_layer = v);
    b.stage("Stage.MidPoint", |s| s.mid_point, |s, v| s.mid_point = v);
    b.stage("Stage.PlayerListPos", |s| s.player_list_pos, |s, v| s.player_list_pos = v);
    b.rw(
        "Stage.ActivePlayer",
        |ctx, _| Some(ctx.scene.stage.active_player as i32),
        |ctx, _, v| {
            ctx.scene.stage.active_player = slot(v).filter(|&p| p < PLAYER_COUNT)?;
            Some(())
        },
    );
    b.stage("Stage.DebugMode", |s| s.debug_mode, |s, v| s.debug_mode = v);

    // Screen.*
    b.screen("Screen.CameraEnabled", |s| s.camera_enabled, |s, v| s.camera_enabled = v);
    b.screen("Screen.CameraTarget", |s| s.camera_target, |s, v| s.camera_target = v);
    b.screen("Screen.CameraStyle", |s| s.camera_style, |s, v| s.camera_style = v);
    b.rw(
        "Screen.DrawListSize",
        |ctx, i| ctx.scene.draw_lists.get(slot(i)?).map(|l| l.len() as i32),
        |ctx, i, v| {
            let len = slot(v).filter(|&n| n <= ctx.scene.entities.len())?;
            ctx.scene.draw_lists.get_mut(slot(i)?)?.resize(len, 0);
            Some(())
        },
    );
    b.screen("Screen.CenterX", |s| s.center_x, |s, v| s.center_x = v);
    b.screen("Screen.CenterY", |s| s.center_y, |s, v| s.center_y = v);
    b.ro("Screen.XSize", |ctx, _| Some(ctx.scene.screen.x_size));
    b.ro("Screen.YSize", |ctx, _| Some(ctx.scene.screen.y_size));
    b.screen("Screen.XOffset", |s| s.x_offset, |s, v| s.x_offset = v);
    b.screen("Screen.YOffset", |s| s.y_offset, |s, v| s.y_offset = v);
    b.screen("Screen.ShakeX", |s| s.shake_x, |s, v| s.shake_x = v);
    b.screen("Screen.ShakeY", |s| s.shake_y, |s, v| s.shake_y = v);
    b.screen("Screen.AdjustCameraY", |s| s.adjust_camera_y, |s, v| s.adjust_camera_y = v);

    // TouchScreen.*
    b.ro("TouchScreen.Down", |ctx, i| ctx.scene.touches.get(slot(i)?).map(|t| t.down as i32));
    b.ro("TouchScreen.XPos", |ctx, i| ctx.scene.touches.get(slot(i)?).map(|t| t.x));
    b.ro("TouchScreen.YPos", |ctx, i| ctx.scene.touches.get(slot(i)?).map(|t| t.y));
    b.ro("TouchScreen.Touches", |ctx, _| {
        Some(ctx.scene.touches.iter().filter(|t| t.down).count() as i32)
    });

    // Music.*
    b.rw(
        "Music.Volume",
        |ctx, _| Some(ctx.scene.music.volume),
        |ctx, _, v| {
            let volume = v.clamp(0, 100);
            ctx.scene.music.volume = volume;
            ctx.host.audio(AudioCommand::MusicVolume(volume));
            Some(())
        },
    );
    b.rw(
        "Music.CurrentTrack",
        |ctx, _| Some(ctx.scene.music.current_track),
        |ctx, _, v| {
            ctx.scene.music.current_track = v;
            Some(())
        },
    );

    b.keys("KeyDown", false);
    b.keys("KeyPress", true);

    for (k, name) in ["Menu1.Selection", "Menu2.Selection"].iter().enumerate() {
        b.rw(
            name,
            move |ctx, _| Some(ctx.scene.menus[k].selection1),
            move |ctx, _, v| {
                ctx.scene.menus[k].selection1 = v;
                Some(())
            },
        );
    }

    // TileLayer.*
    b.tile_layer("TileLayer.XSize", |l| l.x_size, |l, v| l.x_size = v);
    b.tile_layer("TileLayer.YSize", |l| l.y_size, |l, v| l.y_size = v);
    b.tile_layer("TileLayer.Type", |l| l.layout_type as i32, |l, v| l.layout_type = v as u8);
    b.tile_layer("TileLayer.Angle", |l| l.angle, |l, v| l.angle = v);
    b.tile_layer("TileLayer.XPos", |l| l.x_pos, |l, v| l.x_pos = v);
    b.tile_layer("TileLayer.YPos", |l| l.y_pos, |l, v| l.y_pos = v);
    b.tile_layer("TileLayer.ZPos", |l| l.z_pos, |l, v| l.z_pos = v);
    b.tile_layer("TileLayer.ParallaxFactor", |l| l.parallax_factor, |l, v| l.parallax_factor = v);
    b.tile_layer("TileLayer.ScrollSpeed", |l| l.scroll_speed, |l, v| l.scroll_speed = v);
    b.tile_layer("TileLayer.ScrollPos", |l| l.scroll_pos, |l, v| l.scroll_pos = v);
    b.tile_layer(
        "TileLayer.DeformationOffset",
        |l| l.deformation_offset,
        |l, v| l.deformation_offset = v,
    );
    b.tile_layer(
        "TileLayer.DeformationOffsetW",
        |l| l.deformation_offset_w,
        |l, v| l.deformation_offset_w = v,
    );

    b.parallax("HParallax", false);
    b.parallax("VParallax", true);

    // 3DScene.*
    b.rw(
        "3DScene.NoVertices",
        |ctx, _| Some(ctx.scene.scene3d.vertex_count),
        |ctx, _, v| {
            ctx.scene.scene3d.vertex_count = v;
            Some(())
        },
    );
    b.rw(
        "3DScene.NoFaces",
        |ctx, _| Some(ctx.scene.scene3d.face_count),
        |ctx, _, v| {
            ctx.scene.scene3d.face_count = v;
            Some(())
        },
    );
    b.rw(
        "3DScene.ProjectionX",
        |ctx, _| Some(ctx.scene.scene3d.projection_x),
        |ctx, _, v| {
            ctx.scene.scene3d.projection_x = v;
            Some(())
        },
    );
    b.rw(
        "3DScene.ProjectionY",
        |ctx, _| Some(ctx.scene.scene3d.projection_y),
        |ctx, _, v| {
            ctx.scene.scene3d.projection_y = v;
            Some(())
        },
    );
    b.vertex("VertexBuffer.x", |v| &mut v.x);
    b.vertex("VertexBuffer.y", |v| &mut v.y);
    b.vertex("VertexBuffer.z", |v| &mut v.z);
    b.vertex("VertexBuffer.u", |v| &mut v.u);
    b.vertex("VertexBuffer.v", |v| &mut v.v);
    b.face("FaceBuffer.a", |f| f.a, |f, v| f.a = v);
    b.face("FaceBuffer.b", |f| f.b, |f, v| f.b = v);
    b.face("FaceBuffer.c", |f| f.c, |f, v| f.c = v);
    b.face("FaceBuffer.d", |f| f.d, |f, v| f.d = v);
    b.face("FaceBuffer.Flag", |f| f.flag as i32, |f, v| f.flag = v as u8);
    b.face("FaceBuffer.Color", |f| f.color, |f, v| f.color = v);

    // Engine.*
    b.engine("Engine.State", |e| e.state, |e, v| e.state = v);
    b.engine("Engine.Language", |e| e.language, |e, v| e.language = v);
    b.engine("Engine.OnlineActive", |e| e.online_active, |e, v| e.online_active = v);
    b.engine("Engine.FrameSkipTimer", |e| e.frame_skip_timer, |e, v| e.frame_skip_timer = v);
    b.engine("Engine.FrameSkipSetting", |e| e.frame_skip_setting, |e, v| e.frame_skip_setting = v);
    b.rw(
        "Engine.SFXVolume",
        |ctx, _| Some(ctx.scene.engine.sfx_volume),
        |ctx, _, v| {
            ctx.scene.engine.sfx_volume = v;
            ctx.host.audio(AudioCommand::SfxVolume(v));
            Some(())
        },
    );
    b.rw(
        "Engine.BGMVolume",
        |ctx, _| Some(ctx.scene.engine.bgm_volume),
        |ctx, _, v| {
            ctx.scene.engine.bgm_volume = v;
            ctx.host.audio(AudioCommand::BgmVolume(v));
            Some(())
        },
    );
    b.engine("Engine.PlatformID", |e| e.platform_id, |e, v| e.platform_id = v);
    b.engine("Engine.TrialMode", |e| e.trial_mode, |e, v| e.trial_mode = v);
    b.engine("Engine.Message", |e| e.message, |e, v| e.message = v);
    b.engine("Engine.HapticsEnabled", |e| e.haptics_enabled, |e, v| e.haptics_enabled = v);

    b.rw(
        "SaveRAM",
        |ctx, i| ctx.scene.save_ram.get(slot(i)?).copied(),
        |ctx, i, v| {
            *ctx.scene.save_ram.get_mut(slot(i)?)? = v;
            Some(())
        },
    );

    b.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationFile, AnimationFrame};
    use crate::bytecode::OBJECT_TYPE_CAPACITY;
    use crate::host::NullHost;

    struct Fixture {
        scene: Scene,
        regs: Registers,
        objects: Vec<ObjectScript>,
        host: NullHost,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                scene: Scene::new(320, 240),
                regs: Registers::default(),
                objects: vec![ObjectScript::default(); OBJECT_TYPE_CAPACITY],
                host: NullHost,
            }
        }

        fn ctx(&mut self, strict: bool) -> VarContext<'_> {
            VarContext {
                scene: &mut self.scene,
                regs: &mut self.regs,
                objects: &mut self.objects,
                host: &mut self.host,
                object: 0,
                strict,
            }
        }
    }

    fn var(name: &str) -> &'static Variable {
        get(id_of(name).unwrap() as i32).unwrap()
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let names: Vec<String> = table().iter().map(|v| v.name().to_ascii_lowercase()).collect();
        for (i, name) in names.iter().enumerate() {
            assert_eq!(names.iter().position(|n| n == name), Some(i), "{name} registered twice");
        }
        assert_eq!(table().len(), 217);
        assert_eq!(id_of("object.xpos"), id_of("Object.XPos"));
        assert_eq!(id_of("Object.Nope"), None);
        assert!(get(-1).is_none());
    }

    #[test]
    fn register_ids_are_stable() {
        // compiled bytecode stores these indices directly
        assert_eq!(id_of("TempValue0"), Some(0));
        assert_eq!(id_of("TempValue7"), Some(7));
        assert_eq!(id_of("CheckResult"), Some(8));
        assert_eq!(id_of("ArrayPos0"), Some(9));
        assert_eq!(id_of("TempObjectPos"), Some(11));
        assert_eq!(id_of("Global"), Some(12));
        assert_eq!(id_of("Object.EntityNo"), Some(13));
        assert_eq!(id_of("Object.Type"), Some(14));
    }

    #[test]
    fn byte_fields_wrap_and_zero_extend() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(false);
        var("Object.State").write(&mut ctx, 3, 0x1FF).unwrap();
        assert_eq!(var("Object.State").read(&ctx, 3).unwrap(), 0xFF);
        var("Object.Direction").write(&mut ctx, 3, -1).unwrap();
        assert_eq!(var("Object.Direction").read(&ctx, 3).unwrap(), 0xFF);
    }

    #[test]
    fn whole_positions_convert_to_fixed_point() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(false);
        var("Object.iXPos").write(&mut ctx, 5, 100).unwrap();
        assert_eq!(var("Object.XPos").read(&ctx, 5).unwrap(), 100 << 16);
        var("Object.YPos").write(&mut ctx, 5, 0x28_8000).unwrap();
        assert_eq!(var("Object.iYPos").read(&ctx, 5).unwrap(), 0x28);
    }

    #[test]
    fn read_only_variables_ignore_writes() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(true);
        let entity_no = var("Object.EntityNo");
        assert!(entity_no.is_read_only());
        entity_no.write(&mut ctx, 7, 99).unwrap();
        assert_eq!(entity_no.read(&ctx, 7).unwrap(), 7);
        assert_eq!(var("Screen.XSize").read(&ctx, 0).unwrap(), 320);
    }

    #[test]
    fn out_of_range_degrades_unless_strict() {
        let mut fx = Fixture::new();
        {
            let mut ctx = fx.ctx(false);
            assert_eq!(var("Object.Value0").read(&ctx, -1).unwrap(), 0);
            assert_eq!(var("Global").read(&ctx, 4).unwrap(), 0);
            var("SaveRAM").write(&mut ctx, 0x2000, 1).unwrap();
        }
        let ctx = fx.ctx(true);
        assert_eq!(
            var("Object.Value0").read(&ctx, 0x4A0),
            Err(RuntimeError::IndexOutOfRange {
                variable: "Object.Value0".into(),
                index: 0x4A0
            })
        );
    }

    #[test]
    fn registers_ignore_the_index() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(true);
        var("TempValue3").write(&mut ctx, 999, 42).unwrap();
        var("TempObjectPos").write(&mut ctx, -5, 0x400).unwrap();
        assert_eq!(ctx.regs.temp_values[3], 42);
        assert_eq!(ctx.regs.array_pos[2], 0x400);
    }

    #[test]
    fn player_hitbox_follows_the_bound_entity() {
        let mut fx = Fixture::new();
        fx.scene.animations.push(AnimationFile {
            path: "Players/Sonic.ani".into(),
            animations: vec![Animation {
                name: "Walking".into(),
                speed: 0,
                loop_point: 0,
                frames: vec![AnimationFrame::default(), AnimationFrame {
                    hitbox: 1,
                    ..AnimationFrame::default()
                }],
            }],
            hitboxes: vec![
                Hitbox::default(),
                Hitbox {
                    left: -10,
                    top: -20,
                    right: 10,
                    bottom: 20,
                },
            ],
        });
        fx.objects[2].animation = Some(0);
        fx.scene.players[0].entity = 8;
        fx.scene.entities[8].type_id = 2;
        fx.scene.entities[8].frame = 1;

        let ctx = fx.ctx(true);
        assert_eq!(var("Player.CollisionTop").read(&ctx, 0).unwrap(), -20);
        assert_eq!(var("Player.CollisionRight").read(&ctx, 0).unwrap(), 10);

        fx.scene.entities[8].frame = 5;
        let ctx = fx.ctx(true);
        assert_eq!(var("Player.CollisionTop").read(&ctx, 0).unwrap(), 0);
    }

    #[test]
    fn keys_and_menus_map_to_scene_state() {
        let mut fx = Fixture::new();
        fx.scene.input.press.button_a = true;
        let mut ctx = fx.ctx(false);
        assert_eq!(var("KeyPress.ButtonA").read(&ctx, 0).unwrap(), 1);
        assert_eq!(var("KeyDown.ButtonA").read(&ctx, 0).unwrap(), 0);
        var("Menu2.Selection").write(&mut ctx, 0, 3).unwrap();
        assert_eq!(ctx.scene.menus[1].selection1, 3);
    }
}
