use rand::Rng;
use tracing::{trace, warn};

use crate::animation::{process_animation, AnimationFrame};
use crate::bytecode::{SubKind, OBJECT_TYPE_CAPACITY};
use crate::error::RuntimeError;
use crate::host::{
    AudioCommand, DrawCommand, ObjectCollision, PaletteCommand, PlatformCommand, SpriteDraw,
    SpriteFx, TileCollision,
};
use crate::math::{self, Matrix};
use crate::opcode::Opcode;
use crate::scene::{
    Entity, MenuRow, Scene, SpriteFrame as FrameRect, TextMenu, TileLayer, Vertex, DEFORM_COUNT,
    DEFORM_STORE, DRAW_LAYER_COUNT, ENTITY_COUNT, PLAYER_COUNT, SPRITE_FRAME_CAPACITY,
    TEMP_ENTITY_START, VERTEX_CAPACITY,
};
use crate::vm::{Interpreter, Outcome};

pub const MENU_ROW_CAPACITY: usize = 0x200;

const TEXT_INFO_CHAR: i32 = 0;
const TEXT_INFO_ROW_SIZE: i32 = 1;
const TEXT_INFO_ROW_COUNT: i32 = 2;

fn slot(value: i32) -> Option<usize> {
    usize::try_from(value).ok()
}

fn holds(opcode: Opcode, a: i32, b: i32) -> bool {
    use Opcode::*;
    match opcode {
        CheckEqual | IfEqual | WEqual => a == b,
        CheckGreater | IfGreater | WGreater => a > b,
        IfGreaterOrEqual | WGreaterOrEqual => a >= b,
        CheckLower | IfLower | WLower => a < b,
        IfLowerOrEqual | WLowerOrEqual => a <= b,
        _ => a != b,
    }
}

fn arithmetic(it: &mut Interpreter, f: impl Fn(i32, i32) -> i32) -> Outcome {
    let value = f(it.op(0), it.op(1));
    it.set_op(0, value);
    Outcome::READ_WRITE
}

fn unary(it: &mut Interpreter, f: impl Fn(i32) -> i32) -> Outcome {
    let value = f(it.op(0));
    it.set_op(0, value);
    Outcome::READ_WRITE
}

fn result(it: &mut Interpreter, f: impl Fn(&Interpreter) -> i32) -> Outcome {
    let value = f(it);
    it.set_op(0, value);
    Outcome::READ_WRITE
}

fn text(it: &Interpreter) -> String {
    it.vm.script_text.clone()
}

fn current(it: &Interpreter) -> Entity {
    it.scene.entities.get(it.object).cloned().unwrap_or_default()
}

fn sprite_frame(it: &Interpreter, index: i32) -> Option<FrameRect> {
    let script = it.store.objects.get(it.object_type())?;
    let at = script.frame_list_offset.checked_add(slot(index)?)?;
    it.scene.sprite_frames.get(at).copied()
}

fn sheet(it: &Interpreter) -> i32 {
    it.store
        .objects
        .get(it.object_type())
        .map_or(0, |o| o.sprite_sheet)
}

fn frame_draw(frame: &FrameRect, x: i32, y: i32, sheet: i32) -> SpriteDraw {
    SpriteDraw {
        x,
        y,
        width: frame.width,
        height: frame.height,
        sprite_x: frame.sprite_x,
        sprite_y: frame.sprite_y,
        sheet,
    }
}

/// Draws script sprite frame `index` with its pivot at (x, y).
fn draw_frame(it: &mut Interpreter, index: i32, x: i32, y: i32) -> Option<FrameRect> {
    let Some(frame) = sprite_frame(it, index) else {
        warn!(frame = index, object = it.object, "missing sprite frame");
        return None;
    };
    let sprite = frame_draw(&frame, x + frame.pivot_x, y + frame.pivot_y, sheet(it));
    it.host.draw(DrawCommand::Sprite { fx: None, sprite });
    Some(frame)
}

fn sprite_fx(kind: i32, entity: &Entity, frame: &FrameRect) -> Option<SpriteFx> {
    let direction = entity.direction as i32;
    let (pivot_x, pivot_y) = (-frame.pivot_x, -frame.pivot_y);
    match kind {
        0 => Some(SpriteFx::Scale {
            direction,
            pivot_x,
            pivot_y,
            scale_x: entity.scale,
            scale_y: entity.scale,
        }),
        1 => Some(SpriteFx::Rotate {
            direction,
            pivot_x,
            pivot_y,
            rotation: entity.rotation,
        }),
        2 => Some(SpriteFx::RotoZoom {
            direction,
            pivot_x,
            pivot_y,
            rotation: entity.rotation,
            scale: entity.scale,
        }),
        3 => Some(SpriteFx::Ink {
            effect: entity.ink_effect as i32,
            alpha: entity.alpha as i32,
        }),
        5 => Some(SpriteFx::Flip { direction }),
        _ => None,
    }
}

fn draw_frame_fx(it: &mut Interpreter, index: i32, kind: i32, x: i32, y: i32) {
    let Some(frame) = sprite_frame(it, index) else {
        warn!(frame = index, object = it.object, "missing sprite frame");
        return;
    };
    let entity = current(it);
    let Some(fx) = sprite_fx(kind, &entity, &frame) else {
        warn!(fx = kind, object = it.object, "unknown sprite effect");
        return;
    };
    let (x, y) = match fx {
        SpriteFx::Scale { .. } | SpriteFx::Rotate { .. } | SpriteFx::RotoZoom { .. } => (x, y),
        SpriteFx::Ink { .. } | SpriteFx::Flip { .. } => (x + frame.pivot_x, y + frame.pivot_y),
    };
    let sprite = frame_draw(&frame, x, y, sheet(it));
    it.host.draw(DrawCommand::Sprite { fx: Some(fx), sprite });
}

fn animation_frame(it: &Interpreter, entity: &Entity) -> Option<AnimationFrame> {
    let file = it.store.objects.get(entity.type_id as usize)?.animation?;
    it.scene
        .animations
        .get(file)?
        .frame(entity.animation as usize, entity.frame as usize)
        .copied()
}

fn draw_animation_frame(it: &mut Interpreter, entity: &Entity, x: i32, y: i32) {
    let Some(frame) = animation_frame(it, entity) else {
        trace!(object = it.object, animation = entity.animation, frame = entity.frame, "no animation frame to draw");
        return;
    };
    let fx = (entity.direction != 0).then_some(SpriteFx::Flip {
        direction: entity.direction as i32,
    });
    let sprite = SpriteDraw {
        x: x + frame.pivot_x,
        y: y + frame.pivot_y,
        width: frame.width,
        height: frame.height,
        sprite_x: frame.sprite_x,
        sprite_y: frame.sprite_y,
        sheet: frame.sheet,
    };
    it.host.draw(DrawCommand::Sprite { fx, sprite });
}

fn screen_xy(scene: &Scene, x: i32, y: i32) -> (i32, i32) {
    ((x >> 16) - scene.screen.x_offset, (y >> 16) - scene.screen.y_offset)
}

fn draw_numbers(it: &mut Interpreter) {
    let (first, mut x, y, value) = (it.op(0), it.op(1), it.op(2), it.op(3) as i64);
    let (digits, spacing, all_digits) = (it.op(4).min(18), it.op(5), it.op(6) != 0);
    let shown = if value != 0 { value.saturating_mul(10) } else { 10 };
    let mut place: i64 = 10;
    for _ in 0..digits.max(0) {
        if all_digits || shown >= place {
            let digit = (value % place / (place / 10)) as i32;
            draw_frame(it, first + digit, x, y);
        }
        x -= spacing;
        place = place.saturating_mul(10);
    }
}

fn glyph(c: char) -> Option<i32> {
    match c.to_ascii_uppercase() {
        c @ 'A'..='Z' => Some(c as i32 - 'A' as i32),
        c @ '0'..='9' => Some(c as i32 - '0' as i32 + 26),
        _ => None,
    }
}

/// `DrawActName(frame, x, y, alignment, word, spaceWidth, spacing)`: the
/// stage title card, `word` 0 for all of it or the 1-based word.
fn draw_act_name(it: &mut Interpreter) {
    let (first, x, y, alignment) = (it.op(0), it.op(1), it.op(2), it.op(3));
    let (word, space_width, spacing) = (it.op(4), it.op(5), it.op(6));
    let title = it.scene.stage.title_card.clone();
    let title = match slot(word).filter(|&w| w > 0) {
        Some(w) => title.split(' ').nth(w - 1).unwrap_or("").to_string(),
        None => title,
    };

    let advance = |it: &Interpreter, c: char| match glyph(c).and_then(|g| sprite_frame(it, first + g)) {
        Some(frame) => frame.width + spacing,
        None => space_width + spacing,
    };
    let width: i32 = title.chars().map(|c| advance(it, c)).sum();
    let mut x = match alignment {
        1 => x - width,
        2 => x - width / 2,
        _ => x,
    };
    for c in title.chars() {
        if let Some(g) = glyph(c) {
            draw_frame(it, first + g, x, y);
        }
        x += advance(it, c);
    }
}

fn menu_mut<'m>(scene: &'m mut Scene, index: i32) -> Option<&'m mut TextMenu> {
    scene.menus.get_mut(slot(index)?)
}

fn set_layer_deformation(it: &mut Interpreter) -> Result<(), RuntimeError> {
    let (id, wave_length, wave_width) = (it.op(0), it.op(1), it.op(2));
    let (wave_type, start, wave_size) = (it.op(3), it.op(4), it.op(5));
    if wave_length == 0 {
        warn!(object = it.object, "deformation wave length of 0, skipped");
        return Ok(());
    }
    let Some(data) = slot(id).and_then(|d| it.scene.stage.deformation.get_mut(d)) else {
        return it.out_of_range("SetLayerDeformation", id);
    };
    let wave = |i: i32| wave_width.wrapping_mul(math::sin512((i << 9) / wave_length & 0x1FF)) >> 9;

    if wave_type == 1 {
        let start = slot(start).unwrap_or(0);
        for i in 0..wave_size.max(0) {
            match data.get_mut(start + i as usize) {
                Some(entry) => *entry = wave(i),
                None => break,
            }
        }
    } else {
        for (i, entry) in data.iter_mut().take(DEFORM_STORE).enumerate() {
            *entry = wave(i as i32);
        }
    }
    data.copy_within(0..DEFORM_COUNT - DEFORM_STORE, DEFORM_STORE);
    Ok(())
}

fn set_matrix(it: &mut Interpreter, matrix: Matrix) -> Result<Outcome, RuntimeError> {
    let id = it.op(0);
    match slot(id).and_then(|m| it.scene.scene3d.matrices.get_mut(m)) {
        Some(target) => *target = matrix,
        None => it.out_of_range("Matrix", id)?,
    }
    Ok(Outcome::READ_ONLY)
}

fn transform_vertices(it: &mut Interpreter) -> Result<(), RuntimeError> {
    let Some(matrix) = slot(it.op(0)).and_then(|m| it.scene.scene3d.matrices.get(m)).copied() else {
        return it.out_of_range("TransformVertices", it.op(0));
    };
    let start = slot(it.op(1)).unwrap_or(0);
    let end = slot(it.op(2)).unwrap_or(0).min(VERTEX_CAPACITY);
    let scene3d = &mut it.scene.scene3d;
    for i in start..end {
        let vertex = scene3d.vertices[i];
        let (x, y, z) = matrix.transform(vertex.x, vertex.y, vertex.z);
        scene3d.transformed[i] = Vertex { x, y, z, ..vertex };
    }
    Ok(())
}

fn create_temp_object(it: &mut Interpreter) {
    let type_id = it.op(0);
    if type_id <= 0 || type_id as usize >= OBJECT_TYPE_CAPACITY {
        return;
    }
    let mut pos = slot(it.vm.regs.array_pos[2])
        .filter(|p| (TEMP_ENTITY_START..ENTITY_COUNT).contains(p))
        .unwrap_or(TEMP_ENTITY_START);
    if it.scene.entities.get(pos).is_some_and(|e| e.type_id > 0) {
        pos += 1;
        if pos == ENTITY_COUNT {
            pos = TEMP_ENTITY_START;
        }
    }
    it.vm.regs.array_pos[2] = pos as i32;
    let (property, x, y) = (it.op(1), it.op(2), it.op(3));
    if let Some(entity) = it.scene.entities.get_mut(pos) {
        entity.reset(type_id, property, x, y);
    }
}

fn draw_list_mut<'d>(scene: &'d mut Scene, layer: i32) -> Option<&'d mut Vec<usize>> {
    scene.draw_lists.get_mut(slot(layer).filter(|&l| l < DRAW_LAYER_COUNT)?)
}

pub(crate) fn execute(it: &mut Interpreter, opcode: Opcode) -> Result<Outcome, RuntimeError> {
    use Opcode::*;

    let outcome = match opcode {
        End => Outcome::HALT,
        Equal => arithmetic(it, |_, b| b),
        Add => arithmetic(it, i32::wrapping_add),
        Sub => arithmetic(it, i32::wrapping_sub),
        Inc => unary(it, |a| a.wrapping_add(1)),
        Dec => unary(it, |a| a.wrapping_sub(1)),
        Mul => arithmetic(it, i32::wrapping_mul),
        Div | Mod => {
            if it.op(1) == 0 {
                if it.vm.strict {
                    return Err(RuntimeError::DivisionByZero);
                }
                warn!(opcode = opcode.name(), object = it.object, "division by zero, result is 0");
                it.set_op(0, 0);
                Outcome::READ_WRITE
            } else if opcode == Div {
                arithmetic(it, i32::wrapping_div)
            } else {
                arithmetic(it, i32::wrapping_rem)
            }
        }
        ShR => arithmetic(it, |a, b| a.wrapping_shr(b as u32)),
        ShL => arithmetic(it, |a, b| a.wrapping_shl(b as u32)),
        And => arithmetic(it, |a, b| a & b),
        Or => arithmetic(it, |a, b| a | b),
        Xor => arithmetic(it, |a, b| a ^ b),
        FlipSign => unary(it, i32::wrapping_neg),
        Not => unary(it, |a| !a),

        CheckEqual | CheckGreater | CheckLower | CheckNotEqual => {
            it.vm.regs.check_result = holds(opcode, it.op(0), it.op(1)) as i32;
            Outcome::READ_ONLY
        }
        IfEqual | IfGreater | IfGreaterOrEqual | IfLower | IfLowerOrEqual | IfNotEqual => {
            let slot = it.op(0);
            it.push_branch(slot)?;
            if holds(opcode, it.op(1), it.op(2)) {
                Outcome::READ_ONLY
            } else {
                Outcome::jump(it.jump_target(slot, 0)?)
            }
        }
        Else => {
            let slot = it.pop_branch()?;
            Outcome::jump(it.jump_target(slot, 1)?)
        }
        EndIf | EndSwitch => {
            it.pop_branch()?;
            Outcome::READ_ONLY
        }
        WEqual | WGreater | WGreaterOrEqual | WLower | WLowerOrEqual | WNotEqual => {
            let slot = it.op(0);
            if holds(opcode, it.op(1), it.op(2)) {
                it.push_branch(slot)?;
                Outcome::READ_ONLY
            } else {
                Outcome::jump(it.jump_target(slot, 1)?)
            }
        }
        Loop => {
            let slot = it.pop_branch()?;
            Outcome::jump(it.jump_target(slot, 0)?)
        }
        Switch => {
            let (slot, value) = (it.op(0), it.op(1));
            it.push_branch(slot)?;
            let (min, max) = (it.jump_word(slot, 0)?, it.jump_word(slot, 1)?);
            if value < min || value > max {
                Outcome::jump(it.jump_target(slot, 2)?)
            } else {
                Outcome::jump(it.jump_target(slot, 4 + (value as i64 - min as i64))?)
            }
        }
        Break => {
            let slot = it.pop_branch()?;
            Outcome::jump(it.jump_target(slot, 3)?)
        }
        CallFunction => {
            it.call(it.op(0))?;
            Outcome::READ_ONLY
        }
        EndFunction => {
            it.ret()?;
            Outcome::READ_ONLY
        }

        Rand => {
            let max = it.op(1);
            let value = if max > 0 { it.vm.rng.gen_range(0..max) } else { 0 };
            it.set_op(0, value);
            Outcome::READ_WRITE
        }
        Sin => result(it, |it| math::sin512(it.op(1))),
        Cos => result(it, |it| math::cos512(it.op(1))),
        Sin256 => result(it, |it| math::sin256(it.op(1))),
        Cos256 => result(it, |it| math::cos256(it.op(1))),
        SinChange => result(it, |it| {
            it.op(3)
                .wrapping_add(math::sin512(it.op(1)).wrapping_shr(it.op(2) as u32))
                .wrapping_sub(it.op(4))
        }),
        CosChange => result(it, |it| {
            it.op(3)
                .wrapping_add(math::cos512(it.op(1)).wrapping_shr(it.op(2) as u32))
                .wrapping_sub(it.op(4))
        }),
        ATan2 => result(it, |it| math::arc_tan_lookup(it.op(1), it.op(2))),
        Interpolate => result(it, |it| math::interpolate(it.op(1), it.op(2), it.op(3))),
        InterpolateXY => {
            let x = math::interpolate(it.op(2), it.op(4), it.op(6));
            let y = math::interpolate(it.op(3), it.op(5), it.op(6));
            it.set_op(0, x);
            it.set_op(1, y);
            Outcome::READ_WRITE
        }
        GetBit => result(it, |it| it.op(1).wrapping_shr(it.op(2) as u32) & 1),
        SetBit => {
            let mask = 1i32.wrapping_shl(it.op(1) as u32);
            let value = if it.op(2) != 0 { it.op(0) | mask } else { it.op(0) & !mask };
            it.set_op(0, value);
            Outcome::READ_WRITE
        }

        LoadSpriteSheet => {
            let id = it.host.load_sprite_sheet(&text(it));
            let type_id = it.object_type();
            if let Some(script) = it.store.objects.get_mut(type_id) {
                script.sprite_sheet = id;
            }
            Outcome::READ_ONLY
        }
        RemoveSpriteSheet => {
            let path = text(it);
            it.host.platform(PlatformCommand::RemoveSpriteSheet(path));
            Outcome::READ_ONLY
        }
        DrawSprite => {
            let entity = current(it);
            let (x, y) = screen_xy(it.scene, entity.x_pos, entity.y_pos);
            let frame = it.op(0);
            draw_frame(it, frame, x, y);
            Outcome::READ_ONLY
        }
        DrawSpriteXY => {
            let (x, y) = screen_xy(it.scene, it.op(1), it.op(2));
            let frame = it.op(0);
            draw_frame(it, frame, x, y);
            Outcome::READ_ONLY
        }
        DrawSpriteScreenXY => {
            let (frame, x, y) = (it.op(0), it.op(1), it.op(2));
            draw_frame(it, frame, x, y);
            Outcome::READ_ONLY
        }
        DrawSpriteFX => {
            let (x, y) = screen_xy(it.scene, it.op(2), it.op(3));
            let (frame, kind) = (it.op(0), it.op(1));
            draw_frame_fx(it, frame, kind, x, y);
            Outcome::READ_ONLY
        }
        DrawSpriteScreenFX => {
            let (frame, kind, x, y) = (it.op(0), it.op(1), it.op(2), it.op(3));
            draw_frame_fx(it, frame, kind, x, y);
            Outcome::READ_ONLY
        }
        DrawTintRect => {
            let command = DrawCommand::TintRect {
                x: it.op(0),
                y: it.op(1),
                width: it.op(2),
                height: it.op(3),
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }
        DrawRect => {
            let command = DrawCommand::Rect {
                x: it.op(0),
                y: it.op(1),
                width: it.op(2),
                height: it.op(3),
                r: it.op(4),
                g: it.op(5),
                b: it.op(6),
                alpha: it.op(7),
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }
        DrawNumbers => {
            draw_numbers(it);
            Outcome::READ_ONLY
        }
        DrawActName => {
            draw_act_name(it);
            Outcome::READ_ONLY
        }
        DrawLifeIcon => {
            let command = DrawCommand::LifeIcon {
                x: it.op(0),
                y: it.op(1),
                player: it.op(2),
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }
        ClearScreen => {
            it.host.draw(DrawCommand::ClearScreen { color: it.op(0) });
            Outcome::READ_ONLY
        }
        SetScreenFade => {
            let command = DrawCommand::ScreenFade {
                r: it.op(0),
                g: it.op(1),
                b: it.op(2),
                alpha: it.op(3),
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }
        Draw3DScene => {
            let command = DrawCommand::Scene3D {
                vertex_count: it.scene.scene3d.vertex_count,
                face_count: it.scene.scene3d.face_count,
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }

        SpriteFrame => {
            if it.sub != SubKind::Startup {
                trace!(object = it.object, "SpriteFrame outside Startup ignored");
            } else if it.scene.sprite_frames.len() >= SPRITE_FRAME_CAPACITY {
                warn!(object = it.object, "sprite frame list is full");
            } else {
                it.scene.sprite_frames.push(FrameRect {
                    pivot_x: it.op(0),
                    pivot_y: it.op(1),
                    width: it.op(2),
                    height: it.op(3),
                    sprite_x: it.op(4),
                    sprite_y: it.op(5),
                });
                let type_id = it.object_type();
                if let Some(script) = it.store.objects.get_mut(type_id) {
                    script.frame_count += 1;
                }
            }
            Outcome::READ_ONLY
        }
        EditFrame => {
            let offset = it
                .store
                .objects
                .get(it.object_type())
                .map_or(0, |o| o.frame_list_offset);
            let edited = FrameRect {
                pivot_x: it.op(1),
                pivot_y: it.op(2),
                width: it.op(3),
                height: it.op(4),
                sprite_x: it.op(5),
                sprite_y: it.op(6),
            };
            match slot(it.op(0)).and_then(|f| it.scene.sprite_frames.get_mut(offset + f)) {
                Some(frame) => *frame = edited,
                None => it.out_of_range("EditFrame", it.op(0))?,
            }
            Outcome::READ_ONLY
        }

        LoadPalette => {
            let command = PaletteCommand::Load {
                path: text(it),
                bank: it.op(1),
                dest: it.op(2),
                start: it.op(3),
                end: it.op(4),
            };
            it.host.palette(command);
            Outcome::READ_ONLY
        }
        RotatePalette => {
            let command = PaletteCommand::Rotate {
                start: it.op(0),
                end: it.op(1),
                right: it.op(2) != 0,
            };
            it.host.palette(command);
            Outcome::READ_ONLY
        }
        SetActivePalette => {
            let command = PaletteCommand::SetActive {
                bank: it.op(0),
                start_line: it.op(1),
                end_line: it.op(2),
            };
            it.host.palette(command);
            Outcome::READ_ONLY
        }
        SetPaletteFade => {
            let command = PaletteCommand::Fade {
                dest: it.op(0),
                src_a: it.op(1),
                src_b: it.op(2),
                blend: it.op(3),
                start: it.op(4),
                end: it.op(5),
            };
            it.host.palette(command);
            Outcome::READ_ONLY
        }
        CopyPalette => {
            let command = PaletteCommand::Copy {
                src: it.op(0),
                dest: it.op(1),
            };
            it.host.palette(command);
            Outcome::READ_ONLY
        }

        LoadAnimation => {
            let path = text(it);
            let loaded = it
                .scene
                .animations
                .iter()
                .position(|a| a.path.eq_ignore_ascii_case(&path));
            let index = match loaded {
                Some(index) => Some(index),
                None => it.host.load_animation(&path).map(|mut file| {
                    if file.path.is_empty() {
                        file.path = path.clone();
                    }
                    it.scene.animations.push(file);
                    it.scene.animations.len() - 1
                }),
            };
            match index {
                Some(index) => {
                    let type_id = it.object_type();
                    if let Some(script) = it.store.objects.get_mut(type_id) {
                        script.animation = Some(index);
                    }
                }
                None => warn!(%path, object = it.object, "animation file not loaded"),
            }
            Outcome::READ_ONLY
        }
        ProcessAnimation => {
            let file = it
                .store
                .objects
                .get(it.object_type())
                .and_then(|o| o.animation);
            let Scene {
                entities, animations, ..
            } = &mut *it.scene;
            if let (Some(entity), Some(file)) = (entities.get_mut(it.object), file.and_then(|f| animations.get(f))) {
                process_animation(entity, file);
            }
            Outcome::READ_ONLY
        }
        DrawObjectAnimation => {
            let entity = current(it);
            let (x, y) = screen_xy(it.scene, entity.x_pos, entity.y_pos);
            draw_animation_frame(it, &entity, x, y);
            Outcome::READ_ONLY
        }
        DrawPlayerAnimation => {
            if let Some(player) = it.scene.active_player().cloned() {
                if player.visible != 0 {
                    let entity = it.scene.entities.get(player.entity).cloned().unwrap_or_default();
                    let (x, y) = screen_xy(it.scene, player.x_pos, player.y_pos);
                    draw_animation_frame(it, &entity, x, y);
                }
            }
            Outcome::READ_ONLY
        }
        GetAnimationByName => {
            let name = text(it);
            let index = it
                .store
                .objects
                .get(it.object_type())
                .and_then(|o| o.animation)
                .and_then(|f| it.scene.animations.get(f))
                .and_then(|file| file.animation_index(&name));
            it.set_op(0, index.map_or(0, |i| i as i32));
            Outcome::READ_WRITE
        }

        SetupMenu => {
            let (rows, selections, alignment) = (it.op(1), it.op(2), it.op(3));
            match menu_mut(it.scene, it.op(0)) {
                Some(menu) => {
                    *menu = TextMenu {
                        visible_rows: rows,
                        selection_count: selections,
                        alignment,
                        ..TextMenu::default()
                    }
                }
                None => it.out_of_range("SetupMenu", it.op(0))?,
            }
            Outcome::READ_ONLY
        }
        AddMenuEntry => {
            let row = MenuRow {
                text: text(it),
                highlighted: it.op(2) != 0,
            };
            match menu_mut(it.scene, it.op(0)) {
                Some(menu) if menu.rows.len() < MENU_ROW_CAPACITY => menu.rows.push(row),
                Some(_) => warn!(menu = it.op(0), "text menu is full"),
                None => it.out_of_range("AddMenuEntry", it.op(0))?,
            }
            Outcome::READ_ONLY
        }
        EditMenuEntry => {
            let row = MenuRow {
                text: text(it),
                highlighted: it.op(3) != 0,
            };
            let index = it.op(2);
            let edited = match (menu_mut(it.scene, it.op(0)), slot(index)) {
                (Some(menu), Some(i)) if i < menu.rows.len() => {
                    menu.rows[i] = row;
                    true
                }
                (Some(menu), Some(i)) if i == menu.rows.len() && i < MENU_ROW_CAPACITY => {
                    menu.rows.push(row);
                    true
                }
                _ => false,
            };
            if !edited {
                it.out_of_range("EditMenuEntry", index)?;
            }
            Outcome::READ_ONLY
        }
        LoadTextFile => {
            let path = text(it);
            match it.host.load_text_file(&path, it.op(2) != 0) {
                Some(lines) => {
                    if let Some(menu) = menu_mut(it.scene, it.op(0)) {
                        menu.rows = lines
                            .into_iter()
                            .take(MENU_ROW_CAPACITY)
                            .map(|text| MenuRow {
                                text,
                                highlighted: false,
                            })
                            .collect();
                    }
                }
                None => warn!(%path, "text file not loaded"),
            }
            Outcome::READ_ONLY
        }
        DrawText => {
            let rows = match it.scene.menus.get(slot(it.op(0)).unwrap_or(usize::MAX)) {
                Some(menu) => {
                    let start = slot(it.op(5)).unwrap_or(0);
                    let count = slot(it.op(6)).filter(|&c| c > 0).unwrap_or(menu.rows.len());
                    menu.rows.iter().skip(start).take(count).map(|r| r.text.clone()).collect()
                }
                None => Vec::new(),
            };
            let command = DrawCommand::Text {
                x: it.op(1),
                y: it.op(2),
                scale: it.op(3),
                spacing: it.op(4),
                rows,
            };
            it.host.draw(command);
            Outcome::READ_ONLY
        }
        GetTextInfo => result(it, |it| {
            let Some(menu) = slot(it.op(1)).and_then(|m| it.scene.menus.get(m)) else {
                return 0;
            };
            let row = slot(it.op(3)).and_then(|r| menu.rows.get(r));
            match it.op(2) {
                TEXT_INFO_CHAR => row
                    .and_then(|r| r.text.as_bytes().get(slot(it.op(4))?).copied())
                    .map_or(0, |b| b as i32),
                TEXT_INFO_ROW_SIZE => row.map_or(0, |r| r.text.len() as i32),
                TEXT_INFO_ROW_COUNT => menu.rows.len() as i32,
                _ => 0,
            }
        }),
        GetVersionNumber => {
            let row = MenuRow {
                text: it.scene.engine.version.clone(),
                highlighted: it.op(1) != 0,
            };
            match menu_mut(it.scene, it.op(0)) {
                Some(menu) if menu.rows.len() < MENU_ROW_CAPACITY => menu.rows.push(row),
                Some(_) => warn!(menu = it.op(0), "text menu is full"),
                None => it.out_of_range("GetVersionNumber", it.op(0))?,
            }
            Outcome::READ_ONLY
        }
        LoadFontFile => {
            let path = text(it);
            it.host.platform(PlatformCommand::LoadFontFile(path));
            Outcome::READ_ONLY
        }

        LoadStage => {
            it.scene.stage.load_requested = true;
            it.host.platform(PlatformCommand::LoadStage);
            Outcome::READ_ONLY
        }
        ResetObjectEntity => {
            let (type_id, property, x, y) = (it.op(1), it.op(2), it.op(3), it.op(4));
            match slot(it.op(0)).and_then(|e| it.scene.entities.get_mut(e)) {
                Some(entity) => entity.reset(type_id, property, x, y),
                None => it.out_of_range("ResetObjectEntity", it.op(0))?,
            }
            Outcome::READ_ONLY
        }
        CreateTempObject => {
            create_temp_object(it);
            Outcome::READ_ONLY
        }
        BindPlayerToObject => {
            let player = slot(it.op(0)).filter(|&p| p < PLAYER_COUNT);
            let entity = slot(it.op(1)).filter(|&e| e < it.scene.entities.len());
            match (player, entity) {
                (Some(p), Some(e)) => it.scene.players[p].entity = e,
                (None, _) => it.out_of_range("BindPlayerToObject", it.op(0))?,
                (_, None) => it.out_of_range("BindPlayerToObject", it.op(1))?,
            }
            Outcome::READ_ONLY
        }
        PlayerObjectCollision => {
            let query = ObjectCollision {
                kind: it.op(0),
                object: it.object,
                player: it.scene.stage.active_player,
                left: it.op(1),
                top: it.op(2),
                right: it.op(3),
                bottom: it.op(4),
            };
            it.vm.regs.check_result = it.host.player_object_collision(it.scene, query);
            Outcome::READ_ONLY
        }
        PlayerTileCollision => {
            let player = it.scene.stage.active_player;
            it.host.player_tile_collision(it.scene, player);
            Outcome::READ_ONLY
        }
        ProcessPlayerControl => {
            let player = it.scene.stage.active_player;
            it.host.process_player_control(it.scene, player);
            Outcome::READ_ONLY
        }
        ObjectTileCollision | ObjectTileGrip => {
            let query = TileCollision {
                object: it.object,
                side: it.op(0),
                x_offset: it.op(1),
                y_offset: it.op(2),
                plane: it.op(3),
            };
            it.vm.regs.check_result = if opcode == ObjectTileCollision {
                it.host.object_tile_collision(it.scene, query)
            } else {
                it.host.object_tile_grip(it.scene, query)
            };
            Outcome::READ_ONLY
        }

        SetMusicTrack => {
            let command = AudioCommand::SetMusicTrack {
                path: text(it),
                track: it.op(1),
                loop_point: it.op(2),
            };
            it.host.audio(command);
            Outcome::READ_ONLY
        }
        PlayMusic => {
            it.scene.music.current_track = it.op(0);
            it.host.audio(AudioCommand::PlayMusic(it.op(0)));
            Outcome::READ_ONLY
        }
        StopMusic => {
            it.host.audio(AudioCommand::StopMusic);
            Outcome::READ_ONLY
        }
        PauseMusic => {
            it.host.audio(AudioCommand::PauseMusic);
            Outcome::READ_ONLY
        }
        ResumeMusic => {
            it.host.audio(AudioCommand::ResumeMusic);
            Outcome::READ_ONLY
        }
        PlaySfx => {
            let command = AudioCommand::PlaySfx {
                sfx: it.op(0),
                looped: it.op(1) != 0,
            };
            it.host.audio(command);
            Outcome::READ_ONLY
        }
        StopSfx => {
            it.host.audio(AudioCommand::StopSfx(it.op(0)));
            Outcome::READ_ONLY
        }
        SetSfxAttributes => {
            let command = AudioCommand::SetSfxAttributes {
                sfx: it.op(0),
                loop_count: it.op(1),
                pan: it.op(2),
            };
            it.host.audio(command);
            Outcome::READ_ONLY
        }
        PlayStageSfx => {
            let command = AudioCommand::PlayStageSfx {
                sfx: it.op(0),
                looped: it.op(1) != 0,
            };
            it.host.audio(command);
            Outcome::READ_ONLY
        }
        StopStageSfx => {
            it.host.audio(AudioCommand::StopStageSfx(it.op(0)));
            Outcome::READ_ONLY
        }
        LoadVideo => {
            let path = text(it);
            it.host.platform(PlatformCommand::LoadVideo(path));
            Outcome::READ_ONLY
        }
        NextVideoFrame => {
            it.host.platform(PlatformCommand::NextVideoFrame);
            Outcome::READ_ONLY
        }

        SetIdentityMatrix => set_matrix(it, Matrix::identity())?,
        MatrixMultiply => {
            let other = slot(it.op(1)).and_then(|m| it.scene.scene3d.matrices.get(m)).copied();
            match (slot(it.op(0)).and_then(|m| it.scene.scene3d.matrices.get_mut(m)), other) {
                (Some(target), Some(other)) => target.multiply(&other),
                (None, _) => it.out_of_range("MatrixMultiply", it.op(0))?,
                (_, None) => it.out_of_range("MatrixMultiply", it.op(1))?,
            }
            Outcome::READ_ONLY
        }
        MatrixTranslateXYZ => {
            let matrix = Matrix::translation(it.op(1), it.op(2), it.op(3));
            set_matrix(it, matrix)?
        }
        MatrixScaleXYZ => {
            let matrix = Matrix::scale(it.op(1), it.op(2), it.op(3));
            set_matrix(it, matrix)?
        }
        MatrixRotateX => {
            let matrix = Matrix::rotation_x(it.op(1));
            set_matrix(it, matrix)?
        }
        MatrixRotateY => {
            let matrix = Matrix::rotation_y(it.op(1));
            set_matrix(it, matrix)?
        }
        MatrixRotateZ => {
            let matrix = Matrix::rotation_z(it.op(1));
            set_matrix(it, matrix)?
        }
        MatrixRotateXYZ => {
            let matrix = Matrix::rotation_xyz(it.op(1), it.op(2), it.op(3));
            set_matrix(it, matrix)?
        }
        TransformVertices => {
            transform_vertices(it)?;
            Outcome::READ_ONLY
        }

        SetLayerDeformation => {
            set_layer_deformation(it)?;
            Outcome::READ_ONLY
        }
        CheckTouchRect => {
            let (left, top, right, bottom) = (it.op(0), it.op(1), it.op(2), it.op(3));
            it.vm.regs.check_result = it
                .scene
                .touches
                .iter()
                .enumerate()
                .filter(|(_, t)| t.down && t.x > left && t.x < right && t.y > top && t.y < bottom)
                .last()
                .map_or(-1, |(f, _)| f as i32);
            Outcome::READ_ONLY
        }
        GetTileLayerEntry => {
            let tile = slot(it.op(1))
                .and_then(|l| it.scene.tile_layers.get(l))
                .zip(TileLayer::tile_index(it.op(2), it.op(3)))
                .and_then(|(layer, i)| layer.tiles.get(i).copied());
            match tile {
                Some(tile) => it.set_op(0, tile as i32),
                None => it.out_of_range("GetTileLayerEntry", it.op(1))?,
            }
            Outcome::READ_WRITE
        }
        SetTileLayerEntry => {
            let value = it.op(0) as u16;
            let index = TileLayer::tile_index(it.op(2), it.op(3));
            let tile = slot(it.op(1))
                .and_then(|l| it.scene.tile_layers.get_mut(l))
                .zip(index)
                .and_then(|(layer, i)| layer.tiles.get_mut(i));
            match tile {
                Some(tile) => *tile = value,
                None => it.out_of_range("SetTileLayerEntry", it.op(1))?,
            }
            Outcome::READ_ONLY
        }

        ClearDrawList => {
            match draw_list_mut(it.scene, it.op(0)) {
                Some(list) => list.clear(),
                None => it.out_of_range("ClearDrawList", it.op(0))?,
            }
            Outcome::READ_ONLY
        }
        AddDrawListEntityRef => {
            let entity = it.op(1);
            match (draw_list_mut(it.scene, it.op(0)), slot(entity)) {
                (Some(list), Some(e)) if list.len() < ENTITY_COUNT => list.push(e),
                _ => it.out_of_range("AddDrawListEntityRef", entity)?,
            }
            Outcome::READ_ONLY
        }
        GetDrawListEntityRef => {
            let entry = slot(it.op(1))
                .and_then(|l| it.scene.draw_lists.get(l))
                .zip(slot(it.op(2)))
                .and_then(|(list, i)| list.get(i).copied());
            match entry {
                Some(entity) => it.set_op(0, entity as i32),
                None => it.out_of_range("GetDrawListEntityRef", it.op(2))?,
            }
            Outcome::READ_WRITE
        }
        SetDrawListEntityRef => {
            let (entity, layer, index) = (it.op(0), it.op(1), it.op(2));
            let set = match (draw_list_mut(it.scene, layer), slot(index), slot(entity)) {
                (Some(list), Some(i), Some(e)) if i < ENTITY_COUNT => {
                    if i >= list.len() {
                        list.resize(i + 1, 0);
                    }
                    list[i] = e;
                    true
                }
                _ => false,
            };
            if !set {
                it.out_of_range("SetDrawListEntityRef", index)?;
            }
            Outcome::READ_ONLY
        }

        Get16x16TileInfo => {
            let value = it.host.tile_info(it.op(1), it.op(2), it.op(3));
            it.set_op(0, value);
            Outcome::READ_WRITE
        }
        Copy16x16Tile => {
            let command = PlatformCommand::Copy16x16Tile {
                dest: it.op(0),
                src: it.op(1),
            };
            it.host.platform(command);
            Outcome::READ_ONLY
        }
        Set16x16TileInfo => {
            let command = PlatformCommand::Set16x16TileInfo {
                tile: it.op(0),
                info: it.op(1),
                value: it.op(2),
                extra: it.op(3),
            };
            it.host.platform(command);
            Outcome::READ_ONLY
        }
        ReadSaveRAM => {
            it.vm.regs.check_result = it.host.read_save_ram(&mut it.scene.save_ram) as i32;
            Outcome::READ_ONLY
        }
        WriteSaveRAM => {
            it.vm.regs.check_result = it.host.write_save_ram(&it.scene.save_ram) as i32;
            Outcome::READ_ONLY
        }
        SetAchievement => {
            let command = PlatformCommand::SetAchievement {
                id: it.op(0),
                status: it.op(1),
            };
            it.host.platform(command);
            Outcome::READ_ONLY
        }
        SetLeaderboard => {
            let command = PlatformCommand::SetLeaderboard {
                id: it.op(0),
                score: it.op(1),
            };
            it.host.platform(command);
            Outcome::READ_ONLY
        }
        LoadOnlineMenu => {
            it.host.platform(PlatformCommand::LoadOnlineMenu(it.op(0)));
            Outcome::READ_ONLY
        }
        EngineCallback => {
            it.host.platform(PlatformCommand::EngineCallback(it.op(0)));
            Outcome::READ_ONLY
        }
        HapticEffect => {
            let command = PlatformCommand::HapticEffect {
                id: it.op(0),
                a: it.op(1),
                b: it.op(2),
                c: it.op(3),
            };
            it.host.platform(command);
            Outcome::READ_ONLY
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_families_share_predicates() {
        assert!(holds(Opcode::IfGreaterOrEqual, 3, 3));
        assert!(!holds(Opcode::WGreater, 3, 3));
        assert!(holds(Opcode::CheckLower, -1, 0));
        assert!(holds(Opcode::WNotEqual, 1, 2));
        assert!(holds(Opcode::IfLowerOrEqual, 2, 2));
    }

    #[test]
    fn act_name_glyphs() {
        assert_eq!(glyph('a'), Some(0));
        assert_eq!(glyph('Z'), Some(25));
        assert_eq!(glyph('0'), Some(26));
        assert_eq!(glyph('9'), Some(35));
        assert_eq!(glyph(' '), None);
        assert_eq!(glyph('!'), None);
    }

    #[test]
    fn fx_kinds_map_to_effects() {
        let entity = Entity {
            direction: 1,
            rotation: 64,
            ..Entity::default()
        };
        let frame = FrameRect {
            pivot_x: -8,
            pivot_y: -16,
            ..FrameRect::default()
        };
        assert_eq!(
            sprite_fx(1, &entity, &frame),
            Some(SpriteFx::Rotate {
                direction: 1,
                pivot_x: 8,
                pivot_y: 16,
                rotation: 64
            })
        );
        assert_eq!(sprite_fx(5, &entity, &frame), Some(SpriteFx::Flip { direction: 1 }));
        assert_eq!(sprite_fx(4, &entity, &frame), None);
    }
}
