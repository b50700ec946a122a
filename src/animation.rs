use serde::{Deserialize, Serialize};

use crate::scene::Entity;

/// Animation timers count up to this before the frame advances.
pub const FRAME_TICKS: i32 = 0xF0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hitbox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationFrame {
    pub sprite_x: i32,
    pub sprite_y: i32,
    pub width: i32,
    pub height: i32,
    pub pivot_x: i32,
    pub pivot_y: i32,
    pub sheet: i32,
    pub hitbox: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Animation {
    pub name: String,
    pub speed: i32,
    pub loop_point: usize,
    pub frames: Vec<AnimationFrame>,
}

/// An animation file as handed over by the host's loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationFile {
    pub path: String,
    pub animations: Vec<Animation>,
    pub hitboxes: Vec<Hitbox>,
}

impl AnimationFile {
    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn frame(&self, animation: usize, frame: usize) -> Option<&AnimationFrame> {
        self.animations.get(animation)?.frames.get(frame)
    }

    pub fn hitbox(&self, animation: usize, frame: usize) -> Option<&Hitbox> {
        let frame = self.frame(animation, frame)?;
        self.hitboxes.get(frame.hitbox)
    }
}

/// Advances `entity` through its current animation by one tick.
///
/// A positive `animation_speed` overrides the animation's own speed and is
/// capped at [`FRAME_TICKS`]. Switching animations restarts at frame 0.
pub fn process_animation(entity: &mut Entity, file: &AnimationFile) {
    let Some(animation) = file.animations.get(entity.animation as usize) else {
        return;
    };

    if entity.animation_speed <= 0 {
        entity.animation_timer = entity.animation_timer.wrapping_add(animation.speed);
    } else {
        entity.animation_speed = entity.animation_speed.min(FRAME_TICKS);
        entity.animation_timer = entity.animation_timer.wrapping_add(entity.animation_speed);
    }

    if entity.animation != entity.prev_animation {
        entity.prev_animation = entity.animation;
        entity.frame = 0;
        entity.animation_timer = 0;
        entity.animation_speed = 0;
    }

    if entity.animation_timer >= FRAME_TICKS {
        entity.animation_timer -= FRAME_TICKS;
        entity.frame = entity.frame.wrapping_add(1);
    }

    if entity.frame as usize >= animation.frames.len() {
        entity.frame = animation.loop_point as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_file() -> AnimationFile {
        serde_json::from_str(
            r#"{
                "path": "Players/Walker.ani",
                "animations": [
                    { "name": "Stopped", "speed": 0, "frames": [{}] },
                    { "name": "Walking", "speed": 64, "loop_point": 1,
                      "frames": [{ "hitbox": 1 }, { "width": 16 }, { "width": 24 }] }
                ],
                "hitboxes": [
                    { "left": -8, "top": -16, "right": 8, "bottom": 16 },
                    { "left": -4, "top": -4, "right": 4, "bottom": 4 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn lookups_by_name_and_frame() {
        let file = walk_file();
        assert_eq!(file.animation_index("walking"), Some(1));
        assert_eq!(file.animation_index("Running"), None);
        assert_eq!(file.hitbox(1, 0).map(|h| h.left), Some(-4));
        assert_eq!(file.hitbox(1, 1).map(|h| h.left), Some(-8));
        assert!(file.frame(1, 3).is_none());
    }

    #[test]
    fn frames_advance_and_loop() {
        let file = walk_file();
        let mut entity = Entity {
            animation: 1,
            prev_animation: 1,
            ..Entity::default()
        };
        for _ in 0..4 {
            process_animation(&mut entity, &file);
        }
        assert_eq!(entity.frame, 1);
        assert_eq!(entity.animation_timer, 0x10);

        entity.frame = 2;
        entity.animation_timer = FRAME_TICKS - 1;
        process_animation(&mut entity, &file);
        assert_eq!(entity.frame, 1);
    }

    #[test]
    fn speed_override_is_capped_and_reset_on_switch() {
        let file = walk_file();
        let mut entity = Entity {
            animation: 1,
            prev_animation: 1,
            animation_speed: 0x200,
            ..Entity::default()
        };
        process_animation(&mut entity, &file);
        assert_eq!(entity.animation_speed, FRAME_TICKS);
        assert_eq!(entity.frame, 1);

        entity.animation = 0;
        process_animation(&mut entity, &file);
        assert_eq!((entity.frame, entity.animation_timer, entity.animation_speed), (0, 0, 0));
    }
}
