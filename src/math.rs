use std::f64::consts::PI;
use std::sync::OnceLock;

use serde::Serialize;

struct TrigTables {
    sin512: [i32; 0x200],
    cos512: [i32; 0x200],
    sin256: [i32; 0x100],
    cos256: [i32; 0x100],
    atan256: Vec<u8>,
}

fn tables() -> &'static TrigTables {
    static TABLES: OnceLock<TrigTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut sin512 = [0; 0x200];
        let mut cos512 = [0; 0x200];
        for i in 0..0x200 {
            let angle = (i as f64 / 256.0 * PI) as f32;
            sin512[i] = (angle.sin() as f64 * 512.0) as i32;
            cos512[i] = (angle.cos() as f64 * 512.0) as i32;
        }
        sin512[0] = 0;
        sin512[128] = 0x200;
        sin512[256] = 0;
        sin512[384] = -0x200;
        cos512[0] = 0x200;
        cos512[128] = 0;
        cos512[256] = -0x200;
        cos512[384] = 0;

        let mut sin256 = [0; 0x100];
        let mut cos256 = [0; 0x100];
        for i in 0..0x100 {
            sin256[i] = sin512[i * 2] >> 1;
            cos256[i] = cos512[i * 2] >> 1;
        }

        let mut atan256 = vec![0u8; 0x10000];
        for x in 0..0x100 {
            for y in 0..0x100 {
                atan256[x * 0x100 + y] = ((y as f32).atan2(x as f32) * 40.743664) as u8;
            }
        }

        TrigTables {
            sin512,
            cos512,
            sin256,
            cos256,
            atan256,
        }
    })
}

fn wrap512(angle: i32) -> usize {
    let angle = if angle < 0 { 0x200i32.wrapping_sub(angle) } else { angle };
    (angle & 0x1FF) as usize
}

fn wrap256(angle: i32) -> usize {
    let angle = if angle < 0 { 0x100i32.wrapping_sub(angle) } else { angle };
    (angle & 0xFF) as usize
}

pub fn sin512(angle: i32) -> i32 {
    tables().sin512[wrap512(angle)]
}

pub fn cos512(angle: i32) -> i32 {
    tables().cos512[wrap512(angle)]
}

pub fn sin256(angle: i32) -> i32 {
    tables().sin256[wrap256(angle)]
}

pub fn cos256(angle: i32) -> i32 {
    tables().cos256[wrap256(angle)]
}

/// Angle of the vector (x, y) on a 256-step circle.
pub fn arc_tan_lookup(x: i32, y: i32) -> i32 {
    let mut ax = x.unsigned_abs();
    let mut ay = y.unsigned_abs();
    while ax.max(ay) > 0xFF {
        ax >>= 4;
        ay >>= 4;
    }
    let atan = tables().atan256[(ax as usize) * 0x100 + ay as usize];
    let result = if x <= 0 {
        if y <= 0 {
            atan.wrapping_add(0x80)
        } else {
            0x80u8.wrapping_sub(atan)
        }
    } else if y <= 0 {
        0u8.wrapping_sub(atan)
    } else {
        atan
    };
    result as i32
}

fn fx(a: i32, b: i32) -> i32 {
    a.wrapping_mul(b) >> 8
}

/// 4x4 fixed point matrix, 0x100 is 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Matrix {
    pub values: [[i32; 4]; 4],
}

impl Matrix {
    pub fn identity() -> Self {
        let mut m = Matrix::default();
        for i in 0..4 {
            m.values[i][i] = 0x100;
        }
        m
    }

    /// `self = self * other`.
    pub fn multiply(&mut self, other: &Matrix) {
        let mut out = [[0i32; 4]; 4];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                *cell = (0..4)
                    .rev()
                    .map(|k| fx(self.values[row][k], other.values[k][col]))
                    .fold(0i32, |acc, v| acc.wrapping_add(v));
            }
        }
        self.values = out;
    }

    pub fn translation(x: i32, y: i32, z: i32) -> Self {
        let mut m = Matrix::identity();
        m.values[3] = [x, y, z, 0x100];
        m
    }

    pub fn scale(x: i32, y: i32, z: i32) -> Self {
        let mut m = Matrix::default();
        m.values[0][0] = x;
        m.values[1][1] = y;
        m.values[2][2] = z;
        m.values[3][3] = 0x100;
        m
    }

    pub fn rotation_x(angle: i32) -> Self {
        let (s, c) = (sin512(angle) >> 1, cos512(angle) >> 1);
        Matrix {
            values: [
                [0x100, 0, 0, 0],
                [0, c, s, 0],
                [0, -s, c, 0],
                [0, 0, 0, 0x100],
            ],
        }
    }

    pub fn rotation_y(angle: i32) -> Self {
        let (s, c) = (sin512(angle) >> 1, cos512(angle) >> 1);
        Matrix {
            values: [
                [c, 0, s, 0],
                [0, 0x100, 0, 0],
                [-s, 0, c, 0],
                [0, 0, 0, 0x100],
            ],
        }
    }

    pub fn rotation_z(angle: i32) -> Self {
        let (s, c) = (sin512(angle) >> 1, cos512(angle) >> 1);
        Matrix {
            values: [
                [c, s, 0, 0],
                [-s, c, 0, 0],
                [0, 0, 0x100, 0],
                [0, 0, 0, 0x100],
            ],
        }
    }

    pub fn rotation_xyz(x: i32, y: i32, z: i32) -> Self {
        let (sin_x, cos_x) = (sin512(x) >> 1, cos512(x) >> 1);
        let (sin_y, cos_y) = (sin512(y) >> 1, cos512(y) >> 1);
        let (sin_z, cos_z) = (sin512(z) >> 1, cos512(z) >> 1);
        Matrix {
            values: [
                [
                    fx(cos_z, cos_y).wrapping_add(fx(sin_z, fx(sin_y, sin_x))),
                    fx(sin_z, cos_y).wrapping_sub(fx(cos_z, fx(sin_y, sin_x))),
                    fx(sin_y, cos_x),
                    0,
                ],
                [fx(sin_z, -cos_x), fx(cos_z, cos_x), sin_x, 0],
                [
                    fx(sin_z, fx(cos_y, sin_x)).wrapping_sub(fx(cos_z, sin_y)),
                    fx(sin_z, -sin_y).wrapping_sub(fx(cos_z, fx(cos_y, sin_x))),
                    fx(cos_y, cos_x),
                    0,
                ],
                [0, 0, 0, 0x100],
            ],
        }
    }

    pub fn transform(&self, x: i32, y: i32, z: i32) -> (i32, i32, i32) {
        let m = &self.values;
        let axis = |col: usize| {
            fx(x, m[0][col])
                .wrapping_add(fx(y, m[1][col]))
                .wrapping_add(fx(z, m[2][col]))
                .wrapping_add(m[3][col])
        };
        (axis(0), axis(1), axis(2))
    }
}

/// Blends `b` towards `a` by `t` / 0x100. Each term is shifted on its own.
pub fn interpolate(a: i32, b: i32, t: i32) -> i32 {
    (b.wrapping_mul(0x100i32.wrapping_sub(t)) >> 8).wrapping_add(t.wrapping_mul(a) >> 8)
}
