/// Shader stage and uniform value types

use std::str::FromStr;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::error::{Error, Result};

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Kind tag of a uniform upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    /// Number of scalar components carried by this kind
    pub fn component_count(&self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Float => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Vec4 => 4,
            UniformKind::Mat4 => 16,
        }
    }
}

impl FromStr for UniformKind {
    type Err = Error;

    fn from_str(kind: &str) -> Result<Self> {
        match kind {
            "int" | "i" => Ok(UniformKind::Int),
            "float" | "f" => Ok(UniformKind::Float),
            "vec2" | "v2" => Ok(UniformKind::Vec2),
            "vec3" | "v3" => Ok(UniformKind::Vec3),
            "vec4" | "v4" => Ok(UniformKind::Vec4),
            "mat4" | "m4" => Ok(UniformKind::Mat4),
            other => Err(Error::UnknownUniformKind(other.to_string())),
        }
    }
}

/// A typed uniform value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Kind tag of this value
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Build a value from a kind tag and raw scalars
    ///
    /// Ints are truncated from the first scalar. The scalar count must match
    /// the kind exactly.
    pub fn from_kind(kind: UniformKind, data: &[f32]) -> Result<Self> {
        if data.len() != kind.component_count() {
            return Err(Error::InvalidResource(format!(
                "uniform kind {:?} expects {} components, got {}",
                kind,
                kind.component_count(),
                data.len()
            )));
        }
        Ok(match kind {
            UniformKind::Int => UniformValue::Int(data[0] as i32),
            UniformKind::Float => UniformValue::Float(data[0]),
            UniformKind::Vec2 => UniformValue::Vec2([data[0], data[1]]),
            UniformKind::Vec3 => UniformValue::Vec3([data[0], data[1], data[2]]),
            UniformKind::Vec4 => UniformValue::Vec4([data[0], data[1], data[2], data[3]]),
            UniformKind::Mat4 => {
                let mut m = [0.0; 16];
                m.copy_from_slice(data);
                UniformValue::Mat4(m)
            }
        })
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}
