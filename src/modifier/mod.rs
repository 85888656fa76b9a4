//! 覆盖层与骨骼修改器

mod bone_modifier;

pub use bone_modifier::BoneModifier;

use glam::{Quat, Vec3};

use crate::hierarchy::BoneTransform;

/// 服装（coordinate）类型，每套服装可携带独立的覆盖层
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordinateType {
    School01,
    School02,
    Gym,
    Swim,
    Club,
    Plain,
    Pajamas,
}

impl CoordinateType {
    pub const COUNT: usize = 7;

    pub const ALL: [CoordinateType; Self::COUNT] = [
        CoordinateType::School01,
        CoordinateType::School02,
        CoordinateType::Gym,
        CoordinateType::Swim,
        CoordinateType::Club,
        CoordinateType::Plain,
        CoordinateType::Pajamas,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&c| c == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<CoordinateType> {
        Self::ALL.get(index).copied()
    }
}

impl Default for CoordinateType {
    fn default() -> Self {
        CoordinateType::School01
    }
}

/// 单个覆盖层：位置增量、旋转增量、缩放倍率
///
/// 未设置的分量用单位元表示（位置 0、旋转 IDENTITY、缩放 1），
/// 与基准组合时单位元分量让基准原样通过。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneOverride {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneOverride {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneOverride {
    /// 全部分量均未设置
    pub fn is_empty(&self) -> bool {
        self.position == Vec3::ZERO && self.rotation == Quat::IDENTITY && self.scale == Vec3::ONE
    }

    /// 清空回未设置状态
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// 与基准逐分量组合：位置相加、旋转复合、缩放相乘
    pub fn combine(&self, baseline: &BoneTransform) -> BoneTransform {
        BoneTransform {
            translation: baseline.translation + self.position,
            rotation: baseline.rotation * self.rotation,
            scale: baseline.scale * self.scale,
        }
    }
}
