//! 骨骼层级：宿主持有的变换节点树与名称索引

mod name_index;
mod skeleton;

pub use name_index::BoneNameIndex;
pub use skeleton::{BoneNode, NodeHandle, Skeleton};

use glam::{Quat, Vec3};

/// 骨骼变换数据（本地空间 TRS）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}
