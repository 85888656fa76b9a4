//! Bone Override Engine - Rust 实现的骨骼覆盖引擎
//!
//! 对可动态换装的角色模型骨骼层级应用可逆、分层的变换覆盖：
//! - 骨骼名称到层级节点的解析与缓存
//! - 基准姿态（baseline）采集：层级稳定后捕获未覆盖的自然姿态
//! - 两层覆盖模型：全局层 + 按服装（coordinate）层
//! - 每帧状态机驱动的覆盖应用
//! - 版本化二进制持久化，兼容旧版单层格式迁移

pub mod codec;
pub mod controller;
pub mod hierarchy;
pub mod modifier;

pub use codec::BoneDataBlob;
pub use controller::{BaselineState, BoneController, CharacterHost, NullHost};
pub use hierarchy::{BoneNameIndex, BoneTransform, NodeHandle, Skeleton};
pub use modifier::{BoneModifier, BoneOverride, CoordinateType};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoneModError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported save version: {0}")]
    UnsupportedVersion(i32),

    #[error("bone data decode error: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, BoneModError>;
