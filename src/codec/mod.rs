//! 骨骼数据的版本化二进制编解码
//!
//! 持久化布局：`{i32 版本号} + {载荷字节}`。当前写出版本 2；版本 1 是
//! 旧版单层格式，只读迁移。未知版本是硬性解码失败，由调用方降级处理。
//!
//! 版本 2 整卡载荷（有序列表，顺序保留）：
//! ```text
//! u32 修改器数量
//! 每个修改器:
//!   u16 名称长度 + UTF-8 字节
//!   全局层: 10 × f32 (位置 xyz, 旋转 xyzw, 缩放 xyz)
//!   u8 服装层标志; 有则 u8 层数 + 每层 10 × f32
//! ```
//! 版本 2 单服装载荷：`u32 条目数` + 每条 `名称 + 10 × f32 单层`。
//! 版本 1 旧版载荷：`u32 条目数` + 每条 `名称 + 3 × f32 缩放`。

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Quat, Vec3};

use crate::modifier::{BoneModifier, BoneOverride, CoordinateType};
use crate::{BoneModError, Result};

/// 当前写出的存档版本
pub const SAVE_VERSION: i32 = 2;
/// 旧版单层格式（只读）
pub const LEGACY_VERSION: i32 = 1;

/// 持久化数据块：版本号 + 不透明载荷
#[derive(Clone, Debug, PartialEq)]
pub struct BoneDataBlob {
    pub version: i32,
    pub payload: Vec<u8>,
}

impl BoneDataBlob {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.payload.len());
        // Vec 写入不会失败
        let _ = out.write_i32::<LittleEndian>(self.version);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor
            .read_i32::<LittleEndian>()
            .map_err(|e| BoneModError::Decode(format!("failed to read version: {}", e)))?;
        let mut payload = Vec::new();
        cursor
            .read_to_end(&mut payload)
            .map_err(|e| BoneModError::Decode(format!("failed to read payload: {}", e)))?;
        Ok(Self { version, payload })
    }
}

/// 序列化整卡修改器列表（总是写当前版本）
pub fn serialize_modifiers(modifiers: &[BoneModifier]) -> BoneDataBlob {
    let mut payload = Vec::new();
    let _ = payload.write_u32::<LittleEndian>(modifiers.len() as u32);
    for modifier in modifiers {
        write_string(&mut payload, modifier.bone_name());
        write_layer(&mut payload, modifier.global_layer());
        match modifier.coordinate_layers() {
            Some(layers) => {
                let _ = payload.write_u8(1);
                let _ = payload.write_u8(layers.len() as u8);
                for layer in layers {
                    write_layer(&mut payload, layer);
                }
            }
            None => {
                let _ = payload.write_u8(0);
            }
        }
    }
    BoneDataBlob {
        version: SAVE_VERSION,
        payload,
    }
}

/// 版本分支反序列化整卡修改器列表
///
/// 版本 2 直接解码；版本 1 走旧版迁移；其余版本报不支持。
pub fn deserialize_modifiers(blob: &BoneDataBlob) -> Result<Vec<BoneModifier>> {
    match blob.version {
        SAVE_VERSION => decode_modifier_list(&blob.payload),
        LEGACY_VERSION => {
            log::debug!("加载旧版单层骨骼数据，迁移到版本 {}", SAVE_VERSION);
            migrate_legacy(&blob.payload)
        }
        other => Err(BoneModError::UnsupportedVersion(other)),
    }
}

/// 序列化单服装覆盖层集合（骨骼名 -> 该服装的层）
pub fn serialize_coordinate_layers(entries: &[(String, BoneOverride)]) -> BoneDataBlob {
    let mut payload = Vec::new();
    let _ = payload.write_u32::<LittleEndian>(entries.len() as u32);
    for (name, layer) in entries {
        write_string(&mut payload, name);
        write_layer(&mut payload, layer);
    }
    BoneDataBlob {
        version: SAVE_VERSION,
        payload,
    }
}

/// 反序列化单服装覆盖层集合（仅支持当前版本）
pub fn deserialize_coordinate_layers(blob: &BoneDataBlob) -> Result<Vec<(String, BoneOverride)>> {
    if blob.version != SAVE_VERSION {
        return Err(BoneModError::UnsupportedVersion(blob.version));
    }
    let mut cursor = Cursor::new(blob.payload.as_slice());
    let count = read_u32(&mut cursor, "coordinate entry count")?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_string(&mut cursor)?;
        let layer = read_layer(&mut cursor)?;
        entries.push((name, layer));
    }
    Ok(entries)
}

fn decode_modifier_list(payload: &[u8]) -> Result<Vec<BoneModifier>> {
    let mut cursor = Cursor::new(payload);
    let count = read_u32(&mut cursor, "modifier count")?;
    let mut modifiers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_string(&mut cursor)?;
        let global_layer = read_layer(&mut cursor)?;
        let has_coordinate_layers = read_u8(&mut cursor, "coordinate flag")? != 0;
        let coordinate_layers = if has_coordinate_layers {
            let layer_count = read_u8(&mut cursor, "coordinate layer count")? as usize;
            let mut layers = Vec::with_capacity(CoordinateType::COUNT);
            for _ in 0..layer_count {
                layers.push(read_layer(&mut cursor)?);
            }
            // 旧存档的服装数可能少于当前枚举，缺的槽位补未设置
            layers.resize(CoordinateType::COUNT, BoneOverride::default());
            Some(layers)
        } else {
            None
        };
        modifiers.push(BoneModifier::with_layers(name, global_layer, coordinate_layers));
    }
    Ok(modifiers)
}

/// 旧版迁移：单层条目只含缩放，迁移后仅填充全局层，不分配服装层
fn migrate_legacy(payload: &[u8]) -> Result<Vec<BoneModifier>> {
    let mut cursor = Cursor::new(payload);
    let count = read_u32(&mut cursor, "legacy entry count")?;
    let mut modifiers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_string(&mut cursor)?;
        let scale = read_vec3(&mut cursor)?;
        let mut layer = BoneOverride::default();
        layer.scale = scale;
        modifiers.push(BoneModifier::with_layers(name, layer, None));
    }
    Ok(modifiers)
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    // 长度前缀是 u16：超长名称截断到字符边界，保证记录自洽可解码
    let mut end = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &s.as_bytes()[..end];
    let _ = out.write_u16::<LittleEndian>(bytes.len() as u16);
    let _ = out.write_all(bytes);
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BoneModError::Decode(format!("failed to read name length: {}", e)))?;
    let mut bytes = vec![0u8; len as usize];
    cursor
        .read_exact(&mut bytes)
        .map_err(|e| BoneModError::Decode(format!("failed to read name bytes: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| BoneModError::Decode(format!("invalid bone name: {}", e)))
}

fn write_layer(out: &mut Vec<u8>, layer: &BoneOverride) {
    write_vec3(out, layer.position);
    let _ = out.write_f32::<LittleEndian>(layer.rotation.x);
    let _ = out.write_f32::<LittleEndian>(layer.rotation.y);
    let _ = out.write_f32::<LittleEndian>(layer.rotation.z);
    let _ = out.write_f32::<LittleEndian>(layer.rotation.w);
    write_vec3(out, layer.scale);
}

fn read_layer(cursor: &mut Cursor<&[u8]>) -> Result<BoneOverride> {
    let position = read_vec3(cursor)?;
    let x = read_f32(cursor)?;
    let y = read_f32(cursor)?;
    let z = read_f32(cursor)?;
    let w = read_f32(cursor)?;
    let scale = read_vec3(cursor)?;
    Ok(BoneOverride {
        position,
        rotation: Quat::from_xyzw(x, y, z, w),
        scale,
    })
}

fn write_vec3(out: &mut Vec<u8>, v: Vec3) {
    let _ = out.write_f32::<LittleEndian>(v.x);
    let _ = out.write_f32::<LittleEndian>(v.y);
    let _ = out.write_f32::<LittleEndian>(v.z);
}

fn read_vec3(cursor: &mut Cursor<&[u8]>) -> Result<Vec3> {
    Ok(Vec3::new(read_f32(cursor)?, read_f32(cursor)?, read_f32(cursor)?))
}

fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32> {
    cursor
        .read_f32::<LittleEndian>()
        .map_err(|e| BoneModError::Decode(format!("failed to read component: {}", e)))
}

fn read_u8(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u8> {
    cursor
        .read_u8()
        .map_err(|e| BoneModError::Decode(format!("failed to read {}: {}", what, e)))
}

fn read_u32(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BoneModError::Decode(format!("failed to read {}: {}", what, e)))
}
