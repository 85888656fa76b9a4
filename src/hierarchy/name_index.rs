//! 骨骼名称索引
//!
//! 从根节点走一遍层级，缓存名称到节点句柄的完整映射。层级结构变化
//! （增删节点）会整体作废缓存，必须重建，不做增量修补。

use std::collections::HashMap;

use super::{NodeHandle, Skeleton};

/// 名称 -> 节点句柄的查找缓存
pub struct BoneNameIndex {
    map: Option<HashMap<String, NodeHandle>>,
}

impl BoneNameIndex {
    pub fn new() -> Self {
        Self { map: None }
    }

    /// 是否已构建
    pub fn is_initialized(&self) -> bool {
        self.map.is_some()
    }

    /// 从 root 的子树重建映射，替换旧缓存
    ///
    /// 重名骨骼只保留最后遍历到的一个。
    pub fn initialize(&mut self, skeleton: &Skeleton, root: NodeHandle) {
        let mut map = HashMap::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            if let Some(node) = skeleton.node(handle) {
                map.insert(node.name.clone(), handle);
                stack.extend(node.children.iter().copied());
            }
        }
        self.map = Some(map);
    }

    /// 按名称解析节点句柄
    pub fn resolve(&self, bone_name: &str) -> Option<NodeHandle> {
        self.map.as_ref()?.get(bone_name).copied()
    }

    /// 全部可解析的骨骼名称
    pub fn all_names(&self) -> Vec<String> {
        match &self.map {
            Some(map) => map.keys().cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl Default for BoneNameIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_skeleton() -> (Skeleton, NodeHandle) {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_bone("Root", None);
        let spine = skeleton.add_bone("Spine", Some(root));
        skeleton.add_bone("Head", Some(spine));
        skeleton.add_bone("ArmL", Some(spine));
        (skeleton, root)
    }

    #[test]
    fn test_resolve_after_initialize() {
        let (skeleton, root) = build_skeleton();
        let mut index = BoneNameIndex::new();
        assert!(!index.is_initialized());
        assert_eq!(index.resolve("Head"), None);

        index.initialize(&skeleton, root);
        assert!(index.is_initialized());
        let head = index.resolve("Head").unwrap();
        assert_eq!(skeleton.node(head).unwrap().name, "Head");
        assert_eq!(index.resolve("Tail"), None);
    }

    #[test]
    fn test_rebuild_replaces_wholesale() {
        let (mut skeleton, root) = build_skeleton();
        let mut index = BoneNameIndex::new();
        index.initialize(&skeleton, root);
        assert_eq!(index.resolve("Skirt"), None);

        // 宿主挂载新配件后必须整体重建
        let spine = index.resolve("Spine").unwrap();
        skeleton.add_bone("Skirt", Some(spine));
        index.initialize(&skeleton, root);
        assert!(index.resolve("Skirt").is_some());
        assert_eq!(index.all_names().len(), 5);
    }
}
