//! 骨骼节点树
//!
//! 覆盖引擎不拥有骨骼，只通过句柄读写节点变换。宿主在运行时重建层级
//! （挂载配件、换装、重载模型）后，旧句柄必须经名称索引重新解析。

use super::BoneTransform;

/// 层级节点句柄（arena 下标，拷贝语义）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

/// 骨骼节点
#[derive(Clone, Debug)]
pub struct BoneNode {
    pub name: String,
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    /// 本地变换，覆盖引擎的读写目标
    pub local: BoneTransform,
}

/// 骨骼层级（宿主持有的节点 arena）
pub struct Skeleton {
    nodes: Vec<BoneNode>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// 添加骨骼节点，返回其句柄
    ///
    /// 第一个添加的节点为根。插入顺序稳定，句柄在宿主整体重建前一直有效。
    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(BoneNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            local: BoneTransform::default(),
        });
        if let Some(p) = parent {
            if let Some(parent_node) = self.nodes.get_mut(p.0) {
                parent_node.children.push(handle);
            }
        }
        handle
    }

    /// 根节点句柄
    pub fn root(&self) -> Option<NodeHandle> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeHandle(0))
        }
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&BoneNode> {
        self.nodes.get(handle.0)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut BoneNode> {
        self.nodes.get_mut(handle.0)
    }

    pub fn bone_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_bone_links_parent() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_bone("Root", None);
        let spine = skeleton.add_bone("Spine", Some(root));

        assert_eq!(skeleton.root(), Some(root));
        assert_eq!(skeleton.node(spine).unwrap().parent, Some(root));
        assert_eq!(skeleton.node(root).unwrap().children, vec![spine]);
    }
}
