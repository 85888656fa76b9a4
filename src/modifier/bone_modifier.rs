//! 骨骼修改器
//!
//! 单根命名骨骼的覆盖单元：持有基准姿态快照、全局覆盖层和按服装的
//! 覆盖层数组。对节点的引用是弱引用（句柄），层级重建后须重新解析。

use super::{BoneOverride, CoordinateType};
use crate::hierarchy::{BoneTransform, NodeHandle, Skeleton};

/// 单根骨骼的覆盖修改器
#[derive(Clone, Debug)]
pub struct BoneModifier {
    bone_name: String,
    /// 已解析的节点句柄，未解析或层级重建后为 None
    pub(crate) bone_node: Option<NodeHandle>,
    /// 基准姿态，仅在基准采集完成后有效；不持久化，总是重新采集
    baseline: Option<BoneTransform>,
    global_layer: BoneOverride,
    /// 按服装的覆盖层，首次写入按服装数据时才分配
    coordinate_layers: Option<Vec<BoneOverride>>,
}

impl BoneModifier {
    pub fn new(bone_name: impl Into<String>) -> Self {
        Self {
            bone_name: bone_name.into(),
            bone_node: None,
            baseline: None,
            global_layer: BoneOverride::default(),
            coordinate_layers: None,
        }
    }

    /// 反序列化用：带已有层数据构造
    pub(crate) fn with_layers(
        bone_name: String,
        global_layer: BoneOverride,
        coordinate_layers: Option<Vec<BoneOverride>>,
    ) -> Self {
        Self {
            bone_name,
            bone_node: None,
            baseline: None,
            global_layer,
            coordinate_layers,
        }
    }

    pub fn bone_name(&self) -> &str {
        &self.bone_name
    }

    pub fn bone_node(&self) -> Option<NodeHandle> {
        self.bone_node
    }

    pub fn baseline(&self) -> Option<&BoneTransform> {
        self.baseline.as_ref()
    }

    pub fn global_layer(&self) -> &BoneOverride {
        &self.global_layer
    }

    pub fn global_layer_mut(&mut self) -> &mut BoneOverride {
        &mut self.global_layer
    }

    /// 句柄经名称校验后才可用：层级重建后旧句柄可能指到不相干的骨骼
    fn valid_node(&self, skeleton: &Skeleton) -> Option<NodeHandle> {
        let handle = self.bone_node?;
        let node = skeleton.node(handle)?;
        (node.name == self.bone_name).then_some(handle)
    }

    /// 采集基准：读取节点当前的自然姿态存为 baseline
    ///
    /// 节点未解析时不做任何事。
    pub fn collect_baseline(&mut self, skeleton: &Skeleton) {
        let Some(handle) = self.valid_node(skeleton) else { return };
        if let Some(node) = skeleton.node(handle) {
            self.baseline = Some(node.local);
        }
    }

    /// 应用覆盖：选择激活层，与基准组合后写入节点
    ///
    /// 激活层 = 服装层（已分配时），否则全局层。节点未解析或基准未采集时
    /// 不触碰节点。
    pub fn apply(&self, skeleton: &mut Skeleton, coordinate: CoordinateType) {
        let Some(handle) = self.valid_node(skeleton) else { return };
        let Some(baseline) = self.baseline else { return };
        let layer = self.modifier(coordinate);
        if let Some(node) = skeleton.node_mut(handle) {
            node.local = layer.combine(&baseline);
        }
    }

    /// 把基准写回节点，清掉已应用的覆盖结果
    ///
    /// 在重新采集基准前调用，避免残留的覆盖值污染新基准。
    pub fn reset(&mut self, skeleton: &mut Skeleton) {
        let Some(handle) = self.valid_node(skeleton) else { return };
        let Some(baseline) = self.baseline else { return };
        if let Some(node) = skeleton.node_mut(handle) {
            node.local = baseline;
        }
    }

    /// 清除已采集的基准（层级重载后基准失效）
    pub fn invalidate_baseline(&mut self) {
        self.baseline = None;
    }

    /// 全局层和所有已填充的服装层是否全部未设置
    pub fn is_empty(&self) -> bool {
        self.global_layer.is_empty()
            && self
                .coordinate_layers
                .as_ref()
                .map_or(true, |layers| layers.iter().all(|l| l.is_empty()))
    }

    /// 是否已分配按服装的覆盖层
    pub fn is_coordinate_specific(&self) -> bool {
        self.coordinate_layers.is_some()
    }

    /// 分配按服装的覆盖层（幂等）
    pub fn make_coordinate_specific(&mut self) {
        if self.coordinate_layers.is_none() {
            self.coordinate_layers = Some(vec![BoneOverride::default(); CoordinateType::COUNT]);
        }
    }

    /// 取某服装的覆盖层；未分配时回退到全局层
    pub fn modifier(&self, coordinate: CoordinateType) -> &BoneOverride {
        match &self.coordinate_layers {
            Some(layers) => &layers[coordinate.index()],
            None => &self.global_layer,
        }
    }

    /// 取某服装的可写覆盖层，首次写入时分配服装层数组
    pub fn modifier_mut(&mut self, coordinate: CoordinateType) -> &mut BoneOverride {
        let layers = self
            .coordinate_layers
            .get_or_insert_with(|| vec![BoneOverride::default(); CoordinateType::COUNT]);
        &mut layers[coordinate.index()]
    }

    /// 直接写入某服装层（反序列化合并用）
    pub(crate) fn set_coordinate_layer(&mut self, coordinate: CoordinateType, layer: BoneOverride) {
        *self.modifier_mut(coordinate) = layer;
    }

    pub(crate) fn coordinate_layers(&self) -> Option<&[BoneOverride]> {
        self.coordinate_layers.as_deref()
    }
}
