//! 骨骼覆盖控制器
//!
//! 每个角色实例一个。持有修改器列表（插入序，序列化保序，迭代确定）
//! 和惰性构建的名称索引，驱动每帧生命周期状态机，响应重载、换装、
//! 存档等外部事件。多帧序列按显式状态机建模，由外部 tick 推进。

use crate::codec::{self, BoneDataBlob};
use crate::hierarchy::{BoneNameIndex, Skeleton};
use crate::modifier::{BoneModifier, CoordinateType};
use crate::{BoneModError, Result};

use super::{BaselinePhase, BaselineState, CharacterHost};

/// 骨骼覆盖控制器
pub struct BoneController {
    modifiers: Vec<BoneModifier>,
    bone_searcher: BoneNameIndex,
    current_coordinate: CoordinateType,

    /// 宿主可置位：下一帧执行整体刷新
    pub needs_full_refresh: bool,
    /// 宿主可置位：下一帧先做局部基准更新
    pub needs_baseline_update: bool,

    baseline_state: BaselineState,
    baseline_phase: Option<BaselinePhase>,
    /// data-changed 序列挂起中（等配件完成挂载的那一帧）
    pending_data_changed: bool,

    data_loaded_listeners: Vec<Box<dyn FnMut()>>,
}

impl BoneController {
    pub fn new() -> Self {
        Self {
            modifiers: Vec::new(),
            bone_searcher: BoneNameIndex::new(),
            current_coordinate: CoordinateType::default(),
            needs_full_refresh: false,
            needs_baseline_update: false,
            baseline_state: BaselineState::Unknown,
            baseline_phase: None,
            pending_data_changed: false,
            data_loaded_listeners: Vec::new(),
        }
    }

    /// 添加修改器
    ///
    /// 立即解析骨骼节点并采集其基准，然后启动 data-changed 序列。
    /// 空骨骼名是调用方的契约错误，直接拒绝。
    pub fn add_modifier(&mut self, modifier: BoneModifier, skeleton: &mut Skeleton) -> Result<()> {
        if modifier.bone_name().is_empty() {
            return Err(BoneModError::InvalidArgument(
                "modifier bone name must not be empty".to_string(),
            ));
        }
        self.modifiers.push(modifier);
        self.fill_in_transforms(skeleton);
        if let Some(added) = self.modifiers.last_mut() {
            added.collect_baseline(skeleton);
        }
        self.start_data_changed(skeleton);
        Ok(())
    }

    /// 按骨骼名查找修改器；未知名称返回 None
    ///
    /// 重名条目不去重，查找返回列表中的第一个。
    pub fn modifier(&self, bone_name: &str) -> Option<&BoneModifier> {
        self.modifiers.iter().find(|m| m.bone_name() == bone_name)
    }

    pub fn modifier_mut(&mut self, bone_name: &str) -> Option<&mut BoneModifier> {
        self.modifiers.iter_mut().find(|m| m.bone_name() == bone_name)
    }

    /// 修改器列表（插入序）
    pub fn modifiers(&self) -> &[BoneModifier] {
        &self.modifiers
    }

    /// 可变修改器列表，供外部编辑器直接编辑
    pub fn modifiers_mut(&mut self) -> &mut Vec<BoneModifier> {
        &mut self.modifiers
    }

    /// 角色下所有可指定的骨骼名称（首次调用时惰性构建索引）
    pub fn all_possible_bone_names(&mut self, skeleton: &Skeleton) -> Vec<String> {
        if !self.bone_searcher.is_initialized() {
            if let Some(root) = skeleton.root() {
                self.bone_searcher.initialize(skeleton, root);
            }
        }
        self.bone_searcher.all_names()
    }

    pub fn baseline_state(&self) -> BaselineState {
        self.baseline_state
    }

    pub fn current_coordinate(&self) -> CoordinateType {
        self.current_coordinate
    }

    /// 服装选择变更通知：记录并启动 data-changed 序列
    pub fn set_current_coordinate(&mut self, coordinate: CoordinateType, skeleton: &mut Skeleton) {
        self.current_coordinate = coordinate;
        self.start_data_changed(skeleton);
    }

    /// 注册 data-changed 序列完成后的通知回调
    pub fn on_new_data_loaded(&mut self, listener: impl FnMut() + 'static) {
        self.data_loaded_listeners.push(Box::new(listener));
    }

    /// 每帧驱动一次的生命周期状态机
    pub fn late_update(&mut self, skeleton: &mut Skeleton, host: &mut dyn CharacterHost) {
        if self.needs_full_refresh {
            // 整体刷新抢占一切进行中的序列
            self.reload(skeleton, None, true);
            self.needs_full_refresh = false;
            self.needs_baseline_update = false;
            return;
        }

        // 推进挂起的 data-changed 序列：配件挂载的那一帧已经过去
        if self.pending_data_changed {
            self.pending_data_changed = false;
            self.fill_in_transforms(skeleton);
            self.needs_baseline_update = false;
            self.notify_data_loaded();
        }

        match self.baseline_state {
            BaselineState::Known => {
                if self.needs_baseline_update {
                    self.update_baseline(skeleton, host);
                }
                for modifier in &self.modifiers {
                    modifier.apply(skeleton, self.current_coordinate);
                }
                // 采集完成后的最后一个挂起点：装饰副本善后
                if self.baseline_phase == Some(BaselinePhase::Finalize) {
                    host.finish_baseline_capture(skeleton);
                    self.baseline_phase = None;
                }
            }
            BaselineState::Unknown => {
                self.baseline_state = BaselineState::Collecting;
                self.baseline_phase = Some(BaselinePhase::WaitFrameEnd);
            }
            BaselineState::Collecting => {
                self.advance_baseline_collection(skeleton, host);
            }
        }

        self.needs_baseline_update = false;
    }

    /// 服装数据载入
    ///
    /// 清掉所有服装特定修改器中当前服装的旧层，再把传入数据合并进来，
    /// 缺的修改器补建。解码失败记录日志并降级为无数据。
    pub fn load_coordinate(
        &mut self,
        skeleton: &mut Skeleton,
        data: Option<&BoneDataBlob>,
        maintain_state: bool,
    ) {
        if maintain_state {
            return;
        }

        let coordinate = self.current_coordinate;
        for modifier in self.modifiers.iter_mut().filter(|m| m.is_coordinate_specific()) {
            modifier.modifier_mut(coordinate).clear();
        }

        if let Some(blob) = data {
            match codec::deserialize_coordinate_layers(blob) {
                Ok(entries) => {
                    for (name, layer) in entries {
                        if self.modifier(&name).is_none() {
                            self.modifiers.push(BoneModifier::new(name.clone()));
                        }
                        if let Some(target) = self.modifier_mut(&name) {
                            target.make_coordinate_specific();
                            target.set_coordinate_layer(coordinate, layer);
                        }
                    }
                }
                Err(e) => {
                    log::error!("加载服装骨骼数据失败: {}", e);
                }
            }
        }

        self.start_data_changed(skeleton);
    }

    /// 服装数据存档：仅序列化服装特定修改器在当前服装的层
    ///
    /// 结果为空时返回 None，宿主据此清掉已持久化的数据。
    pub fn save_coordinate(&mut self, skeleton: &mut Skeleton) -> Option<BoneDataBlob> {
        self.purge_empty(skeleton);

        let entries: Vec<(String, _)> = self
            .modifiers
            .iter()
            .filter(|m| m.is_coordinate_specific())
            .map(|m| (m.bone_name().to_string(), *m.modifier(self.current_coordinate)))
            .collect();

        if entries.is_empty() {
            None
        } else {
            Some(codec::serialize_coordinate_layers(&entries))
        }
    }

    /// 整卡存档：序列化完整的有序修改器列表
    pub fn save_card(&mut self, skeleton: &mut Skeleton) -> Option<BoneDataBlob> {
        self.purge_empty(skeleton);

        if self.modifiers.is_empty() {
            None
        } else {
            Some(codec::serialize_modifiers(&self.modifiers))
        }
    }

    /// 角色重载
    ///
    /// 把所有修改器复位、放弃进行中的采集、基准回到 Unknown。
    /// `maintain_state` 为假时丢弃修改器集合并从持久化数据重建
    /// （版本感知解码，任何失败降级为空集），最后启动 data-changed 序列。
    pub fn reload(
        &mut self,
        skeleton: &mut Skeleton,
        data: Option<&BoneDataBlob>,
        maintain_state: bool,
    ) {
        for modifier in &mut self.modifiers {
            modifier.reset(skeleton);
        }

        // 进行中的序列全部放弃
        self.baseline_phase = None;
        self.pending_data_changed = false;
        self.baseline_state = BaselineState::Unknown;

        if !maintain_state {
            self.modifiers = match data {
                Some(blob) => match codec::deserialize_modifiers(blob) {
                    Ok(modifiers) => modifiers,
                    Err(e) => {
                        log::error!("加载骨骼扩展数据失败: {}", e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
        }

        self.start_data_changed(skeleton);
    }

    /// 局部基准更新
    ///
    /// 只处理被原生滑条系统驱动的骨骼：先把这些修改器复位，让滑条系统
    /// 重算形状，再只对这部分重新采集基准。避免整套骨骼的全量重采。
    fn update_baseline(&mut self, skeleton: &mut Skeleton, host: &mut dyn CharacterHost) {
        let affected_bones = host.slider_bones();
        let affected: Vec<usize> = self
            .modifiers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.bone_node().is_some_and(|h| affected_bones.contains(&h)))
            .map(|(i, _)| i)
            .collect();

        // 先复位，防止残留缩放混进新基准
        for &i in &affected {
            self.modifiers[i].reset(skeleton);
        }

        host.refresh_shapes(skeleton);

        for &i in &affected {
            self.modifiers[i].collect_baseline(skeleton);
        }
    }

    /// 推进基准采集序列的一个挂起点
    fn advance_baseline_collection(&mut self, skeleton: &mut Skeleton, host: &mut dyn CharacterHost) {
        match self.baseline_phase {
            Some(BaselinePhase::WaitFrameEnd) => {
                if !host.body_ready() {
                    // 动画躯体缺席：放弃采集，回到 Unknown 下帧重试
                    self.baseline_phase = None;
                    self.baseline_state = BaselineState::Unknown;
                    return;
                }
                host.begin_baseline_capture(skeleton);
                self.baseline_phase = Some(BaselinePhase::Settle);
            }
            Some(BaselinePhase::Settle) => {
                for modifier in &mut self.modifiers {
                    modifier.collect_baseline(skeleton);
                }
                self.baseline_state = BaselineState::Known;
                self.baseline_phase = Some(BaselinePhase::Finalize);
            }
            Some(BaselinePhase::Finalize) | None => {
                // Finalize 在 Known 分支处理；无阶段则状态机失步，重启采集
                self.baseline_state = BaselineState::Unknown;
                self.baseline_phase = None;
            }
        }
    }

    /// 启动 data-changed 序列：立即清扫空修改器，剩下的留到下一帧
    /// （等晚绑定的协作方完成挂载）再解析节点并发出通知
    fn start_data_changed(&mut self, skeleton: &mut Skeleton) {
        self.purge_empty(skeleton);
        self.pending_data_changed = true;
    }

    /// 给节点引用为空的修改器解析句柄
    ///
    /// 层级重建后名称对不上的旧句柄先作废。首个解析失败的名称触发一次
    /// 索引重建再重试；仍失败的留空，下次 data-changed 序列继续重试。
    fn fill_in_transforms(&mut self, skeleton: &Skeleton) {
        if self.modifiers.is_empty() {
            return;
        }

        for modifier in &mut self.modifiers {
            if let Some(handle) = modifier.bone_node() {
                let stale = skeleton
                    .node(handle)
                    .map_or(true, |node| node.name != modifier.bone_name());
                if stale {
                    modifier.bone_node = None;
                    modifier.invalidate_baseline();
                }
            }
        }

        let mut initialized = false;
        for modifier in &mut self.modifiers {
            if modifier.bone_node().is_some() {
                continue;
            }
            // 缓存可能过期：解析结果必须和当前层级里的名称对得上
            let mut handle = self
                .bone_searcher
                .resolve(modifier.bone_name())
                .filter(|&h| {
                    skeleton.node(h).is_some_and(|n| n.name == modifier.bone_name())
                });
            if handle.is_none() && !initialized {
                initialized = true;
                if let Some(root) = skeleton.root() {
                    self.bone_searcher.initialize(skeleton, root);
                }
                handle = self
                    .bone_searcher
                    .resolve(modifier.bone_name())
                    .filter(|&h| {
                        skeleton.node(h).is_some_and(|n| n.name == modifier.bone_name())
                    });
            }
            // 解析不到不算错误，留空待重试
            modifier.bone_node = handle;
        }
    }

    /// 清扫空修改器：先复位再移除，保留其余条目的相对顺序
    fn purge_empty(&mut self, skeleton: &mut Skeleton) {
        let mut kept = Vec::with_capacity(self.modifiers.len());
        for mut modifier in std::mem::take(&mut self.modifiers) {
            if modifier.is_empty() {
                modifier.reset(skeleton);
            } else {
                kept.push(modifier);
            }
        }
        self.modifiers = kept;
    }

    fn notify_data_loaded(&mut self) {
        for listener in &mut self.data_loaded_listeners {
            listener();
        }
    }
}

impl Default for BoneController {
    fn default() -> Self {
        Self::new()
    }
}
