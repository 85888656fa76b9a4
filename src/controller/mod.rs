//! 覆盖控制器：修改器集合的生命周期编排

mod bone_controller;

pub use bone_controller::BoneController;

use std::collections::HashSet;

use crate::hierarchy::{NodeHandle, Skeleton};

/// 基准姿态状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaselineState {
    /// 基准失效，下一帧启动采集
    Unknown,
    /// 采集序列进行中，期间不应用覆盖
    Collecting,
    /// 基准有效，每帧应用覆盖
    Known,
}

/// 基准采集序列的挂起点
///
/// 采集跨越多个帧边界：配件等下游系统稳定后才能读到可信的基准。
/// 每个阶段对应一次让出到下一帧，不阻塞任何线程。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BaselinePhase {
    /// 等待帧末，随后确认动画躯体已就位
    WaitFrameEnd,
    /// 再让一帧，等晚挂载的配件稳定
    Settle,
    /// 基准已采集，让一帧后做外部装饰副本的善后同步
    Finalize,
}

/// 宿主协作接口
///
/// 控制器只通过这组窄接口观察宿主：躯体就位信号、原生滑条系统的
/// 影响范围与重算触发、以及基准采集前后的装饰副本挂起/恢复钩子。
pub trait CharacterHost {
    /// 骨骼的动画躯体是否已就位
    fn body_ready(&self) -> bool {
        true
    }

    /// 原生滑条系统当前驱动的骨骼集合（局部基准更新用）
    fn slider_bones(&self) -> HashSet<NodeHandle> {
        HashSet::new()
    }

    /// 让滑条系统重算它的形状贡献
    fn refresh_shapes(&mut self, _skeleton: &mut Skeleton) {}

    /// 基准采集开始前挂起外部装饰副本
    fn begin_baseline_capture(&mut self, _skeleton: &mut Skeleton) {}

    /// 基准采集完成一帧后，把装饰副本重新同步到新基准
    fn finish_baseline_capture(&mut self, _skeleton: &mut Skeleton) {}
}

/// 无协作宿主（测试和最小集成用）
pub struct NullHost;

impl CharacterHost for NullHost {}
