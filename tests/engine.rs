//! 覆盖引擎端到端测试：完整的采集 + 应用周期与持久化往返

use bonemod_engine::{
    BoneController, BoneDataBlob, BoneModifier, BoneNameIndex, CoordinateType, NullHost, Skeleton,
};
use glam::Vec3;

/// 搭一个带配件的小型角色骨骼
fn build_character() -> Skeleton {
    let mut skeleton = Skeleton::new();
    let root = skeleton.add_bone("BodyTop", None);
    let spine = skeleton.add_bone("cf_j_spine01", Some(root));
    let head = skeleton.add_bone("cf_j_head", Some(spine));
    skeleton.add_bone("cf_j_hair_front", Some(head));
    skeleton
}

fn run_frames(controller: &mut BoneController, skeleton: &mut Skeleton, frames: usize) {
    let mut host = NullHost;
    for _ in 0..frames {
        controller.late_update(skeleton, &mut host);
    }
}

#[test]
fn full_cycle_applies_scale_on_top_of_baseline() {
    let mut skeleton = build_character();
    let mut index = BoneNameIndex::new();
    index.initialize(&skeleton, skeleton.root().unwrap());
    let spine = index.resolve("cf_j_spine01").unwrap();
    skeleton.node_mut(spine).unwrap().local.scale = Vec3::splat(2.0);

    let mut controller = BoneController::new();
    let mut modifier = BoneModifier::new("cf_j_spine01");
    modifier.global_layer_mut().scale = Vec3::new(1.2, 1.2, 1.2);
    controller.add_modifier(modifier, &mut skeleton).unwrap();

    run_frames(&mut controller, &mut skeleton, 4);

    // 观察到的缩放 = 基准 2.0 × 覆盖 1.2
    assert_eq!(skeleton.node(spine).unwrap().local.scale, Vec3::splat(2.4));
    assert_eq!(
        controller.modifier("cf_j_spine01").unwrap().baseline().unwrap().scale,
        Vec3::splat(2.0)
    );
}

#[test]
fn overrides_survive_card_save_and_reload() {
    let mut skeleton = build_character();
    let mut controller = BoneController::new();

    let mut head = BoneModifier::new("cf_j_head");
    head.global_layer_mut().position = Vec3::new(0.0, 0.02, 0.0);
    head.modifier_mut(CoordinateType::Pajamas).scale = Vec3::splat(1.1);
    controller.add_modifier(head, &mut skeleton).unwrap();
    run_frames(&mut controller, &mut skeleton, 4);

    let blob = controller.save_card(&mut skeleton).unwrap();
    let bytes = blob.to_bytes();

    // 宿主存的是不透明字节，读回后重载出同样的集合
    let parsed = BoneDataBlob::from_bytes(&bytes).unwrap();
    let mut restored = BoneController::new();
    restored.reload(&mut skeleton, Some(&parsed), false);
    run_frames(&mut restored, &mut skeleton, 4);

    let loaded = restored.modifier("cf_j_head").unwrap();
    assert_eq!(loaded.global_layer().position, Vec3::new(0.0, 0.02, 0.0));
    assert!(loaded.is_coordinate_specific());
    assert_eq!(loaded.modifier(CoordinateType::Pajamas).scale, Vec3::splat(1.1));
}

#[test]
fn hierarchy_rebuild_re_resolves_bones() {
    let mut skeleton = build_character();
    let mut controller = BoneController::new();

    let mut modifier = BoneModifier::new("cf_j_hair_front");
    modifier.global_layer_mut().scale = Vec3::splat(1.5);
    controller.add_modifier(modifier, &mut skeleton).unwrap();
    run_frames(&mut controller, &mut skeleton, 4);

    // 宿主整体重建层级（换发型），节点顺序全变
    let mut rebuilt = Skeleton::new();
    let root = rebuilt.add_bone("BodyTop", None);
    let head = rebuilt.add_bone("cf_j_head", Some(root));
    let hair = rebuilt.add_bone("cf_j_hair_front", Some(head));
    rebuilt.node_mut(hair).unwrap().local.scale = Vec3::splat(0.5);

    controller.needs_full_refresh = true;
    run_frames(&mut controller, &mut rebuilt, 5);

    // 旧句柄作废后按名称重新解析，基准从新层级重新采集
    assert_eq!(
        controller.modifier("cf_j_hair_front").unwrap().bone_node(),
        Some(hair)
    );
    assert_eq!(rebuilt.node(hair).unwrap().local.scale, Vec3::splat(0.75));
}

#[test]
fn enumeration_lists_all_possible_bones() {
    let mut skeleton = build_character();
    let mut controller = BoneController::new();
    let mut names = controller.all_possible_bone_names(&skeleton);
    names.sort();
    assert_eq!(
        names,
        vec!["BodyTop", "cf_j_hair_front", "cf_j_head", "cf_j_spine01"]
    );
}
