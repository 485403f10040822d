mod common;

use nadir_rhi::recording::{Command, RecordedBarrier};
use nadir_rhi::*;
use common::*;

fn render_to(render_device: &RenderDevice<recording::Recording>, target: &std::sync::Arc<recording::RecordingResource>) -> Cmd {
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(target)))
        .unwrap();
    cmd.end_render_pass();
    cmd.close().unwrap();
    cmd
}

fn sample(render_device: &RenderDevice<recording::Recording>, image: &std::sync::Arc<recording::RecordingResource>) -> Cmd {
    let mut cmd = render_device.create_command_list(CommandListType::Compute).unwrap();
    cmd.use_program(&compute_program()).unwrap();
    cmd.attach_resource(compute_srv(0), Some(image), &LazyViewDesc::default()).unwrap();
    cmd.dispatch(1, 1, 1).unwrap();
    cmd.close().unwrap();
    cmd
}

fn whole(resource: u64, state_before: ResourceState, state_after: ResourceState) -> RecordedBarrier {
    RecordedBarrier {
        resource,
        state_before,
        state_after,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[test]
fn lazy_barriers_are_patched_between_lists() {
    let (device, mut render_device) = render_device();
    let target = color_target(&render_device, "target");

    let producer = render_to(&render_device, &target);
    let consumer = sample(&render_device, &target);
    render_device.execute_command_lists(&[&producer, &consumer]).unwrap();

    let submissions = device.submissions();
    assert_eq!(submissions.len(), 4);
    assert_eq!(
        submissions[0],
        vec![Command::ResourceBarrier(vec![whole(target.id(), ResourceState::Unknown, ResourceState::RenderTarget)])]
    );
    assert_eq!(submissions[1], producer.command_list().commands());
    assert_eq!(
        submissions[2],
        vec![Command::ResourceBarrier(vec![whole(
            target.id(),
            ResourceState::RenderTarget,
            ResourceState::NonPixelShaderResource,
        )])]
    );
    assert_eq!(submissions[3], consumer.command_list().commands());

    assert_eq!(
        render_device.global_resource_states().resource_state(&target),
        Some(ResourceState::NonPixelShaderResource)
    );
}

#[test]
fn satisfied_lists_need_no_patch() {
    let (device, mut render_device) = render_device();
    let image = color_target(&render_device, "image");

    let first = sample(&render_device, &image);
    render_device.execute_command_lists(&[&first]).unwrap();
    device.clear_submissions();

    let second = sample(&render_device, &image);
    render_device.execute_command_lists(&[&second]).unwrap();
    assert_eq!(device.submissions().len(), 1);
}

#[test]
fn patches_resolve_per_subresource() {
    let (_, render_device) = render_device();
    let image = texture(&render_device, "mipped", 64, 3, 1, Format::R8G8B8A8Unorm);
    let mut global = GlobalResourceStates::<recording::Recording>::new();

    let mut upload = render_device.create_command_list(CommandListType::Copy).unwrap();
    upload.update_subresource(&image, 1, &[0; 32 * 32 * 4], 32 * 4, 32 * 32 * 4).unwrap();
    upload.close().unwrap();
    assert_eq!(global.patch(&upload).len(), 1);

    let tracker = global.resource_state_tracker(&image).unwrap();
    assert_eq!(tracker.subresource_state(1, 0), ResourceState::CopyDest);
    assert_eq!(tracker.subresource_state(0, 0), ResourceState::Unknown);
    assert_eq!(global.resource_state(&image), None);

    let reader = sample(&render_device, &image);
    let barriers = global.patch(&reader);
    let transitions: Vec<(u32, ResourceState)> = barriers
        .iter()
        .map(|barrier| (barrier.base_mip_level, barrier.state_before))
        .collect();
    assert_eq!(
        transitions,
        vec![(0, ResourceState::Unknown), (1, ResourceState::CopyDest), (2, ResourceState::Unknown)]
    );
    assert!(barriers.iter().all(|barrier| barrier.level_count == 1));
}

#[test]
fn merge_keeps_states_a_list_never_touched() {
    let (_, render_device) = render_device();
    let image = texture(&render_device, "mipped", 64, 2, 1, Format::R8G8B8A8Unorm);
    let mut global = GlobalResourceStates::<recording::Recording>::new();

    let mut whole_write = render_device.create_command_list(CommandListType::Graphics).unwrap();
    whole_write.lazy_resource_barrier(LazyResourceBarrierDesc::whole(&image, ResourceState::UnorderedAccess));
    whole_write.close().unwrap();
    global.patch(&whole_write);

    let mut partial = render_device.create_command_list(CommandListType::Graphics).unwrap();
    partial.lazy_resource_barrier(LazyResourceBarrierDesc::range(&image, 1, 1, 0, 1, ResourceState::CopySource));
    partial.close().unwrap();
    let barriers = global.patch(&partial);
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].state_before, ResourceState::UnorderedAccess);

    let tracker = global.resource_state_tracker(&image).unwrap();
    assert_eq!(tracker.subresource_state(0, 0), ResourceState::UnorderedAccess);
    assert_eq!(tracker.subresource_state(1, 0), ResourceState::CopySource);
}

#[test]
fn dropped_resources_are_released() {
    let (_, render_device) = render_device();
    let kept = color_target(&render_device, "kept");
    let transient = color_target(&render_device, "transient");
    let mut global = GlobalResourceStates::<recording::Recording>::new();

    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    cmd.lazy_resource_barrier(LazyResourceBarrierDesc::whole(&kept, ResourceState::CopySource));
    cmd.lazy_resource_barrier(LazyResourceBarrierDesc::whole(&transient, ResourceState::CopyDest));
    cmd.close().unwrap();
    global.patch(&cmd);
    assert_eq!(global.tracked_resource_count(), 2);

    drop(cmd);
    drop(transient);
    global.release_unused();
    assert_eq!(global.tracked_resource_count(), 1);
    assert_eq!(global.resource_state(&kept), Some(ResourceState::CopySource));
}

#[test]
#[should_panic(expected = "still recording")]
fn open_lists_cannot_be_submitted() {
    let (_, mut render_device) = render_device();
    let cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    let _ = render_device.execute_command_lists(&[&cmd]);
}
