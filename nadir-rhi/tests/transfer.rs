mod common;

use nadir_rhi::recording::Command;
use nadir_rhi::*;
use common::*;

#[test]
fn upload_buffers_are_written_in_place() {
    let (_, render_device) = render_device();
    let constants = buffer(&render_device, 8, MemoryType::Upload);
    let mut cmd = render_device.create_command_list(CommandListType::Copy).unwrap();

    cmd.update_subresource(&constants, 0, &[1, 2, 3, 4], 0, 0).unwrap();

    assert_eq!(constants.contents(), vec![1, 2, 3, 4, 0, 0, 0, 0]);
    assert!(commands(&cmd).is_empty());
    assert!(cmd.cmd_resources().is_empty());
}

#[test]
fn readback_buffers_cannot_be_updated() {
    let (_, render_device) = render_device();
    let readback = buffer(&render_device, 8, MemoryType::Readback);
    let mut cmd = render_device.create_command_list(CommandListType::Copy).unwrap();

    assert!(cmd.update_subresource(&readback, 0, &[0; 8], 0, 0).is_err());
}

#[test]
fn device_buffers_go_through_staging() {
    let (_, render_device) = render_device();
    let vertices = buffer(&render_device, 16, MemoryType::Default);
    let mut cmd = render_device.create_command_list(CommandListType::Copy).unwrap();

    cmd.update_subresource(&vertices, 0, &[7; 12], 0, 0).unwrap();

    let staging = &cmd.cmd_resources()[0];
    let mut expected = vec![7; 12];
    expected.resize(16, 0);
    assert_eq!(staging.contents(), expected);
    assert_eq!(staging.desc().memory_type, MemoryType::Upload);

    assert_eq!(
        commands(&cmd),
        vec![Command::CopyBuffer {
            src: staging.id(),
            dst: vertices.id(),
            regions: vec![BufferCopyRegion { src_offset: 0, dst_offset: 0, num_bytes: 16 }],
        }]
    );
    // Staging memory is never tracked.
    assert!(cmd.resource_state_tracker(staging).is_none());
    assert_eq!(cmd.lazy_barriers().len(), 1);
    assert_eq!(cmd.lazy_barriers()[0].state, ResourceState::CopyDest);
}

#[test]
fn texture_updates_target_one_subresource() {
    let (_, render_device) = render_device();
    let image = texture(&render_device, "atlas", 64, 3, 2, Format::R8G8B8A8Unorm);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    // Mip 2 of layer 1 is 16x16; rows are 64 bytes tight and 256 bytes in staging.
    let data: Vec<u8> = (0..16u8).flat_map(|row| std::iter::repeat_n(row, 64)).collect();
    cmd.update_subresource(&image, 3 + 2, &data, 64, 1024).unwrap();

    let staging = cmd.cmd_resources()[0].clone();
    let contents = staging.contents();
    assert_eq!(contents.len(), 256 * 16);
    assert_eq!(&contents[256..320], &[1; 64][..]);
    assert_eq!(&contents[320..512], &[0; 192][..]);

    match &commands(&cmd)[..] {
        [Command::CopyBufferToTexture { src, dst, regions }] => {
            assert_eq!((*src, *dst), (staging.id(), image.id()));
            assert_eq!(regions[0].buffer_row_pitch, 256);
            assert_eq!((regions[0].texture_mip_level, regions[0].texture_array_layer), (2, 1));
            assert_eq!(regions[0].texture_extent, Extent3D { width: 16, height: 16, depth: 1 });
        }
        other => panic!("unexpected commands {other:?}"),
    }

    let tracker = cmd.resource_state_tracker(&image).unwrap();
    assert!(!tracker.has_resource_state());
    assert_eq!(tracker.subresource_state(2, 1), ResourceState::CopyDest);
    assert_eq!(tracker.subresource_state(2, 0), ResourceState::Unknown);

    // Reading the whole texture afterwards only transitions the uploaded subresource.
    cmd.use_program(&compute_program()).unwrap();
    cmd.attach_resource(compute_srv(0), Some(&image), &LazyViewDesc::default()).unwrap();
    cmd.dispatch(1, 1, 1).unwrap();

    let barriers = barriers(&commands(&cmd));
    assert_eq!(barriers.len(), 1);
    assert_eq!((barriers[0].base_mip_level, barriers[0].base_array_layer), (2, 1));
    assert_eq!(barriers[0].state_before, ResourceState::CopyDest);
    assert_eq!(cmd.lazy_barriers().len(), 1 + 5);
}

#[test]
fn short_texture_data_is_rejected() {
    let (_, render_device) = render_device();
    let image = texture(&render_device, "image", 16, 1, 1, Format::R8G8B8A8Unorm);
    let mut cmd = render_device.create_command_list(CommandListType::Copy).unwrap();

    assert!(cmd.update_subresource(&image, 0, &[0; 100], 64, 1024).is_err());
    assert!(commands(&cmd).is_empty());
}

#[test]
fn texture_copies_transition_both_sides() {
    let (_, render_device) = render_device();
    let src = texture(&render_device, "src", 32, 2, 1, Format::R8G8B8A8Unorm);
    let dst = texture(&render_device, "dst", 32, 1, 1, Format::R8G8B8A8Unorm);
    let mut cmd = render_device.create_command_list(CommandListType::Copy).unwrap();

    cmd.lazy_resource_barrier(LazyResourceBarrierDesc::whole(&src, ResourceState::RenderTarget));
    cmd.copy_texture(&src, &dst, &[TextureCopyRegion {
        extent: Extent3D { width: 16, height: 16, depth: 1 },
        src_mip_level: 1,
        ..Default::default()
    }]);

    let commands = commands(&cmd);
    assert_eq!(commands.len(), 2);
    let barrier = commands[0].barriers()[0];
    assert_eq!((barrier.resource, barrier.base_mip_level), (src.id(), 1));
    assert_eq!(barrier.state_after, ResourceState::CopySource);
    assert!(matches!(commands[1], Command::CopyTexture { .. }));

    let dst_state = cmd.resource_state_tracker(&dst).unwrap();
    assert_eq!(dst_state.resource_state(), ResourceState::CopyDest);
}
