mod common;

use nadir_rhi::recording::Command;
use nadir_rhi::*;
use common::*;

#[test]
fn draws_bind_pipeline_then_barriers_then_binding_set() {
    let (_, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let gbuffer = color_target(&render_device, "gbuffer");
    let target = color_target(&render_device, "target");
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    cmd.use_program(&program).unwrap();
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&gbuffer)))
        .unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.end_render_pass();

    cmd.use_program(&program).unwrap();
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&target)))
        .unwrap();
    cmd.attach_resource(pixel_srv(0), Some(&gbuffer), &LazyViewDesc::default()).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.end_render_pass();
    cmd.close().unwrap();

    let commands = commands(&cmd);
    let kinds: Vec<&str> = commands
        .iter()
        .map(|command| match command {
            Command::BeginRenderPass { .. } => "begin",
            Command::BindPipeline { .. } => "pipeline",
            Command::ResourceBarrier(_) => "barrier",
            Command::BindBindingSet { .. } => "bindings",
            Command::Draw { .. } => "draw",
            Command::EndRenderPass => "end",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        ["begin", "pipeline", "bindings", "draw", "end", "begin", "pipeline", "barrier", "bindings", "draw", "end"]
    );

    let barriers = barriers(&commands);
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].resource, gbuffer.id());
    assert_eq!(barriers[0].state_before, ResourceState::RenderTarget);
    assert_eq!(barriers[0].state_after, ResourceState::PixelShaderResource);

    let lazy: Vec<(u64, ResourceState)> = cmd
        .lazy_barriers()
        .iter()
        .map(|barrier| (barrier.resource.id(), barrier.state))
        .collect();
    assert_eq!(lazy, vec![(gbuffer.id(), ResourceState::RenderTarget), (target.id(), ResourceState::RenderTarget)]);
}

#[test]
fn attachments_transition_before_the_pass_begins() {
    let (_, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let color = color_target(&render_device, "color");
    let depth = texture(&render_device, "depth", 64, 1, 1, Format::D32Float);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    cmd.use_program(&program).unwrap();
    cmd.attach_resource(pixel_srv(0), Some(&color), &LazyViewDesc::default()).unwrap();
    cmd.begin_render_pass(
        &RenderPassBeginDesc::new()
            .with_color(RenderPassBeginColorDesc::new(&color).with_clear_color([0.0, 0.0, 0.0, 1.0]))
            .with_depth_stencil(RenderPassBeginDepthStencilDesc::new(&depth).with_clear(0.0, 0)),
    )
    .unwrap();

    let commands = commands(&cmd);
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].barriers()[0].state_before, ResourceState::PixelShaderResource);
    assert_eq!(commands[0].barriers()[0].state_after, ResourceState::RenderTarget);
    match &commands[1] {
        Command::BeginRenderPass { clear, .. } => {
            assert_eq!(clear.colors, vec![[0.0, 0.0, 0.0, 1.0]]);
            assert_eq!(clear.depth, 0.0);
        }
        other => panic!("expected a render pass, got {other:?}"),
    }

    let depth_lazy = cmd.lazy_barriers().iter().find(|barrier| barrier.resource.id() == depth.id()).unwrap();
    assert_eq!(depth_lazy.state, ResourceState::DepthStencilWrite);
}

#[test]
fn empty_color_slots_are_skipped() {
    let (device, render_device) = render_device();
    let color = color_target(&render_device, "color");
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    cmd.begin_render_pass(
        &RenderPassBeginDesc::new()
            .with_color(RenderPassBeginColorDesc::empty())
            .with_color(RenderPassBeginColorDesc::new(&color).with_load_op(RenderPassLoadOp::Load)),
    )
    .unwrap();
    cmd.end_render_pass();

    assert_eq!(device.creation_stats().views, 1);
    assert_eq!(cmd.lazy_barriers().len(), 1);
    match &commands(&cmd)[0] {
        Command::BeginRenderPass { clear, .. } => assert_eq!(clear.colors.len(), 2),
        other => panic!("expected a render pass, got {other:?}"),
    }
}

#[test]
fn shading_rate_image_sets_combiners_once() {
    let (_, render_device) = render_device();
    let color = color_target(&render_device, "color");
    let rate_image = texture(&render_device, "shading rate", 8, 1, 1, Format::R8Uint);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    let rate_view = cmd
        .object_cache_mut()
        .get_view(None, &BindKey::new(ShaderType::Pixel, ViewType::ShadingRateSource, 0, 0), Some(&rate_image), &LazyViewDesc::default())
        .unwrap();
    cmd.rs_set_shading_rate_image(Some(rate_view));
    for _ in 0..2 {
        cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&color)))
            .unwrap();
        cmd.end_render_pass();
    }
    cmd.rs_set_shading_rate_image(None);
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&color)))
        .unwrap();

    let rates: Vec<[ShadingRateCombiner; 2]> = commands(&cmd)
        .iter()
        .filter_map(|command| match command {
            Command::SetShadingRate { combiners, .. } => Some(*combiners),
            _ => None,
        })
        .collect();
    assert_eq!(
        rates,
        vec![
            [ShadingRateCombiner::Passthrough, ShadingRateCombiner::Override],
            [ShadingRateCombiner::Passthrough, ShadingRateCombiner::Passthrough],
        ]
    );
    assert!(cmd
        .lazy_barriers()
        .iter()
        .any(|barrier| barrier.resource.id() == rate_image.id() && barrier.state == ResourceState::ShadingRateSource));
    // The shading rate format is part of the render pass key.
    assert_eq!(render_device.object_cache().stats().render_pass_count, 2);
}

#[test]
fn reset_keeps_the_cache_and_drops_the_rest() {
    let (device, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let color = color_target(&render_device, "color");
    let albedo = color_target(&render_device, "albedo");
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    let record = |cmd: &mut Cmd| {
        cmd.use_program(&program).unwrap();
        cmd.begin_event("scene");
        cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&color)))
            .unwrap();
        cmd.attach_resource(pixel_srv(1), Some(&albedo), &LazyViewDesc::default()).unwrap();
        cmd.draw_indexed(6, 1, 0, 0, 0).unwrap();
        cmd.end_render_pass();
        cmd.end_event();
        cmd.close().unwrap();
    };

    record(&mut cmd);
    let first = commands(&cmd);
    let created = device.creation_stats();

    cmd.reset().unwrap();
    assert!(!cmd.is_closed());
    assert!(cmd.lazy_barriers().is_empty());
    assert!(cmd.resource_state_trackers().is_empty());
    assert!(cmd.command_list().commands().is_empty());
    assert!(cmd.cmd_resources().is_empty());

    record(&mut cmd);
    assert_eq!(commands(&cmd), first);
    assert_eq!(device.creation_stats(), created);
    assert_eq!(cmd.lazy_barriers().len(), 2);
    assert!(matches!(first[0], Command::BeginEvent(ref name) if name == "scene"));
    assert!(matches!(first.last(), Some(Command::EndEvent)));
}

#[test]
#[cfg(feature = "validation")]
#[should_panic(expected = "recorded after close")]
fn recording_after_close_panics() {
    let (_, render_device) = render_device();
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    cmd.close().unwrap();
    cmd.set_viewport(0.0, 0.0, 1.0, 1.0);
}

#[test]
fn draw_without_render_pass_fails() {
    let (_, render_device) = render_device();
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    cmd.use_program(&graphics_program(ReturnType::Float)).unwrap();

    let error = cmd.draw(3, 1, 0, 0).unwrap_err();
    assert!(format!("{error:#}").contains("graphics pipeline"));
}

#[test]
fn indirect_draws_wait_for_both_buffers() {
    let (_, render_device) = render_device();
    let color = color_target(&render_device, "color");
    let arguments = buffer(&render_device, 64, MemoryType::Default);
    let count = buffer(&render_device, 4, MemoryType::Default);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    cmd.copy_buffer(&count, &arguments, &[BufferCopyRegion { src_offset: 0, dst_offset: 0, num_bytes: 4 }]);
    cmd.use_program(&graphics_program(ReturnType::Float)).unwrap();
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&color)))
        .unwrap();
    cmd.draw_indexed_indirect_count(&arguments, 0, &count, 0, 4, 20).unwrap();

    let commands = commands(&cmd);
    let draw = position(&commands, |command| matches!(command, Command::DrawIndirectCount { indexed: true, .. }));
    let states: Vec<(u64, ResourceState, ResourceState)> = commands[draw - 1]
        .barriers()
        .iter()
        .map(|barrier| (barrier.resource, barrier.state_before, barrier.state_after))
        .collect();
    assert_eq!(
        states,
        vec![
            (arguments.id(), ResourceState::CopyDest, ResourceState::IndirectArgument),
            (count.id(), ResourceState::CopySource, ResourceState::IndirectArgument),
        ]
    );
}
