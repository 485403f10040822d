mod common;

use std::sync::Arc;
use nadir_rhi::recording::{Command, RecordingView};
use nadir_rhi::*;
use common::*;

fn render_scene_pass(cmd: &mut Cmd, program: &Arc<recording::RecordingProgram>, target: &Arc<recording::RecordingResource>, albedo: &Arc<recording::RecordingResource>) {
    cmd.use_program(program).unwrap();
    draw_scene(cmd, target, albedo);
}

fn draw_scene(cmd: &mut Cmd, target: &Arc<recording::RecordingResource>, albedo: &Arc<recording::RecordingResource>) {
    cmd.set_viewport(0.0, 0.0, 64.0, 64.0);
    cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(target)))
        .unwrap();
    cmd.attach_resource(pixel_srv(0), Some(albedo), &LazyViewDesc::default()).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.end_render_pass();
}

#[test]
fn equal_descriptions_share_objects_across_lists() {
    let (device, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let target = color_target(&render_device, "target");
    let albedo = color_target(&render_device, "albedo");

    let mut first = render_device.create_command_list(CommandListType::Graphics).unwrap();
    let mut second = render_device.create_command_list(CommandListType::Graphics).unwrap();
    render_scene_pass(&mut first, &program, &target, &albedo);
    render_scene_pass(&mut second, &program, &target, &albedo);

    let stats = render_device.object_cache().stats();
    assert_eq!(stats.graphics_pipeline_count, 1);
    assert_eq!(stats.render_pass_count, 1);
    assert_eq!(stats.framebuffer_count, 1);
    assert_eq!(stats.binding_set_layout_count, 1);
    assert_eq!(stats.binding_set_count, 1);
    assert_eq!(stats.view_count, 2);

    let created = device.creation_stats();
    assert_eq!(created.graphics_pipelines, 1);
    assert_eq!(created.views, 2);

    let bound_pipeline = |cmd: &Cmd| {
        commands(cmd)
            .into_iter()
            .find_map(|command| match command {
                Command::BindPipeline { pipeline } => Some(pipeline),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(bound_pipeline(&first), bound_pipeline(&second));
}

#[test]
fn fixed_function_state_is_part_of_the_pipeline_key() {
    let (device, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let target = color_target(&render_device, "target");
    let albedo = color_target(&render_device, "albedo");

    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    render_scene_pass(&mut cmd, &program, &target, &albedo);

    cmd.use_program(&program).unwrap();
    cmd.set_blend_state(BlendDesc::alpha_blend());
    draw_scene(&mut cmd, &target, &albedo);

    cmd.use_program(&program).unwrap();
    cmd.set_blend_state(BlendDesc::alpha_blend());
    cmd.set_rasterize_state(RasterizerDesc { cull_mode: CullMode::Back, ..Default::default() });
    cmd.set_depth_stencil_state(DepthStencilDesc::disabled());
    draw_scene(&mut cmd, &target, &albedo);

    assert_eq!(device.creation_stats().graphics_pipelines, 3);
    assert_eq!(render_device.object_cache().stats().render_pass_count, 1);
}

#[test]
fn use_program_starts_from_default_state() {
    let (device, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let target = color_target(&render_device, "target");
    let albedo = color_target(&render_device, "albedo");

    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    render_scene_pass(&mut cmd, &program, &target, &albedo);

    cmd.use_program(&program).unwrap();
    cmd.set_blend_state(BlendDesc::alpha_blend());
    cmd.set_depth_stencil_state(DepthStencilDesc::disabled());
    render_scene_pass(&mut cmd, &program, &target, &albedo);

    assert_eq!(device.creation_stats().graphics_pipelines, 1);
    assert_eq!(render_device.object_cache().stats().graphics_pipeline_count, 1);
}

#[test]
fn attachment_views_are_shared_across_programs() {
    let (device, render_device) = render_device();
    let float_program = graphics_program(ReturnType::Float);
    let uint_program = graphics_program(ReturnType::Uint);
    let target = color_target(&render_device, "target");
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    for program in [&float_program, &uint_program] {
        cmd.use_program(program).unwrap();
        cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&target)))
            .unwrap();
        cmd.end_render_pass();
    }

    let stats = render_device.object_cache().stats();
    assert_eq!(stats.view_count, 1);
    assert_eq!(stats.framebuffer_count, 1);
    assert_eq!(stats.render_pass_count, 1);
    assert_eq!(device.creation_stats().views, 1);
    assert_eq!(device.creation_stats().framebuffers, 1);
}

#[test]
fn back_buffer_framebuffers_are_never_cached() {
    let (device, render_device) = render_device();
    let back_buffer = device.create_back_buffer(64, 64, Format::B8G8R8A8Unorm);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    for _ in 0..2 {
        cmd.begin_render_pass(&RenderPassBeginDesc::new().with_color(RenderPassBeginColorDesc::new(&back_buffer)))
            .unwrap();
        cmd.end_render_pass();
    }

    let stats = render_device.object_cache().stats();
    assert_eq!(stats.framebuffer_count, 0);
    assert_eq!(stats.view_count, 0);
    assert_eq!(stats.render_pass_count, 1);
    assert_eq!(device.creation_stats().framebuffers, 2);
    assert_eq!(device.creation_stats().views, 2);
}

#[test]
fn views_are_keyed_by_program() {
    let (_, render_device) = render_device();
    let float_program = graphics_program(ReturnType::Float);
    let uint_program = graphics_program(ReturnType::Uint);
    let depth = texture(&render_device, "depth", 32, 1, 1, Format::D24UnormS8Uint);
    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    cmd.use_program(&float_program).unwrap();
    cmd.attach_resource(pixel_srv(0), Some(&depth), &LazyViewDesc::default()).unwrap();
    cmd.use_program(&float_program).unwrap();
    cmd.attach_resource(pixel_srv(0), Some(&depth), &LazyViewDesc::default()).unwrap();
    assert_eq!(render_device.object_cache().stats().view_count, 1);

    cmd.use_program(&uint_program).unwrap();
    cmd.attach_resource(pixel_srv(0), Some(&depth), &LazyViewDesc::default()).unwrap();
    assert_eq!(render_device.object_cache().stats().view_count, 2);

    // Programs with identical bindings share one layout.
    assert_eq!(render_device.object_cache().stats().binding_set_layout_count, 1);
}

#[test]
fn reflection_shapes_the_view() {
    let (_, render_device) = render_device();
    let program = graphics_program(ReturnType::Uint);
    let depth = texture(&render_device, "depth", 32, 1, 1, Format::D24UnormS8Uint);
    let cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();

    let stencil: Arc<RecordingView> = cmd
        .object_cache_mut()
        .get_view(Some(&program), &pixel_srv(0), Some(&depth), &LazyViewDesc::default())
        .unwrap();
    assert_eq!(stencil.desc().plane_slice, 1);
    assert_eq!(stencil.desc().dimension, ViewDimension::Texture2D);

    let target: Arc<RecordingView> = cmd
        .object_cache_mut()
        .get_view(None, &BindKey::new(ShaderType::Pixel, ViewType::RenderTarget, 0, 0), Some(&depth), &LazyViewDesc::mip(0))
        .unwrap();
    assert_eq!(target.desc().view_type, ViewType::RenderTarget);
    assert_eq!(target.desc().plane_slice, 0);
    assert_eq!(target.level_count(), 1);
}

#[test]
fn mip_level_is_part_of_the_view_key() {
    let (_, render_device) = render_device();
    let program = compute_program();
    let image = texture(&render_device, "mipped", 32, 3, 1, Format::R8G8B8A8Unorm);
    let cmd = render_device.create_command_list(CommandListType::Compute).unwrap();
    let mut cache = cmd.object_cache_mut();

    let top: Arc<RecordingView> = cache.get_view(Some(&program), &compute_srv(0), Some(&image), &LazyViewDesc::mip(0)).unwrap();
    let second = cache.get_view(Some(&program), &compute_srv(0), Some(&image), &LazyViewDesc::mip(1)).unwrap();
    let second_again = cache.get_view(Some(&program), &compute_srv(0), Some(&image), &LazyViewDesc::mip(1)).unwrap();

    assert!(!Arc::ptr_eq(&top, &second));
    assert!(Arc::ptr_eq(&second, &second_again));
    assert_eq!(top.desc().base_mip_level, 0);
    assert_eq!(second.desc().base_mip_level, 1);
    assert_eq!(cache.stats().view_count, 2);
}

#[test]
#[should_panic(expected = "no shader binding matches")]
fn undeclared_bindings_panic() {
    let (_, render_device) = render_device();
    let image = color_target(&render_device, "image");
    let mut cmd = render_device.create_command_list(CommandListType::Compute).unwrap();

    cmd.use_program(&compute_program()).unwrap();
    cmd.attach_resource(compute_srv(7), Some(&image), &LazyViewDesc::default()).unwrap();
}

#[test]
#[should_panic(expected = "starts at mip 3")]
fn views_past_the_last_mip_panic() {
    let (_, render_device) = render_device();
    let image = texture(&render_device, "mipped", 32, 2, 1, Format::R8G8B8A8Unorm);
    let mut cmd = render_device.create_command_list(CommandListType::Compute).unwrap();

    cmd.use_program(&compute_program()).unwrap();
    cmd.attach_resource(compute_srv(0), Some(&image), &LazyViewDesc::mip(3)).unwrap();
}

#[test]
fn clearing_the_cache_recreates_objects() {
    let (device, render_device) = render_device();
    let program = graphics_program(ReturnType::Float);
    let target = color_target(&render_device, "target");
    let albedo = color_target(&render_device, "albedo");

    let mut cmd = render_device.create_command_list(CommandListType::Graphics).unwrap();
    render_scene_pass(&mut cmd, &program, &target, &albedo);
    cmd.object_cache_mut().clear();
    assert_eq!(render_device.object_cache().stats(), ObjectCacheStats::default());

    render_scene_pass(&mut cmd, &program, &target, &albedo);
    assert_eq!(device.creation_stats().graphics_pipelines, 2);
    assert_eq!(render_device.object_cache().stats().graphics_pipeline_count, 1);
}
