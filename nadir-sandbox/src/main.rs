use std::rc::Rc;
use std::sync::Arc;
use anyhow::Context;
use glam::Vec3;
use nadir_core::cli::EngineArgs;
use nadir_core::log::{self, debug, info};
use nadir_rhi::recording::{Recording, RecordingDevice, RecordingProgram, RecordingResource, RecordingShader};
use nadir_rhi::*;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const ALBEDO_SIZE: u32 = 64;

type Cmd = CommandListBox<Recording>;

fn gbuffer_program() -> RecordingProgram {
    let vertex = RecordingShader::new(ShaderType::Vertex)
        .with_input(InputLayoutDesc { slot: 0, location: 0, format: Format::R32G32B32Float, stride: 12 });
    let pixel = RecordingShader::new(ShaderType::Pixel).with_binding(
        ResourceBindingDesc::new("albedo", ViewType::Texture, 0, 0)
            .with_dimension(ViewDimension::Texture2D)
            .with_return_type(ReturnType::Float),
    );
    RecordingProgram::new(vec![vertex, pixel])
}

fn lighting_program() -> RecordingProgram {
    let texture = |name: &str, view_type, slot| {
        ResourceBindingDesc::new(name, view_type, slot, 0)
            .with_dimension(ViewDimension::Texture2D)
            .with_return_type(ReturnType::Float)
    };
    let compute = RecordingShader::new(ShaderType::Compute)
        .with_binding(texture("gbuffer", ViewType::Texture, 0))
        .with_binding(texture("depth", ViewType::Texture, 1))
        .with_binding(texture("lit", ViewType::RWTexture, 0))
        .with_binding(texture("scratch", ViewType::RWTexture, 1));
    RecordingProgram::new(vec![compute])
}

fn present_program() -> RecordingProgram {
    let vertex = RecordingShader::new(ShaderType::Vertex);
    let pixel = RecordingShader::new(ShaderType::Pixel).with_binding(
        ResourceBindingDesc::new("lit", ViewType::Texture, 0, 0)
            .with_dimension(ViewDimension::Texture2D)
            .with_return_type(ReturnType::Float),
    );
    RecordingProgram::new(vec![vertex, pixel])
}

fn checkerboard(size: u32) -> Vec<u8> {
    (0..size * size)
        .flat_map(|texel| {
            let (x, y) = (texel % size, texel / size);
            if (x / 8 + y / 8) % 2 == 0 { [230, 230, 230, 255] } else { [40, 40, 40, 255] }
        })
        .collect()
}

struct SandboxApp {
    device: Arc<RecordingDevice>,
    render_device: RenderDevice<Recording>,

    gbuffer_program: Arc<RecordingProgram>,
    lighting_program: Arc<RecordingProgram>,
    present_program: Arc<RecordingProgram>,

    vertices: Arc<RecordingResource>,
    albedo: Arc<RecordingResource>,
    gbuffer: Arc<RecordingResource>,
    depth: Arc<RecordingResource>,
    lit: Arc<RecordingResource>,
    scratch: Rc<TransientView<Recording>>,
    back_buffers: [Arc<RecordingResource>; 2],

    geometry_list: Cmd,
    lighting_list: Cmd,
    present_list: Cmd,
}

impl SandboxApp {
    fn new() -> anyhow::Result<Self> {
        let device = Arc::new(RecordingDevice::new());
        let render_device = RenderDevice::<Recording>::new(device.clone());

        let texture = |name: &str, format: Format, bind_flags: BindFlags| {
            let desc = TextureDescBuilder::default()
                .name(name)
                .format(format)
                .width(WIDTH)
                .height(HEIGHT)
                .bind_flags(bind_flags)
                .build()?;
            render_device.create_texture(&desc)
        };

        let gbuffer = texture("gbuffer", Format::R8G8B8A8Unorm, BindFlag::RenderTarget | BindFlag::ShaderResource)?;
        let depth = texture("depth", Format::D32Float, BindFlag::DepthStencil | BindFlag::ShaderResource)?;
        let lit = texture("lit", Format::R16G16B16A16Float, BindFlag::UnorderedAccess | BindFlag::ShaderResource)?;
        let albedo = render_device.create_texture(
            &TextureDesc::new_2d(ALBEDO_SIZE, ALBEDO_SIZE, Format::R8G8B8A8Unorm, BindFlag::ShaderResource | BindFlag::CopyDest),
        )?;
        let vertices = render_device.create_buffer(
            &BufferDesc::new(BindFlag::VertexBuffer | BindFlag::CopyDest, 36, MemoryType::Default).with_name("triangle"),
        )?;

        let scratch = Rc::new(TransientView::new(
            TextureDesc::new_2d(WIDTH / 2, HEIGHT / 2, Format::R16G16B16A16Float, BindFlag::UnorderedAccess),
            LazyViewDesc::default(),
        ));
        let back_buffers = [
            device.create_back_buffer(WIDTH, HEIGHT, Format::B8G8R8A8Srgb),
            device.create_back_buffer(WIDTH, HEIGHT, Format::B8G8R8A8Srgb),
        ];

        let geometry_list = render_device.create_command_list(CommandListType::Graphics)?;
        let lighting_list = render_device.create_command_list(CommandListType::Compute)?;
        let present_list = render_device.create_command_list(CommandListType::Graphics)?;

        Ok(Self {
            device,
            render_device,
            gbuffer_program: Arc::new(gbuffer_program()),
            lighting_program: Arc::new(lighting_program()),
            present_program: Arc::new(present_program()),
            vertices,
            albedo,
            gbuffer,
            depth,
            lit,
            scratch,
            back_buffers,
            geometry_list,
            lighting_list,
            present_list,
        })
    }

    #[profiling::function]
    fn record_geometry(&mut self, frame: u32) -> anyhow::Result<()> {
        let cmd = &mut self.geometry_list;
        cmd.reset()?;

        if frame == 0 {
            cmd.begin_event("upload");
            let triangle: Vec<u8> = [Vec3::new(-1.0, -1.0, 0.0), Vec3::new(3.0, -1.0, 0.0), Vec3::new(-1.0, 3.0, 0.0)]
                .iter()
                .flat_map(|position| position.to_array())
                .flat_map(f32::to_le_bytes)
                .collect();
            cmd.update_subresource(&self.vertices, 0, &triangle, 0, 0)?;

            let row_pitch = u64::from(ALBEDO_SIZE) * 4;
            cmd.update_subresource(&self.albedo, 0, &checkerboard(ALBEDO_SIZE), row_pitch, row_pitch * u64::from(ALBEDO_SIZE))?;
            cmd.end_event();
        }

        cmd.begin_event("gbuffer");
        cmd.use_program(&self.gbuffer_program)?;
        cmd.set_viewport(0.0, 0.0, WIDTH as f32, HEIGHT as f32);
        cmd.begin_render_pass(
            &RenderPassBeginDesc::new()
                .with_color(RenderPassBeginColorDesc::new(&self.gbuffer).with_clear_color([0.0, 0.0, 0.0, 1.0]))
                .with_depth_stencil(RenderPassBeginDepthStencilDesc::new(&self.depth)),
        )?;
        cmd.attach_resource(BindKey::new(ShaderType::Pixel, ViewType::Texture, 0, 0), Some(&self.albedo), &LazyViewDesc::default())?;
        cmd.ia_set_vertex_buffer(0, &self.vertices);
        cmd.draw(3, 1, 0, 0)?;
        cmd.end_render_pass();
        cmd.end_event();
        cmd.close()
    }

    #[profiling::function]
    fn record_lighting(&mut self) -> anyhow::Result<()> {
        let cmd = &mut self.lighting_list;
        cmd.reset()?;

        cmd.begin_event("lighting");
        cmd.use_program(&self.lighting_program)?;
        cmd.attach_resource(BindKey::new(ShaderType::Compute, ViewType::Texture, 0, 0), Some(&self.gbuffer), &LazyViewDesc::default())?;
        cmd.attach_resource(BindKey::new(ShaderType::Compute, ViewType::Texture, 1, 0), Some(&self.depth), &LazyViewDesc::default())?;
        cmd.attach_resource(BindKey::new(ShaderType::Compute, ViewType::RWTexture, 0, 0), Some(&self.lit), &LazyViewDesc::default())?;
        cmd.attach_deferred(BindKey::new(ShaderType::Compute, ViewType::RWTexture, 1, 0), self.scratch.clone());
        cmd.dispatch(WIDTH.div_ceil(8), HEIGHT.div_ceil(8), 1)?;
        cmd.end_event();
        cmd.close()
    }

    #[profiling::function]
    fn record_present(&mut self, frame: u32) -> anyhow::Result<()> {
        let back_buffer = &self.back_buffers[frame as usize % self.back_buffers.len()];
        let cmd = &mut self.present_list;
        cmd.reset()?;

        cmd.begin_event("present");
        cmd.use_program(&self.present_program)?;
        cmd.set_viewport(0.0, 0.0, WIDTH as f32, HEIGHT as f32);
        cmd.begin_render_pass(
            &RenderPassBeginDesc::new()
                .with_color(RenderPassBeginColorDesc::new(back_buffer).with_load_op(RenderPassLoadOp::DontCare)),
        )?;
        cmd.attach_resource(BindKey::new(ShaderType::Pixel, ViewType::Texture, 0, 0), Some(&self.lit), &LazyViewDesc::default())?;
        cmd.draw(3, 1, 0, 0)?;
        cmd.end_render_pass();
        cmd.lazy_resource_barrier(LazyResourceBarrierDesc::whole(back_buffer, ResourceState::Present));
        cmd.end_event();
        cmd.close()
    }

    #[profiling::function]
    fn render(&mut self, frame: u32, dump_commands: bool) -> anyhow::Result<()> {
        self.record_geometry(frame)?;
        self.record_lighting()?;
        self.record_present(frame)?;

        self.device.clear_submissions();
        self.render_device
            .execute_command_lists(&[&self.geometry_list, &self.lighting_list, &self.present_list])
            .with_context(|| format!("failed to submit frame {frame}"))?;
        self.render_device.global_resource_states_mut().release_unused();

        let submissions = self.device.submissions();
        let commands: usize = submissions.iter().map(Vec::len).sum();
        info!(
            "frame {frame}: {} native lists ({} patch lists), {commands} commands",
            submissions.len(),
            submissions.len() - 3,
        );
        if dump_commands {
            for (index, submission) in submissions.iter().enumerate() {
                for command in submission {
                    debug!("  [{index}] {command:?}");
                }
            }
        }
        Ok(())
    }

    fn report(&self) {
        let cache = self.render_device.object_cache().stats();
        info!(
            "object cache: {} graphics / {} compute pipelines, {} render passes, {} framebuffers, {} binding sets, {} views",
            cache.graphics_pipeline_count,
            cache.compute_pipeline_count,
            cache.render_pass_count,
            cache.framebuffer_count,
            cache.binding_set_count,
            cache.view_count,
        );
        info!("device objects: {:?}", self.device.creation_stats());
        info!(
            "tracking {} resources, transient pool holds {}",
            self.render_device.global_resource_states().tracked_resource_count(),
            self.scratch.available_count(),
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = EngineArgs::parse_args();
    log::initialize(args.log_level.into())?;

    let mut app = SandboxApp::new().context("failed to create sandbox")?;
    for frame in 0..args.frames {
        app.render(frame, args.dump_commands)?;
        profiling::finish_frame!();
    }
    app.report();
    Ok(())
}
