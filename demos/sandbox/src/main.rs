use std::time::Instant;

use vela::{
    graphics::{
        self, GpuConfig, GraphicsContext, Program, Shader, ShaderStage, Texture, TextureFormat,
    },
    sys::{Event, EventLoop, WindowConfig},
    Color, VelaResult,
};

const SHADER: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    let y = f32(i32(index & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.5, 0.2, 1.0);
}
"#;

fn run() -> VelaResult {
    let el = EventLoop::new()?;
    let window = el.create_window(&WindowConfig {
        title: "sandbox".to_string(),
        ..Default::default()
    })?;

    let ctx = GraphicsContext::gpu(&GpuConfig::default())?;
    graphics::set_current(&ctx, Some(&window))?;

    let vs = Shader::from_source(ShaderStage::Vertex, SHADER)?;
    let fs = Shader::from_source(ShaderStage::Fragment, SHADER)?;
    let _program = Program::from_shaders(&[&vs, &fs])?;

    let checker = Texture::with_size(64, 64, TextureFormat::Rgba8Unorm)?;
    checker.fill(Color::CORNFLOWER_BLUE)?;
    checker.generate_mipmaps()?;
    log::info!("checker texture has {} mip levels", checker.mip_levels()?);

    let start = Instant::now();
    el.run(|event, control| {
        match event {
            Event::ExitRequested => control.exit(),
            Event::Resized { .. } => graphics::set_window(&window)?,
            Event::Update => {
                let t = start.elapsed().as_secs_f32();
                let pulse = 0.5 + 0.5 * t.sin();
                graphics::clear(Color::rgb(0.1, 0.1, 0.2 + 0.3 * pulse))?;
                window.request_redraw();
            }
        }
        Ok(())
    })
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("sandbox exited with error: {err}");
    }
}
