//! Bonnie 3D viewer
//!
//! Spins a lit cube and a textured sphere, rendered in software into a
//! low resolution framebuffer that is scaled up to the window.
//!
//! Keys: G toggles Gouraud shading, T toggles texturing, B toggles
//! bilinear filtering, W draws the cube's wireframe.

use std::path::Path;

use bonnie_3d::raster::{Color, Framebuffer, TextureQuality, Texture};
use bonnie_3d::{load_config, RenderConfig, Renderer, Shader, VERSION};
use glam::Vec3;
use macroquad::prelude as mq;

const WIDTH: usize = 320;
const HEIGHT: usize = 240;
const CONFIG_PATH: &str = "render.ron";
const BACKGROUND: Color = Color::new(30, 30, 35);

fn window_conf() -> mq::Conf {
    mq::Conf {
        window_title: format!("Bonnie 3D v{}", VERSION),
        window_width: WIDTH as i32 * 3,
        window_height: HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn initial_config() -> RenderConfig {
    if !Path::new(CONFIG_PATH).exists() {
        return RenderConfig { viewport: (WIDTH as i32, HEIGHT as i32), ..Default::default() };
    }
    match load_config(CONFIG_PATH) {
        Ok(config) => {
            log::info!("loaded {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            log::warn!("failed to load {}: {}, using defaults", CONFIG_PATH, e);
            RenderConfig { viewport: (WIDTH as i32, HEIGHT as i32), ..Default::default() }
        }
    }
}

/// Viewer toggles
struct ViewerState {
    gouraud: bool,
    textured: bool,
    bilinear: bool,
    wireframe: bool,
}

impl ViewerState {
    fn shaders(&self) -> Shader {
        let mut flags = if self.gouraud { Shader::GOURAUD } else { Shader::FLAT };
        if self.textured {
            flags |= Shader::TEXTURE;
        }
        flags
    }

    fn handle_keys(&mut self) {
        if mq::is_key_pressed(mq::KeyCode::G) {
            self.gouraud = !self.gouraud;
        }
        if mq::is_key_pressed(mq::KeyCode::T) {
            self.textured = !self.textured;
        }
        if mq::is_key_pressed(mq::KeyCode::B) {
            self.bilinear = !self.bilinear;
        }
        if mq::is_key_pressed(mq::KeyCode::W) {
            self.wireframe = !self.wireframe;
        }
    }
}

fn render_scene(
    fb: &mut Framebuffer,
    zbuffer: &mut [f32],
    config: &RenderConfig,
    viewer: &ViewerState,
    texture: &Texture,
    angle: f32,
) -> Result<(), bonnie_3d::DrawError> {
    let mut r = Renderer::<Framebuffer>::new(WIDTH as i32, HEIGHT as i32);
    r.apply_config(config);
    r.set_image(Some(fb));
    r.set_zbuffer(Some(zbuffer));
    r.clear_zbuffer();
    r.set_shaders(viewer.shaders());
    r.set_texture_quality(if viewer.bilinear { TextureQuality::Bilinear } else { TextureQuality::Nearest });

    r.set_model_pos_scale_rot(Vec3::new(-1.6, 0.0, -6.0), Vec3::ONE, angle, Vec3::new(1.0, 1.0, 0.0));
    r.draw_cube()?;
    if viewer.wireframe {
        r.draw_wireframe_cube(1.0, Color::WHITE, 0.8)?;
    }

    r.set_model_pos_scale_rot(Vec3::new(1.6, 0.0, -6.0), Vec3::splat(1.2), angle * 0.5, Vec3::Y);
    r.draw_adaptive_sphere(1.0, Some(texture))?;
    if viewer.wireframe {
        r.draw_wireframe_adaptive_sphere(0.5, 1.0, Color::WHITE, 0.5)?;
    }
    Ok(())
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    log::info!("Bonnie 3D viewer v{}", VERSION);

    let config = initial_config();
    let texture = Texture::checkerboard(64, 64, Color::new(220, 180, 90), Color::new(60, 40, 30));
    let mut fb = Framebuffer::new(WIDTH, HEIGHT);
    let mut zbuffer = vec![0.0f32; WIDTH * HEIGHT];
    let mut viewer = ViewerState { gouraud: true, textured: true, bilinear: false, wireframe: false };

    loop {
        viewer.handle_keys();
        let angle = mq::get_time() as f32 * 40.0;

        fb.clear(BACKGROUND);
        if let Err(e) = render_scene(&mut fb, &mut zbuffer, &config, &viewer, &texture, angle) {
            log::warn!("frame skipped: {}", e);
        }

        // Scale the framebuffer to the window, keeping its aspect ratio
        let scale = (mq::screen_width() / WIDTH as f32).min(mq::screen_height() / HEIGHT as f32);
        let (draw_w, draw_h) = (WIDTH as f32 * scale, HEIGHT as f32 * scale);
        let draw_x = (mq::screen_width() - draw_w) * 0.5;
        let draw_y = (mq::screen_height() - draw_h) * 0.5;

        mq::clear_background(mq::BLACK);
        let frame = mq::Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        frame.set_filter(mq::FilterMode::Nearest);
        mq::draw_texture_ex(
            &frame,
            draw_x,
            draw_y,
            mq::WHITE,
            mq::DrawTextureParams {
                dest_size: Some(mq::vec2(draw_w, draw_h)),
                ..Default::default()
            },
        );

        mq::next_frame().await
    }
}
