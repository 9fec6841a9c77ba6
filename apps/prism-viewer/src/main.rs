use anyhow::{Context, Result};
use clap::Parser;
use glam::{Quat, Vec3};
use parking_lot::Mutex;
use prism_assets::{Mesh, Shader, Texture2D, load_obj};
use prism_common::{Color, ObjectId};
use prism_ecs::{Camera, GameObject};
use prism_events::{EventManager, KeyEvent, TickEvent};
use prism_input::{Action, InputManager, Key};
use prism_render::Skybox;
use prism_render_wgpu::shaders;
use prism_scene::Scene;
use prism_window::WindowConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Skybox face files, in `+X, -X, +Y, -Y, +Z, -Z` order.
const SKYBOX_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];
/// World units per tick while a movement key is held.
const MOVE_SPEED: f32 = 0.1;
/// Model spin per tick, in radians.
const SPIN_PER_TICK: f32 = 0.01;

#[derive(Parser)]
#[command(name = "prism-viewer", about = "View a model with the prism renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Window configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// OBJ model to show; a cube is shown when omitted
    #[arg(long)]
    model: Option<PathBuf>,

    /// Texture applied to model meshes that carry UVs
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Directory with px/nx/py/ny/pz/nz .png skybox faces
    #[arg(long)]
    skybox: Option<PathBuf>,

    /// WGSL vertex and fragment stages replacing the default program
    #[arg(long, num_args = 2, value_names = ["VERTEX", "FRAGMENT"])]
    shader: Option<Vec<PathBuf>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => WindowConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WindowConfig::new("prism viewer", 1280, 720),
    };
    let shader = Arc::new(load_shader(&cli)?);
    let skybox = cli
        .skybox
        .as_deref()
        .map(load_skybox)
        .transpose()?
        .map(Arc::new);
    let (scene, camera, models) = build_scene(&cli, &config)?;
    let scene = Arc::new(Mutex::new(scene));
    let events = Arc::new(EventManager::new());

    let window = prism_render_wgpu::open_window(config, Arc::clone(&scene), Arc::clone(&events))?;
    {
        let mut renderer = window.renderer().lock();
        renderer.set_shader(Some(shader));
        renderer.set_camera(Some(camera));
        renderer.set_skybox(skybox);
        renderer.set_clear_color(Color::rgb(20, 24, 32));
    }

    let handle = window.handle().clone();
    events.on::<KeyEvent>(move |event| {
        if event.key == Key::Escape && event.action == Action::Down {
            handle.close();
        }
    });
    let input = Arc::clone(window.input());
    let tick_scene = Arc::clone(&scene);
    events.on::<TickEvent>(move |_| {
        let mut scene = tick_scene.lock();
        steer(&mut scene, camera, &input);
        for id in &models {
            if let Some(model) = scene.get_mut(*id) {
                model
                    .transform_mut()
                    .rotate(Quat::from_rotation_y(SPIN_PER_TICK));
            }
        }
    });

    tracing::info!("viewer running: WASD/QE to move, Escape to quit");
    window.join()?;
    tracing::info!("viewer closed");
    Ok(())
}

fn build_scene(cli: &Cli, config: &WindowConfig) -> Result<(Scene, ObjectId, Vec<ObjectId>)> {
    let mut scene = Scene::new("viewer");

    let aspect = config.width as f32 / config.height as f32;
    let mut camera = GameObject::new("camera").with(Camera::perspective(60.0, aspect, 0.1, 100.0));
    camera.transform_mut().position = Vec3::new(0.0, 0.0, 4.0);
    let camera = scene.add(camera)?;

    let texture = cli
        .texture
        .as_deref()
        .map(|path| Texture2D::load(path).with_context(|| format!("loading {}", path.display())))
        .transpose()?
        .map(Arc::new);
    let meshes = match &cli.model {
        Some(path) => load_obj(path).with_context(|| format!("loading {}", path.display()))?,
        None => vec![cube()?],
    };

    let mut models = Vec::with_capacity(meshes.len());
    for (i, mut mesh) in meshes.into_iter().enumerate() {
        if let Some(texture) = texture.as_ref().filter(|_| mesh.uvs().is_some()) {
            mesh.set_texture(Some(Arc::clone(texture)));
        }
        models.push(scene.add(GameObject::new(format!("model-{i}")).with(mesh))?);
    }
    tracing::info!(objects = scene.len(), "scene built");
    Ok((scene, camera, models))
}

fn load_shader(cli: &Cli) -> Result<Shader> {
    match cli.shader.as_deref() {
        Some([vertex, fragment]) => Ok(Shader::load(vertex, fragment)?),
        _ => Ok(shaders::default_shader()),
    }
}

fn load_skybox(dir: &Path) -> Result<Skybox> {
    let mut faces = Vec::with_capacity(SKYBOX_FACES.len());
    for name in SKYBOX_FACES {
        let path = dir.join(format!("{name}.png"));
        let face = Texture2D::load(&path)
            .with_context(|| format!("loading skybox face {}", path.display()))?;
        faces.push(Arc::new(face));
    }
    let faces: [Arc<Texture2D>; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("a skybox needs exactly six faces"))?;
    Ok(Skybox::new(faces))
}

/// Move the camera along its own axes while movement keys are held.
fn steer(scene: &mut Scene, camera: ObjectId, input: &InputManager) {
    let Some(object) = scene.get_mut(camera) else {
        return;
    };
    let transform = object.transform_mut();
    let bindings = [
        (Key::W, transform.forward()),
        (Key::S, -transform.forward()),
        (Key::D, transform.right()),
        (Key::A, -transform.right()),
        (Key::E, transform.up()),
        (Key::Q, -transform.up()),
    ];
    let offset: Vec3 = bindings
        .into_iter()
        .filter(|(key, _)| input.is_key_down(*key))
        .map(|(_, direction)| direction)
        .sum();
    if offset != Vec3::ZERO {
        transform.translate(offset.normalize() * MOVE_SPEED);
    }
}

fn cube() -> Result<Mesh> {
    #[rustfmt::skip]
    let vertices = vec![
        -0.5, -0.5,  0.5,   0.5, -0.5,  0.5,   0.5,  0.5,  0.5,  -0.5,  0.5,  0.5,
        -0.5, -0.5, -0.5,   0.5, -0.5, -0.5,   0.5,  0.5, -0.5,  -0.5,  0.5, -0.5,
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2, 2, 3, 0, // front
        1, 5, 6, 6, 2, 1, // right
        5, 4, 7, 7, 6, 5, // back
        4, 0, 3, 3, 7, 4, // left
        3, 2, 6, 6, 7, 3, // top
        4, 5, 1, 1, 0, 4, // bottom
    ];
    Ok(Mesh::new(vertices, 3)?
        .with_indices(indices)?
        .with_color(Color::rgb(230, 120, 40)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_an_indexed_solid() {
        let cube = cube().unwrap();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.indices().map(<[u32]>::len), Some(36));
    }

    #[test]
    fn steering_follows_held_keys() {
        let mut scene = Scene::new("steer");
        let camera = scene.add(GameObject::new("camera")).unwrap();
        let input = InputManager::new();
        input.key(Key::W, Action::Down, Default::default());

        steer(&mut scene, camera, &input);
        let position = scene.get(camera).unwrap().transform().position;
        assert!((position - Vec3::new(0.0, 0.0, -MOVE_SPEED)).length() < 1e-6);

        input.key(Key::W, Action::Up, Default::default());
        steer(&mut scene, camera, &input);
        assert_eq!(scene.get(camera).unwrap().transform().position, position);
    }

    #[test]
    fn missing_skybox_face_names_the_file() {
        let dir = std::env::temp_dir().join("prism-viewer-missing-skybox");
        let err = load_skybox(&dir).unwrap_err();
        assert!(format!("{err:#}").contains("px.png"));
    }

    #[test]
    fn cli_parses_shader_pair() {
        let cli = Cli::try_parse_from(["prism-viewer", "--shader", "a.wgsl", "b.wgsl"]).unwrap();
        assert_eq!(cli.shader.map(|s| s.len()), Some(2));
    }
}
