use std::path::Path;
use std::process::ExitCode;

use hrc::{Composer, CpuDevice, Pipeline, Result, Scene, SceneDescription, Settings};

fn load_scene(path: &str, settings: &Settings) -> Result<Scene> {
    if !std::fs::exists(path).unwrap_or(false) {
        log::warn!("Scene {:?} not found, starting from an empty scene", path);
        return SceneDescription::default().build(settings);
    }
    let is_tiff = Path::new(path)
        .extension()
        .is_some_and(|ext| ext == "tiff" || ext == "tif");
    if is_tiff {
        Scene::load(path)
    } else {
        SceneDescription::load(path)?.build(settings)
    }
}

fn run() -> Result<()> {
    let scene_file_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "scenes/default.ron".to_string());
    let settings_file_name = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "settings/default.ron".to_string());
    let output_file_name = std::env::args()
        .nth(3)
        .unwrap_or_else(|| "fluence.png".to_string());

    let settings = Settings::load_or_default(&settings_file_name)?;

    let scene = load_scene(&scene_file_name, &settings)?;

    let device = CpuDevice::new(settings.threads)?;
    let mut composer = Composer::new(Pipeline::new(device), &settings);
    let fluence = composer.render(&scene)?;
    log::info!("Peak fluence: {}", fluence.max());

    fluence.save_png(&output_file_name, settings.exposure)
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
