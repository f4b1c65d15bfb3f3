use std::process::ExitCode;

use hrc::{Result, SceneDescription, Settings};

fn run() -> Result<()> {
    let scene_file_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "scenes/default.ron".to_string());
    let settings_file_name = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "settings/default.ron".to_string());
    let output_file_name = std::env::args()
        .nth(3)
        .unwrap_or_else(|| "scene.tiff".to_string());

    let settings = Settings::load_or_default(&settings_file_name)?;
    let scene = SceneDescription::load(&scene_file_name)?.build(&settings)?;
    scene.save(&output_file_name)
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
