//! Validate configuration and report detector status.

use camguide_capture_engine::DetectorSet;
use camguide_common::{config_file_path, AppConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("camguide Configuration Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config file: {}", path.display());
    } else {
        println!("[INFO] No config file at {}, using defaults", path.display());
    }

    let camera = &config.camera;
    println!("     Device: {}", camera.device);
    println!(
        "     Resolution: {}x{}, quality {}",
        camera.image_width, camera.image_height, camera.image_quality
    );
    println!("     Capture interval: {}s", camera.capture_interval);
    println!("     Image directory: {}", camera.image_dir.display());
    println!(
        "     Center threshold: {}%, confidence >= {}",
        camera.center_threshold_percent, camera.detection_confidence
    );
    println!();

    let model_line = |enabled: bool, label: &str, path: &std::path::Path| {
        if !enabled {
            println!("[--] {label}: disabled");
        } else if path.exists() {
            println!("[OK] {label}: {}", path.display());
        } else {
            println!("[WARN] {label}: {} not found", path.display());
        }
    };
    model_line(
        camera.face_detection_enabled,
        "Face cascade",
        &camera.face_cascade_path(),
    );
    let material_path = if camera.use_ncnn && camera.ncnn_model_dir().is_dir() {
        camera.ncnn_model_dir()
    } else {
        camera.reading_material_model_path()
    };
    model_line(
        camera.reading_material_detection_enabled,
        "Reading material model",
        &material_path,
    );

    println!();
    println!("Detection Models:");
    for line in DetectorSet::from_config(camera).status().summary_lines() {
        println!("{line}");
    }

    println!();
    match config.validate() {
        Ok(()) => println!("Configuration is valid. camguide is ready."),
        Err(e) => {
            println!("Configuration is invalid: {e}");
            anyhow::bail!("configuration check failed");
        }
    }
    Ok(())
}
