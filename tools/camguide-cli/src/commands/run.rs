//! Interactive control loop over a replay script.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use camguide_capture_engine::backend::ReplayScript;
use camguide_capture_engine::{CameraService, DetectorSet, SessionSummary};
use camguide_common::AppConfig;
use camguide_detection_model::ExportDataType;
use camguide_processing_core::overlay::movement_indicator;
use camguide_processing_core::RenderMode;

const HELP: &str = "\
Commands:
  start [ID]            Start a capture session
  end                   End the capture session
  frame                 Show the latest detections and guidance
  images                List images saved by the session
  status                Show service status
  history               Show the detection history
  mode [compact|detailed]
                        Switch the history display mode
  clear                 Clear the detection history
  rate <LABEL>          Change the capture interval
  export <PATH> [TYPE]  Export the latest frame (CSV by .csv extension)
  help                  Show this help
  quit                  Stop the camera and exit";

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Start(Option<String>),
    End,
    Frame,
    Images,
    Status,
    History,
    Mode(Option<RenderMode>),
    Clear,
    Rate(String),
    Export {
        path: PathBuf,
        data_type: Option<ExportDataType>,
    },
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let rest = (!rest.is_empty()).then_some(rest);

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "start" => Self::Start(rest.map(str::to_string)),
            "end" => Self::End,
            "frame" => Self::Frame,
            "images" => Self::Images,
            "status" => Self::Status,
            "history" => Self::History,
            "mode" => Self::Mode(
                rest.map(|m| m.parse::<RenderMode>().map_err(|e| e.to_string()))
                    .transpose()?,
            ),
            "clear" => Self::Clear,
            "rate" => Self::Rate(rest.ok_or("usage: rate <LABEL>")?.to_string()),
            "export" => {
                let mut parts = rest.ok_or("usage: export <PATH> [TYPE]")?.split_whitespace();
                let path = parts.next().map(PathBuf::from).ok_or("missing export path")?;
                let data_type = parts
                    .next()
                    .map(|t| t.parse::<ExportDataType>().map_err(|e| e.to_string()))
                    .transpose()?;
                Self::Export { path, data_type }
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}', type 'help'")),
        };
        Ok(Some(command))
    }
}

/// Export type used when none is given: the materials table for CSV files,
/// the whole frame otherwise.
fn default_export_type(path: &Path) -> ExportDataType {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        ExportDataType::Materials
    } else {
        ExportDataType::Session
    }
}

pub async fn run(
    config: AppConfig,
    script: PathBuf,
    rate: Option<String>,
    mode: RenderMode,
    session: Option<String>,
) -> anyhow::Result<()> {
    // Replay detectors need no model files; only value ranges apply.
    config.camera.validate_ranges()?;
    let replay = ReplayScript::load(&script)?;
    println!(
        "Loaded replay script: {} ({} frames, {}x{})",
        script.display(),
        replay.frames.len(),
        replay.header.width,
        replay.header.height
    );

    let (source, faces, materials) = replay.into_backends();
    let detectors = DetectorSet::from_config(&config.camera)
        .with_detector(Box::new(faces))
        .with_detector(Box::new(materials));
    let service = CameraService::new(Arc::new(config), Box::new(source), detectors)?;

    if let Some(label) = rate {
        service.set_frame_rate(&label)?;
    }
    match session {
        Some(id) => {
            let info = service.start_session(Some(id)).await?;
            println!("Session started: {}", info.session_dir.display());
        }
        None => service.start_camera().await?,
    }
    println!("Camera running at {}", service.frame_rate());
    println!("Type 'help' for commands, 'quit' to exit.");
    println!();

    let mut mode = mode;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(&service, command, &mut mode).await {
            println!("Error: {e}");
        }
    }

    println!();
    if let Some(summary) = service.stop_camera().await? {
        print_summary(&summary);
    }
    println!("Camera stopped.");
    Ok(())
}

async fn execute(
    service: &CameraService,
    command: Command,
    mode: &mut RenderMode,
) -> anyhow::Result<()> {
    match command {
        Command::Start(id) => {
            let info = service.start_session(id).await?;
            println!("Session {} started: {}", info.session_id, info.session_dir.display());
        }
        Command::End => {
            let summary = service.end_session().await?;
            print_summary(&summary);
        }
        Command::Frame => print_frame(service),
        Command::Images => {
            let images = service.captured_images().await;
            if images.is_empty() {
                println!("No images captured.");
            }
            for (i, image) in images.iter().enumerate() {
                println!(
                    "{:>3}. {} (faces: {}, materials: {})",
                    i + 1,
                    image.filename.display(),
                    image.detections.faces,
                    image.detections.reading_materials
                );
            }
        }
        Command::Status => {
            let status = service.status().await;
            println!("Camera: {}", if status.camera_running { "running" } else { "stopped" });
            match &status.session_id {
                Some(id) if status.session_active => println!("Session: {id} (active)"),
                Some(id) => println!("Session: {id} (ended)"),
                None => println!("Session: none"),
            }
            println!("Rate: {}", status.frame_rate);
            println!("Frames processed: {}", status.frames_processed);
            println!("Capture failures: {}", status.capture_failures);
            println!("History events: {}", status.history_len);
            println!("Detection Models:");
            for line in status.detection.summary_lines() {
                println!("{line}");
            }
        }
        Command::History => {
            let lines = service.render_history(*mode);
            if lines.is_empty() {
                println!("No detection history.");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Command::Mode(new_mode) => {
            *mode = new_mode.unwrap_or_else(|| mode.toggled());
            println!("History mode: {mode}");
        }
        Command::Clear => {
            service.clear_history();
            println!("History cleared.");
        }
        Command::Rate(label) => {
            if let Err(e) = service.set_frame_rate(&label) {
                println!("{e} (keeping {})", service.frame_rate());
            } else {
                println!("Rate: {}", service.frame_rate());
            }
        }
        Command::Export { path, data_type } => {
            let data_type = data_type.unwrap_or_else(|| default_export_type(&path));
            service.export_to(&path, data_type).await?;
            println!("Exported {data_type} to {}", path.display());
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_frame(service: &CameraService) {
    let snapshot = service.current_snapshot();
    if snapshot.frame_index == 0 {
        println!("No frame processed yet.");
        return;
    }

    let analysis = &snapshot.analysis;
    println!(
        "Frame {} ({}x{})",
        snapshot.frame_index, snapshot.frame_width, snapshot.frame_height
    );
    println!("  Faces: {}", analysis.face_count);
    for face in &analysis.faces {
        let b = face.bbox;
        println!("    #{} at ({}, {}) {}x{}", face.face_id, b.x, b.y, b.width, b.height);
    }
    println!("  Reading materials: {}", analysis.reading_materials.len());
    for material in &analysis.reading_materials {
        let b = material.bbox;
        println!(
            "    {:.2} at ({}, {}) {}x{}{}",
            material.confidence,
            b.x,
            b.y,
            b.width,
            b.height,
            if material.is_centered { " centered" } else { "" }
        );
    }

    match analysis.robot_guidance {
        Some(guidance) => {
            let indicator = movement_indicator(
                guidance.arrow_dx,
                guidance.arrow_dy,
                snapshot.frame_width,
                snapshot.frame_height,
            );
            println!(
                "  Guidance: {} ({}) dx={} dy={} {:.1}px",
                guidance.robot_command,
                indicator.direction,
                guidance.arrow_dx,
                guidance.arrow_dy,
                guidance.movement_magnitude
            );
        }
        None => println!("  Guidance: none"),
    }
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "Session {} ended: {} images, {} events logged",
        summary.session_id,
        summary.images.len(),
        summary.events_logged
    );
    println!("  Summary: {}", summary.summary_path.display());
}
