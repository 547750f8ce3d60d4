//! Compute guidance for a single reading material box.

use anyhow::Context;

use camguide_detection_model::BoundingBox;
use camguide_processing_core::guidance::{compute_guidance, threshold_px};
use camguide_processing_core::overlay::movement_indicator;

/// Parse `X,Y,W,H` into a box.
fn parse_box(text: &str) -> anyhow::Result<BoundingBox> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts[..] else {
        anyhow::bail!("expected X,Y,W,H, got '{text}'");
    };
    Ok(BoundingBox::new(
        x.parse().with_context(|| format!("invalid X '{x}'"))?,
        y.parse().with_context(|| format!("invalid Y '{y}'"))?,
        w.parse().with_context(|| format!("invalid width '{w}'"))?,
        h.parse().with_context(|| format!("invalid height '{h}'"))?,
    ))
}

pub fn run(bbox: &str, width: u32, height: u32, threshold: f64, json: bool) -> anyhow::Result<()> {
    let bbox = parse_box(bbox)?;
    let guidance = compute_guidance(&bbox, width, height, threshold)?;
    let threshold_px = threshold_px(width, height, threshold);

    if json {
        let value = serde_json::json!({
            "robot_guidance": guidance,
            "center_threshold_px": threshold_px,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let (cx, cy) = bbox.center();
    let indicator = movement_indicator(guidance.arrow_dx, guidance.arrow_dy, width, height);
    println!("Frame: {width}x{height}, threshold {threshold}% ({threshold_px:.0}px)");
    println!("Box center: ({cx}, {cy})");
    println!("Offset: dx={} dy={}", guidance.arrow_dx, guidance.arrow_dy);
    println!("Magnitude: {:.1}px", guidance.movement_magnitude);
    println!("Direction: {}", indicator.direction);
    println!("Command: {}", guidance.robot_command);
    Ok(())
}
