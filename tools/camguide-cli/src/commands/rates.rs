//! List the capture interval labels.

use camguide_processing_core::FrameRate;

pub fn run() -> anyhow::Result<()> {
    println!("Capture intervals:");
    for rate in FrameRate::ALL {
        let default = if rate == FrameRate::default() {
            " (default)"
        } else {
            ""
        };
        println!("  \"{}\"  {} ms{default}", rate.label(), rate.interval_ms());
    }
    Ok(())
}
