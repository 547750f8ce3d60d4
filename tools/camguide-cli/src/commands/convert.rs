//! Convert a JSON detection export to CSV.

use std::path::PathBuf;

use camguide_detection_model::{write_csv, DetectionExport, ExportDataType};

pub fn run(
    input: PathBuf,
    data_type: ExportDataType,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let export = DetectionExport::read_file(&input)
        .map_err(|e| anyhow::anyhow!("Failed to load export: {e}"))?;
    let output = output.unwrap_or_else(|| input.with_extension("csv"));

    write_csv(&export.detection_data, data_type, &output)?;

    let rows = match data_type {
        ExportDataType::Faces => export.detection_data.faces.len(),
        _ => export.detection_data.reading_materials.len(),
    };
    println!("Export from {} ({})", export.timestamp, export.data_type);
    println!("Wrote {rows} {data_type} row(s) to {}", output.display());
    Ok(())
}
