//! SVG charts of a contingency table
//!
//! Both charts are rendered with the SVG backend of `plotters`, which does not
//! depend on any system fonts.

use std::fmt::Display;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::contingency::ContingencyTable;
use crate::{ModlocError, ModlocResult};

const HEATMAP_SIZE: (u32, u32) = (1000, 800);
const BAR_SIZE: (u32, u32) = (1200, 700);
const BAR_PLOT_WIDTH: i32 = 960;

/// Anchor points of the viridis colour map, from low to high
const VIRIDIS: [(f64, f64, f64); 5] = [
    (68.0, 1.0, 84.0),
    (59.0, 82.0, 139.0),
    (33.0, 145.0, 140.0),
    (94.0, 201.0, 98.0),
    (253.0, 231.0, 37.0),
];

fn plot_error<E: Display>(err: E) -> ModlocError {
    ModlocError::Plot(err.to_string())
}

/// Renders a heatmap of `log2(count + 1)` of every cell
///
/// Modalities are shown on the x-axis, locations on the y-axis. An empty
/// table results in a chart with a short notice instead of cells.
///
/// # Errors
///
/// [`ModlocError::Plot`] if the chart cannot be rendered or written
#[allow(clippy::cast_precision_loss)]
pub fn heatmap<P: AsRef<Path>>(
    file: P,
    table: &ContingencyTable,
    modality_key: &str,
) -> ModlocResult<()> {
    let root = SVGBackend::new(file.as_ref(), HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    if table.is_empty() {
        no_data(&root, HEATMAP_SIZE)?;
        return Ok(());
    }

    let (n_rows, n_cols) = table.dim();
    let max = table
        .iter_rows()
        .flatten()
        .map(|count| log_count(*count))
        .fold(0.0f64, f64::max);

    let rows = table.rows();
    let cols = table.cols();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{modality_key} distribution on subcellular locations (Log Scale)"),
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(220)
        .build_cartesian_2d(0..n_cols, 0..n_rows)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(modality_key)
        .y_desc("subcellular locations")
        .x_labels(n_cols + 1)
        .y_labels(n_rows + 1)
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_label_formatter(&|x| cols.get(*x).cloned().unwrap_or_default())
        .y_label_formatter(&|y| rows.get(*y).cloned().unwrap_or_default())
        .draw()
        .map_err(plot_error)?;

    for (row_idx, counts) in table.iter_rows().enumerate() {
        chart
            .draw_series(counts.iter().enumerate().map(|(col_idx, count)| {
                let value = if max > 0.0 { log_count(*count) / max } else { 0.0 };
                Rectangle::new(
                    [(col_idx, row_idx), (col_idx + 1, row_idx + 1)],
                    viridis(value).filled(),
                )
            }))
            .map_err(plot_error)?;
    }

    root.present().map_err(plot_error)?;
    info!("Wrote heatmap to {}", file.as_ref().display());
    Ok(())
}

/// Renders a stacked bar chart of the modalities of every location
///
/// Every bar is normalized to 100 %, each modality has its own colour.
/// Locations without any observation are shown as empty bars.
///
/// # Errors
///
/// [`ModlocError::Plot`] if the chart cannot be rendered or written
pub fn stacked_bar<P: AsRef<Path>>(
    file: P,
    table: &ContingencyTable,
    modality_key: &str,
) -> ModlocResult<()> {
    let root = SVGBackend::new(file.as_ref(), BAR_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    if table.is_empty() {
        no_data(&root, BAR_SIZE)?;
        return Ok(());
    }

    let (plot_area, legend_area) = root.split_horizontally(BAR_PLOT_WIDTH);
    let rows = table.rows();
    let percentages = table.row_percentages();

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(
            format!("Distribution of {modality_key} Across Subcellular Locations"),
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(180)
        .y_label_area_size(60)
        .build_cartesian_2d(0..rows.len(), 0f64..100f64)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Subcellular Location")
        .y_desc("Percentages")
        .x_labels(rows.len() + 1)
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_label_formatter(&|x| rows.get(*x).cloned().unwrap_or_default())
        .draw()
        .map_err(plot_error)?;

    let mut bottoms = vec![0.0f64; rows.len()];
    let mut legend_y = 60i32;
    for (col_idx, modality) in table.cols().iter().enumerate() {
        let color = Palette99::pick(col_idx).to_rgba();
        chart
            .draw_series(percentages.iter().enumerate().map(|(row_idx, shares)| {
                let bottom = bottoms[row_idx];
                let top = bottom + shares[col_idx];
                bottoms[row_idx] = top;
                let mut bar = Rectangle::new([(row_idx, bottom), (row_idx + 1, top)], color.filled());
                bar.set_margin(0, 0, 4, 4);
                bar
            }))
            .map_err(plot_error)?;

        legend_area
            .draw(&Rectangle::new(
                [(10, legend_y), (24, legend_y + 14)],
                color.filled(),
            ))
            .map_err(plot_error)?;
        legend_area
            .draw(&Text::new(
                modality.clone(),
                (32, legend_y),
                ("sans-serif", 14).into_font().color(&BLACK),
            ))
            .map_err(plot_error)?;
        legend_y += 22;
    }

    root.present().map_err(plot_error)?;
    info!("Wrote stacked bar chart to {}", file.as_ref().display());
    Ok(())
}

fn no_data(root: &DrawingArea<SVGBackend, Shift>, size: (u32, u32)) -> ModlocResult<()> {
    let center = (
        i32::try_from(size.0 / 2).unwrap_or_default(),
        i32::try_from(size.1 / 2).unwrap_or_default(),
    );
    root.draw(&Text::new(
        "No data available",
        center,
        ("sans-serif", 20).into_font().color(&BLACK),
    ))
    .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn log_count(count: u64) -> f64 {
    (count as f64 + 1.0).log2()
}

/// Interpolates the viridis colour map at `value` within `[0, 1]`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn viridis(value: f64) -> RGBColor {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let scaled = value * (VIRIDIS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let t = scaled - idx as f64;
    let (r0, g0, b0) = VIRIDIS[idx];
    let (r1, g1, b1) = VIRIDIS[idx + 1];
    RGBColor(
        (r0 + (r1 - r0) * t).round() as u8,
        (g0 + (g1 - g0) * t).round() as u8,
        (b0 + (b1 - b0) * t).round() as u8,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn example() -> ContingencyTable {
        ContingencyTable::from_pairs([
            ("Nucleus", "Antibody", 10),
            ("Cytosol", "Antibody", 5),
            ("Nucleus", "Small molecule", 2),
            ("Cytosol", "Small molecule", 20),
        ])
    }

    #[test]
    fn color_scale() {
        assert_eq!(viridis(0.0), RGBColor(68, 1, 84));
        assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
        assert_eq!(viridis(0.5), RGBColor(33, 145, 140));
        assert_eq!(viridis(-3.0), viridis(0.0));
        assert_eq!(viridis(f64::NAN), viridis(0.0));
    }

    #[test]
    fn log_scale() {
        assert_eq!(log_count(0), 0.0);
        assert_eq!(log_count(1), 1.0);
        assert_eq!(log_count(7), 3.0);
    }

    #[test]
    fn render_charts() {
        let dir = tempfile::tempdir().unwrap();
        let heat = dir.path().join("heatmap.svg");
        let bars = dir.path().join("bars.svg");
        heatmap(&heat, &example(), "drugType").unwrap();
        stacked_bar(&bars, &example(), "drugType").unwrap();

        let svg = std::fs::read_to_string(&heat).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Nucleus"));
        let svg = std::fs::read_to_string(&bars).unwrap();
        assert!(svg.contains("Small molecule"));
    }

    #[test]
    fn render_empty() {
        let dir = tempfile::tempdir().unwrap();
        let heat = dir.path().join("heatmap.svg");
        heatmap(&heat, &ContingencyTable::from_pairs([]), "drugType").unwrap();
        let svg = std::fs::read_to_string(&heat).unwrap();
        assert!(svg.contains("No data available"));
    }
}
