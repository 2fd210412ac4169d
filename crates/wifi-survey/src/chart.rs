//! Line chart rendering to standalone SVG.

use std::fmt::Write as _;
use std::path::Path;

use crate::series::PlotData;
use crate::types::SurveyResult;

const WIDTH: f64 = 1400.0;
const HEIGHT: f64 = 700.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 240.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 200.0;
const Y_TICKS: usize = 5;
const MARKER: f64 = 4.0;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// A titled line chart over a shared categorical x axis.
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: PlotData,
}

impl Chart {
    pub fn new(title: &str, x_label: &str, y_label: &str, data: PlotData) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            data,
        }
    }

    /// Write the rendered SVG to `path`.
    pub fn write_svg(&self, path: &Path) -> SurveyResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_svg())?;
        Ok(())
    }

    /// Render the chart as an SVG document.
    pub fn to_svg(&self) -> String {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let points = self.data.x_ticks.len().max(
            self.data
                .series
                .iter()
                .map(|s| s.values.len())
                .max()
                .unwrap_or(0),
        );
        let y_max = self.y_max();

        let x_at = |i: usize| -> f64 {
            if points <= 1 {
                MARGIN_LEFT + plot_w / 2.0
            } else {
                MARGIN_LEFT + plot_w * i as f64 / (points - 1) as f64
            }
        };
        let y_at = |v: f64| -> f64 { MARGIN_TOP + plot_h - plot_h * (v / y_max) };

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            MARGIN_TOP / 2.0 + 6.0,
            escape(&self.title)
        );

        // Axes and horizontal grid.
        let _ = writeln!(
            svg,
            r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
        );
        for t in 0..=Y_TICKS {
            let value = y_max * t as f64 / Y_TICKS as f64;
            let y = y_at(value);
            let _ = writeln!(
                svg,
                r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="#dddddd"/>"##,
                MARGIN_LEFT + plot_w
            );
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{:.1}" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 6.0,
                y + 4.0,
                format_tick(value, y_max)
            );
        }

        for (i, tick) in self.data.x_ticks.iter().enumerate() {
            let x = x_at(i);
            let y = MARGIN_TOP + plot_h + 8.0;
            let _ = write!(
                svg,
                r#"<text transform="translate({x:.1},{y:.1}) rotate(-90)" text-anchor="end">"#
            );
            for (line_no, part) in tick.split('\n').enumerate() {
                let _ = write!(
                    svg,
                    r#"<tspan x="0" dy="{}">{}</tspan>"#,
                    if line_no == 0 { 0.0 } else { 14.0 },
                    escape(part)
                );
            }
            let _ = writeln!(svg, "</text>");
        }

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 10.0,
            escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text transform="translate(20,{}) rotate(-90)" text-anchor="middle">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            escape(&self.y_label)
        );

        for (idx, series) in self.data.series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            let coords: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| (x_at(i), y_at(v.max(0.0))))
                .collect();

            let path = coords
                .iter()
                .map(|(x, y)| format!("{x:.1},{y:.1}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                svg,
                r#"<polyline class="series" points="{path}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
            );
            for (x, y) in &coords {
                let _ = writeln!(
                    svg,
                    r#"<path d="M{:.1},{:.1}L{:.1},{:.1}M{:.1},{:.1}L{:.1},{:.1}" stroke="{color}"/>"#,
                    x - MARKER,
                    y - MARKER,
                    x + MARKER,
                    y + MARKER,
                    x - MARKER,
                    y + MARKER,
                    x + MARKER,
                    y - MARKER
                );
            }

            let ly = MARGIN_TOP + 10.0 + 18.0 * idx as f64;
            let lx = WIDTH - MARGIN_RIGHT + 20.0;
            let _ = writeln!(
                svg,
                r#"<line x1="{lx}" y1="{ly}" x2="{}" y2="{ly}" stroke="{color}" stroke-width="2"/><text x="{}" y="{}">{}</text>"#,
                lx + 20.0,
                lx + 26.0,
                ly + 4.0,
                escape(&series.label)
            );
        }

        svg.push_str("</svg>\n");
        svg
    }

    fn y_max(&self) -> f64 {
        let max = self
            .data
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if max > 0.0 {
            max * 1.05
        } else {
            1.0
        }
    }
}

fn format_tick(value: f64, y_max: f64) -> String {
    if y_max >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
