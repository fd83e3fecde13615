//! HTML rendering for the two dashboard views.
//!
//! Pages are self-contained: inline CSS, inline SVG charts, and a plain
//! GET form for the sidebar selectors.

use std::fmt::Write as _;

use crate::breakdown::{BreakdownBar, CountryBucket, VideoBreakdown};
use crate::dashboard::Dashboard;
use crate::features::{Metric, NormalizedTable};
use crate::logging::{self, obj, v_num, v_str, Domain, ProfileScope};
use crate::styling::{cell_style, format_pct};
use crate::summary::{tile_rows, MetricTile};
use crate::timeline::{CurvePoint, ViewBands};

pub const AGGREGATE_LABEL: &str = "Aggregate Metrics";
pub const INDIVIDUAL_LABEL: &str = "Individual Video Analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Aggregate,
    Individual,
}

impl View {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("individual") => View::Individual,
            _ => View::Aggregate,
        }
    }

    pub fn param(&self) -> &'static str {
        match self {
            View::Aggregate => "aggregate",
            View::Individual => "individual",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Aggregate => AGGREGATE_LABEL,
            View::Individual => INDIVIDUAL_LABEL,
        }
    }
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn bucket_color(bucket: CountryBucket) -> &'static str {
    match bucket {
        CountryBucket::Usa => "#636efa",
        CountryBucket::India => "#ef553b",
        CountryBucket::Other => "#00cc96",
    }
}

// =============================================================================
// Page
// =============================================================================

pub fn render_page(dash: &Dashboard, view: View, selected_title: Option<&str>) -> String {
    let _scope = ProfileScope::new("render_page");
    let body = match view {
        View::Aggregate => render_aggregate(dash),
        View::Individual => render_individual(dash, selected_title),
    };
    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Channel Dashboard</title>
  <style>{css}</style>
</head>
<body>
<aside>{sidebar}</aside>
<main>
<h1>{heading}</h1>
{body}
</main>
</body>
</html>"#,
        css = CSS,
        sidebar = render_sidebar(dash, view, selected_title),
        heading = view.label(),
        body = body,
    );
    logging::debug(
        Domain::Render,
        "page_rendered",
        obj(&[
            ("view", v_str(view.param())),
            ("selected", v_str(selected_title.unwrap_or(""))),
            ("bytes", v_num(page.len() as f64)),
        ]),
    );
    page
}

fn render_sidebar(dash: &Dashboard, view: View, selected_title: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(r#"<form method="get" action="/">"#);
    out.push_str(r#"<label for="view">Aggregate or Individual Video</label>"#);
    out.push_str(r#"<select id="view" name="view" onchange="this.form.submit()">"#);
    for v in [View::Aggregate, View::Individual] {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            v.param(),
            if v == view { " selected" } else { "" },
            v.label()
        );
    }
    out.push_str("</select>");

    if view == View::Individual {
        out.push_str(r#"<label for="video">Pick a Video:</label>"#);
        out.push_str(r#"<select id="video" name="video" onchange="this.form.submit()">"#);
        for title in dash.titles() {
            let escaped = html_escape(title);
            let _ = write!(
                out,
                r#"<option value="{0}"{1}>{0}</option>"#,
                escaped,
                if Some(title) == selected_title { " selected" } else { "" }
            );
        }
        out.push_str("</select>");
    }
    out.push_str(r#"<noscript><button type="submit">Show</button></noscript></form>"#);
    out
}

// =============================================================================
// Aggregate view
// =============================================================================

fn render_aggregate(dash: &Dashboard) -> String {
    let tiles = dash.tiles();
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<p class="note">Median of the last {} months against the last {} months.</p>"#,
        dash.config.short_window_months, dash.config.long_window_months
    );
    out.push_str(&render_tiles(&tiles));
    out.push_str("<h2>Videos relative to the trailing median</h2>");
    out.push_str(&render_normalized_table(&dash.normalized));
    out
}

pub fn render_tiles(tiles: &[MetricTile]) -> String {
    let mut out = String::new();
    for row in tile_rows(tiles) {
        out.push_str(r#"<div class="tiles">"#);
        for tile in row {
            let delta = match tile.delta_text() {
                Some(text) => {
                    let class = if tile.delta.unwrap_or(0.0) < 0.0 { "down" } else { "up" };
                    format!(r#"<div class="delta {}">{}</div>"#, class, text)
                }
                None => String::new(),
            };
            let _ = write!(
                out,
                r#"<div class="tile"><div class="label">{}</div><div class="value">{}</div>{}</div>"#,
                html_escape(tile.label),
                tile.value_text(),
                delta
            );
        }
        out.push_str("</div>");
    }
    out
}

pub fn render_normalized_table(table: &NormalizedTable) -> String {
    let mut out = String::new();
    out.push_str(r#"<div class="table-wrap"><table><thead><tr><th>Video title</th><th>Published</th>"#);
    for m in Metric::ALL {
        let _ = write!(out, "<th>{}</th>", html_escape(m.label()));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td>",
            html_escape(&row.title),
            row.published.format("%Y-%m-%d")
        );
        for value in &row.values {
            match cell_style(*value) {
                Some(style) => {
                    let _ = write!(out, r#"<td style="{}">{}</td>"#, style, format_pct(*value));
                }
                None => {
                    let _ = write!(out, "<td>{}</td>", format_pct(*value));
                }
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
    out
}

// =============================================================================
// Individual view
// =============================================================================

fn render_individual(dash: &Dashboard, selected_title: Option<&str>) -> String {
    let video = match selected_title {
        Some(title) => dash.find_by_title(title),
        None => dash.dataset.videos.first(),
    };
    let Some(video) = video else {
        return match selected_title {
            Some(title) => format!(
                r#"<p class="note">No video titled "{}".</p>"#,
                html_escape(title)
            ),
            None => r#"<p class="note">No videos loaded.</p>"#.to_string(),
        };
    };

    let mut out = String::new();
    let _ = write!(
        out,
        "<h2>{}</h2><p class=\"note\">Published {}</p>",
        html_escape(&video.title),
        video.published.format("%b %d, %Y")
    );
    if let Some(breakdown) = dash.breakdown(&video.video) {
        out.push_str(&render_breakdown(&breakdown));
    }
    out.push_str("<h3>View comparison, first days</h3>");
    out.push_str(&render_curve_chart(&dash.curve(&video.video), &dash.bands));
    out
}

fn render_breakdown(breakdown: &VideoBreakdown) -> String {
    let mut out = String::new();
    out.push_str("<h3>Views by subscription status</h3>");
    if breakdown.bars.is_empty() {
        out.push_str(r#"<p class="note">No country data for this video.</p>"#);
        return out;
    }
    let _ = write!(
        out,
        r#"<p class="note">Total views: {:.0} across {} audience rows</p>"#,
        breakdown.total_views(),
        breakdown.audience.len()
    );
    out.push_str(&render_bar_chart(&breakdown.bars));
    out.push_str(r#"<div class="legend">"#);
    for bucket in CountryBucket::ALL {
        let _ = write!(
            out,
            r#"<span><i style="background:{}"></i>{}</span>"#,
            bucket_color(bucket),
            bucket.label()
        );
    }
    out.push_str("</div>");
    out
}

const BAR_H: f64 = 18.0;
const GROUP_GAP: f64 = 14.0;
const LABEL_W: f64 = 70.0;
const CHART_W: f64 = 640.0;

/// Horizontal grouped bars: one group per subscription status.
pub fn render_bar_chart(bars: &[BreakdownBar]) -> String {
    let max = bars.iter().map(|b| b.views).fold(0.0_f64, f64::max);
    let plot_w = CHART_W - LABEL_W - 60.0;
    let mut body = String::new();
    let mut y = 10.0;
    for is_subscribed in [false, true] {
        let group: Vec<&BreakdownBar> = bars.iter().filter(|b| b.is_subscribed == is_subscribed).collect();
        if group.is_empty() {
            continue;
        }
        let group_h = group.len() as f64 * BAR_H;
        let _ = write!(
            body,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" class="axis">{}</text>"#,
            LABEL_W - 8.0,
            y + group_h / 2.0 + 4.0,
            if is_subscribed { "True" } else { "False" }
        );
        for bar in group {
            let w = if max > 0.0 { bar.views / max * plot_w } else { 0.0 };
            let _ = write!(
                body,
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {:.0}</title></rect><text x="{:.1}" y="{:.1}" class="axis">{:.0}</text>"#,
                LABEL_W,
                y,
                w,
                BAR_H - 2.0,
                bucket_color(bar.bucket),
                bar.bucket.label(),
                bar.views,
                LABEL_W + w + 4.0,
                y + BAR_H - 5.0,
                bar.views
            );
            y += BAR_H;
        }
        y += GROUP_GAP;
    }
    format!(
        r#"<svg class="chart" viewBox="0 0 {:.0} {:.0}" width="{:.0}" height="{:.0}">{}</svg>"#,
        CHART_W, y, CHART_W, y, body
    )
}

const LINE_H: f64 = 300.0;
const PAD: f64 = 40.0;

fn polyline(points: &[(f64, f64)], class: &str) -> String {
    if points.is_empty() {
        return String::new();
    }
    let coords: Vec<String> = points.iter().map(|(x, y)| format!("{:.1},{:.1}", x, y)).collect();
    format!(r#"<polyline class="{}" points="{}"/>"#, class, coords.join(" "))
}

/// Cumulative views of the video against the 20th/50th/80th percentile band.
pub fn render_curve_chart(curve: &[CurvePoint], bands: &ViewBands) -> String {
    if curve.is_empty() && bands.points.is_empty() {
        return r#"<p class="note">No daily data for this video.</p>"#.to_string();
    }
    let max_day = curve
        .iter()
        .map(|p| p.day)
        .chain(bands.points.iter().map(|p| p.day))
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let max_y = curve
        .iter()
        .map(|p| p.cumulative_views)
        .chain(bands.points.iter().map(|p| p.p80.max(p.median)))
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let plot_w = CHART_W - 2.0 * PAD;
    let plot_h = LINE_H - 2.0 * PAD;
    let sx = |day: i64| PAD + day as f64 / max_day * plot_w;
    let sy = |v: f64| LINE_H - PAD - v / max_y * plot_h;

    let band = |pick: fn(&crate::timeline::BandPoint) -> f64| -> Vec<(f64, f64)> {
        bands.points.iter().map(|p| (sx(p.day), sy(pick(p)))).collect()
    };

    let mut body = String::new();
    let _ = write!(
        body,
        r#"<line class="axis-line" x1="{0:.1}" y1="{1:.1}" x2="{2:.1}" y2="{1:.1}"/><line class="axis-line" x1="{0:.1}" y1="{3:.1}" x2="{0:.1}" y2="{1:.1}"/>"#,
        PAD,
        LINE_H - PAD,
        CHART_W - PAD,
        PAD
    );
    let _ = write!(
        body,
        r#"<text x="{:.1}" y="{:.1}" class="axis">day {}</text><text x="4" y="{:.1}" class="axis">{:.0}</text>"#,
        CHART_W - PAD - 40.0,
        LINE_H - PAD + 16.0,
        max_day as i64,
        PAD - 6.0,
        max_y
    );
    body.push_str(&polyline(&band(|p| p.p80), "band p80"));
    body.push_str(&polyline(&band(|p| p.median), "band p50"));
    body.push_str(&polyline(&band(|p| p.p20), "band p20"));
    let video: Vec<(f64, f64)> = curve.iter().map(|p| (sx(p.day), sy(p.cumulative_views))).collect();
    body.push_str(&polyline(&video, "current"));

    format!(
        r#"<svg class="chart" viewBox="0 0 {w:.0} {h:.0}" width="{w:.0}" height="{h:.0}">{body}</svg>
<div class="legend"><span><i class="k-p80"></i>80th percentile</span><span><i class="k-p50"></i>50th percentile</span><span><i class="k-p20"></i>20th percentile</span><span><i class="k-cur"></i>Current video</span></div>"#,
        w = CHART_W,
        h = LINE_H,
        body = body
    )
}

const CSS: &str = r#"
body { margin: 0; display: flex; font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; color: #262730; }
aside { width: 260px; min-height: 100vh; background: #f0f2f6; padding: 1.5rem 1rem; box-sizing: border-box; }
aside label { display: block; font-size: 0.85rem; margin: 0.8rem 0 0.3rem; }
aside select { width: 100%; padding: 0.3rem; }
main { flex: 1; padding: 1.5rem 2rem; overflow-x: auto; }
h1 { font-size: 1.6rem; margin-top: 0; }
.note { color: #6b6f7b; font-size: 0.85rem; }
.tiles { display: grid; grid-template-columns: repeat(5, 1fr); gap: 0.8rem; margin-bottom: 0.8rem; }
.tile { border: 1px solid #e6e9ef; border-radius: 6px; padding: 0.6rem 0.8rem; }
.tile .label { font-size: 0.8rem; color: #6b6f7b; }
.tile .value { font-size: 1.5rem; font-weight: 600; }
.delta { font-size: 0.85rem; }
.delta.up { color: #09ab3b; }
.delta.down { color: #ff2b2b; }
.table-wrap { overflow-x: auto; border: 1px solid #e6e9ef; border-radius: 6px; }
table { border-collapse: collapse; font-size: 0.78rem; white-space: nowrap; }
th, td { padding: 0.3rem 0.6rem; border-bottom: 1px solid #f0f2f6; text-align: right; }
th:first-child, td:first-child { text-align: left; }
.chart { max-width: 100%; }
.axis { font-size: 11px; fill: #6b6f7b; }
.axis-line { stroke: #c7cad1; }
polyline { fill: none; stroke-width: 2; }
.band { stroke-dasharray: 5 4; }
.p80 { stroke: royalblue; }
.p50 { stroke: black; }
.p20 { stroke: purple; }
.current { stroke: firebrick; stroke-width: 3; }
.legend { font-size: 0.8rem; display: flex; gap: 1rem; margin: 0.4rem 0 1rem; }
.legend i { display: inline-block; width: 10px; height: 10px; margin-right: 4px; }
.k-p80 { background: royalblue; } .k-p50 { background: black; } .k-p20 { background: purple; } .k-cur { background: firebrick; }
"#;
