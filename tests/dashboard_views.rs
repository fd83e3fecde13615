//! End-to-end: CSV fixtures on disk through to rendered pages and JSON.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use vidmetrics::config::Config;
use vidmetrics::dashboard::Dashboard;
use vidmetrics::server::route;

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn load_fixture() -> (TempDir, Dashboard) {
    let dir = TempDir::new().unwrap();
    let cfg = Config::with_data_dir(dir.path());
    write_csv(
        &cfg.video_path(),
        "Video,Video title,Video publish time,Comments added,Shares,Dislikes,Likes,Subscribers lost,\
Subscribers gained,RPM (USD),CPM (USD),Average percentage viewed (%),Average view duration,Views,\
Watch time (hours),Subscribers,Your estimated revenue (USD),Impressions,Impressions click-through rate (%)",
        &[
            "Total,,,0,0,0,0,0,0,0,0,0,0:00:00,0,0,0,0,0,0",
            "a1,Oldest <one>,\"Jan 1, 2023\",1,1,0,8,0,10,4.0,8.0,40.0,0:04:00,100,5.0,10,1.0,1000,5.0",
            "b2,Middle,\"Jun 1, 2023\",2,2,0,16,0,10,4.0,8.0,40.0,0:04:00,200,5.0,10,1.0,1000,5.0",
            "c3,Newest,\"Dec 1, 2023\",3,3,0,24,0,10,4.0,8.0,40.0,0:04:00,300,5.0,10,1.0,1000,5.0",
        ],
    );
    write_csv(
        &cfg.country_path(),
        "Video Title,External Video ID,Country Code,Is Subscribed,Views",
        &[
            "Oldest <one>,a1,US,True,60",
            "Oldest <one>,a1,IN,False,30",
            "Oldest <one>,a1,FR,False,10",
        ],
    );
    write_csv(
        &cfg.time_series_path(),
        "Date,External Video ID,Video Title,Views",
        &[
            "1 Jan 2023,a1,Oldest <one>,10",
            "2 Jan 2023,a1,Oldest <one>,5",
            "1 Jun 2023,b2,Middle,20",
            "1 Dec 2023,c3,Newest,30",
        ],
    );
    let dash = Dashboard::load(cfg).unwrap();
    (dir, dash)
}

#[test]
fn summary_tiles_compare_windows() {
    let (_dir, dash) = load_fixture();
    let body: serde_json::Value = serde_json::from_str(&route(&dash, "GET", "/api/summary").body).unwrap();
    let views = &body["tiles"][0];
    assert_eq!(views["label"], "Views");
    // six months back from Dec 1 keeps Jun 1 and Dec 1
    assert_eq!(views["recent_median"], 250.0);
    assert_eq!(views["baseline_median"], 200.0);
    assert_eq!(views["delta_text"], "+25.00%");
    assert_eq!(views["value"], "250.0");
}

#[test]
fn aggregate_page_styles_signed_cells() {
    let (_dir, dash) = load_fixture();
    let page = route(&dash, "GET", "/?view=aggregate").body;
    assert!(page.contains(r#"<td style="color:red;">-50.0%</td>"#));
    assert!(page.contains(r#"<td style="color:green;">50.0%</td>"#));
    assert!(page.contains("Oldest &lt;one&gt;"));
    assert!(!page.contains("Oldest <one>"));
}

#[test]
fn individual_page_shows_breakdown_and_curve() {
    let (_dir, dash) = load_fixture();
    let page = route(&dash, "GET", "/?view=individual&video=Oldest+%3Cone%3E").body;
    assert!(page.contains("Individual Video Analysis"));
    assert_eq!(page.matches("<svg").count(), 2);
    assert!(page.contains("Current video"));
    assert!(page.contains("Total views: 100 across 3 audience rows"));

    let body: serde_json::Value = serde_json::from_str(&route(&dash, "GET", "/api/video?id=a1").body).unwrap();
    let curve = body["curve"].as_array().unwrap();
    assert_eq!(curve.len(), 2);
    assert_eq!(curve[1]["cumulative_views"], 15.0);
    let bands = body["bands"]["points"].as_array().unwrap();
    // day 0 median over 10, 20, 30; day 1 adds the lone 5
    assert_eq!(bands[0]["median"], 20.0);
    assert_eq!(bands[1]["median"], 25.0);
}

#[test]
fn individual_view_defaults_to_newest_video() {
    let (_dir, dash) = load_fixture();
    let page = route(&dash, "GET", "/?view=individual").body;
    assert!(page.contains("<h2>Newest</h2>"));
    assert!(page.contains("No country data for this video."));
}

#[test]
fn video_list_is_newest_first() {
    let (_dir, dash) = load_fixture();
    let body: serde_json::Value = serde_json::from_str(&route(&dash, "GET", "/api/videos").body).unwrap();
    let ids: Vec<&str> = body["videos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c3", "b2", "a1"]);
}
