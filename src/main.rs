use anyhow::Result;
use std::sync::Arc;

use vidmetrics::config::Config;
use vidmetrics::dashboard::Dashboard;
use vidmetrics::logging::{self, obj, v_num, v_str, Domain};
use vidmetrics::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::info(
        Domain::System,
        "startup",
        obj(&[
            ("data_dir", v_str(&cfg.data_dir.display().to_string())),
            ("short_window_months", v_num(cfg.short_window_months as f64)),
            ("long_window_months", v_num(cfg.long_window_months as f64)),
            ("curve_days", v_num(cfg.curve_days as f64)),
        ]),
    );

    let dash = match Dashboard::load(cfg.clone()) {
        Ok(d) => Arc::new(d),
        Err(err) => {
            logging::error(
                Domain::Load,
                "load_failed",
                obj(&[("error", v_str(&format!("{:#}", err)))]),
            );
            return Err(err);
        }
    };

    let addr = cfg.listen_addr();
    tokio::select! {
        res = server::serve(dash, &addr) => res,
        _ = tokio::signal::ctrl_c() => {
            logging::info(Domain::System, "shutdown", obj(&[("reason", v_str("ctrl_c"))]));
            Ok(())
        }
    }
}
