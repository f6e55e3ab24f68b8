use serde_json::json;

use super::{print_json, CmdResult, Console};

pub async fn run(period: &str) -> CmdResult {
    let console = Console::open();
    let client = console.guarded("/").await?.authorized_client()?;
    let (metrics, timeseries) = tokio::try_join!(
        client.dashboard_metrics(),
        client.dashboard_timeseries(period)
    )?;
    print_json(&json!({
        "period": period,
        "metrics": metrics,
        "timeseries": timeseries,
    }))
}
