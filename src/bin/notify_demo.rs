//! Demo that sends a sample run summary through the configured notifiers
//! (log only when Slack is not configured).

use chrono::Local;
use nsm_recommender::pipeline::SummaryRow;
use nsm_recommender::report::ReportWriter;
use nsm_recommender::time_block::TimeBlock;
use nsm_recommender::{telemetry, Action, NotificationEvent, NotifierMux, Recommendation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let rec = Recommendation {
        reference_date: Local::now().date_naive(),
        metric_columns: Vec::new(),
        details: Vec::new(),
        summary: vec![SummaryRow {
            zone: "Z1".to_string(),
            time_block: TimeBlock::from_hm(8, 0).ok_or_else(|| anyhow::anyhow!("bad demo block"))?,
            old_nsm: Some(10.0),
            recommended_nsm: Some(12.0),
            delta_nsm: Some(2.0),
            avg_dynamic_surge_level_y: Some(1.1),
            action: Action::Increase,
        }],
        filtered_out: 0,
    };
    let workbook = ReportWriter::new(std::env::temp_dir().join("nsm_notify_demo"))
        .write(&rec)
        .await?;

    let mux = NotifierMux::from_env();
    let ev = NotificationEvent::new(rec.reference_date, workbook, rec.summary_counts());
    let delivered = mux.notify(&ev).await;

    println!("notify-demo done (delivered to {delivered} notifier(s))");
    Ok(())
}
