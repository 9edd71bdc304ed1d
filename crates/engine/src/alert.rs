use chrono::NaiveDate;

use common::{Alert, StoredIpoState};

use crate::policy::{DecisionRule, PolicyConfig};
use crate::rule;
use crate::window::CloseDay;

/// Build the Telegram text for a row that just moved to Proceed.
pub fn compose(row: &StoredIpoState, day: CloseDay, policy: &PolicyConfig) -> Alert {
    let mut lines = vec![
        format!("🚀 IPO PROCEED ALERT ({})", day.label()),
        String::new(),
        format!("Name: {}", row.name),
    ];

    match policy.decision {
        DecisionRule::LatestReading => {
            lines.push(format!("GMP: {}", fmt_gmp(row.latest_gmp())));
        }
        DecisionRule::HistoryAverage => {
            let history: Vec<String> = row.gmp_history.iter().map(|v| v.to_string()).collect();
            lines.push(format!("GMP History: {}", history.join(", ")));
            lines.push(format!(
                "Average GMP: {}",
                rule::score(DecisionRule::HistoryAverage, row)
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "-".into())
            ));
        }
    }

    lines.push(format!("Subscription: {}", or_dash(&row.subscription)));
    lines.push(format!("Start Date: {}", fmt_date(row.start_date)));
    lines.push(format!("End Date: {}", row.end_date));
    lines.push(String::new());
    lines.push(format!("Status: {}", row.status.to_string().to_uppercase()));

    Alert {
        name: row.name.clone(),
        message: lines.join("\n"),
    }
}

fn fmt_gmp(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "-"
    } else {
        s
    }
}
