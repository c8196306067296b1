use console::style;
use std::fmt::Write;

use crate::board::BoardView;

fn format_uptime(seconds: u64) -> String {
    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let minutes = rest / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}

fn format_bytes(bytes: u64) -> String {
    format!("{:.1} GiB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

/// Renders one view as a terminal frame.
pub fn render(view: &BoardView) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {}",
        style("Served by").bold(),
        style(&view.hostname).bold().cyan()
    );

    if let Some(error) = &view.error {
        let _ = writeln!(out, "{}", style(format!("! {}", error)).red());
    }

    match &view.snapshot {
        Some(s) => {
            let _ = writeln!(out, "  container  {} ({})", s.container_id, s.container_name);
            let _ = writeln!(out, "  service    {} slot {}", s.service_name, s.task_slot);
            let _ = writeln!(out, "  node       {} [{}]", s.node_name, s.node_id);
            let _ = writeln!(out, "  platform   {}/{} {}", s.platform, s.arch, s.environment);
            let _ = writeln!(out, "  uptime     {}", format_uptime(s.uptime_seconds));
            let _ = writeln!(
                out,
                "  load       {:.2} {:.2} {:.2}",
                s.load_average.one, s.load_average.five, s.load_average.fifteen
            );
            let _ = writeln!(
                out,
                "  memory     {} free of {}",
                format_bytes(s.free_memory),
                format_bytes(s.total_memory)
            );
            let _ = writeln!(out, "  requests   {}", s.request_count);
        }
        None => {
            let _ = writeln!(out, "  platform   {}", view.platform);
        }
    }

    if let Some(stats) = &view.stats {
        let _ = writeln!(out, "{} {}", style("Visits").bold(), stats.total_visits);
        for stat in &stats.container_stats {
            let _ = writeln!(out, "  {:<16} {:>6} requests", stat.hostname, stat.request_count);
        }
    }

    if let Some(messages) = &view.messages {
        let _ = writeln!(out, "{}", style("Messages").bold());
        if messages.is_empty() {
            let _ = writeln!(out, "  {}", style("no messages yet").dim());
        }
        for msg in messages {
            let _ = writeln!(
                out,
                "  [{}] {}: {} {}",
                msg.timestamp.format("%H:%M:%S"),
                style(&msg.author).yellow(),
                msg.text,
                style(format!("via {}", msg.hostname)).dim()
            );
        }
    }

    let _ = write!(
        out,
        "{}",
        style(format!("updated {}", view.fetched_at.format("%H:%M:%S"))).dim()
    );
    out
}
