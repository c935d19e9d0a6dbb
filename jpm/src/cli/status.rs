// jpm/src/cli/status.rs
use colored::*;
use jpm_common::pipeline::InstallEvent;
use tokio::sync::broadcast;

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit_idx = 0;

    while value >= 1000.0 && unit_idx < UNITS.len() - 1 {
        value /= 1000.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{bytes}B")
    } else {
        format!("{:.1}{}", value, UNITS[unit_idx])
    }
}

/// Renders one event as a status line, or `None` for events that only feed
/// the summary.
fn render_event(event: &InstallEvent) -> Option<String> {
    match event {
        InstallEvent::InstallStarted { root_count } => Some(format!(
            "{} {} {}",
            "==>".bold().blue(),
            "Installing dependencies:".bold(),
            root_count
        )),
        InstallEvent::FetchStarted { .. } => None,
        InstallEvent::CacheHit { target_id, .. } => Some(format!(
            "{} {} {}",
            " ↺".dimmed(),
            target_id.cyan(),
            "(cached)".dimmed()
        )),
        InstallEvent::DownloadFinished {
            target_id,
            size_bytes,
            ..
        } => Some(format!(
            "{} {} {}",
            " ↓".yellow(),
            target_id.cyan(),
            format_bytes(*size_bytes).dimmed()
        )),
        InstallEvent::PackageInstalled {
            target_id,
            path,
            nested,
        } => {
            let location = if *nested {
                format!("nested at {}", path.display())
            } else {
                path.display().to_string()
            };
            Some(format!(
                "{} {} {}",
                " ✓".green().bold(),
                target_id.cyan(),
                location.dimmed()
            ))
        }
        InstallEvent::PackageFailed { target_id, error } => Some(format!(
            "{} {}: {}",
            " ✗".red().bold(),
            target_id.cyan(),
            error.red()
        )),
        InstallEvent::CircularDependency { chain } => Some(format!(
            "{} {}",
            "Circular dependency skipped:".yellow(),
            chain.join(" -> ")
        )),
        InstallEvent::InstallFinished {
            duration_secs,
            installed_count,
            skipped_count,
            fail_count,
        } => Some(format!(
            "\n{}: {}  {}: {}  {}: {}  {}: {:.2}s",
            "Installed".green().bold(),
            installed_count,
            "Skipped".bold(),
            skipped_count,
            "Failed".red().bold(),
            fail_count,
            "Elapsed".bold(),
            duration_secs
        )),
    }
}

pub async fn handle_events(mut event_rx: broadcast::Receiver<InstallEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => {
                if let Some(line) = render_event(&event) {
                    println!("{line}");
                }
                if matches!(event, InstallEvent::InstallFinished { .. }) {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                break;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => {
                // Ignore lag for now
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn bytes_use_decimal_units() {
        assert_eq!(format_bytes(999), "999B");
        assert_eq!(format_bytes(1_500), "1.5kB");
        assert_eq!(format_bytes(2_000_000), "2.0MB");
    }

    #[test]
    fn fetch_started_is_silent() {
        let event = InstallEvent::FetchStarted {
            target_id: "a@1.0.0".into(),
            url: "https://registry.test/a.tgz".into(),
        };
        assert!(render_event(&event).is_none());
    }

    #[test]
    fn nested_installs_say_so() {
        colored::control::set_override(false);
        let line = render_event(&InstallEvent::PackageInstalled {
            target_id: "c@2.0.0".into(),
            path: PathBuf::from("node_modules/b/node_modules/c"),
            nested: true,
        })
        .unwrap();
        assert!(line.contains("c@2.0.0"));
        assert!(line.contains("nested at node_modules/b/node_modules/c"));
    }
}
