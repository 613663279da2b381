use log::error;
use std::time::Duration;

use crate::features::filesystem::DiskReading;
use crate::features::report::models::ReportView;
use crate::features::system_metrics::{PartialFailure, Snapshot, Temperature};
use crate::shared::config::{OutputFormat, PrivacyLevel, StatusConfig};
use crate::shared::traits::MetricKind;

const BYTE_LABELS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const SEPARATOR: &str = "────────────────────";
const MAX_DISPLAY_NAME: usize = 30;
const MARKUP_CHARS: [char; 13] = ['`', '*', '_', '{', '}', '[', ']', '(', ')', '#', '+', '!', '|'];

/// Renders snapshots as text under a privacy policy.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    show_temp: bool,
}

struct Section {
    icon: &'static str,
    title: &'static str,
    summary: Option<String>,
    items: Vec<String>,
}

impl Section {
    fn new(icon: &'static str, title: &'static str) -> Self {
        Self { icon, title, summary: None, items: Vec::new() }
    }

    fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    fn item(mut self, item: impl Into<String>) -> Self {
        self.items.push(item.into());
        self
    }
}

pub(crate) enum DiskSlot<'a> {
    Reading(&'a DiskReading),
    Failed(&'a PartialFailure),
}

impl Formatter {
    pub fn new(format: OutputFormat, show_temp: bool) -> Self {
        Self { format, show_temp }
    }

    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new(config.output_format, config.show_temp)
    }

    pub fn render(&self, snapshot: &Snapshot, privacy: PrivacyLevel) -> String {
        match self.format {
            OutputFormat::Json => self.render_json(snapshot, privacy),
            OutputFormat::Markdown | OutputFormat::Plain => {
                let markdown = self.format == OutputFormat::Markdown;
                let sections = self.sections(snapshot, privacy);
                self.render_text(snapshot, privacy, &sections, markdown)
            }
        }
    }

    fn render_json(&self, snapshot: &Snapshot, privacy: PrivacyLevel) -> String {
        let view = ReportView::new(snapshot, privacy, self.show_temp);
        serde_json::to_string_pretty(&view).unwrap_or_else(|e| {
            error!("Failed to serialize report: {}", e);
            String::from("{}")
        })
    }

    fn render_text(&self, snapshot: &Snapshot, privacy: PrivacyLevel, sections: &[Section], markdown: bool) -> String {
        let full = privacy == PrivacyLevel::Full;
        let mut lines = Vec::new();

        match (markdown, full) {
            (true, true) => lines.push(format!("# 🖥️ Server Status · {}", sanitize_display_name(&snapshot.hostname))),
            (true, false) => lines.push("# 🖥️ Server Status".to_string()),
            (false, true) => lines.push(format!("Server status ({}):", snapshot.hostname)),
            (false, false) => lines.push("Server status:".to_string()),
        }
        if snapshot.containerized {
            lines.push(if markdown {
                "⚠️ **Running inside a container; figures reflect container limits**".to_string()
            } else {
                "[warning] Running inside a container".to_string()
            });
        }
        lines.push(SEPARATOR.to_string());

        for section in sections {
            if markdown {
                let mut header = format!("{} **{}**", section.icon, section.title);
                if let Some(summary) = &section.summary {
                    header.push_str(": ");
                    header.push_str(summary);
                }
                lines.push(header);
                lines.extend(section.items.iter().map(|item| format!("   - {}", item)));
            } else {
                let parts: Vec<&str> = section
                    .summary
                    .iter()
                    .chain(section.items.iter())
                    .map(String::as_str)
                    .collect();
                lines.push(format!("{}: {}", section.title, parts.join(" | ")));
            }
        }

        let mut notes = Vec::new();
        if snapshot.timed_out {
            notes.push("Partial report: collection deadline reached".to_string());
        } else if !snapshot.is_complete() {
            notes.push("Partial report: some metrics could not be read".to_string());
        }
        if !snapshot.warnings.is_empty() {
            notes.push(if full {
                format!("Configuration warnings: {}", snapshot.warnings.join("; "))
            } else {
                format!("Configuration warnings: {} disk entries skipped", snapshot.warnings.len())
            });
        }
        if !notes.is_empty() {
            lines.push(SEPARATOR.to_string());
            for note in notes {
                lines.push(if markdown { format!("⚠️ {}", note) } else { format!("[warning] {}", note) });
            }
        }

        lines.push(SEPARATOR.to_string());
        let updated = format_timestamp(snapshot, privacy);
        lines.push(if markdown { format!("🕒 **Updated**: {}", updated) } else { format!("Updated: {}", updated) });

        lines.join("\n")
    }

    fn sections(&self, snapshot: &Snapshot, privacy: PrivacyLevel) -> Vec<Section> {
        let full = privacy == PrivacyLevel::Full;
        let mut sections = Vec::new();

        let uptime_title = if snapshot.containerized { "Container uptime" } else { "Uptime" };
        sections.push(match snapshot.uptime {
            Some(uptime) => Section::new("⏱️", uptime_title).summary(format_uptime(uptime)),
            None => unavailable(Section::new("⏱️", uptime_title), snapshot, MetricKind::Uptime, full),
        });

        sections.push(match &snapshot.cpu {
            Some(cpu) => {
                let mut section = Section::new("💻", "CPU").item(format!("Usage: {:.1}%", cpu.percent));
                if self.show_temp {
                    section = match (cpu.temperature, full) {
                        (Temperature::Disabled, _) => section,
                        (Temperature::Celsius(t), true) => section.item(format!("Temperature: {:.1}°C", t)),
                        (Temperature::Unavailable, true) => section.item("Temperature: unavailable"),
                        (t, false) => section.item(format!(
                            "Temperature sensor: {}",
                            if t.is_available() { "available" } else { "unavailable" }
                        )),
                    };
                }
                if full {
                    section = section.item(format!("Cores: {}", cpu.cores));
                    if let Some(mhz) = cpu.frequency_mhz {
                        section = section.item(format!("Frequency: {}MHz", mhz));
                    }
                    if let Some((one, five, fifteen)) = cpu.load_average {
                        section = section.item(format!("Load: {:.2}, {:.2}, {:.2}", one, five, fifteen));
                    }
                }
                section
            }
            None => unavailable(Section::new("💻", "CPU"), snapshot, MetricKind::Cpu, full),
        });

        sections.push(match &snapshot.memory {
            Some(memory) => {
                let mut section = Section::new("💾", "Memory").item(format!("Usage: {:.1}%", memory.percent));
                if full {
                    section = section.item(format!(
                        "Used: {} / {}",
                        format_bytes(memory.used),
                        format_bytes(memory.total)
                    ));
                    if memory.swap_total > 0 {
                        section = section.item(format!(
                            "Swap: {:.1}% ({} / {})",
                            memory.swap_percent(),
                            format_bytes(memory.swap_used),
                            format_bytes(memory.swap_total)
                        ));
                    }
                }
                section
            }
            None => unavailable(Section::new("💾", "Memory"), snapshot, MetricKind::Memory, full),
        });

        let mut disks = Section::new("💿", "Disks");
        for (i, slot) in disk_slots(snapshot).into_iter().enumerate() {
            let label = format!("Disk #{}", i + 1);
            disks = disks.item(match (slot, full) {
                (DiskSlot::Reading(disk), true) => format!(
                    "{}: {:.1}% ({} / {})",
                    sanitize_display_name(&disk.display_name),
                    disk.percent,
                    format_bytes(disk.used),
                    format_bytes(disk.total)
                ),
                (DiskSlot::Reading(disk), false) => format!("{}: {:.1}%", label, disk.percent),
                (DiskSlot::Failed(failure), true) => format!(
                    "{} ({}): unavailable ({})",
                    label,
                    sanitize_display_name(failure.disk_path.as_deref().unwrap_or("?")),
                    failure.reason
                ),
                (DiskSlot::Failed(_), false) => format!("{}: unavailable", label),
            });
        }
        if disks.items.is_empty() {
            disks = unavailable(disks, snapshot, MetricKind::Disk, full);
        }
        sections.push(disks);

        sections.push(match (&snapshot.network, full) {
            (Some(network), true) => Section::new("🌐", "Network")
                .item(format!("Sent: {}", format_bytes(network.bytes_sent)))
                .item(format!("Received: {}", format_bytes(network.bytes_recv))),
            (Some(_), false) => Section::new("🌐", "Network").summary("available"),
            (None, _) => unavailable(Section::new("🌐", "Network"), snapshot, MetricKind::Network, full),
        });

        // Process counts are detail only shown at full privacy.
        match (&snapshot.processes, full) {
            (Some(processes), true) => sections.push(
                Section::new("📊", "Processes")
                    .item(format!("Total: {}", processes.total))
                    .item(format!("Running: {}", processes.running))
                    .item(format!("Sleeping: {}", processes.sleeping)),
            ),
            (Some(_), false) => {}
            (None, _) => {
                if snapshot.is_failed(MetricKind::Processes) {
                    sections.push(unavailable(Section::new("📊", "Processes"), snapshot, MetricKind::Processes, full));
                }
            }
        }

        sections
    }
}

fn unavailable(section: Section, snapshot: &Snapshot, kind: MetricKind, full: bool) -> Section {
    let reason = snapshot
        .partial_failures
        .iter()
        .find(|f| f.kind == kind && f.disk_index.is_none())
        .map(|f| f.reason.as_str());
    match (reason, full) {
        (Some(reason), true) => section.summary(format!("unavailable ({})", reason)),
        _ => section.summary("unavailable"),
    }
}

/// Disk readings and disk failures merged back into resolver order.
pub(crate) fn disk_slots(snapshot: &Snapshot) -> Vec<DiskSlot<'_>> {
    let failed = snapshot
        .partial_failures
        .iter()
        .filter(|f| f.kind == MetricKind::Disk && f.disk_index.is_some())
        .count();
    let mut readings = snapshot.disks.iter();
    (0..snapshot.disks.len() + failed)
        .filter_map(|index| match snapshot.disk_failure(index) {
            Some(failure) => Some(DiskSlot::Failed(failure)),
            None => readings.next().map(DiskSlot::Reading),
        })
        .collect()
}

pub(crate) fn format_timestamp(snapshot: &Snapshot, privacy: PrivacyLevel) -> String {
    match privacy {
        PrivacyLevel::Full => snapshot.collected_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        PrivacyLevel::Minimal => snapshot.collected_at.format("%Y-%m-%d %H:00 UTC").to_string(),
    }
}

/// Binary units, two decimals with trailing zeros dropped: `27.98GB`, `16GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_LABELS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let number = format!("{:.2}", value);
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", number, BYTE_LABELS[unit])
}

/// `15d 8h 22m`; seconds only appear for uptimes under a minute.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let minutes = rest / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() {
        parts.push(format!("{}s", total));
    }
    parts.join(" ")
}

pub fn sanitize_display_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !MARKUP_CHARS.contains(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().count() > MAX_DISPLAY_NAME {
        let truncated: String = cleaned.chars().take(MAX_DISPLAY_NAME - 3).collect();
        format!("{}...", truncated)
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_in_binary_units() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1536), "1.5KB");
        assert_eq!(format_bytes(16 * 1024 * 1024 * 1024), "16GB");
        assert_eq!(format_bytes((27.98 * 1024f64.powi(3)) as u64), "27.98GB");
        assert_eq!(format_bytes((1.25 * 1024f64.powi(4)) as u64), "1.25TB");
    }

    #[test]
    fn formats_uptime_compactly() {
        assert_eq!(format_uptime(Duration::from_secs(15 * 86_400 + 8 * 3_600 + 22 * 60 + 9)), "15d 8h 22m");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h");
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
    }

    #[test]
    fn sanitizes_markup_and_long_names() {
        assert_eq!(sanitize_display_name("**Data** [disk]"), "Data disk");
        assert_eq!(sanitize_display_name("line\nbreak"), "line break");
        let long = "a".repeat(40);
        let sanitized = sanitize_display_name(&long);
        assert_eq!(sanitized.chars().count(), MAX_DISPLAY_NAME);
        assert!(sanitized.ends_with("..."));
    }
}
