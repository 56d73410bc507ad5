//! Capability reporting.
//!
//! Each platform describes which capture facilities it can reach so the
//! CLI and the browser console can explain why a recording cannot start.

use serde::{Deserialize, Serialize};

/// A facility Clipcast may need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

impl Capability {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        available: bool,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            available,
            required,
            fix_instructions: None,
        }
    }

    /// Attach a fix hint, shown only when the capability is missing.
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        if !self.available {
            self.fix_instructions = Some(fix.into());
        }
        self
    }

    pub fn status_label(&self) -> &'static str {
        if self.available {
            "[OK]"
        } else if self.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        }
    }
}

/// Whether every required capability is present.
pub fn all_required_available(capabilities: &[Capability]) -> bool {
    capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available)
}

/// Render a capability report as lines of text.
pub fn capability_report(capabilities: &[Capability]) -> Vec<String> {
    let mut lines = Vec::with_capacity(capabilities.len() * 2);
    for cap in capabilities {
        lines.push(format!(
            "  {} {}: {}",
            cap.status_label(),
            cap.name,
            cap.description
        ));
        if let Some(ref fix) = cap.fix_instructions {
            lines.push(format!("    Fix: {fix}"));
        }
    }
    lines
}

/// Print a capability report to stdout.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Clipcast Capabilities:");
    println!("{}", "-".repeat(60));
    for line in capability_report(capabilities) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_hint_only_kept_when_missing() {
        let ok = Capability::new("MediaRecorder", "recording", true, true).with_fix("upgrade");
        assert!(ok.fix_instructions.is_none());

        let missing = Capability::new("MediaRecorder", "recording", false, true).with_fix("upgrade");
        assert_eq!(missing.fix_instructions.as_deref(), Some("upgrade"));
        assert_eq!(missing.status_label(), "[MISSING - REQUIRED]");
    }

    #[test]
    fn optional_gaps_do_not_block() {
        let caps = vec![
            Capability::new("Display capture", "getDisplayMedia", true, true),
            Capability::new("Tab audio", "audio in display capture", false, false),
        ];
        assert!(all_required_available(&caps));
        assert_eq!(capability_report(&caps).len(), 2);
    }
}
