use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::colors::SkpStyles;
use crate::error::{Result, SkpError};

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error { code: String, message: String },
    Conflicts { paths: Vec<String> },
}

fn response<T: Serialize>(status: RobotStatus, data: T) -> RobotResponse<T> {
    RobotResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    response(RobotStatus::Ok, data)
}

/// Error status that still carries the command's payload.
pub fn robot_failed<T: Serialize>(
    code: impl Into<String>,
    message: impl Into<String>,
    data: T,
) -> RobotResponse<T> {
    response(
        RobotStatus::Error {
            code: code.into(),
            message: message.into(),
        },
        data,
    )
}

pub fn robot_conflicts<T: Serialize>(paths: Vec<String>, data: T) -> RobotResponse<T> {
    response(RobotStatus::Conflicts { paths }, data)
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| SkpError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 16,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(SkpStyles::bold(text).to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(SkpStyles::bold(text).to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        // Pad before styling so escape codes don't count toward the width.
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines
            .push(format!("{} {value}", SkpStyles::muted(padded)));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_status_serializes_snake_case() {
        let value = serde_json::to_value(robot_conflicts(vec!["a.txt".into()], ())).unwrap();
        assert_eq!(value["status"]["conflicts"]["paths"][0], "a.txt");

        let value = serde_json::to_value(robot_ok(1)).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"], 1);
    }

    #[test]
    fn human_layout_joins_lines() {
        colored::control::set_override(false);
        let mut layout = HumanLayout::new();
        layout.section("Applied").bullet("foo@1.0.0");
        assert_eq!(layout.build(), "Applied\n-------\n- foo@1.0.0");
    }
}
