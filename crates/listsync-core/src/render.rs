use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::notify::{Level, Notification};
use crate::sync::{ListView, ViewStatus};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view))]
    pub fn write_list<W: Write>(&self, mut out: W, view: &ListView) -> anyhow::Result<()> {
        let title = view
            .title
            .clone()
            .unwrap_or_else(|| format!("list {}", view.list_id));
        let marker = if view.editing_list { " (editing)" } else { "" };
        writeln!(out, "{}{marker}", self.paint(&title, "1"))?;

        if let Some(err) = &view.last_error {
            writeln!(out, "{}", self.paint(&format!("! {err}"), "31"))?;
        }

        match view.status {
            ViewStatus::Loading => {
                writeln!(out, "loading...")?;
                return Ok(());
            }
            ViewStatus::Empty => {
                writeln!(out, "no tasks")?;
                return Ok(());
            }
            ViewStatus::Ready => {}
        }

        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Description".to_string(),
            "Modules".to_string(),
        ];

        let rows = view
            .tasks
            .iter()
            .map(|task| {
                let text = task.progress.to_string();
                let text = text.strip_prefix("Modules : ").unwrap_or(&text);
                let progress = match task.progress.fraction() {
                    Some(f) if f >= 1.0 => self.paint(text, "32"),
                    _ => text.to_string(),
                };
                vec![
                    self.paint(task.id.as_str(), "33"),
                    task.title.clone(),
                    task.description.clone(),
                    progress,
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn write_notification<W: Write>(
        &self,
        mut out: W,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        let code = match notification.level {
            Level::Success => "32",
            Level::Error => "31",
        };
        let stamp = notification
            .raised_at
            .with_timezone(&Local)
            .format("%H:%M:%S");
        writeln!(
            out,
            "[{stamp}] {}",
            self.paint(&notification.message, code)
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{EntityId, Progress};
    use crate::sync::TaskView;

    fn view(status: ViewStatus, tasks: Vec<TaskView>) -> ListView {
        ListView {
            list_id: EntityId::from("L1"),
            title: Some("Sprint".to_string()),
            tasks,
            status,
            editing_list: false,
            last_error: None,
        }
    }

    #[test]
    fn table_shows_module_ratio_per_task() {
        let tasks = vec![
            TaskView {
                id: EntityId::from("1"),
                title: "A".to_string(),
                description: "first".to_string(),
                progress: Progress::Ratio { done: 1, total: 2 },
                editing: false,
            },
            TaskView {
                id: EntityId::from("22"),
                title: "Bee".to_string(),
                description: String::new(),
                progress: Progress::NoModules,
                editing: false,
            },
        ];

        let mut out = Vec::new();
        Renderer::plain()
            .write_list(&mut out, &view(ViewStatus::Ready, tasks))
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert_eq!(
            text,
            "Sprint\n\
             ID Title Description Modules \n\
             -- ----- ----------- ------- \n\
             1  A     first       1 / 2   \n\
             22 Bee               none    \n"
        );
    }

    #[test]
    fn complete_tasks_are_highlighted_when_colored() {
        let tasks = vec![
            TaskView {
                id: EntityId::from("1"),
                title: "A".to_string(),
                description: String::new(),
                progress: Progress::Ratio { done: 2, total: 2 },
                editing: false,
            },
            TaskView {
                id: EntityId::from("2"),
                title: "B".to_string(),
                description: String::new(),
                progress: Progress::Ratio { done: 1, total: 2 },
                editing: false,
            },
        ];

        let mut out = Vec::new();
        Renderer { color: true }
            .write_list(&mut out, &view(ViewStatus::Ready, tasks))
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("\x1b[32m2 / 2\x1b[0m"), "{text:?}");
        assert!(!text.contains("\x1b[32m1 / 2"), "{text:?}");
    }

    #[test]
    fn notifications_carry_their_local_time() {
        let notification = Notification::task_created("X");
        let stamp = notification
            .raised_at
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string();

        let mut out = Vec::new();
        Renderer::plain()
            .write_notification(&mut out, &notification)
            .expect("render");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            format!("[{stamp}] Task \"X\" successfully created\n")
        );
    }

    #[test]
    fn placeholder_lines_for_loading_and_empty() {
        let mut out = Vec::new();
        let mut loading = view(ViewStatus::Loading, vec![]);
        loading.title = None;
        loading.last_error = Some("failed to fetch list L1".to_string());
        Renderer::plain()
            .write_list(&mut out, &loading)
            .expect("render");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "list L1\n! failed to fetch list L1\nloading...\n"
        );

        let mut out = Vec::new();
        Renderer::plain()
            .write_list(&mut out, &view(ViewStatus::Empty, vec![]))
            .expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "Sprint\nno tasks\n");
    }
}
