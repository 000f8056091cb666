use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "listsync",
    version,
    about = "Keeps a task list in step with a REST collection"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    /// Overrides collection.base_url.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a list and its tasks.
    Show { list_id: String },

    /// Create a task at the end of a list.
    Add {
        list_id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    RenameTask {
        list_id: String,
        task_id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    RenameList {
        list_id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    DeleteList {
        list_id: String,
        /// Skip the confirmation prompt.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
}

impl Command {
    pub fn list_id(&self) -> &str {
        match self {
            Command::Show { list_id }
            | Command::Add { list_id, .. }
            | Command::RenameTask { list_id, .. }
            | Command::RenameList { list_id, .. }
            | Command::DeleteList { list_id, .. } => list_id,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` and
/// `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

pub fn join_title(words: &[String]) -> String {
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_captured() {
        let pre = preprocess_args(&args(&[
            "listsync",
            "rc.collection.base_url=http://host/api",
            "show",
            "rc.color:off",
            "7",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, args(&["listsync", "show", "7"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                (
                    "rc.collection.base_url".to_string(),
                    "http://host/api".to_string()
                ),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn subcommands_parse_multi_word_titles() {
        let cli = GlobalCli::parse_from([
            "listsync",
            "--rc",
            "http.timeout_secs=5",
            "rename-task",
            "L1",
            "9",
            "Buy",
            "milk",
        ]);
        assert_eq!(cli.rc_overrides[0].key, "http.timeout_secs");
        assert_eq!(
            cli.command,
            Command::RenameTask {
                list_id: "L1".to_string(),
                task_id: "9".to_string(),
                title: vec!["Buy".to_string(), "milk".to_string()],
            }
        );

        let cli = GlobalCli::parse_from(["listsync", "delete-list", "L1", "--yes"]);
        assert_eq!(
            cli.command,
            Command::DeleteList {
                list_id: "L1".to_string(),
                yes: true,
            }
        );
        assert_eq!(cli.command.list_id(), "L1");
    }
}
