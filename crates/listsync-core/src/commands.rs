use std::io::{
  self,
  BufRead,
  Write
};
use std::sync::Arc;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::{
  Command,
  join_title
};
use crate::config::SyncSettings;
use crate::edit::CommitTrigger;
use crate::model::EntityId;
use crate::notify::MemoryNotifier;
use crate::remote::HttpCollectionStore;
use crate::render::Renderer;
use crate::sync::ListSynchronizer;

/// One command-line session: a mounted
/// list view plus the notifications it
/// raised.
pub struct Session {
  sync:          ListSynchronizer,
  notifications: Arc<MemoryNotifier>,
  renderer:      Renderer
}

/// Where a command reads answers from and
/// writes its output and notices to.
pub struct Console<R, W, E> {
  pub input: R,
  pub out:   W,
  pub err:   E
}

impl Session {
  pub fn open(
    settings: SyncSettings,
    list_id: EntityId,
    renderer: Renderer
  ) -> anyhow::Result<Self> {
    let revert = settings.revert_on_failure;
    let store = Arc::new(
      HttpCollectionStore::new(settings)
        .context(
          "failed building HTTP client"
        )?
    );
    let notifications =
      Arc::new(MemoryNotifier::new());
    let sync = ListSynchronizer::new(
      list_id,
      store.clone(),
      store,
      notifications.clone()
    )
    .with_revert_on_failure(revert);

    Ok(Self {
      sync,
      notifications,
      renderer
    })
  }

  pub fn synchronizer(
    &self
  ) -> &ListSynchronizer {
    &self.sync
  }

  fn flush_notifications<W: Write>(
    &self,
    mut err: W
  ) -> anyhow::Result<()> {
    for notification in
      self.notifications.drain()
    {
      self.renderer.write_notification(
        &mut err,
        &notification
      )?;
    }
    Ok(())
  }

  fn print<W: Write>(
    &self,
    out: W
  ) -> anyhow::Result<()> {
    self
      .renderer
      .write_list(out, &self.sync.snapshot())
  }
}

#[instrument(skip(settings, renderer))]
pub async fn dispatch(
  settings: SyncSettings,
  renderer: Renderer,
  command: Command
) -> anyhow::Result<()> {
  let session = Session::open(
    settings,
    EntityId::new(command.list_id()),
    renderer
  )?;
  let mut console = Console {
    input: io::BufReader::new(io::stdin()),
    out:   io::stdout(),
    err:   io::stderr()
  };
  execute(&session, command, &mut console)
    .await
}

/// Runs one command against an open
/// session, then flushes the
/// notifications it raised to
/// `console.err`, also on failure.
pub async fn execute<R, W, E>(
  session: &Session,
  command: Command,
  console: &mut Console<R, W, E>
) -> anyhow::Result<()>
where
  R: BufRead,
  W: Write,
  E: Write
{
  let result =
    run_command(session, command, console)
      .await;
  session
    .flush_notifications(&mut console.err)?;
  result
}

async fn run_command<R, W, E>(
  session: &Session,
  command: Command,
  console: &mut Console<R, W, E>
) -> anyhow::Result<()>
where
  R: BufRead,
  W: Write,
  E: Write
{
  let sync = session.synchronizer();
  let list_id = sync.list_id();
  sync.load(&list_id).await?;

  match command {
    | Command::Show {
      ..
    } => {}
    | Command::Add {
      title, ..
    } => {
      let title = join_title(&title);
      sync
        .create_task(&list_id, &title)
        .await?;
    }
    | Command::RenameTask {
      task_id,
      title,
      ..
    } => {
      let task_id = EntityId::new(task_id);
      sync
        .begin_task_edit(&task_id)
        .ok_or_else(|| {
          anyhow!(
            "task {task_id} is not in \
             list {list_id}"
          )
        })?;
      sync.set_task_buffer(
        &task_id,
        &join_title(&title)
      );
      sync
        .commit_task_edit(
          &task_id,
          CommitTrigger::CommitKey
        )
        .await?;
    }
    | Command::RenameList {
      title, ..
    } => {
      sync.begin_list_edit();
      sync.set_list_buffer(&join_title(
        &title
      ));
      sync
        .commit_list_edit(
          CommitTrigger::CommitKey
        )
        .await?;
    }
    | Command::DeleteList {
      yes, ..
    } => {
      let title = sync
        .snapshot()
        .title
        .unwrap_or_default();
      let confirmed = yes
        || confirm_delete(
          &mut console.input,
          &mut console.err,
          &title
        )?;
      if !confirmed {
        info!(list_id = %list_id, "delete cancelled");
        return Ok(());
      }
      sync.delete_list(&list_id, &title).await?;
      return Ok(());
    }
  }

  session.print(&mut console.out)
}

/// Asks before a destructive action.
/// Anything but `y`/`yes` declines.
pub fn confirm_delete<R, W>(
  mut input: R,
  mut output: W,
  title: &str
) -> anyhow::Result<bool>
where
  R: BufRead,
  W: Write
{
  write!(
    output,
    "Delete list \"{title}\"? [y/N] "
  )?;
  output.flush()?;

  let mut answer = String::new();
  input
    .read_line(&mut answer)
    .context("failed reading answer")?;
  let accepted = matches!(
    answer
      .trim()
      .to_ascii_lowercase()
      .as_str(),
    "y" | "yes"
  );
  debug!(accepted, "delete confirmation answered");
  Ok(accepted)
}
