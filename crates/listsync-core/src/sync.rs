//! Local view of one list and its tasks,
//! kept in step with the remote
//! collection.
//!
//! Every remote call happens without the
//! state lock held. Results are written
//! back only while the view is mounted;
//! the mounted flag lives under the same
//! lock as the state it guards. Concurrent
//! writes to the same entity resolve
//! last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{
  debug,
  info,
  instrument,
  warn
};
use uuid::Uuid;

use crate::edit::{
  CommitTrigger,
  TitleEditor
};
use crate::error::{
  RemoteError,
  SyncError
};
use crate::model::{
  EntityId,
  ListEntity,
  Progress,
  TaskEntity
};
use crate::notify::{
  Notification,
  Notifier
};
use crate::remote::{
  CollectionStore,
  ListActions
};

/// How a completed operation touched
/// local state.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Outcome {
  Applied,
  /// Nothing to do, e.g. committing an
  /// editor that was not editing.
  Unchanged,
  /// The view was unmounted before the
  /// response arrived.
  Discarded
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ViewStatus {
  Loading,
  Empty,
  Ready
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
  pub id:          EntityId,
  pub title:       String,
  pub description: String,
  pub progress:    Progress,
  pub editing:     bool
}

/// What a presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
  pub list_id:      EntityId,
  pub title:        Option<String>,
  pub tasks:        Vec<TaskView>,
  pub status:       ViewStatus,
  pub editing_list: bool,
  pub last_error:   Option<String>
}

#[derive(Debug)]
struct SyncState {
  mounted:      bool,
  list_id:      EntityId,
  list:         Option<ListEntity>,
  tasks:        Vec<TaskEntity>,
  last_error:   Option<String>,
  list_editor:  TitleEditor,
  task_editors: HashMap<EntityId, TitleEditor>
}

pub struct ListSynchronizer {
  store:             Arc<dyn CollectionStore>,
  actions:           Arc<dyn ListActions>,
  notifier:          Arc<dyn Notifier>,
  revert_on_failure: bool,
  state:             Mutex<SyncState>
}

impl ListSynchronizer {
  pub fn new(
    list_id: EntityId,
    store: Arc<dyn CollectionStore>,
    actions: Arc<dyn ListActions>,
    notifier: Arc<dyn Notifier>
  ) -> Self {
    Self {
      store,
      actions,
      notifier,
      revert_on_failure: true,
      state: Mutex::new(SyncState {
        mounted: true,
        list_id,
        list: None,
        tasks: vec![],
        last_error: None,
        list_editor: TitleEditor::default(),
        task_editors: HashMap::new()
      })
    }
  }

  pub fn with_revert_on_failure(
    mut self,
    revert: bool
  ) -> Self {
    self.revert_on_failure = revert;
    self
  }

  pub fn is_mounted(&self) -> bool {
    self.state.lock().mounted
  }

  /// Tears the view down. Responses that
  /// arrive afterward are dropped.
  pub fn unmount(&self) {
    let mut state = self.state.lock();
    if std::mem::replace(
      &mut state.mounted,
      false
    ) {
      debug!("list view unmounted");
    }
  }

  pub fn list_id(&self) -> EntityId {
    self.state.lock().list_id.clone()
  }

  pub fn snapshot(&self) -> ListView {
    let state = self.state.lock();
    let status = match state.list {
      | None => ViewStatus::Loading,
      | Some(_) if state.tasks.is_empty() => {
        ViewStatus::Empty
      }
      | Some(_) => ViewStatus::Ready
    };
    let tasks = state
      .tasks
      .iter()
      .map(|task| TaskView {
        id:          task.id.clone(),
        title:       task.title.clone(),
        description: task
          .description
          .clone(),
        progress:    task.progress(),
        editing:     state
          .task_editors
          .get(&task.id)
          .is_some_and(TitleEditor::is_editing)
      })
      .collect();

    ListView {
      list_id: state.list_id.clone(),
      title: state
        .list
        .as_ref()
        .map(|l| l.title.clone()),
      tasks,
      status,
      editing_list: state
        .list_editor
        .is_editing(),
      last_error: state.last_error.clone()
    }
  }

  /// Fetches list metadata and tasks
  /// together. Local state is replaced
  /// only if both succeed.
  #[instrument(skip(self), fields(list_id = %list_id))]
  pub async fn load(
    &self,
    list_id: &EntityId
  ) -> Result<Outcome, SyncError> {
    require_id(list_id, "list id")?;

    let (list, tasks) = futures::join!(
      self.store.fetch_list(list_id),
      self.store.fetch_tasks(list_id)
    );
    let list = list.map_err(|source| {
      self.fetch_failed(
        format!("list {list_id}"),
        source
      )
    })?;
    let tasks = tasks.map_err(|source| {
      self.fetch_failed(
        format!("tasks of list {list_id}"),
        source
      )
    })?;

    let mut state = self.state.lock();
    if !state.mounted {
      debug!("discarding load result for unmounted view");
      return Ok(Outcome::Discarded);
    }
    info!(
      title = %list.title,
      task_count = tasks.len(),
      "list loaded"
    );
    state.list_id = list_id.clone();
    state.list = Some(list);
    replace_tasks(&mut state, tasks);
    state.last_error = None;
    Ok(Outcome::Applied)
  }

  /// Re-reads the task collection of the
  /// bound list and resolves once local
  /// state reflects it.
  #[instrument(skip(self))]
  pub async fn reload_tasks(
    &self
  ) -> Result<Outcome, SyncError> {
    let list_id = self.list_id();
    let tasks = self
      .store
      .fetch_tasks(&list_id)
      .await
      .map_err(|source| {
        self.fetch_failed(
          format!("tasks of list {list_id}"),
          source
        )
      })?;

    let mut state = self.state.lock();
    if !state.mounted {
      return Ok(Outcome::Discarded);
    }
    debug!(count = tasks.len(), "tasks reloaded");
    replace_tasks(&mut state, tasks);
    state.last_error = None;
    Ok(Outcome::Applied)
  }

  /// Re-reads list metadata only.
  #[instrument(skip(self))]
  pub async fn reload_list(
    &self
  ) -> Result<Outcome, SyncError> {
    let list_id = self.list_id();
    let list = self
      .store
      .fetch_list(&list_id)
      .await
      .map_err(|source| {
        self.fetch_failed(
          format!("list {list_id}"),
          source
        )
      })?;

    let mut state = self.state.lock();
    if !state.mounted {
      return Ok(Outcome::Discarded);
    }
    state.list = Some(list);
    state.last_error = None;
    Ok(Outcome::Applied)
  }

  /// Creates an empty-description task
  /// under `list_id`, which must be the
  /// bound list. Nothing is inserted
  /// locally until the reload shows it.
  #[instrument(skip(self), fields(list_id = %list_id, request_id = %Uuid::new_v4()))]
  pub async fn create_task(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<Outcome, SyncError> {
    require_id(list_id, "list id")?;
    if *list_id != self.list_id() {
      return Err(
        SyncError::ValidationFailed {
          field:  "list id",
          reason: "is not the bound list"
        }
      );
    }
    let title = require_title(title)?;

    if let Err(source) = self
      .store
      .create_task(list_id, &title)
      .await
    {
      return Err(self.write_failed(
        "create task",
        source
      ));
    }

    info!(title = %title, "task created");
    self
      .notifier
      .notify(Notification::task_created(
        &title
      ));
    self.reload_tasks().await
  }

  /// Applies the new title locally, then
  /// patches it remotely.
  #[instrument(skip(self), fields(task_id = %task_id, request_id = %Uuid::new_v4()))]
  pub async fn rename_task(
    &self,
    task_id: &EntityId,
    title: &str
  ) -> Result<Outcome, SyncError> {
    require_id(task_id, "task id")?;
    let title = require_title(title)?;

    let previous = self
      .swap_task_title(task_id, &title);

    if let Err(source) = self
      .store
      .patch_task_title(task_id, &title)
      .await
    {
      if self.revert_on_failure
        && let Some(previous) = previous
      {
        self.restore_task_title(
          task_id, &title, previous
        );
      }
      return Err(self.write_failed(
        "rename task",
        source
      ));
    }

    self.reload_tasks().await
  }

  /// Hands the rename to the list owner.
  /// The list editor always ends up
  /// viewing.
  #[instrument(skip(self), fields(list_id = %list_id, request_id = %Uuid::new_v4()))]
  pub async fn rename_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<Outcome, SyncError> {
    self.state.lock().list_editor.cancel();
    require_id(list_id, "list id")?;
    let title = require_title(title)?;

    let previous =
      self.swap_list_title(list_id, &title);

    if let Err(source) = self
      .actions
      .rename_list(list_id, &title)
      .await
    {
      if self.revert_on_failure
        && let Some(previous) = previous
      {
        self.restore_list_title(
          list_id, &title, previous
        );
      }
      return Err(self.write_failed(
        "rename list",
        source
      ));
    }

    self.reload_list().await
  }

  /// Hands the delete to the list owner.
  /// Confirmation is the caller's job.
  #[instrument(skip(self), fields(list_id = %list_id, request_id = %Uuid::new_v4()))]
  pub async fn delete_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<Outcome, SyncError> {
    self.state.lock().list_editor.cancel();
    require_id(list_id, "list id")?;

    if let Err(source) = self
      .actions
      .delete_list(list_id, title)
      .await
    {
      return Err(self.write_failed(
        "delete list",
        source
      ));
    }

    info!(title = %title, "list deleted");
    self.notifier.notify(
      Notification::success(format!(
        "List \"{title}\" successfully \
         deleted"
      ))
    );

    let mut state = self.state.lock();
    if state.list_id == *list_id {
      state.list = None;
      state.tasks.clear();
      state.task_editors.clear();
      state.mounted = false;
      debug!("list view unmounted");
    }
    Ok(Outcome::Applied)
  }

  /// Enters list title editing and
  /// returns the seeded buffer.
  pub fn begin_list_edit(&self) -> String {
    let mut state = self.state.lock();
    let current = state
      .list
      .as_ref()
      .map(|l| l.title.clone())
      .unwrap_or_default();
    state.list_editor.begin(&current);
    current
  }

  pub fn set_list_buffer(
    &self,
    text: &str
  ) -> bool {
    self
      .state
      .lock()
      .list_editor
      .set_buffer(text)
  }

  pub fn cancel_list_edit(&self) {
    self.state.lock().list_editor.cancel();
  }

  #[instrument(skip(self))]
  pub async fn commit_list_edit(
    &self,
    trigger: CommitTrigger
  ) -> Result<Outcome, SyncError> {
    let (list_id, buffer) = {
      let mut state = self.state.lock();
      let buffer =
        state.list_editor.commit(trigger);
      (state.list_id.clone(), buffer)
    };
    let Some(buffer) = buffer else {
      return Ok(Outcome::Unchanged);
    };
    self.rename_list(&list_id, &buffer).await
  }

  /// Enters title editing for a known
  /// task. `None` if the task is not in
  /// the local view.
  pub fn begin_task_edit(
    &self,
    task_id: &EntityId
  ) -> Option<String> {
    let mut state = self.state.lock();
    let current = state
      .tasks
      .iter()
      .find(|t| t.id == *task_id)?
      .title
      .clone();
    state
      .task_editors
      .entry(task_id.clone())
      .or_default()
      .begin(&current);
    Some(current)
  }

  pub fn set_task_buffer(
    &self,
    task_id: &EntityId,
    text: &str
  ) -> bool {
    self
      .state
      .lock()
      .task_editors
      .get_mut(task_id)
      .is_some_and(|e| e.set_buffer(text))
  }

  pub fn cancel_task_edit(
    &self,
    task_id: &EntityId
  ) {
    if let Some(editor) = self
      .state
      .lock()
      .task_editors
      .get_mut(task_id)
    {
      editor.cancel();
    }
  }

  #[instrument(skip(self), fields(task_id = %task_id))]
  pub async fn commit_task_edit(
    &self,
    task_id: &EntityId,
    trigger: CommitTrigger
  ) -> Result<Outcome, SyncError> {
    let buffer = self
      .state
      .lock()
      .task_editors
      .get_mut(task_id)
      .and_then(|e| e.commit(trigger));
    let Some(buffer) = buffer else {
      return Ok(Outcome::Unchanged);
    };
    self.rename_task(task_id, &buffer).await
  }

  fn fetch_failed(
    &self,
    resource: String,
    source: RemoteError
  ) -> SyncError {
    warn!(resource = %resource, error = %source, "fetch failed; keeping previous state");
    let err = SyncError::FetchFailed {
      resource,
      source
    };
    let mut state = self.state.lock();
    if state.mounted {
      state.last_error = Some(err.to_string());
    }
    err
  }

  fn write_failed(
    &self,
    operation: &'static str,
    source: RemoteError
  ) -> SyncError {
    warn!(operation, error = %source, "write failed");
    self
      .notifier
      .notify(Notification::write_failed());
    SyncError::WriteFailed {
      operation,
      source
    }
  }

  fn swap_task_title(
    &self,
    task_id: &EntityId,
    title: &str
  ) -> Option<String> {
    let mut state = self.state.lock();
    if !state.mounted {
      return None;
    }
    let task = state
      .tasks
      .iter_mut()
      .find(|t| t.id == *task_id)?;
    Some(std::mem::replace(
      &mut task.title,
      title.to_string()
    ))
  }

  fn restore_task_title(
    &self,
    task_id: &EntityId,
    attempted: &str,
    previous: String
  ) {
    let mut state = self.state.lock();
    if !state.mounted {
      return;
    }
    if let Some(task) = state
      .tasks
      .iter_mut()
      .find(|t| t.id == *task_id)
      && task.title == attempted
    {
      debug!(task_id = %task_id, "reverting task title");
      task.title = previous;
    }
  }

  fn swap_list_title(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Option<String> {
    let mut state = self.state.lock();
    if !state.mounted {
      return None;
    }
    let list = state
      .list
      .as_mut()
      .filter(|l| l.id == *list_id)?;
    Some(std::mem::replace(
      &mut list.title,
      title.to_string()
    ))
  }

  fn restore_list_title(
    &self,
    list_id: &EntityId,
    attempted: &str,
    previous: String
  ) {
    let mut state = self.state.lock();
    if !state.mounted {
      return;
    }
    if let Some(list) = state.list.as_mut()
      && list.id == *list_id
      && list.title == attempted
    {
      debug!(list_id = %list_id, "reverting list title");
      list.title = previous;
    }
  }
}

fn replace_tasks(
  state: &mut SyncState,
  tasks: Vec<TaskEntity>
) {
  state.task_editors.retain(|id, _| {
    tasks.iter().any(|t| t.id == *id)
  });
  state.tasks = tasks;
}

fn require_id(
  id: &EntityId,
  field: &'static str
) -> Result<(), SyncError> {
  if id.is_empty() {
    return Err(
      SyncError::ValidationFailed {
        field,
        reason: "must not be empty"
      }
    );
  }
  Ok(())
}

fn require_title(
  title: &str
) -> Result<String, SyncError> {
  let trimmed = title.trim();
  if trimmed.is_empty() {
    return Err(
      SyncError::ValidationFailed {
        field:  "title",
        reason: "must not be empty"
      }
    );
  }
  Ok(trimmed.to_string())
}
