use async_trait::async_trait;
use listsync_shared::{
  ListDto,
  TaskCreate,
  TaskDto,
  TitlePatch
};
use reqwest::header::{
  ACCEPT,
  CONTENT_TYPE
};
use reqwest::{
  Client,
  RequestBuilder,
  Url
};
use serde::de::DeserializeOwned;
use tracing::{
  debug,
  instrument,
  warn
};

use crate::config::SyncSettings;
use crate::error::RemoteError;
use crate::model::{
  EntityId,
  ListEntity,
  TaskEntity
};

pub const MERGE_PATCH: &str =
  "application/merge-patch+json";

/// Reads and writes of one list and its
/// tasks against the remote collection.
#[async_trait]
pub trait CollectionStore: Send + Sync {
  async fn fetch_list(
    &self,
    list_id: &EntityId
  ) -> Result<ListEntity, RemoteError>;

  async fn fetch_tasks(
    &self,
    list_id: &EntityId
  ) -> Result<Vec<TaskEntity>, RemoteError>;

  async fn create_task(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError>;

  async fn patch_task_title(
    &self,
    task_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError>;
}

/// List-level writes the synchronizer
/// hands off to its owner.
#[async_trait]
pub trait ListActions: Send + Sync {
  async fn rename_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError>;

  async fn delete_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone)]
pub struct HttpCollectionStore {
  client:   Client,
  settings: SyncSettings
}

impl HttpCollectionStore {
  pub fn new(
    settings: SyncSettings
  ) -> Result<Self, RemoteError> {
    let client = Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|source| {
        RemoteError::Transport {
          url: settings
            .base_url
            .to_string(),
          source
        }
      })?;
    Ok(Self {
      client,
      settings
    })
  }

  fn endpoint(
    &self,
    collection: &str,
    tail: &[&str]
  ) -> Result<Url, RemoteError> {
    let mut url =
      self.settings.base_url.clone();
    {
      let mut path = url
        .path_segments_mut()
        .map_err(|()| {
          RemoteError::unavailable(
            "base url cannot carry a path"
          )
        })?;
      path.pop_if_empty();
      for segment in collection
        .split('/')
        .filter(|s| !s.is_empty())
      {
        path.push(segment);
      }
      for segment in tail {
        path.push(segment);
      }
    }
    Ok(url)
  }

  fn list_url(
    &self,
    list_id: &EntityId
  ) -> Result<Url, RemoteError> {
    self.endpoint(
      &self.settings.lists,
      &[list_id.as_str()]
    )
  }

  fn parent_reference(
    &self,
    list_id: &EntityId
  ) -> String {
    format!(
      "{}{}",
      self.settings.parent_prefix,
      list_id
    )
  }

  async fn get_json<T>(
    &self,
    url: Url
  ) -> Result<T, RemoteError>
  where
    T: DeserializeOwned
  {
    let label = url.to_string();
    let request = self
      .client
      .get(url)
      .header(ACCEPT, "application/json");
    let body = send(request, &label)
      .await?
      .bytes()
      .await
      .map_err(|source| {
        RemoteError::Transport {
          url: label.clone(),
          source
        }
      })?;
    serde_json::from_slice(&body).map_err(
      |source| RemoteError::Decode {
        url: label,
        source
      }
    )
  }
}

#[instrument(skip(request))]
async fn send(
  request: RequestBuilder,
  label: &str
) -> Result<reqwest::Response, RemoteError>
{
  let response = request
    .send()
    .await
    .map_err(|source| {
      warn!(url = %label, error = %source, "request failed");
      RemoteError::Transport {
        url: label.to_string(),
        source
      }
    })?;

  let status = response.status();
  if !status.is_success() {
    let body = response
      .text()
      .await
      .unwrap_or_default();
    warn!(url = %label, status = status.as_u16(), "remote rejected request");
    return Err(RemoteError::Status {
      url: label.to_string(),
      status: status.as_u16(),
      body
    });
  }

  debug!(url = %label, status = status.as_u16(), "remote request ok");
  Ok(response)
}

#[async_trait]
impl CollectionStore
  for HttpCollectionStore
{
  #[instrument(skip(self), fields(list_id = %list_id))]
  async fn fetch_list(
    &self,
    list_id: &EntityId
  ) -> Result<ListEntity, RemoteError> {
    let url = self.list_url(list_id)?;
    let dto: ListDto =
      self.get_json(url).await?;
    debug!(title = %dto.title, task_refs = dto.tasks.len(), "fetched list");
    Ok(ListEntity::from(dto))
  }

  #[instrument(skip(self), fields(list_id = %list_id))]
  async fn fetch_tasks(
    &self,
    list_id: &EntityId
  ) -> Result<Vec<TaskEntity>, RemoteError>
  {
    let url = self.endpoint(
      &self.settings.lists,
      &[
        list_id.as_str(),
        self.settings.tasks.as_str()
      ]
    )?;
    let dtos: Vec<TaskDto> =
      self.get_json(url).await?;
    debug!(count = dtos.len(), "fetched tasks");
    Ok(
      dtos
        .into_iter()
        .map(TaskEntity::from)
        .collect()
    )
  }

  #[instrument(skip(self), fields(list_id = %list_id, title_len = title.len()))]
  async fn create_task(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError> {
    let url = self.endpoint(
      &self.settings.tasks,
      &[]
    )?;
    let body = TaskCreate {
      title:        title.to_string(),
      description:  String::new(),
      parent_field: self
        .settings
        .parent_field
        .clone(),
      parent:       self
        .parent_reference(list_id)
    };
    let label = url.to_string();
    send(
      self.client.post(url).json(&body),
      &label
    )
    .await?;
    Ok(())
  }

  #[instrument(skip(self), fields(task_id = %task_id, title_len = title.len()))]
  async fn patch_task_title(
    &self,
    task_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError> {
    let url = self.endpoint(
      &self.settings.tasks,
      &[task_id.as_str()]
    )?;
    patch_title(&self.client, url, title)
      .await
  }
}

#[async_trait]
impl ListActions for HttpCollectionStore {
  #[instrument(skip(self), fields(list_id = %list_id, title_len = title.len()))]
  async fn rename_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError> {
    let url = self.list_url(list_id)?;
    patch_title(&self.client, url, title)
      .await
  }

  #[instrument(skip(self), fields(list_id = %list_id, title = %title))]
  async fn delete_list(
    &self,
    list_id: &EntityId,
    title: &str
  ) -> Result<(), RemoteError> {
    let url = self.list_url(list_id)?;
    let label = url.to_string();
    send(self.client.delete(url), &label)
      .await?;
    Ok(())
  }
}

async fn patch_title(
  client: &Client,
  url: Url,
  title: &str
) -> Result<(), RemoteError> {
  let label = url.to_string();
  let body = serde_json::to_vec(
    &TitlePatch {
      title: title.to_string()
    }
  )
  .map_err(|source| RemoteError::Decode {
    url: label.clone(),
    source
  })?;
  send(
    client
      .patch(url)
      .header(CONTENT_TYPE, MERGE_PATCH)
      .body(body),
    &label
  )
  .await?;
  Ok(())
}
