use std::fmt;

use serde::ser::SerializeMap;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

/// Identifier assigned by the remote
/// store. Kept as text whatever the
/// wire representation was.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into().trim().to_string())
  }

  /// Accepts a bare id or a resource
  /// path such as `/api/tasks/7`, in
  /// which case the last segment is
  /// the id.
  pub fn from_reference(
    reference: &str
  ) -> Self {
    let trimmed =
      reference.trim().trim_end_matches('/');
    let last = trimmed
      .rsplit('/')
      .next()
      .unwrap_or(trimmed);
    Self::new(last)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for EntityId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for EntityId {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<u64> for EntityId {
  fn from(value: u64) -> Self {
    Self(value.to_string())
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Unsigned(u64),
  Signed(i64),
  Text(String)
}

impl RawId {
  fn into_text(self) -> String {
    match self {
      | RawId::Unsigned(n) => {
        n.to_string()
      }
      | RawId::Signed(n) => {
        n.to_string()
      }
      | RawId::Text(s) => s
    }
  }
}

impl<'de> Deserialize<'de> for EntityId {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      RawId::deserialize(deserializer)?;
    Ok(Self::new(raw.into_text()))
  }
}

/// A child reference inside a list
/// payload: a bare id, a resource path,
/// or an embedded object carrying `id`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
  Unsigned(u64),
  Signed(i64),
  Text(String),
  Embedded { id: RawId }
}

fn deserialize_references<'de, D>(
  deserializer: D
) -> Result<Vec<EntityId>, D::Error>
where
  D: Deserializer<'de>
{
  let raw = Option::<
    Vec<RawReference>
  >::deserialize(deserializer)?;
  Ok(
    raw
      .unwrap_or_default()
      .into_iter()
      .map(|reference| match reference {
        | RawReference::Unsigned(n) => {
          EntityId::from(n)
        }
        | RawReference::Signed(n) => {
          EntityId::new(n.to_string())
        }
        | RawReference::Text(s) => {
          EntityId::from_reference(&s)
        }
        | RawReference::Embedded {
          id
        } => EntityId::new(id.into_text())
      })
      .collect()
  )
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct ListDto {
  pub id:    EntityId,
  #[serde(default)]
  pub title: String,
  #[serde(
    default,
    deserialize_with = "deserialize_references"
  )]
  pub tasks: Vec<EntityId>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ModuleDto {
  #[serde(rename = "isDone", default)]
  pub is_done: bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskDto {
  pub id:          EntityId,
  #[serde(default)]
  pub title:       String,
  #[serde(
    default,
    deserialize_with = "null_as_empty"
  )]
  pub description: String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub modules:     Vec<ModuleDto>
}

fn null_as_empty<'de, D>(
  deserializer: D
) -> Result<String, D::Error>
where
  D: Deserializer<'de>
{
  Ok(
    Option::<String>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

fn null_as_default<'de, D>(
  deserializer: D
) -> Result<Vec<ModuleDto>, D::Error>
where
  D: Deserializer<'de>
{
  Ok(
    Option::<Vec<ModuleDto>>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

/// Body of a task creation request.
/// The parent reference is written
/// under a caller-chosen field name.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCreate {
  pub title:        String,
  pub description:  String,
  pub parent_field: String,
  pub parent:       String
}

impl Serialize for TaskCreate {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    let mut map =
      serializer.serialize_map(Some(3))?;
    map.serialize_entry(
      "title",
      &self.title
    )?;
    map.serialize_entry(
      "description",
      &self.description
    )?;
    map.serialize_entry(
      &self.parent_field,
      &self.parent
    )?;
    map.end()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TitlePatch {
  pub title: String
}
