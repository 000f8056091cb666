use std::fmt;

use listsync_shared::{
  ListDto,
  ModuleDto,
  TaskDto
};
pub use listsync_shared::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntity {
  pub id:    EntityId,
  pub title: String,
  pub tasks: Vec<EntityId>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntity {
  pub id:          EntityId,
  pub title:       String,
  pub description: String,
  pub modules:     Vec<ModuleEntity>
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ModuleEntity {
  pub is_done: bool
}

/// Completion of a task's module
/// checklist.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Progress {
  NoModules,
  Ratio { done: usize, total: usize }
}

impl Progress {
  pub fn of(
    modules: &[ModuleEntity]
  ) -> Self {
    if modules.is_empty() {
      return Progress::NoModules;
    }
    let done = modules
      .iter()
      .filter(|m| m.is_done)
      .count();
    Progress::Ratio {
      done,
      total: modules.len()
    }
  }

  /// `None` when there is nothing to
  /// divide by.
  pub fn fraction(&self) -> Option<f64> {
    match *self {
      | Progress::NoModules => None,
      | Progress::Ratio {
        done,
        total
      } => Some(done as f64 / total as f64)
    }
  }
}

impl fmt::Display for Progress {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Progress::NoModules => {
        write!(f, "Modules : none")
      }
      | Progress::Ratio {
        done,
        total
      } => write!(
        f,
        "Modules : {done} / {total}"
      )
    }
  }
}

impl TaskEntity {
  pub fn progress(&self) -> Progress {
    Progress::of(&self.modules)
  }
}

impl From<ModuleDto> for ModuleEntity {
  fn from(dto: ModuleDto) -> Self {
    Self {
      is_done: dto.is_done
    }
  }
}

impl From<TaskDto> for TaskEntity {
  fn from(dto: TaskDto) -> Self {
    Self {
      id:          dto.id,
      title:       dto.title,
      description: dto.description,
      modules:     dto
        .modules
        .into_iter()
        .map(ModuleEntity::from)
        .collect()
    }
  }
}

impl From<ListDto> for ListEntity {
  fn from(dto: ListDto) -> Self {
    Self {
      id:    dto.id,
      title: dto.title,
      tasks: dto.tasks
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn modules(
    flags: &[bool]
  ) -> Vec<ModuleEntity> {
    flags
      .iter()
      .map(|&is_done| ModuleEntity {
        is_done
      })
      .collect()
  }

  #[test]
  fn empty_checklist_has_no_ratio() {
    let progress = Progress::of(&[]);
    assert_eq!(
      progress,
      Progress::NoModules
    );
    assert_eq!(progress.fraction(), None);
    assert_eq!(
      progress.to_string(),
      "Modules : none"
    );
  }

  #[test]
  fn ratio_counts_done_modules() {
    for flags in [
      vec![true],
      vec![false, false],
      vec![true, false, true, true],
    ] {
      let progress =
        Progress::of(&modules(&flags));
      let done =
        flags.iter().filter(|f| **f).count();
      assert_eq!(
        progress,
        Progress::Ratio {
          done,
          total: flags.len()
        }
      );
      assert_eq!(
        progress.fraction(),
        Some(done as f64 / flags.len() as f64)
      );
    }
  }

  #[test]
  fn ratio_text_matches_card_format() {
    let task = TaskEntity {
      id:          EntityId::from(1_u64),
      title:       "A".to_string(),
      description: String::new(),
      modules:     modules(&[
        true, false
      ])
    };
    assert_eq!(
      task.progress().to_string(),
      "Modules : 1 / 2"
    );
  }
}
