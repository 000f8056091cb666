#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
  Viewing,
  Editing { buffer: String }
}

/// What ended an edit. Both commit.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum CommitTrigger {
  ClickAway,
  CommitKey
}

/// Inline title editor: a two-state
/// machine holding the uncommitted
/// buffer while editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEditor {
  state: EditState
}

impl Default for TitleEditor {
  fn default() -> Self {
    Self {
      state: EditState::Viewing
    }
  }
}

impl TitleEditor {
  pub fn state(&self) -> &EditState {
    &self.state
  }

  pub fn is_editing(&self) -> bool {
    matches!(
      self.state,
      EditState::Editing { .. }
    )
  }

  pub fn buffer(&self) -> Option<&str> {
    match &self.state {
      | EditState::Editing {
        buffer
      } => Some(buffer),
      | EditState::Viewing => None
    }
  }

  /// Enters edit mode seeded with
  /// `current_title`. Any buffer left
  /// from an earlier edit is dropped.
  pub fn begin(
    &mut self,
    current_title: &str
  ) {
    self.state = EditState::Editing {
      buffer: current_title.to_string()
    };
  }

  /// Returns false when not editing.
  pub fn set_buffer(
    &mut self,
    text: &str
  ) -> bool {
    match &mut self.state {
      | EditState::Editing {
        buffer
      } => {
        text.clone_into(buffer);
        true
      }
      | EditState::Viewing => false
    }
  }

  /// Leaves edit mode and hands back the
  /// buffered title to commit.
  pub fn commit(
    &mut self,
    _trigger: CommitTrigger
  ) -> Option<String> {
    match std::mem::replace(
      &mut self.state,
      EditState::Viewing
    ) {
      | EditState::Editing {
        buffer
      } => Some(buffer),
      | EditState::Viewing => None
    }
  }

  pub fn cancel(&mut self) {
    self.state = EditState::Viewing;
  }
}
