//! Whole-editor snapshots and the linear undo history over them.

use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// View transform of the active tab.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ViewState {
    pub scale: f64,
    pub translate: Point,
    pub visible_rect: Rect,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.,
            translate: Point::default(),
            visible_rect: Rect::default(),
        }
    }
}

/// Everything needed to restore the editor, compared blob for blob.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct SavedState {
    /// Tree name to serialized scene.
    pub tabs: BTreeMap<String, String>,
    pub main_tree: Option<String>,
    pub current_tab: Option<String>,
    pub view: ViewState,
}

#[derive(Debug, Default, Clone)]
pub struct UndoStack {
    undo: Vec<SavedState>,
    redo: Vec<SavedState>,
    current: Option<SavedState>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the history and starts over from `state`.
    pub fn reset(&mut self, state: SavedState) {
        self.undo.clear();
        self.redo.clear();
        self.current = Some(state);
    }

    pub fn current(&self) -> Option<&SavedState> {
        self.current.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// The state [`UndoStack::undo`] would step back to.
    pub fn peek_undo(&self) -> Option<&SavedState> {
        self.undo.last()
    }

    pub fn peek_redo(&self) -> Option<&SavedState> {
        self.redo.last()
    }

    /// Records `state` as the latest change and drops the redo history.
    ///
    /// Returns `false` without recording when `state` equals the current
    /// state or the top of the undo stack.
    pub fn push(&mut self, state: SavedState) -> bool {
        if self.current.as_ref() == Some(&state) || self.undo.last() == Some(&state) {
            debug!("undo: skipped unchanged state");
            return false;
        }
        if let Some(current) = self.current.replace(state) {
            self.undo.push(current);
        }
        self.redo.clear();
        true
    }

    /// Steps back one change and returns the state to restore.
    pub fn undo(&mut self) -> Option<&SavedState> {
        let previous = self.undo.pop()?;
        if let Some(current) = self.current.replace(previous) {
            self.redo.push(current);
        }
        info!("undo: {} left, {} to redo", self.undo.len(), self.redo.len());
        self.current.as_ref()
    }

    pub fn redo(&mut self) -> Option<&SavedState> {
        let next = self.redo.pop()?;
        if let Some(current) = self.current.replace(next) {
            self.undo.push(current);
        }
        info!("redo: {} left, {} to undo", self.redo.len(), self.undo.len());
        self.current.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn state(tab: &str, blob: &str) -> SavedState {
        SavedState {
            tabs: [(tab.to_owned(), blob.to_owned())].into_iter().collect(),
            main_tree: Some(tab.to_owned()),
            current_tab: Some(tab.to_owned()),
            view: ViewState::default(),
        }
    }

    #[test]
    fn test_push_undo_redo() {
        let mut stack = UndoStack::new();
        assert!(stack.undo().is_none());
        stack.reset(state("Main", "0"));
        assert!(stack.push(state("Main", "1")));
        assert!(stack.push(state("Main", "2")));
        assert_eq!(stack.undo_len(), 2);
        assert_eq!(stack.peek_undo(), Some(&state("Main", "1")));
        assert!(stack.peek_redo().is_none());

        assert_eq!(stack.undo(), Some(&state("Main", "1")));
        assert_eq!(stack.undo(), Some(&state("Main", "0")));
        assert!(stack.undo().is_none());
        assert_eq!(stack.current(), Some(&state("Main", "0")));
        assert_eq!(stack.redo_len(), 2);

        assert_eq!(stack.redo(), Some(&state("Main", "1")));
        assert!(stack.can_redo());

        // A new change cuts off the redo history
        assert!(stack.push(state("Main", "3")));
        assert!(!stack.can_redo());
        assert!(stack.redo().is_none());
        assert_eq!(stack.undo(), Some(&state("Main", "1")));
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let mut stack = UndoStack::new();
        stack.reset(state("Main", "0"));
        assert!(!stack.push(state("Main", "0")));
        assert!(stack.push(state("Main", "1")));
        assert!(!stack.push(state("Main", "1")));
        // Same as the top of the undo stack
        assert!(!stack.push(state("Main", "0")));
        assert_eq!(stack.undo_len(), 1);

        let mut moved = state("Main", "1");
        moved.view.scale = 2.;
        assert!(stack.push(moved));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut stack = UndoStack::new();
        assert!(stack.push(state("A", "0")));
        assert!(!stack.can_undo());
        stack.push(state("A", "1"));
        stack.reset(state("B", "0"));
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    proptest! {
        #[test]
        fn undo_redo_is_symmetric(count in 1usize..20) {
            let mut stack = UndoStack::new();
            let initial = state("Main", "initial");
            stack.reset(initial.clone());
            for i in 0..count {
                prop_assert!(stack.push(state("Main", &i.to_string())));
            }
            let last = stack.current().cloned();

            for _ in 0..count {
                prop_assert!(stack.undo().is_some());
            }
            prop_assert_eq!(stack.current(), Some(&initial));
            prop_assert!(stack.undo().is_none());

            for _ in 0..count {
                prop_assert!(stack.redo().is_some());
            }
            prop_assert_eq!(stack.current().cloned(), last);
        }
    }
}
