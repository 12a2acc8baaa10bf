//! Lock flags and the interaction state derived from them.

use super::object::DesignObject;
use super::serde_helpers::truthy;
use serde::{Deserialize, Serialize};

/// Per-axis lock flags of a design object
///
/// Stored flags may come from editors that wrote `"true"` or `1`; all of
/// those deserialize to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFlags {
    #[serde(default, deserialize_with = "truthy")]
    pub movement_x: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub movement_y: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub rotation: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub scaling_x: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub scaling_y: bool,
}

impl LockFlags {
    pub const UNLOCKED: LockFlags = LockFlags {
        movement_x: false,
        movement_y: false,
        rotation: false,
        scaling_x: false,
        scaling_y: false,
    };

    pub const LOCKED: LockFlags = LockFlags {
        movement_x: true,
        movement_y: true,
        rotation: true,
        scaling_x: true,
        scaling_y: true,
    };

    /// An object counts as locked when it cannot move on either axis
    pub fn is_locked(&self) -> bool {
        self.movement_x && self.movement_y
    }

    pub fn all(locked: bool) -> Self {
        if locked { Self::LOCKED } else { Self::UNLOCKED }
    }
}

impl DesignObject {
    pub fn is_locked(&self) -> bool {
        self.locks.is_locked()
    }

    /// Set every lock flag at once and re-derive interaction
    pub fn set_locked(&mut self, locked: bool) {
        self.locks = LockFlags::all(locked);
        self.derive_interaction();
    }

    /// Recompute `selectable`/`evented` from lock and link state.
    ///
    /// Backgrounds and variable-box inner text are never interactive.
    pub fn derive_interaction(&mut self) {
        let interactive =
            !self.is_locked() && !self.data.is_background && self.data.parent_box.is_none();
        self.selectable = interactive;
        self.evented = interactive;
    }

    /// Make a freshly loaded object consistent.
    ///
    /// Partially locked objects (both movement axes locked) get the full lock
    /// set; stored interaction flags are discarded.
    pub fn normalize_lock_state(&mut self) {
        if self.locks.is_locked() {
            self.locks = LockFlags::LOCKED;
        }
        self.derive_interaction();
    }
}
