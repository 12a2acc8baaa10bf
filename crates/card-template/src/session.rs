//! Editor session: the state one open template tab carries around.
//!
//! Tool selection, pan mode, the clipboard and per-side history all live
//! here rather than in globals, so two sessions never see each other's state.

use crate::constants::{NUDGE_STEP, NUDGE_STEP_LARGE};
use crate::geometry::MaskShape;
use crate::history::History;
use crate::scene::{
    DesignObject, NamedPage, ObjectId, Side, Template, VariableBoxIds, VariableBoxSpec,
};
use crate::types::{Result, SideKind, TemplateError};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Offset applied to pasted objects so they do not hide their originals
const PASTE_OFFSET: f32 = 10.0;

/// What a click on the canvas does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTool {
    #[default]
    Select,
    Text,
    Shape(MaskShape),
    VariableBox,
    Photo,
    Barcode,
    Qrcode,
}

/// Arrow-key direction for [`EditorSession::nudge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug)]
pub struct EditorSession {
    template: Template,
    active_side: SideKind,
    active_page: usize,
    histories: HashMap<SideKind, History>,
    tool: ActiveTool,
    panning: bool,
    clipboard: Vec<DesignObject>,
    next_id: u64,
}

impl EditorSession {
    pub fn new(mut template: Template) -> Result<Self> {
        template.normalize()?;
        let mut histories = HashMap::new();
        histories.insert(SideKind::Front, History::new(template.front.side.snapshot()?));
        if let Some(back) = template.side(SideKind::Back) {
            histories.insert(SideKind::Back, History::new(back.snapshot()?));
        }

        Ok(Self {
            template,
            active_side: SideKind::Front,
            active_page: 0,
            histories,
            tool: ActiveTool::Select,
            panning: false,
            clipboard: Vec::new(),
            next_id: 1,
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Finish editing and hand back the template, with pages stored
    pub fn into_template(mut self) -> Template {
        self.store_active_page();
        self.template
    }

    pub fn active_side(&self) -> SideKind {
        self.active_side
    }

    /// The side currently on the canvas
    pub fn side(&self) -> &Side {
        match self.active_side {
            SideKind::Back => self.template.back.as_ref().unwrap_or(&self.template.front.side),
            SideKind::Front => &self.template.front.side,
        }
    }

    fn side_mut(&mut self) -> Result<&mut Side> {
        self.template
            .side_mut(self.active_side)
            .ok_or_else(|| TemplateError::UnresolvedReference("back side".to_string()))
    }

    /// Switch the canvas to the other face, enabling the back if needed
    pub fn set_active_side(&mut self, kind: SideKind) -> Result<()> {
        if let Some(history) = self.histories.get_mut(&self.active_side) {
            history.flush();
        }
        if kind == SideKind::Back && !self.histories.contains_key(&SideKind::Back) {
            let snapshot = self.template.enable_back().snapshot()?;
            self.histories.insert(SideKind::Back, History::new(snapshot));
        }
        self.active_side = kind;
        Ok(())
    }

    pub fn tool(&self) -> ActiveTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ActiveTool) {
        self.tool = tool;
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    pub fn set_panning(&mut self, panning: bool) {
        self.panning = panning;
    }

    pub fn history(&self, kind: SideKind) -> Option<&History> {
        self.histories.get(&kind)
    }

    /// A new id unique across both sides and every stored page
    pub fn fresh_id(&mut self, prefix: &str) -> ObjectId {
        loop {
            let id = ObjectId::new(format!("{}-{}", prefix, self.next_id));
            self.next_id += 1;
            let taken = self.template.front.side.contains(&id)
                || self.template.back.as_ref().is_some_and(|b| b.contains(&id))
                || self.template.front.pages.iter().any(|p| p.design.contains(&id));
            if !taken {
                return id;
            }
        }
    }

    fn record_edit(&mut self, now: Instant) {
        let snapshot = match self.side().snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Could not snapshot side for history: {}", e);
                return;
            }
        };
        if let Some(history) = self.histories.get_mut(&self.active_side) {
            history.record(snapshot, now);
        }
    }

    /// Drive the debounce timer of the active side's history
    pub fn tick(&mut self, now: Instant) -> bool {
        self.histories
            .get_mut(&self.active_side)
            .is_some_and(|history| history.tick(now))
    }

    pub fn add_object(&mut self, object: DesignObject, now: Instant) -> Result<ObjectId> {
        let id = object.id.clone();
        self.side_mut()?.add(object)?;
        self.record_edit(now);
        Ok(id)
    }

    pub fn add_variable_box(&mut self, spec: VariableBoxSpec, now: Instant) -> Result<VariableBoxIds> {
        let container = self.fresh_id("box");
        let text = ObjectId::new(format!("{}-text", container));
        let ids = self.side_mut()?.add_variable_box(container, text, spec)?;
        self.record_edit(now);
        Ok(ids)
    }

    pub fn remove(&mut self, id: &ObjectId, now: Instant) -> Result<Vec<DesignObject>> {
        let removed = self.side_mut()?.remove(id)?;
        self.record_edit(now);
        Ok(removed)
    }

    pub fn set_locked(&mut self, id: &ObjectId, locked: bool, now: Instant) -> Result<()> {
        self.side_mut()?.set_locked(id, locked)?;
        self.record_edit(now);
        Ok(())
    }

    pub fn move_by(&mut self, id: &ObjectId, dx: f32, dy: f32, now: Instant) -> Result<bool> {
        let moved = self.side_mut()?.move_by(id, dx, dy)?;
        if moved {
            self.record_edit(now);
        }
        Ok(moved)
    }

    /// Arrow-key move; `large` is the shift modifier
    pub fn nudge(&mut self, id: &ObjectId, direction: Nudge, large: bool, now: Instant) -> Result<bool> {
        let step = if large { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        let (dx, dy) = match direction {
            Nudge::Left => (-step, 0.0),
            Nudge::Right => (step, 0.0),
            Nudge::Up => (0.0, -step),
            Nudge::Down => (0.0, step),
        };
        if self.side().get(id).is_some_and(DesignObject::is_locked) {
            return Ok(false);
        }
        self.move_by(id, dx, dy, now)
    }

    /// Live resize; history is recorded when the drag ends
    pub fn scale_to(&mut self, id: &ObjectId, scale_x: f32, scale_y: f32) -> Result<bool> {
        self.side_mut()?.scale_to(id, scale_x, scale_y)
    }

    pub fn end_scale(&mut self, id: &ObjectId, now: Instant) -> Result<()> {
        self.side_mut()?.end_scale(id)?;
        self.record_edit(now);
        Ok(())
    }

    pub fn rotate_to(&mut self, id: &ObjectId, angle: f32, now: Instant) -> Result<bool> {
        let rotated = self.side_mut()?.rotate_to(id, angle)?;
        if rotated {
            self.record_edit(now);
        }
        Ok(rotated)
    }

    /// Copy objects to the clipboard; linked box/text partners come along
    pub fn copy(&mut self, ids: &[ObjectId]) -> Result<usize> {
        let side = self.side();
        let mut wanted: HashSet<ObjectId> = HashSet::new();
        for id in ids {
            let object = side
                .get(id)
                .ok_or_else(|| TemplateError::ObjectNotFound(id.to_string()))?;
            wanted.insert(object.id.clone());
            wanted.extend(object.data.text_object.iter().cloned());
            wanted.extend(object.data.parent_box.iter().cloned());
        }

        let copied: Vec<DesignObject> = side
            .objects
            .iter()
            .filter(|o| wanted.contains(&o.id))
            .cloned()
            .collect();
        self.clipboard = copied;
        Ok(self.clipboard.len())
    }

    pub fn clipboard_len(&self) -> usize {
        self.clipboard.len()
    }

    /// Paste the clipboard with fresh ids, remapping box/text links
    pub fn paste(&mut self, now: Instant) -> Result<Vec<ObjectId>> {
        if self.clipboard.is_empty() {
            return Ok(Vec::new());
        }

        let originals = self.clipboard.clone();
        let mapping: HashMap<ObjectId, ObjectId> = originals
            .iter()
            .map(|o| {
                let prefix = o.type_name();
                (o.id.clone(), self.fresh_id(prefix))
            })
            .collect();

        let mut pasted = Vec::with_capacity(originals.len());
        for mut object in originals {
            object.id = mapping[&object.id].clone();
            object.data.text_object = object
                .data
                .text_object
                .as_ref()
                .and_then(|id| mapping.get(id).cloned());
            object.data.parent_box = object
                .data
                .parent_box
                .as_ref()
                .and_then(|id| mapping.get(id).cloned());
            object.transform.left += PASTE_OFFSET;
            object.transform.top += PASTE_OFFSET;
            object.derive_interaction();
            pasted.push(object);
        }

        let side = self.side_mut()?;
        let ids = pasted.iter().map(|o| o.id.clone()).collect();
        side.objects.extend(pasted);
        side.repair_links();
        self.record_edit(now);
        Ok(ids)
    }

    /// Restore the previous snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.replay(true)
    }

    /// Re-apply an undone snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.replay(false)
    }

    fn replay(&mut self, backwards: bool) -> bool {
        let kind = self.active_side;
        let Some(history) = self.histories.get_mut(&kind) else {
            return false;
        };
        let step = if backwards { history.undo() } else { history.redo() };
        let snapshot = match step {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::debug!("{}", e);
                return false;
            }
        };

        let restored = Side::from_snapshot(&snapshot);
        let applied = match (restored, self.template.side_mut(kind)) {
            (Ok(side), Some(slot)) => {
                *slot = side;
                true
            }
            (Err(e), _) => {
                log::warn!("Discarding unreadable history entry: {}", e);
                false
            }
            (Ok(_), None) => false,
        };

        if let Some(history) = self.histories.get_mut(&kind) {
            history.end_replay();
        }
        applied
    }

    pub fn pages(&self) -> &[NamedPage] {
        &self.template.front.pages
    }

    pub fn active_page(&self) -> usize {
        self.active_page
    }

    fn store_active_page(&mut self) {
        let current = self.template.front.side.clone();
        if let Some(page) = self.template.front.pages.get_mut(self.active_page) {
            page.design = current;
        }
    }

    /// Append a blank named page and switch to it
    pub fn add_page(&mut self, name: impl Into<String>) -> Result<usize> {
        if self.template.front.pages.is_empty() {
            self.template.front.pages.push(NamedPage {
                name: "Page 1".to_string(),
                design: self.template.front.side.clone(),
            });
        }
        self.template.front.pages.push(NamedPage {
            name: name.into(),
            design: Side::new(self.template.size()),
        });
        let index = self.template.front.pages.len() - 1;
        self.switch_page(index)?;
        Ok(index)
    }

    /// Store the canvas into its page and load another one
    pub fn switch_page(&mut self, index: usize) -> Result<()> {
        if index >= self.template.front.pages.len() {
            return Err(TemplateError::ObjectNotFound(format!("page {}", index)));
        }
        self.set_active_side(SideKind::Front)?;
        self.store_active_page();

        let mut side = self.template.front.pages[index].design.clone();
        side.normalize();
        self.template.front.side = side;
        self.active_page = index;
        // Each page starts a fresh undo stack
        self.histories
            .insert(SideKind::Front, History::new(self.template.front.side.snapshot()?));
        Ok(())
    }
}
