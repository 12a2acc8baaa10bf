//! One face of a card: ordered objects, background and physical size.

use super::object::{Background, DesignObject, ObjectId, ObjectKind, ShapeProps};
use crate::constants::{mm_to_px, EDIT_DPI, MM_PER_INCH};
use crate::history::Snapshot;
use crate::types::{Result, TemplateError};
use serde::{Deserialize, Serialize};

/// Physical size of a side in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Default for SideSize {
    /// ISO/IEC 7810 ID-1 (CR80)
    fn default() -> Self {
        Self {
            width_mm: 85.6,
            height_mm: 54.0,
        }
    }
}

impl SideSize {
    pub fn new(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }

    /// Size in editor pixels
    pub fn to_px(&self) -> (f32, f32) {
        (mm_to_px(self.width_mm), mm_to_px(self.height_mm))
    }

    /// Size in pixels at an arbitrary resolution
    pub fn to_px_at(&self, dpi: f32) -> (u32, u32) {
        let w = (self.width_mm / MM_PER_INCH * dpi).round().max(1.0) as u32;
        let h = (self.height_mm / MM_PER_INCH * dpi).round().max(1.0) as u32;
        (w, h)
    }
}

/// Scene graph of one card face
///
/// Z-order equals position in `objects`; later objects draw on top.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Side {
    #[serde(default)]
    pub objects: Vec<DesignObject>,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub size: SideSize,
}

impl Side {
    pub fn new(size: SideSize) -> Self {
        Self {
            objects: Vec::new(),
            background: Background::default(),
            size,
        }
    }

    /// Editor-pixel scale factor for a target resolution
    pub fn scale_for_dpi(dpi: f32) -> f32 {
        dpi / EDIT_DPI
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| &o.id == id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&DesignObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut DesignObject> {
        self.objects.iter_mut().find(|o| &o.id == id)
    }

    pub(crate) fn require(&self, id: &ObjectId) -> Result<&DesignObject> {
        self.get(id)
            .ok_or_else(|| TemplateError::ObjectNotFound(id.to_string()))
    }

    pub(crate) fn require_mut(&mut self, id: &ObjectId) -> Result<&mut DesignObject> {
        self.get_mut(id)
            .ok_or_else(|| TemplateError::ObjectNotFound(id.to_string()))
    }

    /// Objects matching a predicate, in z-order
    pub fn find_all<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a DesignObject>
    where
        P: Fn(&DesignObject) -> bool + 'a,
    {
        self.objects.iter().filter(move |o| predicate(o))
    }

    /// Add an object on top of the stack
    pub fn add(&mut self, object: DesignObject) -> Result<()> {
        if self.contains(&object.id) {
            return Err(TemplateError::DuplicateId(object.id.to_string()));
        }
        self.objects.push(object);
        Ok(())
    }

    /// Remove an object together with any linked box or text.
    ///
    /// Returns the removed objects in their original z-order.
    pub fn remove(&mut self, id: &ObjectId) -> Result<Vec<DesignObject>> {
        let object = self.require(id)?;
        let mut doomed = vec![object.id.clone()];
        if let Some(text) = &object.data.text_object {
            doomed.push(text.clone());
        }
        if let Some(parent) = &object.data.parent_box {
            doomed.push(parent.clone());
        }

        let (removed, kept): (Vec<DesignObject>, Vec<DesignObject>) = std::mem::take(&mut self.objects)
            .into_iter()
            .partition(|o| doomed.contains(&o.id));
        self.objects = kept;
        Ok(removed)
    }

    /// Lock or unlock an object; locking is all-or-nothing
    pub fn set_locked(&mut self, id: &ObjectId, locked: bool) -> Result<()> {
        self.require_mut(id)?.set_locked(locked);
        Ok(())
    }

    /// Translate an object. Returns false when its locks forbid the move.
    pub fn move_by(&mut self, id: &ObjectId, dx: f32, dy: f32) -> Result<bool> {
        let object = self.require_mut(id)?;
        let dx = if object.locks.movement_x { 0.0 } else { dx };
        let dy = if object.locks.movement_y { 0.0 } else { dy };
        if dx == 0.0 && dy == 0.0 {
            return Ok(false);
        }
        object.transform.left += dx;
        object.transform.top += dy;

        if matches!(object.kind, ObjectKind::VariableBox(_)) {
            self.sync_variable_box(id)?;
        }
        Ok(true)
    }

    /// Set scale factors during an interactive resize
    pub fn scale_to(&mut self, id: &ObjectId, scale_x: f32, scale_y: f32) -> Result<bool> {
        let object = self.require_mut(id)?;
        let mut changed = false;
        if !object.locks.scaling_x && scale_x.is_finite() && scale_x > 0.0 {
            object.transform.scale_x = scale_x;
            changed = true;
        }
        if !object.locks.scaling_y && scale_y.is_finite() && scale_y > 0.0 {
            object.transform.scale_y = scale_y;
            changed = true;
        }
        Ok(changed)
    }

    /// Commit an interactive resize.
    ///
    /// Scale is folded into width/height so later layout math sees real
    /// sizes; a variable box then re-fits its inner text.
    pub fn end_scale(&mut self, id: &ObjectId) -> Result<()> {
        let object = self.require_mut(id)?;
        match object.kind {
            ObjectKind::VariableBox(_) => {
                object.transform.bake_scale();
                self.sync_variable_box(id)?;
            }
            ObjectKind::PhotoPlaceholder(_) | ObjectKind::MaskedPhoto(_) => {
                object.transform.bake_scale();
            }
            _ => {}
        }
        Ok(())
    }

    pub fn rotate_to(&mut self, id: &ObjectId, angle: f32) -> Result<bool> {
        let object = self.require_mut(id)?;
        if object.locks.rotation {
            return Ok(false);
        }
        object.transform.angle = angle.rem_euclid(360.0);

        if matches!(object.kind, ObjectKind::VariableBox(_)) {
            self.sync_variable_box(id)?;
        }
        Ok(true)
    }

    /// Move an object one step up the stack
    pub fn bring_forward(&mut self, id: &ObjectId) -> Result<()> {
        let index = self.position(id)?;
        if index + 1 < self.objects.len() {
            self.objects.swap(index, index + 1);
        }
        Ok(())
    }

    /// Move an object one step down the stack
    pub fn send_backward(&mut self, id: &ObjectId) -> Result<()> {
        let index = self.position(id)?;
        if index > 0 {
            self.objects.swap(index, index - 1);
        }
        Ok(())
    }

    pub fn bring_to_front(&mut self, id: &ObjectId) -> Result<()> {
        let index = self.position(id)?;
        let object = self.objects.remove(index);
        self.objects.push(object);
        Ok(())
    }

    pub fn send_to_back(&mut self, id: &ObjectId) -> Result<()> {
        let index = self.position(id)?;
        let object = self.objects.remove(index);
        self.objects.insert(0, object);
        Ok(())
    }

    fn position(&self, id: &ObjectId) -> Result<usize> {
        self.index_of(id)
            .ok_or_else(|| TemplateError::ObjectNotFound(id.to_string()))
    }

    /// Apply lock normalization to every object
    pub fn normalize_locks(&mut self) {
        for object in &mut self.objects {
            object.normalize_lock_state();
        }
    }

    /// Fix dangling box/text links left by older saves.
    ///
    /// A box whose text is gone degrades to a plain shape; a text whose box
    /// is gone becomes free-standing. Returns the ids that were repaired.
    pub fn repair_links(&mut self) -> Vec<ObjectId> {
        let ids: Vec<ObjectId> = self.objects.iter().map(|o| o.id.clone()).collect();
        let mut repaired = Vec::new();

        for object in &mut self.objects {
            if matches!(object.kind, ObjectKind::VariableBox(_)) {
                let linked = object
                    .data
                    .text_object
                    .as_ref()
                    .is_some_and(|text| ids.contains(text));
                if !linked {
                    log::warn!(
                        "Variable box {} lost its text object; keeping it as a shape",
                        object.id
                    );
                    object.kind = ObjectKind::Shape(ShapeProps::default());
                    object.data.text_object = None;
                    repaired.push(object.id.clone());
                }
            }

            let orphaned = object
                .data
                .parent_box
                .as_ref()
                .is_some_and(|parent| !ids.contains(parent));
            if orphaned {
                log::warn!("Text {} refers to a missing box; detaching it", object.id);
                object.data.parent_box = None;
                object.derive_interaction();
                repaired.push(object.id.clone());
            }
        }

        repaired
    }

    /// Serialize the side for history and persistence
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(serde_json::to_string(self)?))
    }

    /// Rebuild a side from a snapshot, normalizing locks and links
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let mut side: Side = serde_json::from_str(snapshot.as_str())?;
        side.normalize();
        Ok(side)
    }

    /// Post-load cleanup applied whenever a side enters the editor
    pub fn normalize(&mut self) {
        self.repair_links();
        self.normalize_locks();
    }
}
