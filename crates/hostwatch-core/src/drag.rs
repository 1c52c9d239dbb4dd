//! Edit mode and drag reordering of dashboard cards.
//!
//! [`DragState::reduce`] is a pure reducer over the slot sequence of the card
//! container; [`DragReorder`] owns edit mode and projects the reducer's state
//! onto the view (banner, placeholder node, hidden source, child order).

use crate::order::{restore_order, OrderStore};
use crate::view::{Field, NodeKind, ViewError, ViewHandle};

/// Banner text shown at the top of the container while editing.
pub const EDIT_BANNER: &str = "Drag cards to reorder them. Press e when done.";

/// Horizontal extent of the card under the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub width: f64,
}

impl Bounds {
    /// Whether `x` lies in the right half.
    pub fn right_half(&self, x: f64) -> bool {
        (x - self.left) / self.width > 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragMsg {
    Start(String),
    Over {
        pointer_x: f64,
        candidate: String,
        bounds: Bounds,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Card(String),
    Placeholder,
}

/// Cards in display order plus the drag in progress, if any.
///
/// While dragging, the source keeps its slot (it is only hidden) and a
/// [`Slot::Placeholder`] marks the drop position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DragState {
    slots: Vec<Slot>,
    source: Option<String>,
}

impl DragState {
    pub fn new(cards: impl IntoIterator<Item = String>) -> Self {
        Self {
            slots: cards.into_iter().map(Slot::Card).collect(),
            source: None,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }

    pub fn placeholder_index(&self) -> Option<usize> {
        self.slots.iter().position(|s| *s == Slot::Placeholder)
    }

    /// Card ids in slot order, placeholder excluded.
    pub fn cards(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                Slot::Card(id) => Some(id.clone()),
                Slot::Placeholder => None,
            })
            .collect()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Slot::Card(c) if c == id))
    }

    pub fn reduce(self, msg: DragMsg) -> DragState {
        match msg {
            DragMsg::Start(id) => self.start(id),
            DragMsg::Over {
                pointer_x,
                candidate,
                bounds,
            } => self.over(pointer_x, &candidate, bounds),
            DragMsg::End => self.end(),
        }
    }

    fn start(self, id: String) -> DragState {
        // a new drag always settles the previous one first
        let mut state = self.end();
        let Some(at) = state.index_of(&id) else {
            return state;
        };
        state.slots.insert(at + 1, Slot::Placeholder);
        state.source = Some(id);
        state
    }

    fn over(mut self, pointer_x: f64, candidate: &str, bounds: Bounds) -> DragState {
        if self.source.as_deref().is_none_or(|s| s == candidate) {
            return self;
        }
        let Some(from) = self.placeholder_index() else {
            return self;
        };
        self.slots.remove(from);
        let Some(at) = self.index_of(candidate) else {
            self.slots.insert(from, Slot::Placeholder);
            return self;
        };
        let to = if bounds.right_half(pointer_x) { at + 1 } else { at };
        self.slots.insert(to, Slot::Placeholder);
        self
    }

    fn end(self) -> DragState {
        let Some(source) = self.source else {
            return DragState {
                slots: self
                    .slots
                    .into_iter()
                    .filter(|s| *s != Slot::Placeholder)
                    .collect(),
                source: None,
            };
        };
        let has_placeholder = self.slots.contains(&Slot::Placeholder);
        let slots = self
            .slots
            .into_iter()
            .filter_map(|s| match s {
                Slot::Placeholder => Some(Slot::Card(source.clone())),
                Slot::Card(id) if id == source && has_placeholder => None,
                other => Some(other),
            })
            .collect();
        DragState {
            slots,
            source: None,
        }
    }
}

// ============================================================
// Edit mode + projection onto the view
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    Viewing,
    Editing(DragState),
}

/// Owns edit mode for one card container.
#[derive(Debug)]
pub struct DragReorder {
    container: String,
    banner: String,
    placeholder: String,
    mode: EditMode,
}

impl DragReorder {
    pub fn new(container: impl Into<String>) -> Self {
        let container = container.into();
        Self {
            banner: format!("{container}-edit-banner"),
            placeholder: format!("{container}-placeholder"),
            container,
            mode: EditMode::Viewing,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditMode::Editing(_))
    }

    pub fn placeholder_id(&self) -> &str {
        &self.placeholder
    }

    /// Enter edit mode if not already in it.
    pub fn enter<V: ViewHandle>(&mut self, view: &mut V) -> Result<(), ViewError> {
        if self.is_editing() {
            return Ok(());
        }
        let cards = card_children(view, &self.container)?;
        view.create(&self.container, &self.banner, NodeKind::Banner)?;
        view.patch(&self.banner, Field::Text(EDIT_BANNER.to_string()))?;
        self.mode = EditMode::Editing(DragState::new(cards));
        self.project(view)?;
        tracing::debug!(container = %self.container, "edit mode on");
        Ok(())
    }

    /// Leave edit mode, finishing any drag, and persist the card order.
    ///
    /// Returns the order that was persisted, or `None` when not editing.
    /// A failing store is logged; the on-screen order stands either way.
    pub fn exit<V: ViewHandle>(
        &mut self,
        view: &mut V,
        store: &mut dyn OrderStore,
    ) -> Result<Option<Vec<String>>, ViewError> {
        if !self.is_editing() {
            return Ok(None);
        }
        self.handle(view, DragMsg::End)?;
        self.mode = EditMode::Viewing;
        if view.exists(&self.banner) {
            view.remove(&self.banner)?;
        }

        let order = card_children(view, &self.container)?;
        if let Err(e) = store.save(&order) {
            tracing::warn!(error = %e, "failed to persist card order");
        }
        tracing::debug!(container = %self.container, cards = order.len(), "edit mode off");
        Ok(Some(order))
    }

    /// Toggle edit mode.
    pub fn toggle<V: ViewHandle>(
        &mut self,
        view: &mut V,
        store: &mut dyn OrderStore,
    ) -> Result<(), ViewError> {
        if self.is_editing() {
            self.exit(view, store).map(|_| ())
        } else {
            self.enter(view)
        }
    }

    /// Feed a drag message. Ignored (returns `false`) outside edit mode.
    pub fn handle<V: ViewHandle>(&mut self, view: &mut V, msg: DragMsg) -> Result<bool, ViewError> {
        let EditMode::Editing(state) = std::mem::replace(&mut self.mode, EditMode::Viewing) else {
            return Ok(false);
        };
        let state = match msg {
            // pick up cards that arrived since the last drag
            DragMsg::Start(_) if !state.is_dragging() => {
                DragState::new(card_children(view, &self.container)?).reduce(msg)
            }
            _ => state.reduce(msg),
        };
        self.mode = EditMode::Editing(state);
        self.project(view)?;
        Ok(true)
    }

    /// Order the container's cards by a stored order.
    pub fn restore<V: ViewHandle>(&self, view: &mut V, stored: &[String]) -> Result<(), ViewError> {
        let current = card_children(view, &self.container)?;
        let order = restore_order(&current, stored);
        let mut children = Vec::with_capacity(order.len() + 1);
        if view.exists(&self.banner) {
            children.push(self.banner.clone());
        }
        children.extend(order);
        view.patch(&self.container, Field::Children(children))
    }

    fn project<V: ViewHandle>(&self, view: &mut V) -> Result<(), ViewError> {
        let state = match &self.mode {
            EditMode::Editing(state) => state,
            EditMode::Viewing => return Ok(()),
        };

        let wants_placeholder = state.placeholder_index().is_some();
        let has_placeholder = view.exists(&self.placeholder);
        if wants_placeholder && !has_placeholder {
            view.create(&self.container, &self.placeholder, NodeKind::Placeholder)?;
        } else if !wants_placeholder && has_placeholder {
            view.remove(&self.placeholder)?;
        }
        if let Some(source) = state.source() {
            view.patch(&self.placeholder, Field::Text(source.to_string()))?;
        }

        for id in state.cards() {
            let hidden = state.source() == Some(id.as_str());
            if view.locate(&id)?.hidden != hidden {
                view.patch(&id, Field::Hidden(hidden))?;
            }
        }

        let mut children = Vec::with_capacity(state.slots().len() + 1);
        if view.exists(&self.banner) {
            children.push(self.banner.clone());
        }
        for slot in state.slots() {
            children.push(match slot {
                Slot::Card(id) => id.clone(),
                Slot::Placeholder => self.placeholder.clone(),
            });
        }
        view.patch(&self.container, Field::Children(children))
    }
}

/// Ids of the container's card children in display order.
fn card_children<V: ViewHandle>(view: &V, container: &str) -> Result<Vec<String>, ViewError> {
    let node = view.locate(container)?;
    let mut out = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if view.locate(child)?.kind == NodeKind::Card {
            out.push(child.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::MemoryOrderStore;
    use crate::view::{ViewTree, ROOT};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const WIDE: Bounds = Bounds {
        left: 0.0,
        width: 10.0,
    };

    fn over(candidate: &str, x: f64) -> DragMsg {
        DragMsg::Over {
            pointer_x: x,
            candidate: candidate.to_string(),
            bounds: WIDE,
        }
    }

    fn setup(cards: &[&str]) -> (ViewTree, DragReorder) {
        let mut view = ViewTree::new();
        view.create(ROOT, "cards", NodeKind::Container).unwrap();
        for c in cards {
            view.create("cards", c, NodeKind::Card).unwrap();
        }
        (view, DragReorder::new("cards"))
    }

    // ---- reducer ----

    #[test]
    fn test_start_places_placeholder_after_source() {
        let s = DragState::new(ids(&["a", "b", "c"])).reduce(DragMsg::Start("a".into()));
        assert_eq!(
            s.slots(),
            [
                Slot::Card("a".into()),
                Slot::Placeholder,
                Slot::Card("b".into()),
                Slot::Card("c".into())
            ]
        );
        assert_eq!(s.source(), Some("a"));
    }

    #[test]
    fn test_over_uses_midpoint() {
        let s = DragState::new(ids(&["a", "b", "c"]))
            .reduce(DragMsg::Start("a".into()))
            .reduce(over("c", 7.0));
        assert_eq!(s.placeholder_index(), Some(3));

        let s = s.reduce(over("c", 3.0));
        assert_eq!(s.placeholder_index(), Some(2));

        // exactly on the midpoint counts as the left half
        let s = s.reduce(over("b", 5.0));
        assert_eq!(s.placeholder_index(), Some(1));
    }

    #[test]
    fn test_over_ignores_source_and_unknown() {
        let s = DragState::new(ids(&["a", "b"])).reduce(DragMsg::Start("b".into()));
        let before = s.clone();
        assert_eq!(s.clone().reduce(over("b", 9.0)), before);
        assert_eq!(s.clone().reduce(over("zzz", 9.0)), before);
        // no drag in progress
        let idle = DragState::new(ids(&["a", "b"]));
        assert_eq!(idle.clone().reduce(over("a", 9.0)), idle);
    }

    #[test]
    fn test_end_moves_source_to_placeholder() {
        let s = DragState::new(ids(&["a", "b", "c"]))
            .reduce(DragMsg::Start("a".into()))
            .reduce(over("c", 9.0))
            .reduce(DragMsg::End);
        assert_eq!(s.cards(), ["b", "c", "a"]);
        assert!(!s.is_dragging());
        assert_eq!(s.placeholder_index(), None);
    }

    #[test]
    fn test_start_then_end_keeps_order() {
        let s = DragState::new(ids(&["a", "b", "c"]))
            .reduce(DragMsg::Start("b".into()))
            .reduce(DragMsg::End);
        assert_eq!(s.cards(), ["a", "b", "c"]);
        assert_eq!(s.slots().len(), 3);
    }

    #[test]
    fn test_start_unknown_card_is_noop() {
        let s = DragState::new(ids(&["a"])).reduce(DragMsg::Start("nope".into()));
        assert!(!s.is_dragging());
        assert_eq!(s.slots().len(), 1);
    }

    // ---- edit mode ----

    #[test]
    fn test_messages_ignored_outside_edit_mode() {
        let (mut view, mut drag) = setup(&["a", "b"]);
        assert!(!drag.handle(&mut view, DragMsg::Start("a".into())).unwrap());
        assert!(!view.exists(drag.placeholder_id()));
        assert!(!view.locate("a").unwrap().hidden);
    }

    #[test]
    fn test_enter_shows_banner_and_is_idempotent() {
        let (mut view, mut drag) = setup(&["a", "b"]);
        drag.enter(&mut view).unwrap();
        drag.enter(&mut view).unwrap();
        assert_eq!(
            view.children("cards"),
            ["cards-edit-banner", "a", "b"]
        );
        assert_eq!(view.text("cards-edit-banner"), Some(EDIT_BANNER));
    }

    #[test]
    fn test_drag_projects_onto_view() {
        let (mut view, mut drag) = setup(&["a", "b", "c"]);
        drag.enter(&mut view).unwrap();
        drag.handle(&mut view, DragMsg::Start("a".into())).unwrap();
        assert!(view.locate("a").unwrap().hidden);
        assert_eq!(
            view.children("cards"),
            ["cards-edit-banner", "a", "cards-placeholder", "b", "c"]
        );
        assert_eq!(view.text("cards-placeholder"), Some("a"));

        drag.handle(&mut view, over("b", 8.0)).unwrap();
        assert_eq!(
            view.children("cards"),
            ["cards-edit-banner", "a", "b", "cards-placeholder", "c"]
        );

        drag.handle(&mut view, DragMsg::End).unwrap();
        assert_eq!(view.children("cards"), ["cards-edit-banner", "b", "a", "c"]);
        assert!(!view.exists("cards-placeholder"));
        assert!(!view.locate("a").unwrap().hidden);
    }

    #[test]
    fn test_drag_end_without_over_restores_visible_card() {
        let (mut view, mut drag) = setup(&["a", "b"]);
        drag.enter(&mut view).unwrap();
        drag.handle(&mut view, DragMsg::Start("b".into())).unwrap();
        drag.handle(&mut view, DragMsg::End).unwrap();

        let b = view.locate("b").unwrap();
        assert!(!b.hidden);
        assert_eq!(b.parent.as_deref(), Some("cards"));
        assert_eq!(view.children("cards"), ["cards-edit-banner", "a", "b"]);
    }

    #[test]
    fn test_exit_mid_drag_finishes_and_persists() {
        let (mut view, mut drag) = setup(&["a", "b", "c"]);
        let mut store = MemoryOrderStore::new();
        drag.enter(&mut view).unwrap();
        drag.handle(&mut view, DragMsg::Start("c".into())).unwrap();
        drag.handle(&mut view, over("a", 1.0)).unwrap();

        let saved = drag.exit(&mut view, &mut store).unwrap();
        assert_eq!(saved, Some(ids(&["c", "a", "b"])));
        assert_eq!(view.children("cards"), ["c", "a", "b"]);
        assert!(!view.locate("c").unwrap().hidden);
        assert_eq!(store.load().unwrap(), ["c", "a", "b"]);

        // leaving again does nothing
        assert_eq!(drag.exit(&mut view, &mut store).unwrap(), None);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_late_card_can_be_dragged() {
        let (mut view, mut drag) = setup(&["a"]);
        drag.enter(&mut view).unwrap();
        view.create("cards", "late", NodeKind::Card).unwrap();
        drag.handle(&mut view, DragMsg::Start("late".into())).unwrap();
        drag.handle(&mut view, over("a", 0.0)).unwrap();
        drag.handle(&mut view, DragMsg::End).unwrap();
        assert_eq!(view.children("cards"), ["cards-edit-banner", "late", "a"]);
    }

    #[test]
    fn test_restore() {
        let (mut view, drag) = setup(&["card-a", "card-b", "card-c"]);
        drag.restore(&mut view, &ids(&["card-c", "card-x", "card-a"]))
            .unwrap();
        assert_eq!(view.children("cards"), ["card-c", "card-a", "card-b"]);
    }

    #[test]
    fn test_toggle() {
        let (mut view, mut drag) = setup(&["a"]);
        let mut store = MemoryOrderStore::new();
        drag.toggle(&mut view, &mut store).unwrap();
        assert!(drag.is_editing());
        drag.toggle(&mut view, &mut store).unwrap();
        assert!(!drag.is_editing());
        assert!(!view.exists("cards-edit-banner"));
        assert_eq!(store.saves(), 1);
    }
}
