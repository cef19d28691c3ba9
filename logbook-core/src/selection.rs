//! Ordered, name-keyed list with a single selection.
//!
//! Used for the workload list and the container tabs. Selection changes are
//! queued as [`SelectionEvent`]s; the owner drains them with
//! [`SelectionList::take_events`] after each mutation.

use crate::error::ListError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem<S> {
    pub name: String,
    pub style: S,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    Changed { name: String, index: usize },
}

#[derive(Debug)]
pub struct SelectionList<S> {
    items: Vec<ListItem<S>>,
    selected: Option<usize>,
    events: Vec<SelectionEvent>,
}

impl<S> Default for SelectionList<S> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            events: Vec::new(),
        }
    }
}

impl<S> SelectionList<S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Append an item. Names are unique.
    pub fn add_item(&mut self, name: impl Into<String>, style: S) -> Result<(), ListError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(ListError::Duplicate { name });
        }
        self.items.push(ListItem { name, style });
        Ok(())
    }

    pub fn set_style(&mut self, name: &str, style: S) -> Result<(), ListError> {
        let index = self.position(name).ok_or_else(|| ListError::NotFound {
            name: name.to_string(),
        })?;
        self.items[index].style = style;
        Ok(())
    }

    /// Remove an item. Removing the selected item clears the selection;
    /// removing an earlier one keeps the selection on the same item.
    pub fn delete_item(&mut self, name: &str) -> Result<(), ListError> {
        let index = self.position(name).ok_or_else(|| ListError::NotFound {
            name: name.to_string(),
        })?;
        self.items.remove(index);

        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Ok(())
    }

    /// Select `index`, clamped to the last item. Selecting the current item
    /// does nothing.
    pub fn select_at(&mut self, index: usize) {
        let Some(last) = self.items.len().checked_sub(1) else {
            return;
        };
        let index = index.min(last);
        if self.selected == Some(index) {
            return;
        }

        self.selected = Some(index);
        self.events.push(SelectionEvent::Changed {
            name: self.items[index].name.clone(),
            index,
        });
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let next = match self.selected {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        };
        self.select_at(next);
    }

    pub fn select_prev(&mut self) {
        let Some(last) = self.items.len().checked_sub(1) else {
            return;
        };
        let prev = match self.selected {
            Some(0) | None => last,
            Some(i) => i - 1,
        };
        self.select_at(prev);
    }

    /// Remove every item and the selection. Queued events are kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ListItem<S>] {
        &self.items
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.items.get(i))
            .map(|item| item.name.as_str())
    }

    /// Drain queued selection events, oldest first.
    pub fn take_events(&mut self) -> Vec<SelectionEvent> {
        std::mem::take(&mut self.events)
    }
}
