use std::sync::Arc;

use crate::store::GraphState;

/// Remembers the last value of a projection and reports whether a new value differs.
///
/// Equality is whatever [`PartialEq`] says for `T`; for a struct of flags that is a
/// field-by-field comparison, which is all a subscriber needs to decide whether to re-render.
#[derive(Clone, Debug)]
pub struct Memo<T> {
    value: Option<T>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: PartialEq> Memo<T> {
    /// Store `next` if it differs from the current value. Returns whether it did.
    pub fn update(&mut self, next: T) -> bool {
        if self.value.as_ref() == Some(&next) {
            false
        } else {
            self.value = Some(next);
            true
        }
    }

    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

impl<T: PartialEq> Memo<Arc<[T]>> {
    /// Like [`Memo::update`] for sequences, comparing element by element and keeping the
    /// previous allocation when nothing changed.
    pub fn update_seq(&mut self, next: Vec<T>) -> bool {
        match &self.value {
            Some(current) if **current == *next => false,
            _ => {
                self.value = Some(next.into());
                true
            }
        }
    }
}

/// A selector function over the store state together with the memo of its last output.
pub struct Selector<T> {
    select: fn(&GraphState) -> T,
    memo: Memo<T>,
}

impl<T: PartialEq> Selector<T> {
    #[must_use]
    pub fn new(select: fn(&GraphState) -> T) -> Self {
        Self {
            select,
            memo: Memo::default(),
        }
    }

    /// Evaluate the selector on `state`; returns whether the selected slice changed.
    pub fn poll(&mut self, state: &GraphState) -> bool {
        self.memo.update((self.select)(state))
    }

    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.memo.get()
    }
}

#[cfg(test)]
mod tests {
    use emath::pos2;

    use super::*;
    use crate::{model::Node, viewport::Viewport};

    #[derive(Debug, PartialEq)]
    struct Flags {
        focusable: bool,
        width: f32,
    }

    fn flags(state: &GraphState) -> Flags {
        Flags {
            focusable: state.edges_focusable,
            width: state.width,
        }
    }

    #[test]
    fn selector_ignores_unselected_fields() -> anyhow::Result<()> {
        let mut state = GraphState::default();
        let mut selector = Selector::new(flags);
        assert!(selector.poll(&state));

        state.add_node(Node::new("n1", pos2(0.0, 0.0), emath::Vec2::ZERO))?;
        state.set_viewport(Viewport { x: 10.0, y: 10.0, zoom: 2.0 });
        state.user_selection_active = true;
        assert!(!selector.poll(&state));

        state.edges_focusable = false;
        assert!(selector.poll(&state));
        assert_eq!(
            selector.get(),
            Some(&Flags {
                focusable: false,
                width: 0.0
            })
        );
        Ok(())
    }

    #[test]
    fn sequence_memo_keeps_allocation() {
        let mut memo: Memo<Arc<[u32]>> = Memo::default();
        assert!(memo.update_seq(vec![1, 2, 3]));
        let first = memo.get().cloned();

        assert!(!memo.update_seq(vec![1, 2, 3]));
        assert!(Arc::ptr_eq(first.as_ref().unwrap(), memo.get().unwrap()));

        assert!(memo.update_seq(vec![1, 3]));
        assert!(!Arc::ptr_eq(first.as_ref().unwrap(), memo.get().unwrap()));
    }
}
