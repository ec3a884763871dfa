use serde::{Deserialize, Serialize};

/// Identifier of a physical key, as reported by the host input system.
pub type KeyCode = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A raw key transition from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    #[serde(rename = "type")]
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Down,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Up,
        }
    }
}

/// Keys currently held, in the order they were pressed. No duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeldKeys {
    codes: Vec<KeyCode>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: KeyCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.codes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Returns `false` if the key was already held.
    fn press(&mut self, code: KeyCode) -> bool {
        if self.contains(code) {
            return false;
        }
        self.codes.push(code);
        true
    }

    /// Returns `false` if the key was not held.
    fn release(&mut self, code: KeyCode) -> bool {
        match self.codes.iter().position(|&c| c == code) {
            Some(idx) => {
                self.codes.remove(idx);
                true
            },
            None => false,
        }
    }
}

/// Folds key transitions into the current [`HeldKeys`] set.
///
/// Every code is tracked, including ones no player uses; filtering happens
/// in the control mapping.
#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    held: HeldKeys,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the resulting held set.
    ///
    /// Repeated key-down (auto-repeat) and key-up without a prior key-down are
    /// both no-ops.
    pub fn apply(&mut self, event: KeyEvent) -> &HeldKeys {
        let changed = match event.kind {
            KeyEventKind::Down => self.held.press(event.code),
            KeyEventKind::Up => self.held.release(event.code),
        };
        if !changed {
            tracing::trace!(code = event.code, kind = ?event.kind, "Key event left held set unchanged");
        }
        &self.held
    }

    pub fn held(&self) -> &HeldKeys {
        &self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(held: &HeldKeys) -> Vec<KeyCode> {
        held.iter().collect()
    }

    #[test]
    fn down_appends_in_press_order() {
        let mut tracker = KeyTracker::new();
        tracker.apply(KeyEvent::down(39));
        tracker.apply(KeyEvent::down(65));
        assert_eq!(codes(tracker.held()), vec![39, 65]);
    }

    #[test]
    fn repeated_down_does_not_duplicate() {
        let mut tracker = KeyTracker::new();
        tracker.apply(KeyEvent::down(37));
        tracker.apply(KeyEvent::down(37));
        tracker.apply(KeyEvent::down(37));
        assert_eq!(codes(tracker.held()), vec![37]);
    }

    #[test]
    fn up_removes_only_that_code() {
        let mut tracker = KeyTracker::new();
        tracker.apply(KeyEvent::down(37));
        tracker.apply(KeyEvent::down(39));
        tracker.apply(KeyEvent::down(68));
        tracker.apply(KeyEvent::up(39));
        assert_eq!(codes(tracker.held()), vec![37, 68]);
    }

    #[test]
    fn up_without_down_is_noop() {
        let mut tracker = KeyTracker::new();
        tracker.apply(KeyEvent::down(65));
        let held = tracker.apply(KeyEvent::up(39));
        assert_eq!(codes(held), vec![65]);
    }

    #[test]
    fn re_press_moves_key_to_end() {
        let mut tracker = KeyTracker::new();
        tracker.apply(KeyEvent::down(37));
        tracker.apply(KeyEvent::down(39));
        tracker.apply(KeyEvent::up(37));
        tracker.apply(KeyEvent::down(37));
        assert_eq!(codes(tracker.held()), vec![39, 37]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn held_set_matches_last_event_per_code(
                events in proptest::collection::vec((0u32..6, proptest::bool::ANY), 0..60)
            ) {
                let mut tracker = KeyTracker::new();
                let mut last_down = std::collections::HashMap::new();
                for &(code, down) in &events {
                    let event = if down { KeyEvent::down(code) } else { KeyEvent::up(code) };
                    tracker.apply(event);
                    last_down.insert(code, down);
                }

                let held: Vec<KeyCode> = tracker.held().iter().collect();
                let mut dedup = held.clone();
                dedup.sort_unstable();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), held.len(), "duplicates in {:?}", held);

                for (code, down) in last_down {
                    prop_assert_eq!(
                        tracker.held().contains(code),
                        down,
                        "code {} last down={} but held={:?}",
                        code,
                        down,
                        held
                    );
                }
            }
        }
    }
}
