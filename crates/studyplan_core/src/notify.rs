//! Change notification and derived-view invalidation.
//!
//! # Responsibility
//! - Name the persisted collections a mutation can touch.
//! - Map touched collections to the views that depend on them.
//! - Publish committed changes to registered listeners.
//! - Memoize derived values keyed by collection revisions (pull model).
//!
//! # Invariants
//! - Every committed mutation bumps the revision of each collection it
//!   touched, so a memo keyed by those revisions can never serve stale data.
//! - Listeners are invoked in registration order.

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Independently persisted collection of the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Subjects,
    Semesters,
    Lectures,
    Assignments,
    Todos,
    Profile,
    ActivityLog,
    Preferences,
    IdSequence,
}

const COLLECTION_COUNT: usize = 9;

impl Collection {
    pub const ALL: [Collection; COLLECTION_COUNT] = [
        Self::Subjects,
        Self::Semesters,
        Self::Lectures,
        Self::Assignments,
        Self::Todos,
        Self::Profile,
        Self::ActivityLog,
        Self::Preferences,
        Self::IdSequence,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Subjects => 0,
            Self::Semesters => 1,
            Self::Lectures => 2,
            Self::Assignments => 3,
            Self::Todos => 4,
            Self::Profile => 5,
            Self::ActivityLog => 6,
            Self::Preferences => 7,
            Self::IdSequence => 8,
        }
    }

    /// Views whose output is derived from this collection.
    pub fn dependent_views(self) -> &'static [ViewKind] {
        match self {
            Self::Subjects => &[ViewKind::SubjectList, ViewKind::Grades],
            Self::Semesters => &[
                ViewKind::SemesterList,
                ViewKind::AssignmentList,
                ViewKind::LectureList,
                ViewKind::Grades,
                ViewKind::Calendar,
            ],
            Self::Lectures => &[
                ViewKind::LectureList,
                ViewKind::TodaySchedule,
                ViewKind::Calendar,
            ],
            Self::Assignments => &[
                ViewKind::AssignmentList,
                ViewKind::Dashboard,
                ViewKind::UpcomingDeadlines,
                ViewKind::Grades,
                ViewKind::Calendar,
            ],
            Self::Todos => &[ViewKind::TodoList],
            Self::Profile => &[ViewKind::Profile],
            Self::ActivityLog => &[ViewKind::Activity],
            Self::Preferences => &[ViewKind::Theme],
            Self::IdSequence => &[],
        }
    }
}

/// Derived output consumed by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewKind {
    SubjectList,
    SemesterList,
    AssignmentList,
    LectureList,
    Dashboard,
    UpcomingDeadlines,
    TodaySchedule,
    Grades,
    Calendar,
    TodoList,
    Profile,
    Activity,
    Theme,
}

/// Set of collections touched by one committed mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    collections: BTreeSet<Collection>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: Collection) {
        self.collections.insert(collection);
    }

    pub fn contains(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn collections(&self) -> impl Iterator<Item = Collection> + '_ {
        self.collections.iter().copied()
    }

    /// Union of dependent views, sorted and deduplicated.
    pub fn affected_views(&self) -> BTreeSet<ViewKind> {
        self.collections
            .iter()
            .flat_map(|collection| collection.dependent_views().iter().copied())
            .collect()
    }
}

impl FromIterator<Collection> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Collection>>(iter: I) -> Self {
        Self {
            collections: iter.into_iter().collect(),
        }
    }
}

/// Event delivered to listeners after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// In-memory state changed; affected views must be re-read.
    Committed(ChangeSet),
    /// Write-through failed; state is kept in memory and retried later.
    PersistenceFailed { key: &'static str, message: String },
}

/// Receiver of change events, typically the rendering layer.
pub trait ChangeListener {
    fn on_change(&self, event: &ChangeEvent);
}

impl<F: Fn(&ChangeEvent)> ChangeListener for F {
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned by `ChangeBus::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Ordered listener registry.
#[derive(Default)]
pub struct ChangeBus {
    listeners: Vec<(ListenerId, Box<dyn ChangeListener>)>,
    next_id: u64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns whether a listener was removed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn publish(&self, event: &ChangeEvent) {
        for (_, listener) in &self.listeners {
            listener.on_change(event);
        }
    }
}

/// Per-collection revision counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revisions {
    counters: [u64; COLLECTION_COUNT],
}

impl Revisions {
    pub fn bump(&mut self, collection: Collection) {
        self.counters[collection.index()] += 1;
    }

    pub fn get(&self, collection: Collection) -> u64 {
        self.counters[collection.index()]
    }

    /// Revision vector for a dependency list, used as a memo stamp.
    pub fn stamp(&self, dependencies: &[Collection]) -> Vec<u64> {
        dependencies.iter().map(|c| self.get(*c)).collect()
    }
}

/// Single-slot memo keyed by an argument and a revision stamp.
///
/// Recomputes when either the argument or any dependency revision changed.
pub struct Memo<K, T> {
    slot: RefCell<Option<(K, Vec<u64>, T)>>,
}

impl<K, T> Default for Memo<K, T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<K: PartialEq + Clone, T: Clone> Memo<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, key: &K, stamp: Vec<u64>, compute: impl FnOnce() -> T) -> T {
        if let Some((cached_key, cached_stamp, value)) = self.slot.borrow().as_ref() {
            if cached_key == key && *cached_stamp == stamp {
                return value.clone();
            }
        }
        let value = compute();
        *self.slot.borrow_mut() = Some((key.clone(), stamp, value.clone()));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, ChangeEvent, ChangeSet, Collection, Memo, Revisions, ViewKind};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn affected_views_are_deduplicated() {
        let changes: ChangeSet = [Collection::Assignments, Collection::Lectures]
            .into_iter()
            .collect();
        let views = changes.affected_views();
        assert!(views.contains(&ViewKind::Calendar));
        assert!(views.contains(&ViewKind::Dashboard));
        assert!(views.contains(&ViewKind::TodaySchedule));
        assert_eq!(
            views.iter().filter(|v| **v == ViewKind::Calendar).count(),
            1
        );
    }

    #[test]
    fn memo_recomputes_only_after_revision_bump() {
        let memo: Memo<(), u32> = Memo::new();
        let mut revisions = Revisions::default();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            7
        };

        let deps = [Collection::Assignments];
        memo.get_or_compute(&(), revisions.stamp(&deps), compute);
        memo.get_or_compute(&(), revisions.stamp(&deps), compute);
        assert_eq!(calls.get(), 1);

        revisions.bump(Collection::Todos);
        memo.get_or_compute(&(), revisions.stamp(&deps), compute);
        assert_eq!(calls.get(), 1);

        revisions.bump(Collection::Assignments);
        memo.get_or_compute(&(), revisions.stamp(&deps), compute);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn bus_delivers_in_order_and_supports_unsubscribe() {
        let seen = Rc::new(Cell::new(0u32));
        let mut bus = ChangeBus::new();
        let first = Rc::clone(&seen);
        let id = bus.subscribe(Box::new(move |_: &ChangeEvent| {
            first.set(first.get() * 10 + 1);
        }));
        let second = Rc::clone(&seen);
        bus.subscribe(Box::new(move |_: &ChangeEvent| {
            second.set(second.get() * 10 + 2);
        }));

        bus.publish(&ChangeEvent::Committed(ChangeSet::new()));
        assert_eq!(seen.get(), 12);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.len(), 1);
    }
}
