//! Group-scoped ordering of records.
//!
//! Records such as modules (ordered within a course) and contents (ordered
//! within a module) carry an `order` value. When a record is created without
//! an explicit order, it is placed after every record of its group, that is
//! it receives `max + 1`, or `0` when the group is empty. Explicit orders are
//! kept as they are, even if they collide with other records.
//!
//! Groups are typed: an [`Ordered`] record names the values which scope its
//! ordering as [`Ordered::Group`], usually a tuple of its fields. A record
//! ordered globally uses `()`.

use diesel::{dsl::max, prelude::*};
use std::convert::Infallible;

use crate::db::{
    Connection,
    models as db,
    schema::{contents, modules},
};

/// A record ordered within a group.
pub trait Ordered {
    /// Values scoping ordering of this record.
    type Group: PartialEq;

    /// Group this record belongs to.
    fn group(&self) -> Self::Group;

    /// Current order of this record, if one is set.
    fn order(&self) -> Option<i32>;
}

/// A record which was not yet persisted and can have its order assigned.
pub trait Candidate: Ordered {
    fn set_order(&mut self, order: i32);
}

/// Set of persisted records, capable of finding the last order in a group.
pub trait OrderSource<T: Ordered + ?Sized> {
    type Error;

    /// Find the largest order of any record in `group`.
    ///
    /// Returns `None` when the group has no records.
    fn last_order(&self, group: &T::Group) -> Result<Option<i32>, Self::Error>;
}

/// Assign an order to a record about to be persisted.
///
/// If `record` already has an order it is returned as is and `source` is not
/// consulted. Otherwise the record is placed after the last record of its
/// group in `source`.
///
/// This function should be called exactly once for each record, immediately
/// before it is first persisted. It never changes orders of other records.
///
/// Fails with [`AssignError::Overflow`] when the last record of the group
/// already has the largest possible order.
pub fn assign_order<T, S>(source: &S, record: &mut T)
-> Result<i32, AssignError<S::Error>>
where
    T: Candidate,
    S: OrderSource<T> + ?Sized,
{
    if let Some(order) = record.order() {
        return Ok(order);
    }

    let order = match source.last_order(&record.group()).map_err(AssignError::Source)? {
        Some(last) => last.checked_add(1).ok_or(AssignError::Overflow)?,
        None => 0,
    };

    record.set_order(order);

    Ok(order)
}

#[derive(Debug, Eq, PartialEq)]
pub enum AssignError<E> {
    /// Last order of the group could not be found.
    Source(E),
    /// There is no order after the group's last.
    Overflow,
}

impl<'a, R: Ordered + ?Sized> Ordered for &'a R {
    type Group = R::Group;

    fn group(&self) -> R::Group {
        (**self).group()
    }

    fn order(&self) -> Option<i32> {
        (**self).order()
    }
}

/// A slice of records already in memory.
///
/// Records without an order are ignored.
impl<T, R> OrderSource<T> for [R]
where
    T: Ordered + ?Sized,
    R: Ordered<Group = T::Group>,
{
    type Error = Infallible;

    fn last_order(&self, group: &T::Group) -> Result<Option<i32>, Infallible> {
        Ok(self.iter()
            .filter(|record| record.group() == *group)
            .filter_map(Ordered::order)
            .max())
    }
}

/// In-memory record of orders taken within groups.
///
/// Unlike a slice of records, a ledger can be extended as new records are
/// placed, which makes it suitable for assigning orders to a batch of records
/// which are persisted together.
#[derive(Clone, Debug)]
pub struct OrderLedger<G> {
    entries: Vec<(G, i32)>,
}

impl<G: PartialEq> OrderLedger<G> {
    pub fn new() -> Self {
        OrderLedger { entries: Vec::new() }
    }

    /// Create a ledger of orders taken by `records`.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator,
        I::Item: Ordered<Group = G>,
    {
        let mut ledger = OrderLedger::new();
        for record in records {
            ledger.record(&record);
        }
        ledger
    }

    /// Note that `record` has taken its order.
    ///
    /// Records without an order are ignored.
    pub fn record<R>(&mut self, record: &R)
    where
        R: Ordered<Group = G> + ?Sized,
    {
        if let Some(order) = record.order() {
            self.entries.push((record.group(), order));
        }
    }

    /// Assign an order to `record` (see [`assign_order`]) and record it in
    /// this ledger.
    pub fn place<T>(&mut self, record: &mut T) -> Result<i32, AssignError<Infallible>>
    where
        T: Candidate<Group = G>,
    {
        let order = assign_order(&*self, record)?;
        self.record(&*record);
        Ok(order)
    }
}

impl<G: PartialEq> Default for OrderLedger<G> {
    fn default() -> Self {
        OrderLedger::new()
    }
}

impl<T, G> OrderSource<T> for OrderLedger<G>
where
    T: Ordered<Group = G> + ?Sized,
    G: PartialEq,
{
    type Error = Infallible;

    fn last_order(&self, group: &G) -> Result<Option<i32>, Infallible> {
        Ok(self.entries.iter()
            .filter(|(g, _)| g == group)
            .map(|&(_, order)| order)
            .max())
    }
}

impl Ordered for db::Module {
    type Group = i32;

    fn group(&self) -> i32 {
        self.course
    }

    fn order(&self) -> Option<i32> {
        Some(self.order)
    }
}

impl Ordered for db::NewModule {
    type Group = i32;

    fn group(&self) -> i32 {
        self.course
    }

    fn order(&self) -> Option<i32> {
        self.order
    }
}

impl Candidate for db::NewModule {
    fn set_order(&mut self, order: i32) {
        self.order = Some(order);
    }
}

impl Ordered for db::Content {
    type Group = i32;

    fn group(&self) -> i32 {
        self.module
    }

    fn order(&self) -> Option<i32> {
        Some(self.order)
    }
}

impl Ordered for db::NewContent {
    type Group = i32;

    fn group(&self) -> i32 {
        self.module
    }

    fn order(&self) -> Option<i32> {
        self.order
    }
}

impl Candidate for db::NewContent {
    fn set_order(&mut self, order: i32) {
        self.order = Some(order);
    }
}

/// Modules of a course, as persisted in the database.
impl OrderSource<db::NewModule> for Connection {
    type Error = diesel::result::Error;

    fn last_order(&self, course: &i32) -> Result<Option<i32>, Self::Error> {
        modules::table
            .filter(modules::course.eq(*course))
            .select(max(modules::order))
            .get_result(self)
    }
}

/// Contents of a module, as persisted in the database.
impl OrderSource<db::NewContent> for Connection {
    type Error = diesel::result::Error;

    fn last_order(&self, module: &i32) -> Result<Option<i32>, Self::Error> {
        contents::table
            .filter(contents::module.eq(*module))
            .select(max(contents::order))
            .get_result(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A record ordered within a two-field group.
    #[derive(Clone, Debug)]
    struct Lesson {
        course: u32,
        term: char,
        order: Option<i32>,
    }

    impl Lesson {
        fn new(course: u32, term: char, order: Option<i32>) -> Self {
            Lesson { course, term, order }
        }
    }

    impl Ordered for Lesson {
        type Group = (u32, char);

        fn group(&self) -> (u32, char) {
            (self.course, self.term)
        }

        fn order(&self) -> Option<i32> {
            self.order
        }
    }

    impl Candidate for Lesson {
        fn set_order(&mut self, order: i32) {
            self.order = Some(order);
        }
    }

    /// A record ordered globally.
    #[derive(Clone, Debug)]
    struct Note {
        order: Option<i32>,
    }

    impl Ordered for Note {
        type Group = ();

        fn group(&self) {}

        fn order(&self) -> Option<i32> {
            self.order
        }
    }

    impl Candidate for Note {
        fn set_order(&mut self, order: i32) {
            self.order = Some(order);
        }
    }

    fn assign<T: Candidate>(source: &[T], record: &mut T) -> i32 {
        assign_order(source, record).unwrap()
    }

    #[test]
    fn appends_after_last_in_group() {
        let existing = vec![
            Lesson::new(1, 'a', Some(0)),
            Lesson::new(1, 'a', Some(1)),
            Lesson::new(1, 'a', Some(2)),
        ];

        let mut lesson = Lesson::new(1, 'a', None);
        assert_eq!(assign(&existing, &mut lesson), 3);
        assert_eq!(lesson.order, Some(3));
    }

    #[test]
    fn first_in_empty_group_is_zero() {
        let mut lesson = Lesson::new(7, 'b', None);
        assert_eq!(assign(&[], &mut lesson), 0);
    }

    #[test]
    fn explicit_order_is_kept() {
        let existing = vec![
            Lesson::new(1, 'a', Some(0)),
            Lesson::new(1, 'a', Some(9)),
        ];

        let mut lesson = Lesson::new(1, 'a', Some(5));
        assert_eq!(assign(&existing, &mut lesson), 5);
        assert_eq!(lesson.order, Some(5));

        // Even when it collides with an existing record.
        let mut lesson = Lesson::new(1, 'a', Some(0));
        assert_eq!(assign(&existing, &mut lesson), 0);
    }

    #[test]
    fn groups_are_independent() {
        let existing = vec![
            Lesson::new(1, 'a', Some(4)),
            Lesson::new(2, 'a', Some(10)),
            Lesson::new(1, 'b', Some(20)),
        ];

        let mut lesson = Lesson::new(1, 'a', None);
        assert_eq!(assign(&existing, &mut lesson), 5);

        let mut lesson = Lesson::new(2, 'b', None);
        assert_eq!(assign(&existing, &mut lesson), 0);
    }

    #[test]
    fn assignment_is_idempotent() {
        let existing = vec![Lesson::new(1, 'a', Some(3))];
        let mut lesson = Lesson::new(1, 'a', None);

        let first = assign(&existing, &mut lesson);
        let second = assign(&existing, &mut lesson);

        assert_eq!(first, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn gaps_are_preserved() {
        let existing = vec![
            Lesson::new(3, 'a', Some(0)),
            Lesson::new(3, 'a', Some(7)),
        ];

        let mut lesson = Lesson::new(3, 'a', None);
        assert_eq!(assign(&existing, &mut lesson), 8);
    }

    #[test]
    fn order_past_largest_is_rejected() {
        let existing = vec![
            Lesson::new(1, 'a', Some(0)),
            Lesson::new(1, 'a', Some(std::i32::MAX)),
        ];

        let mut lesson = Lesson::new(1, 'a', None);
        assert_eq!(assign_order(&existing[..], &mut lesson), Err(AssignError::Overflow));
        assert_eq!(lesson.order, None);

        // Other groups are unaffected.
        let mut lesson = Lesson::new(1, 'b', None);
        assert_eq!(assign(&existing, &mut lesson), 0);

        // As are records with an explicit order.
        let mut lesson = Lesson::new(1, 'a', Some(std::i32::MAX));
        assert_eq!(assign(&existing, &mut lesson), std::i32::MAX);
    }

    #[test]
    fn unordered_records_are_ignored() {
        let existing = vec![
            Lesson::new(1, 'a', None),
            Lesson::new(1, 'a', Some(2)),
        ];

        let mut lesson = Lesson::new(1, 'a', None);
        assert_eq!(assign(&existing, &mut lesson), 3);
    }

    #[test]
    fn global_ordering_counts_up_from_zero() {
        let mut notes: Vec<Note> = Vec::new();

        for expected in 0..3 {
            let mut note = Note { order: None };
            assert_eq!(assign(&notes, &mut note), expected);
            notes.push(note);
        }

        let orders = notes.iter().map(|n| n.order).collect::<Vec<_>>();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn ledger_places_batches_in_sequence() {
        let existing = vec![
            Lesson::new(1, 'a', Some(0)),
            Lesson::new(1, 'a', Some(4)),
        ];
        let mut ledger = OrderLedger::from_records(&existing);

        let mut first = Lesson::new(1, 'a', None);
        let mut second = Lesson::new(1, 'a', None);
        let mut other = Lesson::new(2, 'a', None);

        assert_eq!(ledger.place(&mut first), Ok(5));
        assert_eq!(ledger.place(&mut second), Ok(6));
        assert_eq!(ledger.place(&mut other), Ok(0));
    }

    #[test]
    fn ledger_records_explicit_orders() {
        let mut ledger = OrderLedger::new();

        let mut explicit = Lesson::new(1, 'a', Some(10));
        assert_eq!(ledger.place(&mut explicit), Ok(10));

        let mut next = Lesson::new(1, 'a', None);
        assert_eq!(ledger.place(&mut next), Ok(11));
    }

    #[test]
    fn ledger_reports_overflow() {
        let mut ledger = OrderLedger::new();

        let mut last = db::NewModule {
            course: 1,
            title: "Last".to_string(),
            description: String::new(),
            order: Some(std::i32::MAX),
        };
        assert_eq!(ledger.place(&mut last), Ok(std::i32::MAX));

        let mut next = db::NewModule { order: None, ..last.clone() };
        assert_eq!(ledger.place(&mut next), Err(AssignError::Overflow));
        assert_eq!(next.order, None);
    }

    #[test]
    fn modules_are_grouped_by_course() {
        let existing = vec![
            db::Module {
                id: 1,
                course: 1,
                title: "Intro".to_string(),
                description: String::new(),
                order: 2,
            },
            db::Module {
                id: 2,
                course: 2,
                title: "Other".to_string(),
                description: String::new(),
                order: 9,
            },
        ];

        let mut module = db::NewModule {
            course: 1,
            title: "Next".to_string(),
            description: String::new(),
            order: None,
        };

        assert_eq!(assign_order(&existing[..], &mut module), Ok(3));
        assert_eq!(module.order, Some(3));
    }
}
