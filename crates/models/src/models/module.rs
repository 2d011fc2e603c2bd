use diesel::{
    Connection as _,
    prelude::*,
    result::Error as DbError,
};
use failure::Fail;
use serde::Serialize;
use std::collections::BTreeMap;
use syllabus_error::ApiError;
use syllabus_macros::From;

use crate::{
    db::{Connection, models as db, schema::{contents, courses, modules}},
    ordering::{AssignError, assign_order},
};
use super::{
    Content,
    FindModelResult,
    Model,
    Owned,
    content,
    item::{CreateItemError, ItemRef, NewItem},
};

/// A module is a single, ordered part of a course.
#[derive(Debug)]
pub struct Module {
    data: db::Module,
}

/// A subset of module's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    course: i32,
    title: String,
    description: String,
    order: i32,
}

impl Model for Module {
    const ERROR_CATEGORY: &'static str = "module";

    type Id = i32;
    type Database = db::Module;
    type Public = Public;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        modules::table
            .filter(modules::id.eq(id))
            .get_result::<db::Module>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Module) -> Self {
        Module { data }
    }

    fn into_db(self) -> db::Module {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        let db::Module { id, course, ref title, ref description, order } = self.data;

        Public {
            id,
            course,
            title: title.clone(),
            description: description.clone(),
            order,
        }
    }
}

impl Owned for Module {
    fn by_id_owned(db: &Connection, id: i32, owner: i32) -> FindModelResult<Self> {
        modules::table
            .inner_join(courses::table)
            .filter(modules::id.eq(id).and(courses::owner.eq(owner)))
            .select(modules::all_columns)
            .get_result::<db::Module>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }
}

impl Module {
    /// Get all modules of a course, in order.
    pub fn by_course(db: &Connection, course: i32) -> Result<Vec<Module>, DbError> {
        modules::table
            .filter(modules::course.eq(course))
            .order_by((modules::order, modules::id))
            .get_results::<db::Module>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Change this module's title or description.
    pub fn update(&mut self, db: &Connection, changes: db::ModuleChanges)
    -> Result<(), UpdateModuleError> {
        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(UpdateModuleError::EmptyTitle);
            }
        }

        if changes.title.is_none() && changes.description.is_none() {
            return Ok(());
        }

        self.data = diesel::update(&self.data)
            .set(changes)
            .get_result::<db::Module>(db)?;

        Ok(())
    }

    /// Delete this module, together with all its contents.
    pub fn delete(self, db: &Connection) -> Result<(), DbError> {
        db.transaction(|| {
            content::delete_in_modules(db, &[self.data.id])?;
            diesel::delete(&self.data).execute(db)?;
            Ok(())
        })
    }

    /// Get all contents of this module, in order.
    pub fn contents(&self, db: &Connection) -> Result<Vec<Content>, DbError> {
        Content::by_module(db, self.data.id)
    }

    /// Place an existing item in this module.
    ///
    /// Unless `order` is given, the item is placed after all other contents
    /// of this module.
    pub fn add_content(&self, db: &Connection, item: ItemRef, order: Option<i32>)
    -> Result<Content, CreateContentError> {
        check_new_order(order)?;

        let data = db.transaction::<_, CreateContentError, _>(|| {
            self.lock(db)?;

            let mut new = db::NewContent {
                module: self.data.id,
                kind: item.kind(),
                item: item.id(),
                order,
            };
            assign_order(db, &mut new)?;

            diesel::insert_into(contents::table)
                .values(&new)
                .get_result::<db::Content>(db)
                .map_err(From::from)
        })?;

        log::debug!("Placed {} {} in module {} at {}",
            data.kind, data.item, data.module, data.order);

        Content::load(db, data).map_err(From::from)
    }

    /// Create a new item owned by `owner` and place it in this module.
    ///
    /// Uploaded files are only stored once both the item and `order` were
    /// validated, and are stored within the same transaction.
    pub fn create_content(
        &self,
        db: &Connection,
        owner: i32,
        item: NewItem,
        order: Option<i32>,
    ) -> Result<Content, CreateContentError> {
        check_new_order(order)?;

        db.transaction(|| {
            let item = item.insert(db, owner)?;
            self.add_content(db, item, order)
        })
    }

    /// Explicitly set orders of this module's contents.
    ///
    /// `orders` maps content IDs to their new orders. Contents not mentioned
    /// keep their current order.
    pub fn reorder_contents(&self, db: &Connection, orders: &BTreeMap<i32, i32>)
    -> Result<Vec<Content>, ReorderContentsError> {
        db.transaction::<_, ReorderContentsError, _>(|| {
            let owned = contents::table
                .filter(contents::module.eq(self.data.id))
                .select(contents::id)
                .get_results::<i32>(db)?;

            match check_reorder(&owned, orders) {
                Ok(()) => (),
                Err(ReorderCheck::Foreign(id)) =>
                    return Err(ReorderContentsError::Foreign(id)),
                Err(ReorderCheck::Negative(id)) =>
                    return Err(ReorderContentsError::NegativeOrder(id)),
            }

            for (&id, &order) in orders {
                diesel::update(contents::table.find(id))
                    .set(contents::order.eq(order))
                    .execute(db)?;
            }

            Ok(())
        })?;

        self.contents(db).map_err(From::from)
    }

    /// Lock this module's row until the end of current transaction.
    ///
    /// Orders of contents are assigned under this lock, so that concurrent
    /// additions to the same module are serialized.
    fn lock(&self, db: &Connection) -> Result<(), DbError> {
        modules::table
            .find(self.data.id)
            .select(modules::id)
            .for_update()
            .get_result::<i32>(db)
            .map(|_| ())
    }
}

impl std::ops::Deref for Module {
    type Target = db::Module;

    fn deref(&self) -> &db::Module {
        &self.data
    }
}

fn check_new_order(order: Option<i32>) -> Result<(), CreateContentError> {
    match order {
        Some(order) if order < 0 => Err(CreateContentError::NegativeOrder),
        _ => Ok(()),
    }
}

/// Reason why an explicit reordering was rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ReorderCheck {
    /// Record does not belong to the group being reordered.
    Foreign(i32),
    /// Record would be given a negative order.
    Negative(i32),
}

/// Verify that an explicit reordering only mentions records of `owned`,
/// and only assigns non-negative orders.
pub(crate) fn check_reorder(owned: &[i32], orders: &BTreeMap<i32, i32>)
-> Result<(), ReorderCheck> {
    for (&id, &order) in orders {
        if !owned.contains(&id) {
            return Err(ReorderCheck::Foreign(id));
        }
        if order < 0 {
            return Err(ReorderCheck::Negative(id));
        }
    }

    Ok(())
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UpdateModuleError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "Module's title cannot be empty")]
    #[api(code = "module:update:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateContentError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Item(#[cause] #[from] CreateItemError),
    #[fail(display = "Order cannot be negative")]
    #[api(code = "content:create:negative-order", status = "BAD_REQUEST")]
    NegativeOrder,
    #[fail(display = "Module has no room for another content")]
    #[api(code = "content:create:order-overflow", status = "BAD_REQUEST")]
    OrderOverflow,
}

impl From<AssignError<DbError>> for CreateContentError {
    fn from(e: AssignError<DbError>) -> Self {
        match e {
            AssignError::Source(e) => CreateContentError::Database(e),
            AssignError::Overflow => CreateContentError::OrderOverflow,
        }
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ReorderContentsError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "Content {} does not belong to this module", _0)]
    #[api(code = "content:reorder:foreign", status = "BAD_REQUEST")]
    Foreign(i32),
    #[fail(display = "Content {} cannot have a negative order", _0)]
    #[api(code = "content:reorder:negative", status = "BAD_REQUEST")]
    NegativeOrder(i32),
}
