use diesel::{
    Connection as _,
    expression::dsl::any,
    prelude::*,
    result::Error as DbError,
};
use serde::Serialize;

use crate::db::{
    Connection,
    models as db,
    schema::{contents, courses, modules},
    types::ContentKind,
};
use super::{
    FindModelResult,
    Model,
    Owned,
    item::{self, Item, ItemChanges, ItemRef, UpdateItemError},
};

/// A content container places a single item in a module.
#[derive(Debug)]
pub struct Content {
    data: db::Content,
    item: Item,
}

/// A subset of content's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    module: i32,
    order: i32,
    kind: ContentKind,
    item: item::Public,
}

impl Model for Content {
    const ERROR_CATEGORY: &'static str = "content";

    type Id = i32;
    type Database = (db::Content, Item);
    type Public = Public;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        let data = contents::table
            .filter(contents::id.eq(id))
            .get_result::<db::Content>(db)?;

        Content::load(db, data).map_err(From::from)
    }

    fn from_db((data, item): Self::Database) -> Self {
        Content { data, item }
    }

    fn into_db(self) -> Self::Database {
        (self.data, self.item)
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        Public {
            id: self.data.id,
            module: self.data.module,
            order: self.data.order,
            kind: self.data.kind,
            item: self.item.get_public(),
        }
    }
}

impl Owned for Content {
    fn by_id_owned(db: &Connection, id: i32, owner: i32) -> FindModelResult<Self> {
        let data = contents::table
            .inner_join(modules::table.inner_join(courses::table))
            .filter(contents::id.eq(id).and(courses::owner.eq(owner)))
            .select(contents::all_columns)
            .get_result::<db::Content>(db)?;

        Content::load(db, data).map_err(From::from)
    }
}

impl Content {
    /// Construct a content container from its database row, loading its item.
    pub fn load(db: &Connection, data: db::Content) -> Result<Content, DbError> {
        let item = data.item_ref().load(db)?;
        Ok(Content { data, item })
    }

    /// Get all contents of a module, in order.
    pub fn by_module(db: &Connection, module: i32) -> Result<Vec<Content>, DbError> {
        contents::table
            .filter(contents::module.eq(module))
            .order_by((contents::order, contents::id))
            .get_results::<db::Content>(db)?
            .into_iter()
            .map(|data| Content::load(db, data))
            .collect()
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Update this content's item.
    pub fn update(&mut self, db: &Connection, changes: &ItemChanges)
    -> Result<(), UpdateItemError> {
        self.item.update(db, changes)
    }

    /// Delete this content container together with its item.
    pub fn delete(self, db: &Connection) -> Result<(), DbError> {
        db.transaction(|| {
            diesel::delete(&self.data).execute(db)?;
            self.data.item_ref().delete(db)
        })?;

        log::debug!("Deleted content {} ({} {})",
            self.data.id, self.data.kind, self.data.item);

        Ok(())
    }
}

impl std::ops::Deref for Content {
    type Target = db::Content;

    fn deref(&self) -> &db::Content {
        &self.data
    }
}

impl db::Content {
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::from_parts(self.kind, self.item)
    }
}

/// Delete all content containers in specified modules, together with their
/// items.
///
/// Items are not removed by cascading deletes, as they are referenced by
/// `(kind, item)` rather than by a foreign key. This function must be called
/// before modules are deleted.
pub(crate) fn delete_in_modules(db: &Connection, modules: &[i32])
-> Result<(), DbError> {
    let removed = diesel::delete(contents::table
        .filter(contents::module.eq(any(modules))))
        .get_results::<db::Content>(db)?;

    for content in &removed {
        content.item_ref().delete(db)?;
    }

    Ok(())
}
