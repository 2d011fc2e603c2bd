use chrono::{DateTime, Utc};
use diesel::{
    Connection as _,
    expression::dsl::any,
    prelude::*,
    result::{DatabaseErrorKind, Error as DbError},
};
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syllabus_error::ApiError;
use syllabus_macros::From;
use syllabus_util::is_slug;

use crate::{
    db::{Connection, models as db, schema::{courses, modules, subjects}},
    ordering::{AssignError, OrderLedger, assign_order},
};
use super::{
    FindModelResult,
    Model,
    Module,
    Owned,
    content,
    module::{ReorderCheck, check_reorder},
};

/// A course, owned by an instructor and organized into modules.
#[derive(Debug)]
pub struct Course {
    data: db::Course,
}

/// A subset of course's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    owner: i32,
    subject: i32,
    title: String,
    slug: String,
    overview: String,
    created: DateTime<Utc>,
}

impl Model for Course {
    const ERROR_CATEGORY: &'static str = "course";

    type Id = i32;
    type Database = db::Course;
    type Public = Public;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        courses::table
            .filter(courses::id.eq(id))
            .get_result::<db::Course>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Course) -> Self {
        Course { data }
    }

    fn into_db(self) -> db::Course {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        let db::Course {
            id, owner, subject, ref title, ref slug, ref overview, created,
        } = self.data;

        Public {
            id,
            owner,
            subject,
            title: title.clone(),
            slug: slug.clone(),
            overview: overview.clone(),
            created,
        }
    }
}

impl Owned for Course {
    fn by_id_owned(db: &Connection, id: i32, owner: i32) -> FindModelResult<Self> {
        courses::table
            .filter(courses::id.eq(id).and(courses::owner.eq(owner)))
            .get_result::<db::Course>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }
}

impl Course {
    /// Get all courses, newest first, optionally only those of a subject.
    pub fn all(db: &Connection, subject: Option<&str>) -> Result<Vec<Course>, DbError> {
        let query = courses::table
            .inner_join(subjects::table)
            .select(courses::all_columns)
            .order_by((courses::created.desc(), courses::id.desc()))
            .into_boxed();

        let query = match subject {
            Some(slug) => query.filter(subjects::slug.eq(slug)),
            None => query,
        };

        query
            .get_results::<db::Course>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Get all courses owned by a user, newest first.
    pub fn by_owner(db: &Connection, owner: i32) -> Result<Vec<Course>, DbError> {
        courses::table
            .filter(courses::owner.eq(owner))
            .order_by((courses::created.desc(), courses::id.desc()))
            .get_results::<db::Course>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Create a new course.
    pub fn create(
        db: &Connection,
        owner: i32,
        subject: i32,
        title: &str,
        slug: &str,
        overview: &str,
    ) -> Result<Course, CreateCourseError> {
        if title.trim().is_empty() {
            return Err(CreateCourseError::EmptyTitle);
        }

        if !is_slug(slug) {
            return Err(CreateCourseError::InvalidSlug);
        }

        let data = diesel::insert_into(courses::table)
            .values(db::NewCourse { owner, subject, title, slug, overview })
            .get_result::<db::Course>(db)?;

        log::info!("User {} created course {} ({})", owner, data.id, data.slug);

        Ok(Course { data })
    }

    /// Change this course's details.
    pub fn update(&mut self, db: &Connection, changes: db::CourseChanges)
    -> Result<(), UpdateCourseError> {
        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(UpdateCourseError::EmptyTitle);
            }
        }

        if let Some(slug) = changes.slug {
            if !is_slug(slug) {
                return Err(UpdateCourseError::InvalidSlug);
            }
        }

        if changes.subject.is_none() && changes.title.is_none()
        && changes.slug.is_none() && changes.overview.is_none() {
            return Ok(());
        }

        self.data = diesel::update(&self.data)
            .set(changes)
            .get_result::<db::Course>(db)?;

        Ok(())
    }

    /// Delete this course, together with its modules and their contents.
    pub fn delete(self, db: &Connection) -> Result<(), DbError> {
        db.transaction::<_, DbError, _>(|| {
            let modules = modules::table
                .filter(modules::course.eq(self.data.id))
                .select(modules::id)
                .get_results::<i32>(db)?;

            content::delete_in_modules(db, &modules)?;
            diesel::delete(&self.data).execute(db)?;

            Ok(())
        })?;

        log::info!("Deleted course {} ({})", self.data.id, self.data.slug);

        Ok(())
    }

    /// Get all modules of this course, in order.
    pub fn modules(&self, db: &Connection) -> Result<Vec<Module>, DbError> {
        Module::by_course(db, self.data.id)
    }

    /// Create a new module in this course.
    ///
    /// Unless `order` is given, the module is placed after all other modules
    /// of this course.
    pub fn create_module(
        &self,
        db: &Connection,
        title: &str,
        description: &str,
        order: Option<i32>,
    ) -> Result<Module, CreateModuleError> {
        if title.trim().is_empty() {
            return Err(CreateModuleError::EmptyTitle);
        }

        if let Some(order) = order {
            if order < 0 {
                return Err(CreateModuleError::NegativeOrder);
            }
        }

        db.transaction::<_, CreateModuleError, _>(|| {
            self.lock(db)?;

            let mut new = db::NewModule {
                course: self.data.id,
                title: title.to_string(),
                description: description.to_string(),
                order,
            };
            assign_order(db, &mut new)?;

            diesel::insert_into(modules::table)
                .values(&new)
                .get_result::<db::Module>(db)
                .map(Module::from_db)
                .map_err(From::from)
        })
    }

    /// Apply a module formset to this course.
    ///
    /// All forms are applied in a single transaction: changes to and deletions
    /// of existing modules first, and then creation of new modules, which are
    /// placed after existing modules in the order of their forms.
    pub fn update_modules(&self, db: &Connection, forms: &[ModuleForm])
    -> Result<Vec<Module>, ModuleFormsetError> {
        db.transaction::<_, ModuleFormsetError, _>(|| {
            self.lock(db)?;

            let existing = modules::table
                .filter(modules::course.eq(self.data.id))
                .get_results::<db::Module>(db)?;

            let plan = plan_formset(self.data.id, &existing, forms)?;

            for update in &plan.updates {
                diesel::update(modules::table.find(update.id))
                    .set((
                        modules::title.eq(update.title),
                        modules::description.eq(update.description),
                    ))
                    .execute(db)?;
            }

            if !plan.deletes.is_empty() {
                content::delete_in_modules(db, &plan.deletes)?;
                diesel::delete(modules::table
                    .filter(modules::id.eq(any(&plan.deletes[..]))))
                    .execute(db)?;
            }

            if !plan.creates.is_empty() {
                diesel::insert_into(modules::table)
                    .values(&plan.creates)
                    .execute(db)?;
            }

            log::debug!("Applied formset to course {}: {} updated, {} deleted, \
                {} created", self.data.id, plan.updates.len(), plan.deletes.len(),
                plan.creates.len());

            Ok(())
        })?;

        self.modules(db).map_err(From::from)
    }

    /// Explicitly set orders of this course's modules.
    ///
    /// `orders` maps module IDs to their new orders. Modules not mentioned
    /// keep their current order.
    pub fn reorder_modules(&self, db: &Connection, orders: &BTreeMap<i32, i32>)
    -> Result<Vec<Module>, ReorderModulesError> {
        db.transaction::<_, ReorderModulesError, _>(|| {
            let owned = modules::table
                .filter(modules::course.eq(self.data.id))
                .select(modules::id)
                .get_results::<i32>(db)?;

            match check_reorder(&owned, orders) {
                Ok(()) => (),
                Err(ReorderCheck::Foreign(id)) =>
                    return Err(ReorderModulesError::Foreign(id)),
                Err(ReorderCheck::Negative(id)) =>
                    return Err(ReorderModulesError::NegativeOrder(id)),
            }

            for (&id, &order) in orders {
                diesel::update(modules::table.find(id))
                    .set(modules::order.eq(order))
                    .execute(db)?;
            }

            Ok(())
        })?;

        self.modules(db).map_err(From::from)
    }

    /// Lock this course's row until the end of current transaction.
    ///
    /// Orders of modules are assigned under this lock, so that concurrent
    /// additions to the same course are serialized.
    fn lock(&self, db: &Connection) -> Result<(), DbError> {
        courses::table
            .find(self.data.id)
            .select(courses::id)
            .for_update()
            .get_result::<i32>(db)
            .map(|_| ())
    }
}

impl std::ops::Deref for Course {
    type Target = db::Course;

    fn deref(&self) -> &db::Course {
        &self.data
    }
}

/// A single form of a module formset.
///
/// A form with an ID changes (or, with `delete` set, deletes) an existing
/// module. A form without one creates a new module, unless it is blank.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ModuleForm {
    pub id: Option<i32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub delete: bool,
}

impl ModuleForm {
    /// Is this an extra form left empty?
    fn is_blank(&self) -> bool {
        self.id.is_none()
            && self.title.trim().is_empty()
            && self.description.trim().is_empty()
    }
}

/// Changes to be made to modules of a course by a formset.
#[derive(Debug)]
struct FormsetPlan<'a> {
    updates: Vec<ModuleUpdate<'a>>,
    deletes: Vec<i32>,
    creates: Vec<db::NewModule>,
}

#[derive(Debug)]
struct ModuleUpdate<'a> {
    id: i32,
    title: &'a str,
    description: &'a str,
}

/// Decide what changes a formset makes to a course's `existing` modules.
fn plan_formset<'a>(course: i32, existing: &[db::Module], forms: &'a [ModuleForm])
-> Result<FormsetPlan<'a>, ModuleFormsetError> {
    let mut plan = FormsetPlan {
        updates: Vec::new(),
        deletes: Vec::new(),
        creates: Vec::new(),
    };
    let mut seen = Vec::new();

    for form in forms {
        let id = match form.id {
            Some(id) => id,
            None => continue,
        };

        if !existing.iter().any(|module| module.id == id) {
            return Err(ModuleFormsetError::Foreign(id));
        }

        if seen.contains(&id) {
            return Err(ModuleFormsetError::Duplicate(id));
        }
        seen.push(id);

        if form.delete {
            plan.deletes.push(id);
        } else if form.title.trim().is_empty() {
            return Err(ModuleFormsetError::EmptyTitle);
        } else {
            plan.updates.push(ModuleUpdate {
                id,
                title: &form.title,
                description: &form.description,
            });
        }
    }

    let mut ledger = OrderLedger::from_records(
        existing.iter().filter(|module| !plan.deletes.contains(&module.id)));

    for form in forms {
        if form.id.is_some() || form.delete || form.is_blank() {
            continue;
        }

        if form.title.trim().is_empty() {
            return Err(ModuleFormsetError::EmptyTitle);
        }

        let mut module = db::NewModule {
            course,
            title: form.title.clone(),
            description: form.description.clone(),
            order: None,
        };
        ledger.place(&mut module).map_err(|_| ModuleFormsetError::OrderOverflow)?;
        plan.creates.push(module);
    }

    Ok(plan)
}

#[derive(ApiError, Debug, Fail)]
pub enum CreateCourseError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] DbError),
    #[fail(display = "Course's title cannot be empty")]
    #[api(code = "course:create:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "Slug may only contain lowercase letters, digits, \
        hyphens, and underscores")]
    #[api(code = "course:create:invalid-slug", status = "BAD_REQUEST")]
    InvalidSlug,
    #[fail(display = "Slug is already used by another course")]
    #[api(code = "course:create:slug-taken", status = "BAD_REQUEST")]
    SlugTaken,
    #[fail(display = "No such subject")]
    #[api(code = "course:create:no-subject", status = "BAD_REQUEST")]
    NoSuchSubject,
}

impl From<DbError> for CreateCourseError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
                => CreateCourseError::SlugTaken,
            DbError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
                => CreateCourseError::NoSuchSubject,
            _ => CreateCourseError::Database(e),
        }
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum UpdateCourseError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] DbError),
    #[fail(display = "Course's title cannot be empty")]
    #[api(code = "course:update:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "Slug may only contain lowercase letters, digits, \
        hyphens, and underscores")]
    #[api(code = "course:update:invalid-slug", status = "BAD_REQUEST")]
    InvalidSlug,
    #[fail(display = "Slug is already used by another course")]
    #[api(code = "course:update:slug-taken", status = "BAD_REQUEST")]
    SlugTaken,
    #[fail(display = "No such subject")]
    #[api(code = "course:update:no-subject", status = "BAD_REQUEST")]
    NoSuchSubject,
}

impl From<DbError> for UpdateCourseError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
                => UpdateCourseError::SlugTaken,
            DbError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
                => UpdateCourseError::NoSuchSubject,
            _ => UpdateCourseError::Database(e),
        }
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateModuleError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "Module's title cannot be empty")]
    #[api(code = "module:create:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "Order cannot be negative")]
    #[api(code = "module:create:negative-order", status = "BAD_REQUEST")]
    NegativeOrder,
    #[fail(display = "Course has no room for another module")]
    #[api(code = "module:create:order-overflow", status = "BAD_REQUEST")]
    OrderOverflow,
}

impl From<AssignError<DbError>> for CreateModuleError {
    fn from(e: AssignError<DbError>) -> Self {
        match e {
            AssignError::Source(e) => CreateModuleError::Database(e),
            AssignError::Overflow => CreateModuleError::OrderOverflow,
        }
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ModuleFormsetError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "Module {} does not belong to this course", _0)]
    #[api(code = "module:formset:foreign", status = "BAD_REQUEST")]
    Foreign(i32),
    #[fail(display = "Module {} appears in more than one form", _0)]
    #[api(code = "module:formset:duplicate", status = "BAD_REQUEST")]
    Duplicate(i32),
    #[fail(display = "Module's title cannot be empty")]
    #[api(code = "module:formset:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "Course has no room for another module")]
    #[api(code = "module:formset:order-overflow", status = "BAD_REQUEST")]
    OrderOverflow,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ReorderModulesError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "Module {} does not belong to this course", _0)]
    #[api(code = "module:reorder:foreign", status = "BAD_REQUEST")]
    Foreign(i32),
    #[fail(display = "Module {} cannot have a negative order", _0)]
    #[api(code = "module:reorder:negative", status = "BAD_REQUEST")]
    NegativeOrder(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: i32, order: i32) -> db::Module {
        db::Module {
            id,
            course: 1,
            title: format!("Module {}", id),
            description: String::new(),
            order,
        }
    }

    fn new_form(title: &str) -> ModuleForm {
        ModuleForm {
            title: title.to_string(),
            ..ModuleForm::default()
        }
    }

    fn existing_form(id: i32, title: &str, delete: bool) -> ModuleForm {
        ModuleForm {
            id: Some(id),
            title: title.to_string(),
            delete,
            ..ModuleForm::default()
        }
    }

    fn orders(plan: &FormsetPlan) -> Vec<Option<i32>> {
        plan.creates.iter().map(|m| m.order).collect()
    }

    #[test]
    fn new_modules_follow_existing_ones() {
        let existing = vec![module(1, 0), module(2, 4)];
        let forms = vec![new_form("Loops"), new_form("Functions")];

        let plan = plan_formset(1, &existing, &forms).unwrap();

        assert_eq!(orders(&plan), vec![Some(5), Some(6)]);
        assert_eq!(plan.creates[0].title, "Loops");
        assert_eq!(plan.creates[1].title, "Functions");
        assert!(plan.creates.iter().all(|m| m.course == 1));
    }

    #[test]
    fn first_modules_of_a_course_start_at_zero() {
        let forms = vec![new_form("Intro"), new_form("Basics"), new_form("Wrap-up")];

        let plan = plan_formset(1, &[], &forms).unwrap();

        assert_eq!(orders(&plan), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn blank_extra_forms_are_skipped() {
        let existing = vec![module(1, 0)];
        let forms = vec![new_form(""), new_form("Next"), new_form("  ")];

        let plan = plan_formset(1, &existing, &forms).unwrap();

        assert_eq!(plan.creates.len(), 1);
        assert_eq!(orders(&plan), vec![Some(1)]);
    }

    #[test]
    fn new_forms_need_a_title() {
        let forms = vec![ModuleForm {
            description: "No title".to_string(),
            ..ModuleForm::default()
        }];

        match plan_formset(1, &[], &forms) {
            Err(ModuleFormsetError::EmptyTitle) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn existing_forms_update_and_delete() {
        let existing = vec![module(1, 0), module(2, 1), module(3, 2)];
        let forms = vec![
            existing_form(1, "Renamed", false),
            existing_form(3, "", true),
        ];

        let plan = plan_formset(1, &existing, &forms).unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, 1);
        assert_eq!(plan.updates[0].title, "Renamed");
        assert_eq!(plan.deletes, vec![3]);
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn deletions_happen_before_creation() {
        let existing = vec![module(1, 0), module(2, 4)];
        let forms = vec![existing_form(2, "Gone", true), new_form("Replacement")];

        let plan = plan_formset(1, &existing, &forms).unwrap();

        assert_eq!(plan.deletes, vec![2]);
        assert_eq!(orders(&plan), vec![Some(1)]);
    }

    #[test]
    fn gaps_in_existing_orders_are_kept() {
        let existing = vec![module(1, 0), module(2, 7)];
        let forms = vec![new_form("Next")];

        let plan = plan_formset(1, &existing, &forms).unwrap();

        assert_eq!(orders(&plan), vec![Some(8)]);
    }

    #[test]
    fn no_module_is_placed_after_largest_order() {
        let existing = vec![module(1, 0), module(2, std::i32::MAX)];
        let forms = vec![new_form("Overflowing")];

        match plan_formset(1, &existing, &forms) {
            Err(ModuleFormsetError::OrderOverflow) => (),
            other => panic!("unexpected result: {:?}", other),
        }

        // Deleting the last module makes room again.
        let forms = vec![existing_form(2, "", true), new_form("Fits")];
        let plan = plan_formset(1, &existing, &forms).unwrap();
        assert_eq!(orders(&plan), vec![Some(1)]);
    }

    #[test]
    fn order_overflow_is_a_client_error() {
        let err = CreateModuleError::from(AssignError::<DbError>::Overflow);
        assert_eq!(err.status(), syllabus_error::StatusCode::BAD_REQUEST);
        assert_eq!(err.code().as_ref().map(|c| &**c), Some("module:create:order-overflow"));
    }

    #[test]
    fn forms_for_other_courses_are_rejected() {
        let existing = vec![module(1, 0)];
        let forms = vec![existing_form(9, "Elsewhere", false)];

        match plan_formset(1, &existing, &forms) {
            Err(ModuleFormsetError::Foreign(9)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn modules_appear_in_one_form_only() {
        let existing = vec![module(1, 0)];
        let forms = vec![
            existing_form(1, "Once", false),
            existing_form(1, "Twice", false),
        ];

        match plan_formset(1, &existing, &forms) {
            Err(ModuleFormsetError::Duplicate(1)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn existing_forms_keep_their_title() {
        let existing = vec![module(1, 0)];
        let forms = vec![existing_form(1, " ", false)];

        match plan_formset(1, &existing, &forms) {
            Err(ModuleFormsetError::EmptyTitle) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
