use actix_web::{
    HttpResponse,
    web::{self, Json, Path, Query, ServiceConfig},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syllabus_models::{
    Course,
    Model,
    Module,
    Owned,
    course::ModuleForm,
    db::models::CourseChanges,
    permissions::{AddCourse, DeleteCourse, EditCourse, ViewCourse},
};
use syllabus_web::{Created, Database, Session};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/courses")
            .route(web::get().to(list_courses))
            .route(web::post().to(create_course))
        )
        .route("/courses/mine", web::get().to(list_own_courses))
        .service(web::resource("/courses/{id}")
            .name("course")
            .route(web::get().to(get_course))
            .route(web::put().to(update_course))
            .route(web::delete().to(delete_course))
        )
        .service(web::resource("/courses/{id}/modules")
            .route(web::get().to(list_modules))
            .route(web::post().to(create_module))
            .route(web::put().to(update_modules))
        )
        .route("/courses/{id}/modules/order", web::put().to(reorder_modules))
    ;
}

type CourseList = Json<Vec<<Course as Model>::Public>>;
type ModuleList = Json<Vec<<Module as Model>::Public>>;

#[derive(Deserialize)]
struct CourseQuery {
    /// Only list courses of the subject with this slug.
    subject: Option<String>,
}

/// Get list of all courses, newest first.
///
/// ## Method
///
/// ```text
/// GET /courses?subject=:slug
/// ```
fn list_courses(db: Database, query: Query<CourseQuery>) -> Result<CourseList> {
    let subject = query.subject.as_ref().map(String::as_str);
    Ok(Json(Course::all(&db, subject)?.iter().map(Model::get_public).collect()))
}

/// Get list of courses owned by current user.
///
/// ## Method
///
/// ```text
/// GET /courses/mine
/// ```
fn list_own_courses(db: Database, session: Session<ViewCourse>)
-> Result<CourseList> {
    Ok(Json(Course::by_owner(&db, session.user_id())?
        .iter()
        .map(Model::get_public)
        .collect()))
}

#[derive(Deserialize)]
struct NewCourse {
    subject: i32,
    title: String,
    slug: String,
    #[serde(default)]
    overview: String,
}

/// Create a new course, owned by current user.
///
/// ## Method
///
/// ```text
/// POST /courses
/// ```
fn create_course(
    db: Database,
    session: Session<AddCourse>,
    data: Json<NewCourse>,
) -> Result<Created<Json<<Course as Model>::Public>>> {
    let course = Course::create(
        &db,
        session.user_id(),
        data.subject,
        &data.title,
        &data.slug,
        &data.overview,
    )?;

    Ok(Created::new("course", course.id(), Json(course.get_public())))
}

#[derive(Serialize)]
struct CourseDetails {
    #[serde(flatten)]
    course: <Course as Model>::Public,
    modules: Vec<<Module as Model>::Public>,
}

/// Get a course together with its modules.
///
/// ## Method
///
/// ```text
/// GET /courses/:id
/// ```
fn get_course(db: Database, id: Path<i32>) -> Result<Json<CourseDetails>> {
    let course = Course::by_id(&db, *id)?;
    let modules = course.modules(&db)?;

    Ok(Json(CourseDetails {
        course: course.get_public(),
        modules: modules.iter().map(Model::get_public).collect(),
    }))
}

#[derive(Deserialize)]
struct CourseUpdate {
    subject: Option<i32>,
    title: Option<String>,
    slug: Option<String>,
    overview: Option<String>,
}

/// Update a course.
///
/// ## Method
///
/// ```text
/// PUT /courses/:id
/// ```
fn update_course(
    db: Database,
    session: Session<EditCourse>,
    id: Path<i32>,
    update: Json<CourseUpdate>,
) -> Result<Json<<Course as Model>::Public>> {
    let mut course = Course::by_id_owned(&db, *id, session.user_id())?;

    course.update(&db, CourseChanges {
        subject: update.subject,
        title: update.title.as_ref().map(String::as_str),
        slug: update.slug.as_ref().map(String::as_str),
        overview: update.overview.as_ref().map(String::as_str),
    })?;

    Ok(Json(course.get_public()))
}

/// Delete a course, together with all its modules and contents.
///
/// ## Method
///
/// ```text
/// DELETE /courses/:id
/// ```
fn delete_course(db: Database, session: Session<DeleteCourse>, id: Path<i32>)
-> Result<HttpResponse> {
    Course::by_id_owned(&db, *id, session.user_id())?.delete(&db)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Get list of modules in a course, in order.
///
/// ## Method
///
/// ```text
/// GET /courses/:id/modules
/// ```
fn list_modules(db: Database, id: Path<i32>) -> Result<ModuleList> {
    let modules = Course::by_id(&db, *id)?.modules(&db)?;
    Ok(Json(modules.iter().map(Model::get_public).collect()))
}

#[derive(Deserialize)]
struct NewModule {
    title: String,
    #[serde(default)]
    description: String,
    order: Option<i32>,
}

/// Create a new module in a course.
///
/// Unless an explicit order is given, the module is placed after all other
/// modules of the course.
///
/// ## Method
///
/// ```text
/// POST /courses/:id/modules
/// ```
fn create_module(
    db: Database,
    session: Session,
    id: Path<i32>,
    data: Json<NewModule>,
) -> Result<Created<Json<<Module as Model>::Public>>> {
    let course = Course::by_id_owned(&db, *id, session.user_id())?;
    let module = course.create_module(&db, &data.title, &data.description, data.order)?;

    Ok(Created::new("module", module.id(), Json(module.get_public())))
}

/// Apply a module formset to a course.
///
/// The body is a list of forms. A form with an `id` changes an existing
/// module (or deletes it, when `delete` is set), and a form without one
/// creates a new module at the end of the course. Forms without an `id` and
/// with an empty title are ignored.
///
/// ## Method
///
/// ```text
/// PUT /courses/:id/modules
/// ```
fn update_modules(
    db: Database,
    session: Session,
    id: Path<i32>,
    forms: Json<Vec<ModuleForm>>,
) -> Result<ModuleList> {
    let course = Course::by_id_owned(&db, *id, session.user_id())?;
    let modules = course.update_modules(&db, &forms)?;

    Ok(Json(modules.iter().map(Model::get_public).collect()))
}

/// Explicitly set orders of modules in a course.
///
/// The body maps module IDs to their new orders.
///
/// ## Method
///
/// ```text
/// PUT /courses/:id/modules/order
/// ```
fn reorder_modules(
    db: Database,
    session: Session,
    id: Path<i32>,
    orders: Json<BTreeMap<i32, i32>>,
) -> Result<ModuleList> {
    let course = Course::by_id_owned(&db, *id, session.user_id())?;
    let modules = course.reorder_modules(&db, &orders)?;

    Ok(Json(modules.iter().map(Model::get_public).collect()))
}
