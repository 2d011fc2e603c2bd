use actix_web::web::{self, Json, ServiceConfig};
use serde::Deserialize;
use syllabus_models::{Model, Subject, permissions::ManageSubjects};
use syllabus_web::{Created, Database, Session};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/subjects")
            .route(web::get().to(list_subjects))
            .route(web::post().to(create_subject))
        )
        .service(web::resource("/subjects/{slug}")
            .name("subject")
            .route(web::get().to(get_subject))
        )
    ;
}

/// Get list of all subjects.
///
/// ## Method
///
/// ```text
/// GET /subjects
/// ```
fn list_subjects(db: Database) -> Result<Json<Vec<<Subject as Model>::Public>>> {
    Ok(Json(Subject::all(&db)?.iter().map(Model::get_public).collect()))
}

#[derive(Deserialize)]
struct NewSubject {
    title: String,
    slug: String,
}

/// Create a new subject.
///
/// ## Method
///
/// ```text
/// POST /subjects
/// ```
fn create_subject(
    db: Database,
    _: Session<ManageSubjects>,
    data: Json<NewSubject>,
) -> Result<Created<Json<<Subject as Model>::Public>>> {
    let subject = Subject::create(&db, &data.title, &data.slug)?;
    Ok(Created::new("subject", &subject.slug, Json(subject.get_public())))
}

/// Get a subject by its slug.
///
/// ## Method
///
/// ```text
/// GET /subjects/:slug
/// ```
fn get_subject(db: Database, slug: web::Path<String>)
-> Result<Json<<Subject as Model>::Public>> {
    Ok(Json(Subject::by_slug(&db, &slug)?.get_public()))
}
