use actix_web::{
    HttpRequest,
    HttpResponse,
    web::{self, Json, ServiceConfig},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syllabus_models::{Model, PermissionBits, User};
use syllabus_web::{Database, session::{Normal, Session}};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/sessions")
            .route(web::get().to(get_session))
            .route(web::post().to(create_session))
            .route(web::delete().to(destroy_session))
        )
    ;
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

/// Log in.
///
/// A session cookie is set on the response. Any session the client may still
/// have is replaced.
///
/// ## Method
///
/// ```text
/// POST /sessions
/// ```
fn create_session(req: HttpRequest, db: Database, credentials: Json<Credentials>)
-> Result<Json<<User as Model>::Public>> {
    let Credentials { email, password } = credentials.into_inner();
    let user = User::authenticate(&db, &email, &password)?;

    Session::<Normal>::create(&req, &user);

    Ok(Json(user.get_public()))
}

#[derive(Serialize)]
struct SessionData {
    user: i32,
    expires: DateTime<Utc>,
    permissions: PermissionBits,
}

/// Get details of the current session.
///
/// ## Method
///
/// ```text
/// GET /sessions
/// ```
fn get_session(session: Session) -> Json<SessionData> {
    Json(SessionData {
        user: session.user_id(),
        expires: session.expires,
        permissions: session.permissions(),
    })
}

/// Log out.
///
/// ## Method
///
/// ```text
/// DELETE /sessions
/// ```
fn destroy_session(req: HttpRequest, session: Session) -> HttpResponse {
    Session::destroy(&req, session);
    HttpResponse::NoContent().finish()
}
