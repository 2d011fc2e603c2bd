use actix_web::{HttpResponse, web::{self, Json, Path, ServiceConfig}};
use syllabus_models::{Content, Model, Owned, item::ItemChanges};
use syllabus_web::{Database, Session};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/contents/{id}")
            .name("content")
            .route(web::get().to(get_content))
            .route(web::put().to(update_content))
            .route(web::delete().to(delete_content))
        )
    ;
}

/// Get a content together with its item.
///
/// ## Method
///
/// ```text
/// GET /contents/:id
/// ```
fn get_content(db: Database, session: Session, id: Path<i32>)
-> Result<Json<<Content as Model>::Public>> {
    Ok(Json(Content::by_id_owned(&db, *id, session.user_id())?.get_public()))
}

/// Update a content's item.
///
/// Only the title and fields specific to the item's kind (`content` for text
/// items, `url` for video items) can be changed.
///
/// ## Method
///
/// ```text
/// PUT /contents/:id
/// ```
fn update_content(
    db: Database,
    session: Session,
    id: Path<i32>,
    changes: Json<ItemChanges>,
) -> Result<Json<<Content as Model>::Public>> {
    let mut content = Content::by_id_owned(&db, *id, session.user_id())?;
    content.update(&db, &changes)?;
    Ok(Json(content.get_public()))
}

/// Delete a content, together with its item.
///
/// ## Method
///
/// ```text
/// DELETE /contents/:id
/// ```
fn delete_content(db: Database, session: Session, id: Path<i32>)
-> Result<HttpResponse> {
    Content::by_id_owned(&db, *id, session.user_id())?.delete(&db)?;
    Ok(HttpResponse::NoContent().finish())
}
