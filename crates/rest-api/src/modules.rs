use actix_web::{
    HttpMessage,
    HttpRequest,
    HttpResponse,
    web::{self, Bytes, Json, Path, PayloadConfig, Query, ServiceConfig},
};
use failure::Fail;
use serde::{Deserialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use syllabus_error::ApiError;
use syllabus_models::{
    Config,
    Content,
    ContentKind,
    File,
    Model,
    Module,
    Owned,
    db::models::ModuleChanges,
    item::{NewItem, Upload},
};
use syllabus_web::{Created, Database, Session};

use crate::Result;

/// Largest accepted upload, in bytes.
const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/modules/{id}")
            .name("module")
            .route(web::get().to(get_module))
            .route(web::put().to(update_module))
            .route(web::delete().to(delete_module))
        )
        .route("/modules/{id}/contents", web::get().to(list_contents))
        .route("/modules/{id}/contents/order", web::put().to(reorder_contents))
        .service(web::resource("/modules/{id}/contents/{kind}")
            .data(PayloadConfig::new(MAX_UPLOAD_SIZE))
            .route(web::post().to(create_content))
        )
    ;
}

type ContentList = Json<Vec<<Content as Model>::Public>>;

/// Get a module.
///
/// ## Method
///
/// ```text
/// GET /modules/:id
/// ```
fn get_module(db: Database, session: Session, id: Path<i32>)
-> Result<Json<<Module as Model>::Public>> {
    Ok(Json(Module::by_id_owned(&db, *id, session.user_id())?.get_public()))
}

#[derive(Deserialize)]
struct ModuleUpdate {
    title: Option<String>,
    description: Option<String>,
}

/// Update a module's title or description.
///
/// ## Method
///
/// ```text
/// PUT /modules/:id
/// ```
fn update_module(
    db: Database,
    session: Session,
    id: Path<i32>,
    update: Json<ModuleUpdate>,
) -> Result<Json<<Module as Model>::Public>> {
    let mut module = Module::by_id_owned(&db, *id, session.user_id())?;

    module.update(&db, ModuleChanges {
        title: update.title.as_ref().map(String::as_str),
        description: update.description.as_ref().map(String::as_str),
    })?;

    Ok(Json(module.get_public()))
}

/// Delete a module, together with all its contents.
///
/// ## Method
///
/// ```text
/// DELETE /modules/:id
/// ```
fn delete_module(db: Database, session: Session, id: Path<i32>)
-> Result<HttpResponse> {
    Module::by_id_owned(&db, *id, session.user_id())?.delete(&db)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Get list of contents of a module, in order.
///
/// ## Method
///
/// ```text
/// GET /modules/:id/contents
/// ```
fn list_contents(db: Database, session: Session, id: Path<i32>)
-> Result<ContentList> {
    let contents = Module::by_id_owned(&db, *id, session.user_id())?.contents(&db)?;
    Ok(Json(contents.iter().map(Model::get_public).collect()))
}

/// Explicitly set orders of contents in a module.
///
/// The body maps content IDs to their new orders.
///
/// ## Method
///
/// ```text
/// PUT /modules/:id/contents/order
/// ```
fn reorder_contents(
    db: Database,
    session: Session,
    id: Path<i32>,
    orders: Json<BTreeMap<i32, i32>>,
) -> Result<ContentList> {
    let module = Module::by_id_owned(&db, *id, session.user_id())?;
    let contents = module.reorder_contents(&db, &orders)?;

    Ok(Json(contents.iter().map(Model::get_public).collect()))
}

#[derive(Deserialize)]
struct NewText {
    title: String,
    content: String,
    order: Option<i32>,
}

#[derive(Deserialize)]
struct NewVideo {
    title: String,
    url: String,
    order: Option<i32>,
}

/// Parameters of an upload. Contents of the uploaded file are the request's
/// body.
#[derive(Deserialize)]
struct UploadParams {
    #[serde(default)]
    title: String,
    order: Option<i32>,
}

/// Create a new item and place it in a module.
///
/// Text and video items are created from a JSON body. For file and image
/// items the body is the file's contents, its MIME type is taken from the
/// `Content-Type` header, and the title is passed in the query string.
///
/// ## Method
///
/// ```text
/// POST /modules/:id/contents/:kind
/// ```
fn create_content(
    req: HttpRequest,
    db: Database,
    session: Session,
    path: Path<(i32, String)>,
    body: Bytes,
) -> Result<Created<Json<<Content as Model>::Public>>> {
    let (id, kind) = path.into_inner();
    let kind = kind.parse::<ContentKind>()?;
    let module = Module::by_id_owned(&db, id, session.user_id())?;
    let owner = session.user_id();

    let content = match kind {
        ContentKind::Text => {
            let NewText { title, content, order } = parse_body(&body)?;
            module.create_content(&db, owner, NewItem::Text {
                title: &title,
                content: &content,
            }, order)?
        }
        ContentKind::Video => {
            let NewVideo { title, url, order } = parse_body(&body)?;
            module.create_content(&db, owner, NewItem::Video {
                title: &title,
                url: &url,
            }, order)?
        }
        ContentKind::File | ContentKind::Image => {
            let UploadParams { title, order } = parse_query(req.query_string())?;
            let upload = Upload {
                storage: &Config::global().storage.path,
                data: &body,
                mime: match req.content_type() {
                    "" => "application/octet-stream",
                    mime => mime,
                },
            };
            let item = match kind {
                ContentKind::Image => NewItem::Image { title: &title, upload },
                _ => NewItem::File { title: &title, upload },
            };

            module.create_content(&db, owner, item, order)?
        }
    };

    Ok(Created::new("content", content.id(), Json(content.get_public())))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, InvalidBody> {
    serde_json::from_slice(body).map_err(InvalidBody)
}

fn parse_query(query: &str) -> Result<UploadParams, InvalidQuery> {
    Query::<UploadParams>::from_query(query)
        .map(Query::into_inner)
        .map_err(|err| InvalidQuery(err.to_string()))
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "content:invalid:query", status = "BAD_REQUEST")]
#[fail(display = "Invalid upload parameters: {}", _0)]
struct InvalidQuery(String);

#[derive(ApiError, Debug, Fail)]
#[api(code = "content:invalid:body", status = "BAD_REQUEST")]
#[fail(display = "Invalid request body: {}", _0)]
struct InvalidBody(#[cause] serde_json::Error);
