use actix_web::web::{self, Path, ServiceConfig};
use syllabus_models::{File, Model};
use syllabus_web::{Database, FileExt, Stream};

use crate::Result;

/// Configure routes.
pub fn configure(app: &mut ServiceConfig) {
    app
        .service(web::resource("/files/{id}")
            .name("file")
            .route(web::get().to(get_file))
        )
    ;
}

/// Download contents of a stored file.
///
/// ## Method
///
/// ```text
/// GET /files/:id
/// ```
fn get_file(db: Database, id: Path<i32>) -> Result<Stream> {
    Ok(File::by_id(&db, *id)?.stream()?)
}
