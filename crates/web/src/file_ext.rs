use actix_files::NamedFile;
use actix_web::{
    HttpRequest,
    HttpResponse,
    Responder,
    http::header::{ETAG, HeaderValue},
};
use syllabus_models::File;

pub trait FileExt {
    /// Get an Actix responder streaming contents of this file.
    fn stream(&self) -> std::io::Result<Stream>;
}

impl FileExt for File {
    fn stream(&self) -> std::io::Result<Stream> {
        Stream::open(self)
    }
}

/// Contents of a stored file, served with its MIME type and an entity tag
/// derived from its hash.
pub struct Stream {
    stream: NamedFile,
    etag: String,
}

impl Stream {
    fn open(file: &File) -> std::io::Result<Stream> {
        let mut stream = NamedFile::open(file.path())?;

        match file.mime.parse() {
            Ok(mime) => stream = stream.set_content_type(mime),
            Err(_) => log::warn!("Invalid MIME type {:?} of file {}",
                file.mime, file.id),
        }

        Ok(Stream {
            stream,
            // Base64 encoding only uses bytes allowed in entity tags.
            etag: format!(r#""{}""#, base64::encode(&file.hash)),
        })
    }
}

impl Responder for Stream {
    type Error = <NamedFile as Responder>::Error;
    type Future = Result<HttpResponse, Self::Error>;

    fn respond_to(self, req: &HttpRequest) -> Self::Future {
        let mut rsp = self.stream.respond_to(req)?;

        if let Ok(value) = HeaderValue::from_str(&self.etag) {
            rsp.headers_mut().insert(ETAG, value);
        }

        Ok(rsp)
    }
}
