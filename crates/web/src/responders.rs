use actix_web::{
    HttpRequest,
    HttpResponse,
    Responder,
    http::{StatusCode, header::{LOCATION, HeaderValue}},
};
use futures::future::{self, Future, IntoFuture};

/// Build a 201 Created response.
///
/// The `Location` header points at the named resource, with the ID of the
/// created object as its only parameter. Remaining properties of the response
/// (including its body) are defined by the wrapped [`Responder`].
pub struct Created<T> {
    resource: &'static str,
    id: String,
    responder: T,
}

impl<T> Created<T> {
    pub fn new<I: ToString>(resource: &'static str, id: I, responder: T) -> Self {
        Created {
            resource,
            id: id.to_string(),
            responder,
        }
    }
}

impl<T> Responder for Created<T>
where
    T: Responder + 'static,
{
    type Future = Box<dyn Future<Item = HttpResponse, Error = Self::Error>>;
    type Error = actix_web::Error;

    fn respond_to(self, req: &HttpRequest) -> Self::Future {
        let Created { resource, id, responder } = self;

        let location = match req.url_for(resource, &[id]) {
            Ok(url) => url.to_string(),
            Err(err) => return Box::new(future::err(err.into())),
        };

        Box::new(responder.respond_to(req)
            .into_future()
            .map_err(Into::into)
            .and_then(move |mut rsp| {
                *rsp.status_mut() = StatusCode::CREATED;
                rsp.headers_mut().insert(LOCATION, HeaderValue::from_str(&location)?);
                Ok(rsp)
            }))
    }
}
