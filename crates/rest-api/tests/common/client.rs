//! Client for testing interactions with the API.

use actix_web::{
    dev::{MessageBody, ServiceResponse},
    http::{Cookie, HeaderMap, Method, StatusCode, header::{CONTENT_TYPE, SET_COOKIE}},
    test::{self, TestRequest},
    web::Bytes,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

/// Password of all seeded users.
pub const PASSWORD: &str = "test";

/// Dispatch a single request to the application.
pub type Dispatch<'app> = dyn FnMut(TestRequest) -> Response + 'app;

pub struct Client<'app> {
    app: &'app mut Dispatch<'app>,
    session: Option<Cookie<'static>>,
}

impl<'app> Client<'app> {
    pub fn new(app: &'app mut Dispatch<'app>) -> Client<'app> {
        Client { app, session: None }
    }

    /// Log in as `email`. All following requests are made in that user's
    /// session.
    pub fn login(&mut self, email: &str) {
        let response = self.post("/api/v1/sessions")
            .json(json!({ "email": email, "password": PASSWORD }))
            .assert_success();

        self.session = Some(response.cookie("sesid"));
    }

    /// Forget the current session.
    pub fn logout(&mut self) {
        self.session = None;
    }

    pub fn get(&mut self, path: &str) -> Request<'_, 'app> {
        self.request(Method::GET, path)
    }

    pub fn post(&mut self, path: &str) -> Request<'_, 'app> {
        self.request(Method::POST, path)
    }

    pub fn put(&mut self, path: &str) -> Request<'_, 'app> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&mut self, path: &str) -> Request<'_, 'app> {
        self.request(Method::DELETE, path)
    }

    fn request(&mut self, method: Method, path: &str) -> Request<'_, 'app> {
        let request = TestRequest::with_uri(path).method(method);
        let request = match self.session {
            Some(ref cookie) => request.cookie(cookie.clone()),
            None => request,
        };

        Request { client: self, request }
    }
}

/// A prepared but not yet sent request.
pub struct Request<'client, 'app> {
    client: &'client mut Client<'app>,
    request: TestRequest,
}

impl<'client, 'app> Request<'client, 'app> {
    /// Send this request with JSON as its body.
    pub fn json<T: Serialize>(self, json: T) -> Response {
        let Request { client, request } = self;
        (client.app)(request.set_json(&json))
    }

    /// Send this request with `data` as its body.
    pub fn body(self, mime: &str, data: &'static [u8]) -> Response {
        let Request { client, request } = self;
        (client.app)(request.header(CONTENT_TYPE, mime).set_payload(data))
    }

    /// Send this request with `data` as its body, without a content type.
    pub fn payload(self, data: &'static [u8]) -> Response {
        let Request { client, request } = self;
        (client.app)(request.set_payload(data))
    }

    /// Send this request with no body.
    pub fn send(self) -> Response {
        let Request { client, request } = self;
        (client.app)(request)
    }
}

/// A response, read in full.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Read a response in full.
    pub fn read<B: MessageBody>(response: ServiceResponse<B>) -> Response {
        let status = response.status();
        let headers = response.headers().clone();
        let body = test::read_body(response);

        Response { status, headers, body }
    }

    /// Assert that this response uses specified code.
    pub fn assert_status(self, code: StatusCode) -> Self {
        assert_eq!(self.status, code, "Bad status code, body: {:?}", self.body);
        self
    }

    /// Assert that this response is a success.
    pub fn assert_success(self) -> Self {
        assert!(self.status.is_success(),
            "Expected success, not {}, body: {:?}", self.status, self.body);
        self
    }

    /// Assert that this response is an API error with specified HTTP status
    /// code and error code string.
    pub fn assert_error(self, status: StatusCode, code: &str) {
        assert_eq!(self.status, status, "Bad status code, body: {:?}", self.body);

        let data: ErrorData = self.json();
        assert_eq!(data.error, code, "{}", data.raw);
    }

    /// Get value of a header.
    ///
    /// This function will panic if header was not set.
    pub fn header(&self, name: &str) -> &str {
        match self.headers.get(name).and_then(|value| value.to_str().ok()) {
            Some(value) => value,
            None => panic!("Expected header {} to be set", name),
        }
    }

    /// Get value of a cookie.
    ///
    /// This function will panic if cookie was not set.
    pub fn cookie(&self, name: &str) -> Cookie<'static> {
        self.headers.get_all(SET_COOKIE)
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse_encoded(value.to_string()).ok())
            .find(|cookie| cookie.name() == name)
            .unwrap_or_else(|| panic!("Expected {} cookie to be set", name))
    }

    /// Deserialize this response's body as JSON.
    ///
    /// This function will panic on errors.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        match serde_json::from_slice(&self.body) {
            Ok(value) => value,
            Err(err) => panic!("Bad JSON ({}): {:?}", err, self.body),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    error: String,
    raw: String,
}
