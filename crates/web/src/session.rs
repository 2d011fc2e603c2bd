//! Session management.

use actix_web::{
    HttpRequest,
    HttpMessage,
    FromRequest,
    cookie::SameSite,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorInternalServerError, Result},
    http::Cookie,
};
use chrono::{DateTime, Duration, Utc};
use diesel::{prelude::*, result::Error as DbError};
use failure::Fail;
use futures::{Future, Poll, future::{self, FutureResult}};
use log::debug;
use std::{marker::PhantomData, rc::Rc};
use syllabus_error::{ApiError, Error};
use syllabus_models::{
    db::{
        Connection,
        Pool,
        models::{Session as DbSession, NewSession},
        schema::sessions,
    },
    models::{AssertExists, Model, User},
    permissions::{Permission, PermissionBits, RequirePermissionsError},
};

/// Cookie holding the sealed session ID.
const COOKIE: &str = "sesid";

/// Days after which an instructor has to log in again.
const LIFETIME_DAYS: i64 = 30;

/// Days a session may stay unused.
const IDLE_DAYS: i64 = 7;

#[derive(Clone)]
pub struct SessionManager {
    /// Key sealing session cookies.
    secret: Vec<u8>,
    db: Pool,
}

/// Instructor's session, extracted from a request.
///
/// Requests without a valid session cookie fail with 401. A [`Policy`] may
/// reject the remaining ones with 403.
pub struct Session<Policy = Normal> {
    data: DbSession,
    _policy: PhantomData<Policy>,
}

/// Additional requirement a session must meet, such as holding the
/// [`AddCourse`] permission. Only checked for live sessions.
///
/// [`AddCourse`]: syllabus_models::permissions::AddCourse
pub trait Policy {
    type Error;

    fn validate(session: &DbSession) -> Validation<Self::Error>;
}

#[derive(Clone, Debug)]
pub enum Validation<E = Error> {
    Pass,
    /// Reject with 403 `user:session:rejected`.
    Reject,
    Error(E),
}

/// Any live session passes.
pub struct Normal;

/// Session state of a request, kept in its extensions.
struct SessionData {
    existing: Option<DbSession>,
    /// Session to start once the request is handled. Replaces `existing`.
    new: Option<NewSession>,
    /// Log out of `existing`.
    destroy: bool,
}

impl SessionManager {
    pub fn new(secret: &[u8], db: Pool) -> SessionManager {
        SessionManager {
            secret: secret.to_vec(),
            db,
        }
    }

    /// Is `ses` neither past its expiry nor idle for too long at `now`?
    fn is_alive(ses: &DbSession, now: DateTime<Utc>) -> bool {
        now <= ses.expires && now - ses.last_used <= Duration::days(IDLE_DAYS)
    }

    fn before_request(&self, req: &mut ServiceRequest) -> Result<()> {
        let cookie = match req.cookie(COOKIE) {
            Some(cookie) => cookie,
            None => return Ok(()),
        };

        let mut data = match base64::decode(cookie.value()) {
            Ok(data) => data,
            Err(err) => {
                debug!("Malformed session cookie: {}", err);
                return Ok(());
            }
        };
        let sesid: i32 = match syllabus_util::unseal(&self.secret, &mut data) {
            Ok(sesid) => sesid,
            Err(err) => {
                debug!("Cannot unseal session cookie: {}", err);
                return Ok(());
            }
        };

        let db = self.db.get().map_err(internal)?;

        let session = sessions::table
            .filter(sessions::id.eq(sesid))
            .get_result::<DbSession>(&*db)
            .optional()
            .map_err(internal)?;

        let session = match session {
            Some(session) => session,
            None => return Ok(()),
        };

        if SessionManager::is_alive(&session, Utc::now()) {
            req.extensions_mut().insert(SessionData {
                existing: Some(session),
                new: None,
                destroy: false,
            });
        } else {
            debug!("Session {} of user {} expired", session.id, session.user);
            diesel::delete(&session)
                .execute(&*db)
                .map_err(internal)?;
        }

        Ok(())
    }

    fn after_request<B>(&self, rsp: &mut ServiceResponse<B>) -> Result<()> {
        let cookie = match rsp.request().extensions().get::<SessionData>() {
            Some(session) => self.finish_session(rsp.request(), session)?,
            None => None,
        };

        if let Some(cookie) = cookie {
            rsp.response_mut().add_cookie(&cookie)?;
        }

        Ok(())
    }

    /// Write a request's session changes to the database. Returns the cookie
    /// the response should carry.
    fn finish_session(&self, req: &HttpRequest, session: &SessionData)
    -> Result<Option<Cookie<'static>>> {
        let db = self.db.get().map_err(internal)?;

        match (session.existing.as_ref(), session.new.as_ref()) {
            (Some(existing), _) if session.destroy => {
                diesel::delete(existing)
                    .execute(&*db)
                    .map_err(internal)?;

                Ok(Some(self.cookie(req, String::new(), Duration::zero())))
            }
            (existing, Some(new)) => {
                if let Some(existing) = existing {
                    diesel::delete(existing)
                        .execute(&*db)
                        .map_err(internal)?;
                }

                let session = diesel::insert_into(sessions::table)
                    .values(new)
                    .get_result::<DbSession>(&*db)
                    .map_err(internal)?;

                let value = syllabus_util::seal(&self.secret, session.id).map_err(internal)?;

                Ok(Some(self.cookie(
                    req, base64::encode(&value), Duration::days(LIFETIME_DAYS))))
            }
            (Some(existing), None) => {
                diesel::update(existing)
                    .set(sessions::last_used.eq(Utc::now()))
                    .execute(&*db)
                    .map_err(internal)?;
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    fn cookie(&self, req: &HttpRequest, value: String, max_age: Duration)
    -> Cookie<'static> {
        Cookie::build(COOKIE, value)
            .domain(req.app_config().host().to_string())
            .path("/")
            .max_age_time(max_age)
            .secure(!cfg!(debug_assertions))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }
}

fn internal<E: ToString>(err: E) -> actix_web::Error {
    ErrorInternalServerError(err.to_string())
}

impl<S, B> Transform<S> for SessionManager
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>>,
    S::Error: From<actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = S::Error;
    type Transform = SessionMiddleware<S>;
    type InitError = ();
    type Future = FutureResult<SessionMiddleware<S>, ()>;

    fn new_transform(&self, service: S) -> Self::Future {
        future::ok(SessionMiddleware {
            service,
            manager: Rc::new(self.clone()),
        })
    }
}

pub struct SessionMiddleware<S> {
    service: S,
    manager: Rc<SessionManager>,
}

impl<S, B> Service for SessionMiddleware<S>
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>>,
    S::Error: From<actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = S::Error;
    type Future = Box<dyn Future<Item = Self::Response, Error = S::Error>>;

    fn poll_ready(&mut self) -> Poll<(), Self::Error> {
        self.service.poll_ready()
    }

    fn call(&mut self, mut req: ServiceRequest) -> Self::Future {
        if let Err(e) = self.manager.before_request(&mut req) {
            return Box::new(future::err(From::from(e)));
        }

        let manager = self.manager.clone();
        Box::new(self.service.call(req)
            .map(move |rsp| rsp.checked_expr(|rsp| manager.after_request(rsp))))
    }
}

impl<P> Session<P> {
    /// Log `user` in once the request is handled.
    ///
    /// The session keeps a snapshot of the user's permissions.
    pub fn create(req: &HttpRequest, user: &User) {
        let now = Utc::now();
        let new = NewSession {
            user: user.id(),
            expires: now + Duration::days(LIFETIME_DAYS),
            last_used: now,
            permissions: user.permissions().bits(),
        };

        let mut extensions = req.extensions_mut();

        debug!("Creating session for user {}", user.id());
        if let Some(session) = extensions.get_mut::<SessionData>() {
            session.new = Some(new);
            return;
        }

        extensions.insert(SessionData {
            existing: None,
            new: Some(new),
            destroy: false,
        });
    }

    pub fn destroy(req: &HttpRequest, sess: Self) {
        req.extensions_mut().insert(SessionData {
            existing: Some(sess.data),
            new: None,
            destroy: true,
        })
    }

    pub fn user_id(&self) -> i32 {
        self.data.user
    }

    pub fn user(&self, db: &Connection) -> Result<User, DbError> {
        User::by_id(db, self.data.user).assert_exists()
    }

    pub fn permissions(&self) -> PermissionBits {
        PermissionBits::from_bits_truncate(self.data.permissions)
    }
}

impl<P> std::ops::Deref for Session<P> {
    type Target = DbSession;

    fn deref(&self) -> &DbSession {
        &self.data
    }
}

impl<P> FromRequest for Session<P>
where
    P: Policy,
    Error: From<P::Error>,
{
    type Error = Error;
    type Future = Result<Session<P>, Error>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.extensions()
            .get::<SessionData>()
            .and_then(|s| s.existing);

        let session = match session {
            Some(session) => session,
            None => return Err(SessionFromRequestError::NoSession.into()),
        };

        match P::validate(&session) {
            Validation::Pass => Ok(Session {
                data: session,
                _policy: PhantomData,
            }),
            Validation::Reject => Err(SessionFromRequestError::Policy.into()),
            Validation::Error(error) => Err(error.into()),
        }
    }
}

impl Policy for Normal {
    type Error = Error;

    fn validate(_: &DbSession) -> Validation {
        Validation::Pass
    }
}

impl<P: Permission> Policy for P {
    type Error = RequirePermissionsError;

    fn validate(session: &DbSession) -> Validation<RequirePermissionsError> {
        let bits = PermissionBits::from_bits_truncate(session.permissions);

        match bits.require(P::bits()) {
            Ok(()) => Validation::Pass,
            Err(err) => Validation::Error(err),
        }
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum SessionFromRequestError {
    #[api(status = "UNAUTHORIZED", code = "user:session:required")]
    #[fail(display = "A session is required to access this resource")]
    NoSession,
    #[api(status = "FORBIDDEN", code = "user:session:rejected")]
    #[fail(display = "Rejected by policy")]
    Policy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use syllabus_models::permissions::{AddCourse, DeleteCourse, EditCourse};

    fn session(permissions: PermissionBits) -> DbSession {
        let now = Utc::now();
        DbSession {
            id: 1,
            user: 1,
            expires: now + Duration::days(LIFETIME_DAYS),
            last_used: now,
            permissions: permissions.bits(),
        }
    }

    #[test]
    fn fresh_sessions_pass() {
        let ses = session(PermissionBits::empty());
        assert!(SessionManager::is_alive(&ses, Utc::now()));
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let ses = session(PermissionBits::empty());
        let later = ses.expires + Duration::seconds(1);
        assert!(!SessionManager::is_alive(&ses, later));
    }

    #[test]
    fn inactive_sessions_are_rejected() {
        let ses = session(PermissionBits::empty());

        let soon = ses.last_used + Duration::days(IDLE_DAYS - 1);
        assert!(SessionManager::is_alive(&ses, soon));

        let later = ses.last_used + Duration::days(IDLE_DAYS + 1);
        assert!(!SessionManager::is_alive(&ses, later));
    }

    #[test]
    fn permission_policies_check_session_bits() {
        let ses = session(PermissionBits::ADD_COURSE | PermissionBits::EDIT_COURSE);

        assert!(match <AddCourse as Policy>::validate(&ses) {
            Validation::Pass => true,
            _ => false,
        });
        assert!(match <(AddCourse, EditCourse) as Policy>::validate(&ses) {
            Validation::Pass => true,
            _ => false,
        });

        match <DeleteCourse as Policy>::validate(&ses) {
            Validation::Error(err) => {
                assert_eq!(err.0, PermissionBits::DELETE_COURSE);
                assert_eq!(err.status(), actix_web::http::StatusCode::FORBIDDEN);
            }
            _ => panic!("missing permission not detected"),
        }
    }
}
