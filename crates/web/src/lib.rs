mod extractors;
mod file_ext;
mod responders;

pub mod session;

pub use self::{
    extractors::{Database, DatabasePoolMissing},
    file_ext::{FileExt, Stream},
    responders::Created,
    session::{Session, SessionManager},
};
