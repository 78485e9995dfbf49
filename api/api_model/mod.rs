mod auth;
mod director;
mod genre;
mod like;
mod movie;
mod user;

pub(crate) use auth::*;
pub(crate) use director::*;
pub(crate) use genre::*;
pub(crate) use like::*;
pub(crate) use movie::*;
pub(crate) use user::*;
