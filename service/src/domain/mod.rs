//! Domain definitions.

pub mod order;
pub mod person;
pub mod reply;

pub use self::{
    order::{Detail, Order},
    person::Person,
    reply::Reply,
};
