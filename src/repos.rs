//! Typed queries per table. Listings return a [`Page`](crate::paging::Page)
//! whose total comes from a count over the same predicate.

pub mod category;
pub mod general;
pub mod room;
pub mod user;
