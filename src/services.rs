//! Orchestration between the routers and the repositories.

pub mod general;
pub mod room;
pub mod user;

/// What an entry form submission ended in.
#[derive(Debug)]
pub enum Entry<T> {
    Created(T),
    Updated(T),
    /// Nothing was written; the message goes back to the form.
    Rejected(&'static str),
}

impl<T> Entry<T> {
    pub fn message(&self) -> &'static str {
        match self {
            Entry::Created(_) => "Registration completed.",
            Entry::Updated(_) => "Update completed.",
            Entry::Rejected(message) => message,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Entry::Rejected(_))
    }
}
