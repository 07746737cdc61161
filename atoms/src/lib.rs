//! Catalog domain logic for the Cakewalk gallery.
//!
//! Atoms take their collaborators (the object store, the landing guard) as
//! arguments and hold no state between calls.

pub mod catalog;
pub mod store;
