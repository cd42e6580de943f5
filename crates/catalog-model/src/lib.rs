//! Catalog data model.
//!
//! Typed statistical entities (folders, data sets, variables, attributes,
//! users, publications) and the facts imported against them.
//!
//! # Overview
//!
//! - **Entities**: [`Entity`] wraps every catalog entity type and exposes the
//!   fields used by storage filters.
//! - **Facts**: [`Fact`] is one variable/value pair; its shape is fixed by the
//!   owning variable's [`VariableType`].
//! - **Individuals**: [`Individual`] is one imported row worth of facts.
//! - **Filters**: [`Filter`] and [`DataFilter`] describe entity and fact
//!   queries independently of the storage engine.

mod clock;
mod entity;
mod error;
mod fact;
mod filter;
mod ids;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::{
    Attribute, DataSet, Entity, EntityType, Folder, FormatKind, FormatOptions, Publication, User,
    ValueFormat, Variable, VariableType,
};
pub use error::{ModelError, Result};
pub use fact::{Fact, Individual, SchemaEntry};
pub use filter::{DataFilter, Filter, QueryOptions, SortOrder};
pub use ids::{AttributeId, DataSetId, EntityId, VariableId};
